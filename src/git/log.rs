//! Bounded commit-log streaming.

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::debug;

/// Commit-log errors.
#[derive(Error, Debug)]
pub enum LogError {
    /// The log command could not be started.
    #[error("Failed to run git log in {}", .path.display())]
    Spawn {
        /// Directory the command was started in.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Output of the log command could not be read.
    #[error("Failed reading git log output")]
    Read(#[source] io::Error),

    /// The log command terminated abnormally.
    #[error("Failed executing git log command: {}", .stderr.trim())]
    Failed {
        /// Captured standard error of the command.
        stderr: String,
    },
}

/// A bounded window of the commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Repository root to read the log from.
    pub path: PathBuf,
    /// Maximum number of commits.
    pub limit: usize,
    /// Commits at or before this revision are excluded.
    pub exclude_up_to_revision: Option<String>,
}

impl LogQuery {
    /// Creates a query for the `limit` most recent commits after `last_revision`.
    ///
    /// An empty `last_revision` imposes no lower bound.
    pub fn new<P: Into<PathBuf>>(path: P, limit: usize, last_revision: &str) -> Self {
        Self {
            path: path.into(),
            limit,
            exclude_up_to_revision: (!last_revision.is_empty())
                .then(|| last_revision.to_string()),
        }
    }
}

/// Producer of commit subject lines, newest first.
pub trait LogSource {
    /// Lines of the log. A failure of the underlying command is reported as the last item.
    type Lines: Iterator<Item = Result<String, LogError>>;

    /// Starts reading the log window described by `query`.
    fn log(&self, query: &LogQuery) -> Result<Self::Lines, LogError>;
}

/// Reads the log by running the `git` executable.
#[derive(Debug, Clone)]
pub struct GitLog {
    program: PathBuf,
}

impl Default for GitLog {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitLog {
    /// Creates a log source that runs `git` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log source running a specific git executable.
    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to git for a query.
    ///
    /// The revision range follows `--end-of-options`, so a revision is never
    /// parsed as an option even when it starts with `-`.
    pub fn args(query: &LogQuery) -> Vec<String> {
        let mut args = vec![
            "log".to_string(),
            "--pretty=format:%s".to_string(),
            format!("-{}", query.limit),
        ];
        if let Some(revision) = &query.exclude_up_to_revision {
            args.push("--end-of-options".to_string());
            args.push(format!("{revision}.."));
        }
        args
    }
}

impl LogSource for GitLog {
    type Lines = GitLogLines;

    fn log(&self, query: &LogQuery) -> Result<GitLogLines, LogError> {
        let args = Self::args(query);
        debug!(
            "Running {} {} in {}",
            self.program.display(),
            args.join(" "),
            query.path.display()
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&query.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LogError::Spawn {
                path: query.path.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take().map(drain_stderr);
        match stdout {
            Some(stdout) => Ok(GitLogLines {
                child,
                stdout: BufReader::new(stdout),
                stderr,
                finished: false,
            }),
            None => {
                reap(&mut child);
                Err(LogError::Read(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "git log stdout was not captured",
                )))
            }
        }
    }
}

/// Lines streamed from a running `git log` process.
///
/// Dropping the iterator before it is exhausted kills and reaps the process.
pub struct GitLogLines {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl GitLogLines {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.stdout.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn finish(&mut self) -> Result<(), LogError> {
        let status = self.child.wait().map_err(LogError::Read)?;
        if status.success() {
            return Ok(());
        }

        let stderr = self
            .stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        debug!("git log exited with {status}");
        Err(LogError::Failed { stderr })
    }
}

impl Iterator for GitLogLines {
    type Item = Result<String, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.finished = true;
                self.finish().err().map(Err)
            }
            Err(e) => {
                self.finished = true;
                reap(&mut self.child);
                Some(Err(LogError::Read(e)))
            }
        }
    }
}

impl Drop for GitLogLines {
    fn drop(&mut self) {
        if !self.finished {
            reap(&mut self.child);
        }
    }
}

/// Collects standard error on a separate thread while stdout is streamed.
fn drain_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!("Failed to read git log stderr: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Kills and waits for a child process, logging failures.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill git log process: {e}");
    }
    if let Err(e) = child.wait() {
        debug!("Failed to wait for git log process: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_last_revision_has_no_lower_bound() {
        let query = LogQuery::new("/repo", 100, "");

        assert_eq!(query.exclude_up_to_revision, None);
        assert_eq!(
            GitLog::args(&query),
            vec!["log", "--pretty=format:%s", "-100"]
        );
    }

    #[test]
    fn query_with_last_revision_requests_open_range() {
        let query = LogQuery::new("/repo", 25, "abc123");

        assert_eq!(query.exclude_up_to_revision.as_deref(), Some("abc123"));
        assert_eq!(
            GitLog::args(&query),
            vec![
                "log",
                "--pretty=format:%s",
                "-25",
                "--end-of-options",
                "abc123.."
            ]
        );
    }

    #[test]
    fn spawn_failure_names_path() {
        let log = GitLog::with_program("/nonexistent/git-binary");
        let query = LogQuery::new(std::env::temp_dir(), 10, "");

        let err = log.log(&query).err().unwrap();

        assert!(matches!(err, LogError::Spawn { .. }));
        assert!(err.to_string().starts_with("Failed to run git log in"));
    }

    #[test]
    fn revision_starting_with_dash_stays_a_revision() {
        let query = LogQuery::new("/repo", 100, "--output=/tmp/log");

        let args = GitLog::args(&query);

        let end_of_options = args.iter().position(|a| a == "--end-of-options");
        assert_eq!(end_of_options, Some(3));
        assert_eq!(args[4], "--output=/tmp/log..");
    }

    /// Runs `script` through `sh` in place of git.
    ///
    /// `sh` receives the git arguments, so the script is stored as a file named
    /// `log` in the working directory and the remaining arguments are ignored.
    #[cfg(unix)]
    fn scripted_log(script: &str) -> (tempfile::TempDir, GitLogLines) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("log"), script).unwrap();
        let query = LogQuery::new(temp_dir.path(), 10, "");

        let lines = GitLog::with_program("sh").log(&query).unwrap();
        (temp_dir, lines)
    }

    #[cfg(unix)]
    #[test]
    fn lines_are_decoded_lossily_without_carriage_returns() {
        let (_temp_dir, lines) =
            scripted_log(r"printf 'PROJ-1: fix\r\n\377\376PROJ-2: add\nPROJ-3: last'");

        let lines: Vec<String> = lines.collect::<Result<_, _>>().unwrap();

        assert_eq!(
            lines,
            vec![
                "PROJ-1: fix".to_string(),
                "\u{FFFD}\u{FFFD}PROJ-2: add".to_string(),
                "PROJ-3: last".to_string(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn dropping_lines_early_stops_the_process() {
        let (_temp_dir, mut lines) =
            scripted_log("printf 'first\\n'\nsleep 30\nprintf 'second\\n'\n");

        let started = std::time::Instant::now();
        assert_eq!(lines.next().unwrap().unwrap(), "first");
        drop(lines);

        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn failure_with_large_stderr_is_reported() {
        let script = "i=0\n\
                      while [ $i -lt 2000 ]; do\n\
                      printf 'error: object file is corrupt, retrying read\\n' >&2\n\
                      i=$((i + 1))\n\
                      done\n\
                      printf 'PROJ-1: partial\\n'\n\
                      exit 3\n";
        let (_temp_dir, lines) = scripted_log(script);

        let items: Vec<Result<String, LogError>> = lines.collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "PROJ-1: partial");
        match &items[1] {
            Err(LogError::Failed { stderr }) => assert_eq!(stderr.lines().count(), 2000),
            other => panic!("unexpected item: {other:?}"),
        }
    }
}
