//! Capture-group extraction from commit subjects.

use regex::Regex;

use super::IssuesError;

/// A compiled issue pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    /// Compiles `pattern`. Invalid syntax is reported before any line is matched.
    pub fn new(pattern: &str) -> Result<Self, IssuesError> {
        let regex = Regex::new(pattern).map_err(|source| IssuesError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Returns the groups of the first match in `line`, or `None` when it does not match.
    ///
    /// Element 0 is the whole match. Groups that did not take part in the match are empty.
    pub fn captures(&self, line: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(line)?;
        Some(
            captures
                .iter()
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_groups_in_order() {
        let matcher = PatternMatcher::new(r"(\w+-\d+): (.+)").unwrap();

        let groups = matcher.captures("PROJ-12: fix null check").unwrap();

        assert_eq!(groups, vec!["PROJ-12: fix null check", "PROJ-12", "fix null check"]);
    }

    #[test]
    fn no_match_is_none() {
        let matcher = PatternMatcher::new(r"(\w+-\d+): (.+)").unwrap();

        assert!(matcher.captures("chore: bump version").is_none());
    }

    #[test]
    fn only_first_match_is_used() {
        let matcher = PatternMatcher::new(r"(\w+-\d+)").unwrap();

        let groups = matcher.captures("PROJ-1 and PROJ-2").unwrap();

        assert_eq!(groups, vec!["PROJ-1", "PROJ-1"]);
    }

    #[test]
    fn non_participating_group_is_empty() {
        let matcher = PatternMatcher::new(r"(\w+-\d+)(?: \[(\w+)\])?: (.+)").unwrap();

        let groups = matcher.captures("PROJ-7: tidy up").unwrap();

        assert_eq!(groups, vec!["PROJ-7: tidy up", "PROJ-7", "", "tidy up"]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = PatternMatcher::new(r"(\w+-\d+: (.+)").unwrap_err();

        assert!(matches!(err, IssuesError::InvalidPattern { ref pattern, .. } if pattern == r"(\w+-\d+: (.+)"));
    }
}
