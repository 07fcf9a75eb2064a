use thiserror::Error;

/// Errors produced while compiling a single filter-list line.
///
/// None of these are fatal to list loading: [`crate::RuleSet`] logs and
/// skips the offending line.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The address part of the rule is empty or the degenerate `//`.
    #[error("Empty rule: {0:?}")]
    EmptyRule(String),

    /// The translated pattern was rejected by the regex engine.
    #[error("Failed to compile pattern for rule {rule:?}: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// A comment or cosmetic line was passed where an address rule was expected.
    #[error("Not an address rule: {0:?}")]
    NotAddressRule(String),
}

impl RuleError {
    /// Whether this error marks the rule itself as invalid, as opposed to
    /// a line that is simply not an address rule.
    pub fn is_invalid_rule(&self) -> bool {
        matches!(self, RuleError::EmptyRule(_) | RuleError::Pattern { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RuleError::EmptyRule("//".to_string()).to_string(), "Empty rule: \"//\"");
        assert_eq!(
            RuleError::NotAddressRule("##.ad".to_string()).to_string(),
            "Not an address rule: \"##.ad\""
        );
    }

    #[test]
    fn test_invalid_rule_classification() {
        assert!(RuleError::EmptyRule(String::new()).is_invalid_rule());
        assert!(!RuleError::NotAddressRule("!comment".to_string()).is_invalid_rule());
    }
}
