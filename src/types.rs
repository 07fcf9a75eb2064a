use serde::{Deserialize, Serialize};

/// Classification of a candidate entry (or a rule's own address text).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Host part of the entry, empty when the entry is a bare route.
    pub domain: String,
    /// Whether the entry carries a path or query beyond the bare domain.
    pub contains_route: bool,
}

impl EntryInfo {
    pub fn new(domain: impl Into<String>, contains_route: bool) -> Self {
        Self {
            domain: domain.into(),
            contains_route,
        }
    }

    /// Domain without route, e.g. `example.com`.
    pub fn is_domain_only(&self) -> bool {
        !self.domain.is_empty() && !self.contains_route
    }

    /// Route without domain, e.g. `/banner/img`.
    pub fn is_route_only(&self) -> bool {
        self.contains_route && self.domain.is_empty()
    }

    /// Both domain and route, e.g. `http://example.com/banner/img`.
    pub fn is_full_url(&self) -> bool {
        !self.domain.is_empty() && self.contains_route
    }
}

/// Result of checking if an entry should be blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResult {
    pub should_block: bool,
    pub reason: String,
    /// Raw texts of the rules behind the decision: every blocking rule that
    /// matched, or the single exception rule that allowed the entry.
    pub matched_rules: Vec<String>,
    pub category: BlockCategory,
}

impl BlockResult {
    pub(crate) fn blocked(matched_rules: Vec<String>) -> Self {
        Self {
            should_block: true,
            reason: format!("Matched {} blocking rule(s)", matched_rules.len()),
            matched_rules,
            category: BlockCategory::Blocked,
        }
    }

    pub(crate) fn excepted(exception: String) -> Self {
        Self {
            should_block: false,
            reason: "Matched exception rule".to_string(),
            matched_rules: vec![exception],
            category: BlockCategory::Excepted,
        }
    }

    pub(crate) fn clean() -> Self {
        Self {
            should_block: false,
            reason: "No rule matched".to_string(),
            matched_rules: vec![],
            category: BlockCategory::Clean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockCategory {
    /// At least one blocking rule matched and no exception did.
    Blocked,
    /// An exception rule matched; blocking rules are ignored.
    Excepted,
    Clean,
}

/// Statistics about a rule list load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub compiled: u64,
    pub exceptions: u64,
    pub comments: u64,
    pub cosmetic: u64,
    pub invalid: u64,
}

impl LoadStats {
    /// Total number of lines seen.
    pub fn total(&self) -> u64 {
        self.compiled + self.comments + self.cosmetic + self.invalid
    }

    pub fn skipped(&self) -> u64 {
        self.comments + self.cosmetic + self.invalid
    }

    pub(crate) fn merge(&mut self, other: LoadStats) {
        self.compiled += other.compiled;
        self.exceptions += other.exceptions;
        self.comments += other.comments;
        self.cosmetic += other.cosmetic;
        self.invalid += other.invalid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_info_categories() {
        assert!(EntryInfo::new("test.com", false).is_domain_only());
        assert!(EntryInfo::new("", true).is_route_only());
        assert!(EntryInfo::new("test.com", true).is_full_url());

        let empty = EntryInfo::default();
        assert!(!empty.is_domain_only());
        assert!(!empty.is_route_only());
        assert!(!empty.is_full_url());
    }

    #[test]
    fn test_load_stats_totals() {
        let mut stats = LoadStats {
            compiled: 3,
            exceptions: 1,
            comments: 2,
            cosmetic: 1,
            invalid: 1,
        };
        assert_eq!(stats.total(), 7);
        assert_eq!(stats.skipped(), 4);

        stats.merge(LoadStats {
            compiled: 1,
            ..Default::default()
        });
        assert_eq!(stats.compiled, 4);
        assert_eq!(stats.total(), 8);
    }
}
