//! Adblock Filter Parser
//!
//! Compiles Adblock Plus / EasyList filter rules into regular expressions and
//! decides whether URLs, domains, or routes should be blocked. Exception
//! rules (`@@`) always win over blocking rules.
//!
//! # Quick Start
//!
//! ```rust
//! use adblock_parser::RuleSet;
//!
//! let rules = RuleSet::from_lines(["||ads.example.com^", "adv", "@@advice."]);
//!
//! assert_eq!(rules.should_block("http://ads.example.com/foo.gif"), vec!["||ads.example.com^"]);
//! assert!(rules.is_blocked("http://example.com/advert.html"));
//! assert!(!rules.is_blocked("http://example.com/advice.html"));
//! ```
//!
//! Filter lists can also be loaded from files or remote URLs through
//! [`AdBlocker`], which caches remote lists on disk.

pub mod blocker;
pub mod config;
pub mod entry;
pub mod error;
pub mod filters;
pub mod rule;
pub mod types;

pub use blocker::{AdBlocker, RuleSet};
pub use config::AdblockConfig;
pub use entry::classify;
pub use error::RuleError;
pub use filters::{FilterManager, FilterSource, FilterSources};
pub use rule::{ParsedLine, Rule};
pub use types::{BlockCategory, BlockResult, EntryInfo, LoadStats};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{AdBlocker, AdblockConfig, BlockCategory, BlockResult, FilterSource, Rule, RuleSet};
}
