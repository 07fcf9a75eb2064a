use crate::config::AdblockConfig;
use crate::entry::classify;
use crate::error::RuleError;
use crate::filters::FilterManager;
use crate::rule::{ParsedLine, Rule};
use crate::types::{BlockResult, LoadStats};

use anyhow::Result;
use tracing::{debug, info, warn};

/// Ordered set of compiled rules, exceptions first.
///
/// The set is read-only while matching, so it can be shared across threads
/// and queried concurrently without locking.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

enum Verdict<'a> {
    Excepted(&'a Rule),
    Blocked(Vec<&'a str>),
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from raw filter-list lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rule_set = Self::new();
        rule_set.add_rules(lines);
        rule_set
    }

    /// Adopt rules that were already compiled
    pub fn from_compiled(rules: Vec<Rule>) -> Self {
        let mut rule_set = Self { rules };
        rule_set.sort_exceptions_first();
        rule_set
    }

    /// Compile and append filter-list lines.
    ///
    /// Comments, cosmetic rules and invalid rules are skipped; only the
    /// returned stats record them.
    pub fn add_rules<I, S>(&mut self, lines: I) -> LoadStats
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stats = LoadStats::default();

        for line in lines {
            let line = line.as_ref();
            match Rule::parse(line) {
                Ok(ParsedLine::Rule(rule)) => {
                    stats.compiled += 1;
                    if rule.is_exception() {
                        stats.exceptions += 1;
                    }
                    self.rules.push(rule);
                }
                Ok(ParsedLine::Comment) => stats.comments += 1,
                Ok(ParsedLine::Cosmetic) => stats.cosmetic += 1,
                Err(e) => {
                    debug!(rule = line, error = %e, "Skipping invalid rule");
                    stats.invalid += 1;
                }
            }
        }

        self.sort_exceptions_first();
        stats
    }

    /// Replace all rules with the given lines
    pub fn reset<I, S>(&mut self, lines: I) -> LoadStats
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.clear();
        self.add_rules(lines)
    }

    // Stable: relative order inside each partition is kept
    fn sort_exceptions_first(&mut self) {
        self.rules.sort_by_key(|rule| !rule.is_exception());
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn evaluate(&self, entry: &str) -> Verdict<'_> {
        let entry = entry.trim();
        let info = classify(entry);

        let mut matched = Vec::new();
        for rule in &self.rules {
            if !rule.matches(entry, &info) {
                continue;
            }
            if rule.is_exception() {
                return Verdict::Excepted(rule);
            }
            matched.push(rule.raw());
        }

        Verdict::Blocked(matched)
    }

    /// Raw texts of the rules that block `entry`, in rule-set order.
    ///
    /// An empty list means the entry is allowed, either because nothing
    /// matched or because an exception rule matched.
    pub fn should_block(&self, entry: &str) -> Vec<&str> {
        match self.evaluate(entry) {
            Verdict::Excepted(_) => vec![],
            Verdict::Blocked(matched) => matched,
        }
    }

    /// Check if an entry should be blocked
    pub fn is_blocked(&self, entry: &str) -> bool {
        !self.should_block(entry).is_empty()
    }

    /// Get detailed block information
    pub fn check(&self, entry: &str) -> BlockResult {
        match self.evaluate(entry) {
            Verdict::Excepted(rule) => BlockResult::excepted(rule.raw().to_string()),
            Verdict::Blocked(matched) if matched.is_empty() => BlockResult::clean(),
            Verdict::Blocked(matched) => {
                BlockResult::blocked(matched.into_iter().map(str::to_string).collect())
            }
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for RuleSet {
    fn from_iter<I: IntoIterator<Item = S>>(lines: I) -> Self {
        Self::from_lines(lines)
    }
}

/// Ad blocker wired to its configured filter lists
pub struct AdBlocker {
    rule_set: RuleSet,
    config: AdblockConfig,
    stats: LoadStats,
    filter_manager: FilterManager,
}

impl AdBlocker {
    /// Create a new ad blocker, loading every configured filter list
    pub async fn new(config: AdblockConfig) -> Result<Self> {
        let filter_manager = FilterManager::from_config(&config);
        let mut blocker = Self {
            rule_set: RuleSet::new(),
            config,
            stats: LoadStats::default(),
            filter_manager,
        };
        blocker.reload().await?;

        Ok(blocker)
    }

    /// Reload every configured filter list and rebuild the rule set.
    ///
    /// A list that fails to load is skipped with a warning; the other lists
    /// are still used. Fails when lists are configured but none could be
    /// loaded, leaving the current rules in place.
    pub async fn reload(&mut self) -> Result<()> {
        let mut rule_set = RuleSet::new();
        let mut stats = LoadStats::default();
        let mut loaded_sources = 0;
        let mut last_error = None;

        for source in &self.config.sources {
            match self.filter_manager.load_lines(source).await {
                Ok(lines) => {
                    let loaded = rule_set.add_rules(&lines);
                    info!(
                        source = %source,
                        compiled = loaded.compiled,
                        skipped = loaded.skipped(),
                        "Loaded filter list"
                    );
                    stats.merge(loaded);
                    loaded_sources += 1;
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Could not load filter list");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error.filter(|_| loaded_sources == 0) {
            return Err(e.context("No filter list could be loaded"));
        }

        if !self.config.custom_filters.is_empty() {
            stats.merge(rule_set.add_rules(&self.config.custom_filters));
        }

        self.rule_set = rule_set;
        self.stats = stats;
        Ok(())
    }

    /// Add custom filter rule
    pub fn add_custom_filter(&mut self, filter: String) -> Result<(), RuleError> {
        let rule = Rule::new(&filter)?;
        let mut rules = self.rule_set.rules().to_vec();
        rules.push(rule);

        self.rule_set = RuleSet::from_compiled(rules);
        self.stats.compiled += 1;
        self.config.custom_filters.push(filter);
        Ok(())
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Get current configuration
    pub fn config(&self) -> &AdblockConfig {
        &self.config
    }

    /// Get statistics of the last load
    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn should_block(&self, entry: &str) -> Vec<&str> {
        self.rule_set.should_block(entry)
    }

    pub fn is_blocked(&self, entry: &str) -> bool {
        self.rule_set.is_blocked(entry)
    }

    pub fn check(&self, entry: &str) -> BlockResult {
        self.rule_set.check(entry)
    }
}
