//! Compilation of Adblock filter lines into matchable rules.
//!
//! An address rule is translated into a regular expression:
//!
//! - `^` is a separator: anything but a letter, a digit, or one of `_ - . %`,
//!   or the end of the address
//! - `*` is a wildcard
//! - `|` at the start or end anchors the beginning or end of the address
//! - `||` at the start anchors the beginning of a domain name
//!
//! Filter options after `$` are dropped. A `domain=` list restricts
//! the rule to (or excludes it from) a list of domains.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::entry::SCHEME_SEPARATOR;
use crate::error::RuleError;
use crate::types::EntryInfo;

const EXCEPTION_MARKER: &str = "@@";
const COMMENT_MARKER: &str = "!";
const VERSION_HEADER: &str = "[Adblock";
const COSMETIC_MARKERS: [&str; 3] = ["##", "#?#", "#@#"];

const DOMAIN_OPTION: &str = "domain=";
const EXCLUDED_DOMAIN_MARKER: char = '~';

/// Replacement for `^`.
const SEPARATOR: &str = r"([^A-Za-z0-9_\-\.%]|$)";

/// Replacement for a leading `||`: optional scheme, then an optional
/// authority prefix ending on a subdomain boundary (RFC 3986, appendix B).
const DOMAIN_ANCHOR: &str = r"^([^:\/?#]+:)?(\/\/([^\/?#]*\.)?)?";

/// Characters that are regex metacharacters in filter text and have no
/// meaning in filter syntax.
const ESCAPED_CHARS: [char; 12] = ['\\', '.', '$', '+', '?', '{', '}', '(', ')', '[', ']', '/'];

/// `$option,option,...` suffix. The leading `~` covers negated options such
/// as `$~third-party`.
fn options_regex() -> &'static Regex {
    static OPTIONS_REGEX: OnceLock<Regex> = OnceLock::new();
    OPTIONS_REGEX.get_or_init(|| Regex::new(r"(?i)\$~?[a-z\-]+.*$").expect("Invalid options regex"))
}

/// A line of a filter list, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Rule(Rule),
    /// `! comment` or `[Adblock Plus 2.0]` header
    Comment,
    /// Element hiding rule (`##`, `#?#`, `#@#`), never compiled
    Cosmetic,
}

/// A compiled address rule.
#[derive(Debug, Clone)]
pub struct Rule {
    raw: String,
    regex: Regex,
    is_exception: bool,
    domains_included: BTreeSet<String>,
    domains_excluded: BTreeSet<String>,
    contains_domain: bool,
    contains_route: bool,
}

impl Rule {
    /// Classify and, for address rules, compile one filter-list line.
    pub fn parse(line: &str) -> Result<ParsedLine, RuleError> {
        let (text, is_exception) = match line.strip_prefix(EXCEPTION_MARKER) {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        if text.starts_with(COMMENT_MARKER) || text.starts_with(VERSION_HEADER) {
            return Ok(ParsedLine::Comment);
        }

        if COSMETIC_MARKERS.iter().any(|marker| text.contains(marker)) {
            return Ok(ParsedLine::Cosmetic);
        }

        Self::compile(text, is_exception).map(ParsedLine::Rule)
    }

    /// Compile an address rule, rejecting comments and cosmetic rules.
    pub fn new(line: &str) -> Result<Self, RuleError> {
        match Self::parse(line)? {
            ParsedLine::Rule(rule) => Ok(rule),
            ParsedLine::Comment | ParsedLine::Cosmetic => {
                Err(RuleError::NotAddressRule(line.to_string()))
            }
        }
    }

    fn compile(text: &str, is_exception: bool) -> Result<Self, RuleError> {
        if text.is_empty() || text == "//" {
            return Err(RuleError::EmptyRule(text.to_string()));
        }

        let (domains_included, domains_excluded) = parse_domains(text);
        let address = strip_options(text);

        let contains_domain = text.contains(SCHEME_SEPARATOR)
            || text.starts_with('|')
            || !domains_included.is_empty()
            || !domains_excluded.is_empty();

        let escaped = escape(address);
        let contains_route = !contains_domain || has_route(&escaped);

        let pattern = translate(&escaped);
        if pattern.is_empty() {
            return Err(RuleError::EmptyRule(text.to_string()));
        }

        let regex = Regex::new(&pattern).map_err(|source| RuleError::Pattern {
            rule: text.to_string(),
            source,
        })?;

        Ok(Self {
            raw: text.to_string(),
            regex,
            is_exception,
            domains_included,
            domains_excluded,
            contains_domain,
            contains_route,
        })
    }

    /// Check the rule against an entry and its classification.
    ///
    /// The pattern is only evaluated when the shape of the entry fits the
    /// shape of the rule: full URLs are checked against every rule, bare
    /// domains only against domain-only rules, bare routes only against
    /// route-only rules. Domain restrictions apply to the first two cases.
    pub fn matches(&self, entry: &str, info: &EntryInfo) -> bool {
        let domain_allowed = self.accepts_domain(&info.domain);

        let eligible = (info.is_full_url() && domain_allowed)
            || (info.is_domain_only() && self.is_domain_only() && domain_allowed)
            || (info.is_route_only() && self.is_route_only());

        eligible && self.regex.is_match(entry)
    }

    fn accepts_domain(&self, domain: &str) -> bool {
        (self.domains_included.is_empty() || self.is_included(domain))
            && (self.domains_excluded.is_empty() || !self.is_excluded(domain))
    }

    fn is_domain_only(&self) -> bool {
        self.contains_domain && !self.contains_route
    }

    fn is_route_only(&self) -> bool {
        self.contains_route && !self.contains_domain
    }

    /// Rule text without the exception marker.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The regular expression the rule compiles to.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_exception(&self) -> bool {
        self.is_exception
    }

    pub fn domains_included(&self) -> &BTreeSet<String> {
        &self.domains_included
    }

    pub fn domains_excluded(&self) -> &BTreeSet<String> {
        &self.domains_excluded
    }

    pub fn is_included(&self, domain: &str) -> bool {
        self.domains_included.contains(domain)
    }

    pub fn is_excluded(&self, domain: &str) -> bool {
        self.domains_excluded.contains(domain)
    }

    pub fn contains_domain(&self) -> bool {
        self.contains_domain
    }

    pub fn contains_route(&self) -> bool {
        self.contains_route
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && self.pattern() == other.pattern()
            && self.is_exception == other.is_exception
            && self.domains_included == other.domains_included
            && self.domains_excluded == other.domains_excluded
            && self.contains_domain == other.contains_domain
            && self.contains_route == other.contains_route
    }
}

/// Address part of `address$options`.
fn strip_options(text: &str) -> &str {
    options_regex().find(text).map_or(text, |m| &text[..m.start()])
}

/// Read `domain=a.com|~b.com` from rule text. The list starts at the first
/// `domain=` and runs to the end of the line.
fn parse_domains(text: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut included = BTreeSet::new();
    let mut excluded = BTreeSet::new();

    let Some(pos) = text.find(DOMAIN_OPTION) else {
        return (included, excluded);
    };

    for domain in text[pos + DOMAIN_OPTION.len()..].split('|').filter(|d| !d.is_empty()) {
        if domain.contains(EXCLUDED_DOMAIN_MARKER) {
            excluded.insert(domain.replace(EXCLUDED_DOMAIN_MARKER, "").trim().to_string());
        } else {
            included.insert(domain.trim().to_string());
        }
    }

    (included, excluded)
}

fn escape(address: &str) -> String {
    let mut escaped = String::with_capacity(address.len() * 2);
    for c in address.chars() {
        if ESCAPED_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whether escaped rule text targets something past the domain, once
/// scheme and anchor tokens are removed.
fn has_route(escaped: &str) -> bool {
    let bare = escaped
        .replace(SCHEME_SEPARATOR, "")
        .replace(r":\/\/", "")
        .replace(['|', '^', '$'], "");

    bare.splitn(2, '/')
        .nth(1)
        .is_some_and(|route| route.len() > 1)
}

/// Turn escaped filter text into a regular expression.
fn translate(escaped: &str) -> String {
    let (body, anchor_end) = match escaped.strip_suffix('|') {
        Some(body) => (body, true),
        None => (escaped, false),
    };

    // A bare `||` is not a domain anchor and falls through as literal text
    let (prefix, body) = match body.strip_prefix("||") {
        Some(rest) if !rest.is_empty() => (DOMAIN_ANCHOR, rest),
        Some(_) => ("", body),
        None => match body.strip_prefix('|') {
            Some(rest) => ("^", rest),
            None => ("", body),
        },
    };

    let mut pattern = String::with_capacity(prefix.len() + body.len() * 2 + 1);
    pattern.push_str(prefix);
    for c in body.chars() {
        match c {
            '^' => pattern.push_str(SEPARATOR),
            '*' => pattern.push_str(".*"),
            '|' => pattern.push_str(r"\|"),
            _ => pattern.push(c),
        }
    }
    if anchor_end {
        pattern.push('$');
    }

    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::classify;

    fn compile(line: &str) -> Rule {
        Rule::new(line).unwrap()
    }

    fn matches(rule: &Rule, entry: &str) -> bool {
        rule.matches(entry, &classify(entry))
    }

    #[test]
    fn test_invalid_rules() {
        assert!(matches!(Rule::parse(""), Err(RuleError::EmptyRule(_))));
        assert!(matches!(Rule::parse("//"), Err(RuleError::EmptyRule(_))));
        assert!(matches!(Rule::parse("@@"), Err(RuleError::EmptyRule(_))));
        // Nothing left once the options are removed
        assert!(matches!(Rule::parse("$script,third-party"), Err(RuleError::EmptyRule(_))));
    }

    #[test]
    fn test_comments() {
        assert_eq!(Rule::parse("!this is comment").unwrap(), ParsedLine::Comment);
        assert_eq!(Rule::parse("[Adblock Plus 1.1]").unwrap(), ParsedLine::Comment);
        assert!(matches!(Rule::parse("non-comment rule").unwrap(), ParsedLine::Rule(_)));
    }

    #[test]
    fn test_cosmetic_rules() {
        assert_eq!(Rule::parse("##.advert").unwrap(), ParsedLine::Cosmetic);
        assert_eq!(Rule::parse("example.com##.advert").unwrap(), ParsedLine::Cosmetic);
        assert_eq!(Rule::parse("example.com#?#div:-abp-has(.ad)").unwrap(), ParsedLine::Cosmetic);
        assert_eq!(Rule::parse("example.com#@#.advert").unwrap(), ParsedLine::Cosmetic);
        assert!(matches!(Rule::new("##.advert"), Err(RuleError::NotAddressRule(_))));
    }

    #[test]
    fn test_exception_marker() {
        let rule = compile("@@advice.");
        assert!(rule.is_exception());
        assert_eq!(rule.raw(), "advice.");
        assert_eq!(rule.pattern(), r"advice\.");

        assert!(!compile("advice.").is_exception());
    }

    #[test]
    fn test_escape_special_characters() {
        let rule = compile(r".$+?{}()[]/\");
        assert_eq!(rule.pattern(), r"\.\$\+\?\{\}\(\)\[\]\/\\");
    }

    #[test]
    fn test_caret() {
        assert_eq!(compile("domain^").pattern(), r"domain([^A-Za-z0-9_\-\.%]|$)");
    }

    #[test]
    fn test_asterisk() {
        assert_eq!(compile("domain*").pattern(), "domain.*");
    }

    #[test]
    fn test_vertical_bars() {
        assert_eq!(
            compile("||domain").pattern(),
            r"^([^:\/?#]+:)?(\/\/([^\/?#]*\.)?)?domain"
        );
        assert_eq!(compile("|domain").pattern(), "^domain");
        assert_eq!(compile("domain|").pattern(), "domain$");
        assert_eq!(compile("|http://example.com/|").pattern(), r"^http:\/\/example\.com\/$");
        assert_eq!(compile(r"domain|bl||ah").pattern(), r"domain\|bl\|\|ah");
        assert_eq!(compile("a||").pattern(), r"a\|$");
    }

    #[test]
    fn test_options_are_stripped() {
        assert_eq!(compile("/ads/*$script,image").pattern(), r"\/ads\/.*");
        assert_eq!(compile("/ads/$~third-party").pattern(), r"\/ads\/");
        assert_eq!(
            compile("||cdn.example.com^$image,domain=example.org").pattern(),
            r"^([^:\/?#]+:)?(\/\/([^\/?#]*\.)?)?cdn\.example\.com([^A-Za-z0-9_\-\.%]|$)"
        );
    }

    #[test]
    fn test_domain_option() {
        let rule = compile("/test/*$script,~third-party,domain=test1.com|~test2.com| test3.com ");
        assert!(rule.is_included("test1.com"));
        assert!(rule.is_included("test3.com"));
        assert!(rule.is_excluded("test2.com"));
        assert_eq!(rule.domains_included().len(), 2);
        assert_eq!(rule.domains_excluded().len(), 1);
        assert!(rule.contains_domain());

        let unrestricted = compile("/test/*$script");
        assert!(unrestricted.domains_included().is_empty());
        assert!(unrestricted.domains_excluded().is_empty());
    }

    #[test]
    fn test_domain_token_in_address_restricts_rule() {
        let rule = compile("/redirect?domain=ads.com");
        assert!(rule.is_included("ads.com"));
        assert!(rule.contains_domain());
        assert!(rule.contains_route());
        assert_eq!(rule.pattern(), r"\/redirect\?domain=ads\.com");

        assert!(matches(&rule, "http://ads.com/redirect?domain=ads.com"));
        assert!(!matches(&rule, "http://other.com/redirect?domain=ads.com"));
    }

    #[test]
    fn test_separator_is_ascii_only() {
        let rule = compile("/foo^");
        assert!(matches(&rule, "http://x.com/fooé"));
        assert!(matches(&rule, "http://x.com/foo/bar"));
        assert!(!matches(&rule, "http://x.com/foo_bar"));
    }

    #[test]
    fn test_contains_route() {
        for line in [
            "/ezo/*$script,~third-party,domain=~yandex.by|~yandex.com|~yandex.kz|~yandex.ru|~yandex.ua",
            "||ads.example.com/test^",
            "||cal-one.net/ellington/deals_widget.php?^",
            "||cdn.totalfratmove.com/ttt/^$image,domain=postgradproblems.com",
            "adv",
        ] {
            assert!(compile(line).contains_route(), "Expected route in: {}", line);
        }

        for line in [
            "http://example.com^",
            "||ads.example.com^",
            "||cdn.totalfratmove.com^$image,domain=postgradproblems.com",
        ] {
            assert!(!compile(line).contains_route(), "Expected no route in: {}", line);
        }
    }

    #[test]
    fn test_contains_domain() {
        assert!(compile("||ads.example.com^").contains_domain());
        assert!(compile("|http://example.com/").contains_domain());
        assert!(compile("http://example.com^").contains_domain());
        assert!(compile("-advertise.$domain=mb-advertise.gr").contains_domain());
        assert!(!compile("-ad-code/").contains_domain());
    }

    #[test]
    fn test_match_url() {
        let rule = compile("swf|");
        assert!(matches(&rule, "http://example.com/annoyingflash.swf"));
        assert!(!matches(&rule, "http://example.com/swf/index.html"));
    }

    #[test]
    fn test_entry_shape_gates_matching() {
        // Route-only rule is not applied to a bare domain
        let route_rule = compile("ads");
        assert!(!matches(&route_rule, "ads.example.com"));
        assert!(matches(&route_rule, "/ads/banner.gif"));

        // Domain-only rule is not applied to a bare route
        let domain_rule = compile("||ads.example.com^");
        assert!(matches(&domain_rule, "ads.example.com"));
        assert!(!matches(&domain_rule, "/ads.example.com/"));
    }

    #[test]
    fn test_domain_restriction() {
        let rule = compile("/ads/*$domain=a.com|~b.com");
        assert!(matches(&rule, "http://a.com/ads/x"));
        assert!(!matches(&rule, "http://b.com/ads/x"));
        assert!(!matches(&rule, "http://c.com/ads/x"));

        let excluding = compile("/ads/*$domain=~b.com");
        assert!(matches(&excluding, "http://c.com/ads/x"));
        assert!(!matches(&excluding, "http://b.com/ads/x"));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let line = "||cdn.example.com/ads/^$image,domain=a.com|~b.com";
        assert_eq!(compile(line), compile(line));
        assert_ne!(compile(line), compile("@@||cdn.example.com/ads/^$image,domain=a.com|~b.com"));
    }
}
