//! Classification of candidate entries into domain / route parts.
//!
//! An entry can be a full URL (`http://example.com/ad.gif`), a
//! scheme-relative URL (`//example.com/ad.gif`), a bare route (`/ad.gif`)
//! or a bare domain with an optional route (`example.com/ad.gif`).
//! Classification never fails: components that cannot be extracted are
//! reported as empty.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::types::EntryInfo;

pub(crate) const SCHEME_SEPARATOR: &str = "://";

/// Classify an entry into its domain and whether it carries a route.
pub fn classify(entry: &str) -> EntryInfo {
    if entry.starts_with("//") || entry.contains(SCHEME_SEPARATOR) {
        classify_url(entry)
    } else if entry.starts_with('/') {
        // Routes always start with a slash
        EntryInfo::new("", true)
    } else {
        // A domain without scheme, possibly followed by a route
        let mut parts = entry.splitn(2, '/').filter(|part| !part.is_empty());
        let domain = parts.next().unwrap_or_default();
        let contains_route = parts.next().is_some();

        EntryInfo::new(domain, contains_route)
    }
}

fn classify_url(entry: &str) -> EntryInfo {
    let parsed = if entry.starts_with("//") {
        Url::parse(&format!("http:{entry}"))
    } else {
        Url::parse(entry)
    };

    match parsed {
        Ok(url) => {
            let domain = url.host_str().unwrap_or_default().trim_end_matches('/');
            let has_query = url.query().is_some_and(|query| !query.is_empty());

            EntryInfo::new(domain, url.path().len() > 1 || has_query)
        }
        Err(e) => {
            debug!(entry, error = %e, "Entry is not a valid URL, splitting it by hand");
            classify_raw(entry)
        }
    }
}

/// Generic URI split (RFC 3986, appendix B). Matches any input.
fn uri_regex() -> &'static Regex {
    static URI_REGEX: OnceLock<Regex> = OnceLock::new();
    URI_REGEX.get_or_init(|| {
        Regex::new(r"^(?:[^:/?#]+:)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?").expect("Invalid URI regex")
    })
}

/// Classification of a URL-like entry the URL parser rejected. Each missing
/// component is treated as empty on its own.
fn classify_raw(entry: &str) -> EntryInfo {
    let Some(captures) = uri_regex().captures(entry) else {
        return EntryInfo::default();
    };

    let domain = captures.get(1).map_or("", |authority| host_of(authority.as_str()));
    let path = captures.get(2).map_or("", |m| m.as_str());
    let has_query = captures.get(3).is_some_and(|query| !query.as_str().is_empty());

    EntryInfo::new(domain.trim_end_matches('/'), path.len() > 1 || has_query)
}

/// Host of an authority, without user info and port.
fn host_of(authority: &str) -> &str {
    let host = authority.rsplit('@').next().unwrap_or_default();
    if host.starts_with('[') {
        host.find(']').map_or(host, |end| &host[..=end])
    } else {
        host.split(':').next().unwrap_or_default()
    }
}
