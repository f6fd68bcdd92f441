use once_cell::sync::Lazy;
use regex::Regex;

/// Tool output often arrives colored; strip escapes before parsing.
pub fn strip_ansi(s: &str) -> String {
    strip_ansi_escapes::strip_str(s)
}

/// First whitespace-delimited token of a line (the canonical URL of a route
/// line, or the domain of an annotated domain line).
pub fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

/// Canonical form of a route token: trimmed, scheme defaulted to `http://`
/// when absent.
pub fn canonical_url(base: &str) -> String {
    let base = base.trim();
    if base.is_empty() {
        return String::new();
    }
    if base.contains("://") {
        base.to_string()
    } else {
        format!("http://{base}")
    }
}

/// Host portion of a URL token, when one parses.
pub fn host_of(base: &str) -> Option<String> {
    if !base.contains("://") {
        return None;
    }
    let parsed = url::Url::parse(base).ok()?;
    parsed.host_str().map(|h| h.to_string())
}

static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d{1,3})\]$").unwrap());
static RE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());

/// HTTP status from the bracket token directly following the base URL, if
/// present (`https://x/y [404] ...` -> 404).
pub fn route_status(line: &str) -> Option<u16> {
    let mut tokens = line.split_whitespace();
    tokens.next()?; // base URL
    let tag = tokens.next()?;
    let caps = RE_STATUS.captures(tag)?;
    caps.get(1)?.as_str().parse().ok()
}

/// All `[...]` annotation groups on a line, in order. Groups may contain
/// spaces (`[text/html; charset=utf-8]`).
pub fn bracket_groups(line: &str) -> Vec<String> {
    RE_BRACKET
        .find_iter(line)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Strict bare-domain normalization: lowercase, scheme/path/port stripped,
/// `*.` wildcard and `www.` labels dropped, labels validated (`[a-z0-9-]`,
/// 1..=63 chars, no edge hyphen), at least one dot required except for
/// `localhost`. Returns None for anything that is not a clean domain.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut d = raw.trim().to_ascii_lowercase();
    if let Some(idx) = d.find("://") {
        d = d[idx + 3..].to_string();
    }
    if let Some(idx) = d.find('/') {
        d.truncate(idx);
    }
    if let Some(idx) = d.find(':') {
        d.truncate(idx);
    }
    let mut d = d.trim_matches('.').to_string();
    if let Some(rest) = d.strip_prefix("*.") {
        d = rest.to_string();
    }
    if let Some(rest) = d.strip_prefix("www.") {
        d = rest.to_string();
    }
    if d.is_empty() {
        return None;
    }
    if d != "localhost" && !d.contains('.') {
        return None;
    }
    for label in d.split('.') {
        if label.is_empty() || label.len() > 63 {
            return None;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return None;
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return None;
        }
    }
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_are_lowercased_and_stripped() {
        assert_eq!(normalize_domain("Example.COM"), Some("example.com".into()));
        assert_eq!(
            normalize_domain("https://App.Example.com:8443/login"),
            Some("app.example.com".into())
        );
        assert_eq!(normalize_domain("*.example.com"), Some("example.com".into()));
        assert_eq!(normalize_domain("www.example.com"), Some("example.com".into()));
        assert_eq!(normalize_domain("localhost"), Some("localhost".into()));
    }

    #[test]
    fn junk_domains_are_rejected() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("nodots"), None);
        assert_eq!(normalize_domain("-bad.example.com"), None);
        assert_eq!(normalize_domain("bad-.example.com"), None);
        assert_eq!(normalize_domain("spaced domain.com"), None);
        assert_eq!(normalize_domain("mailto:user@example.com"), None);
    }

    #[test]
    fn canonical_url_defaults_scheme() {
        assert_eq!(canonical_url("sub.example.com/path"), "http://sub.example.com/path");
        assert_eq!(canonical_url("https://example.com"), "https://example.com");
        assert_eq!(canonical_url("  "), "");
    }

    #[test]
    fn status_is_read_from_first_bracket_only() {
        assert_eq!(route_status("https://x/y [200] [Title]"), Some(200));
        assert_eq!(route_status("https://x/y [0]"), Some(0));
        assert_eq!(route_status("https://x/y"), None);
        assert_eq!(route_status("https://x/y [Title] [200]"), None);
    }

    #[test]
    fn bracket_groups_keep_spaces() {
        let groups = bracket_groups("https://x [200] [Title] [text/html; charset=utf-8]");
        assert_eq!(groups, vec!["[200]", "[Title]", "[text/html; charset=utf-8]"]);
    }
}
