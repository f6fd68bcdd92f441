use crate::pipeline::normalize;

/// One decoded ingress line.
///
/// Prefixes of the line grammar become their own variants; anything without a
/// prefix is classified by shape into a route, a bare domain, or free-form
/// meta text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Empty,
    /// Free-form diagnostic text.
    Meta(String),
    /// JavaScript URL discovery.
    Js(String),
    /// HTML endpoint discovery.
    Html(String),
    /// Serialized certificate record (JSON payload, unparsed).
    Cert(String),
    /// Serialized DNS record (JSON payload, unparsed).
    Dns(String),
    /// Registration-data `key=value` entry.
    Rdap(String),
    /// Bare domain, possibly followed by bracket annotations.
    Domain(String),
    /// URL or path, possibly followed by bracket annotations.
    Route(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub active: bool,
    pub event: Event,
}

// Schemes that never name a fetchable route; shape dispatch must not read
// their payload slashes as paths.
const OPAQUE_SCHEMES: &[&str] = &["data:", "mailto:", "tel:", "javascript:"];

/// Decode one raw ingress line against the prefix grammar. ANSI escapes are
/// stripped and the optional `active:` marker is consumed first.
pub fn decode(raw: &str) -> Line {
    let stripped = normalize::strip_ansi(raw);
    let mut body = stripped.trim();
    let mut active = false;
    if let Some(rest) = body.strip_prefix("active:") {
        active = true;
        body = rest.trim_start();
    }
    Line {
        active,
        event: decode_body(body),
    }
}

fn decode_body(body: &str) -> Event {
    if body.is_empty() {
        return Event::Empty;
    }
    if let Some(rest) = body.strip_prefix("meta:") {
        return Event::Meta(rest.trim().to_string());
    }
    if let Some(rest) = body.strip_prefix("js:") {
        return Event::Js(rest.trim().to_string());
    }
    if let Some(rest) = body.strip_prefix("html:") {
        return Event::Html(rest.trim().to_string());
    }
    if let Some(rest) = body.strip_prefix("cert:") {
        return Event::Cert(rest.trim().to_string());
    }
    if let Some(rest) = body.strip_prefix("dns:") {
        return Event::Dns(rest.trim().to_string());
    }
    if let Some(rest) = body.strip_prefix("rdap:") {
        return Event::Rdap(rest.trim().to_string());
    }
    if body.contains("-->") || body.contains(" (") {
        return Event::Meta(body.to_string());
    }
    // Shape is decided by the first token; trailing bracket annotations
    // (httpx status/title/content-type) must not turn a host into a route.
    let token = normalize::first_token(body);
    if OPAQUE_SCHEMES.iter().any(|s| token.starts_with(s)) {
        return Event::Domain(body.to_string());
    }
    if token.contains("://") || token.contains('/') {
        return Event::Route(body.to_string());
    }
    Event::Domain(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_dispatch() {
        assert_eq!(decode("meta: run started").event, Event::Meta("run started".into()));
        assert_eq!(decode("js: https://x/a.js").event, Event::Js("https://x/a.js".into()));
        assert_eq!(decode("html: https://x/").event, Event::Html("https://x/".into()));
        assert_eq!(decode("cert: {}").event, Event::Cert("{}".into()));
        assert_eq!(decode("dns: {}").event, Event::Dns("{}".into()));
        assert_eq!(decode("rdap: handle=X").event, Event::Rdap("handle=X".into()));
    }

    #[test]
    fn active_marker_is_consumed() {
        let line = decode("active: https://x/y [200]");
        assert!(line.active);
        assert_eq!(line.event, Event::Route("https://x/y [200]".into()));
        assert!(!decode("https://x/y").active);
    }

    #[test]
    fn shape_dispatch() {
        assert_eq!(decode("   ").event, Event::Empty);
        assert_eq!(decode("example.com").event, Event::Domain("example.com".into()));
        assert_eq!(decode("sub.example.com/path").event, Event::Route("sub.example.com/path".into()));
        assert_eq!(decode("https://x").event, Event::Route("https://x".into()));
        assert_eq!(
            decode("resolver --> 1.2.3.4").event,
            Event::Meta("resolver --> 1.2.3.4".into())
        );
        assert_eq!(
            decode("timeout (after 3 retries)").event,
            Event::Meta("timeout (after 3 retries)".into())
        );
        // annotated host lines stay domains even when a bracket carries a slash
        assert_eq!(
            decode("active: app.example.com [200] [text/html; charset=utf-8]").event,
            Event::Domain("app.example.com [200] [text/html; charset=utf-8]".into())
        );
    }

    #[test]
    fn opaque_schemes_never_become_routes() {
        assert_eq!(
            decode("data:image/png;base64,AAAA").event,
            Event::Domain("data:image/png;base64,AAAA".into())
        );
        assert_eq!(
            decode("mailto:sec@example.com").event,
            Event::Domain("mailto:sec@example.com".into())
        );
    }

    #[test]
    fn ansi_escapes_are_stripped() {
        let line = decode("\u{1b}[32mexample.com\u{1b}[0m");
        assert_eq!(line.event, Event::Domain("example.com".into()));
    }
}
