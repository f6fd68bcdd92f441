//! Route categorization heuristics.
//!
//! Pure string classification: no I/O, no global mutable state, stable output
//! order. A route commonly lands in several categories at once
//! (`/backup.zip?token=x` is both an archive and sensitive).

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

/// Route categories. `ORDER` fixes the priority used for detection results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Api,
    Graphql,
    Crawl,
    Json,
    Feeds,
    Js,
    Css,
    Html,
    Svg,
    Wasm,
    Images,
    Fonts,
    Video,
    Docs,
    Archives,
    Maps,
    Meta,
}

impl Category {
    pub const ORDER: [Category; 17] = [
        Category::Api,
        Category::Graphql,
        Category::Crawl,
        Category::Json,
        Category::Feeds,
        Category::Js,
        Category::Css,
        Category::Html,
        Category::Svg,
        Category::Wasm,
        Category::Images,
        Category::Fonts,
        Category::Video,
        Category::Docs,
        Category::Archives,
        Category::Maps,
        Category::Meta,
    ];

    /// Directory (and file stem) under `routes/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Graphql => "graphql",
            Category::Crawl => "crawl",
            Category::Json => "json",
            Category::Feeds => "feeds",
            Category::Js => "js",
            Category::Css => "css",
            Category::Html => "html",
            Category::Svg => "svg",
            Category::Wasm => "wasm",
            Category::Images => "images",
            Category::Fonts => "fonts",
            Category::Video => "video",
            Category::Docs => "docs",
            Category::Archives => "archives",
            Category::Maps => "maps",
            Category::Meta => "meta",
        }
    }
}

pub type Categories = SmallVec<[Category; 4]>;

static RE_API_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)(api|v\d+|beta|graphql)(/|$)").unwrap());
static RE_API_DOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"swagger|openapi|api[-_]?doc|api[-_]?spec|apispec|api[-_]?definition").unwrap());
static RE_GRAPHQL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|/)(graphql|graphiql|playground)(/|$)").unwrap());
static RE_FEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|/)(feed|rss|atom)(/|$)").unwrap());

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "ico", "bmp", "tif", "tiff", "avif"];
const FONT_EXTS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];
const VIDEO_EXTS: &[&str] = &["mp4", "webm", "avi", "mov", "mkv", "flv", "wmv", "m4v"];
const DOC_EXTS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md", "rtf", "csv"];
const ARCHIVE_EXTS: &[&str] = &["zip", "tar", "gz", "tgz", "rar", "7z", "bz2", "xz"];

const SENSITIVE_NAMES: &[&str] = &[
    "backup", "secret", "token", "password", "passwd", "credential", "creds", "config",
    "database", "db", "id_rsa", ".env", ".git", ".svn", "ssh", "private", "keystore",
];
const SENSITIVE_EXTS: &[&str] = &[
    "bak", "old", "swp", "sql", "db", "sqlite", "env", "ini", "cfg", "config", "conf",
    "log", "pem", "key", "p12", "pfx", "crt",
];
const SENSITIVE_QUERY_KEYS: &[&str] = &[
    "token=", "secret=", "password=", "passwd=", "key=", "apikey=", "api_key=",
    "access_token=", "auth=", "credential", "private_key=", "signature=",
];
const SENSITIVE_ARCHIVE_NAMES: &[&str] = &["backup", "config", "secret", "database", "db"];

/// Ordered, deduplicated categories for a route.
pub fn detect(route: &str) -> Categories {
    detect_with_reasons(route).into_iter().map(|(c, _)| c).collect()
}

/// Like [`detect`] but each category carries the rule that produced it.
pub fn detect_with_reasons(route: &str) -> Vec<(Category, String)> {
    let view = match RouteView::parse(route) {
        Some(v) => v,
        None => return Vec::new(),
    };
    let mut found = Found::default();
    classify(&view, &mut found);

    let mut ordered = Vec::with_capacity(found.hits.len());
    for cat in Category::ORDER {
        if let Some((_, reason)) = found.hits.iter().find(|(c, _)| *c == cat) {
            ordered.push((cat, reason.clone()));
        }
    }
    ordered
}

/// Lower-cased decomposition of a route, computed once per detection.
struct RouteView {
    full: String,
    path: String,
    query: String,
    base: String,
    ext: String,
}

impl RouteView {
    fn parse(route: &str) -> Option<Self> {
        let full = route.trim().to_ascii_lowercase();
        if full.is_empty() {
            return None;
        }
        for scheme in ["data:", "mailto:", "tel:"] {
            if full.starts_with(scheme) {
                return None;
            }
        }
        let (raw_path, query) = if full.contains("://") {
            match url::Url::parse(&full) {
                Ok(u) => (
                    u.path().to_string(),
                    u.query().unwrap_or_default().to_string(),
                ),
                Err(_) => split_opaque(&full),
            }
        } else {
            split_opaque(&full)
        };
        let path = clean_path(&raw_path);
        let base = path.rsplit('/').next().unwrap_or_default().to_string();
        let ext = match base.rfind('.') {
            Some(idx) if idx + 1 < base.len() => base[idx + 1..].to_string(),
            _ => String::new(),
        };
        Some(Self {
            full,
            path,
            query,
            base,
            ext,
        })
    }

    /// Base name without its final extension.
    fn stem(&self) -> &str {
        if self.ext.is_empty() {
            &self.base
        } else {
            &self.base[..self.base.len() - self.ext.len() - 1]
        }
    }
}

fn split_opaque(s: &str) -> (String, String) {
    match s.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (s.to_string(), String::new()),
    }
}

/// Collapse duplicate slashes and strip the trailing one.
fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        cleaned.push(c);
    }
    while cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned.pop();
    }
    if cleaned == "/" {
        cleaned.clear();
    }
    cleaned
}

#[derive(Default)]
struct Found {
    hits: Vec<(Category, String)>,
}

impl Found {
    fn add(&mut self, cat: Category, reason: impl Into<String>) {
        if !self.hits.iter().any(|(c, _)| *c == cat) {
            self.hits.push((cat, reason.into()));
        }
    }
}

fn classify(v: &RouteView, f: &mut Found) {
    let api_doc = is_api_document(v);

    // extension table
    match v.ext.as_str() {
        "map" => f.add(Category::Maps, "source map extension"),
        "wasm" => f.add(Category::Wasm, "wasm extension"),
        "svg" => f.add(Category::Svg, "svg extension"),
        "jsonld" => f.add(Category::Json, "json-ld extension"),
        "json" => {
            if api_doc {
                f.add(Category::Api, "api document (.json)");
            } else if is_feed_name(v.stem()) {
                f.add(Category::Feeds, "feed payload (.json)");
            } else {
                f.add(Category::Json, "json extension");
            }
        }
        "yaml" | "yml" => {
            if api_doc {
                f.add(Category::Api, "api document (.yaml)");
            }
        }
        "xml" => {
            if is_sitemap(&v.base) {
                f.add(Category::Crawl, "sitemap");
            } else if is_feed_name(v.stem()) {
                f.add(Category::Feeds, "feed xml");
            }
        }
        "gz" => {
            // compressed sitemaps stay crawl data, everything else .gz is an archive
            if v.base.ends_with(".xml.gz") {
                if is_sitemap(&v.base) {
                    f.add(Category::Crawl, "compressed sitemap");
                }
            } else {
                f.add(Category::Archives, "gzip archive");
            }
        }
        "txt" => {
            if v.base == "robots.txt" {
                f.add(Category::Crawl, "robots.txt");
            }
            f.add(Category::Docs, "text document");
        }
        "js" | "mjs" | "cjs" => f.add(Category::Js, "javascript extension"),
        "css" => f.add(Category::Css, "stylesheet extension"),
        "html" | "htm" => f.add(Category::Html, "html extension"),
        e if IMAGE_EXTS.contains(&e) => f.add(Category::Images, "image extension"),
        e if FONT_EXTS.contains(&e) => f.add(Category::Fonts, "font extension"),
        e if VIDEO_EXTS.contains(&e) => f.add(Category::Video, "video extension"),
        e if DOC_EXTS.contains(&e) => f.add(Category::Docs, "document extension"),
        e if ARCHIVE_EXTS.contains(&e) => f.add(Category::Archives, "archive extension"),
        _ => {}
    }

    // name rules
    if v.base == "robots.txt" || v.path.ends_with("/robots") {
        f.add(Category::Crawl, "robots");
    }
    if is_sitemap(&v.base) {
        f.add(Category::Crawl, "sitemap");
    }

    // path and query rules
    if RE_API_PATH.is_match(&v.path) || v.path.contains("/rest/") || v.path.contains("/services/") {
        f.add(Category::Api, "api path segment");
    }
    if api_doc {
        f.add(Category::Api, "api document indicator");
    }
    if RE_GRAPHQL.is_match(&v.path)
        || ((v.query.contains("query=") || v.query.contains("operationname="))
            && v.full.contains("graphql"))
    {
        f.add(Category::Graphql, "graphql endpoint");
    }
    if RE_FEED.is_match(&v.path) {
        f.add(Category::Feeds, "feed path segment");
    }

    // sensitive indicators
    if let Some(hit) = SENSITIVE_NAMES.iter().find(|k| v.base.contains(*k)) {
        f.add(Category::Meta, format!("sensitive name `{hit}`"));
    }
    if SENSITIVE_EXTS.contains(&v.ext.as_str()) {
        f.add(Category::Meta, format!("sensitive extension .{}", v.ext));
    }
    if ARCHIVE_EXTS.contains(&v.ext.as_str())
        && SENSITIVE_ARCHIVE_NAMES.iter().any(|k| v.base.contains(k))
    {
        f.add(Category::Meta, "sensitive archive name");
    }
    if let Some(hit) = SENSITIVE_QUERY_KEYS.iter().find(|k| v.full.contains(*k)) {
        f.add(Category::Meta, format!("sensitive query key `{hit}`"));
    }
}

fn is_api_document(v: &RouteView) -> bool {
    if RE_API_DOC.is_match(&v.base) {
        return true;
    }
    if v.stem() == "api" && (v.full.contains("openapi") || v.full.contains("swagger")) {
        return true;
    }
    v.query.contains("format=openapi") || v.query.contains("format=swagger")
}

fn is_feed_name(stem: &str) -> bool {
    matches!(stem, "feed" | "rss" | "atom")
}

fn is_sitemap(base: &str) -> bool {
    base == "sitemap.xml"
        || base == "sitemap_index.xml"
        || base == "sitemap.xml.gz"
        || (base.starts_with("sitemap") && base.contains(".xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(route: &str) -> Vec<Category> {
        detect(route).into_iter().collect()
    }

    #[test]
    fn non_http_schemes_are_empty() {
        assert!(cats("data:image/png;base64,AAA").is_empty());
        assert!(cats("mailto:x@example.com").is_empty());
        assert!(cats("tel:+15550100").is_empty());
    }

    #[test]
    fn path_is_cleaned_before_matching() {
        assert_eq!(cats("https://x//api//v1//users/"), vec![Category::Api]);
        assert_eq!(cats("https://x/assets//app.js"), vec![Category::Js]);
    }

    #[test]
    fn detection_is_pure_and_repeatable() {
        let route = "https://example.com/api/v2/export.json?token=abc";
        assert_eq!(detect(route), detect(route));
        let reasons = detect_with_reasons(route);
        let plain: Vec<Category> = reasons.iter().map(|(c, _)| *c).collect();
        assert_eq!(plain, cats(route));
    }
}
