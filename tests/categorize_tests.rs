use recon_hunter::{detect, detect_with_reasons, Category};

#[test]
fn single_category_routes() {
    assert_eq!(
        detect("https://example.com/static/app.js.map").as_slice(),
        &[Category::Maps]
    );
    assert_eq!(detect("https://example.com/openapi.json").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/api/v1/users").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/assets/app.js").as_slice(), &[Category::Js]);
    assert_eq!(detect("https://example.com/style.css").as_slice(), &[Category::Css]);
    assert_eq!(detect("https://example.com/index.html").as_slice(), &[Category::Html]);
    assert_eq!(detect("https://example.com/logo.svg").as_slice(), &[Category::Svg]);
    assert_eq!(detect("https://example.com/lib/module.wasm").as_slice(), &[Category::Wasm]);
    assert_eq!(detect("https://example.com/photo.jpeg").as_slice(), &[Category::Images]);
    assert_eq!(detect("https://example.com/font.woff2").as_slice(), &[Category::Fonts]);
    assert_eq!(detect("https://example.com/clip.mp4").as_slice(), &[Category::Video]);
    assert_eq!(detect("https://example.com/report.docx").as_slice(), &[Category::Docs]);
    assert_eq!(detect("https://example.com/data.jsonld").as_slice(), &[Category::Json]);
    assert_eq!(detect("https://example.com/release.tar").as_slice(), &[Category::Archives]);
}

#[test]
fn crawl_surface() {
    assert_eq!(detect("robots.txt").as_slice(), &[Category::Crawl, Category::Docs]);
    assert_eq!(
        detect("https://example.com/robots.txt").as_slice(),
        &[Category::Crawl, Category::Docs]
    );
    assert_eq!(detect("https://example.com/sitemap.xml").as_slice(), &[Category::Crawl]);
    assert_eq!(
        detect("https://example.com/sitemap_index.xml").as_slice(),
        &[Category::Crawl]
    );
    assert_eq!(
        detect("https://example.com/sitemap.xml.gz").as_slice(),
        &[Category::Crawl]
    );
    assert_eq!(detect("https://example.com/.well-known/robots").as_slice(), &[Category::Crawl]);
}

#[test]
fn sensitive_routes() {
    assert_eq!(
        detect("https://example.com/backup.zip?token=abc").as_slice(),
        &[Category::Archives, Category::Meta]
    );
    assert_eq!(detect("https://example.com/.env").as_slice(), &[Category::Meta]);
    assert_eq!(detect("https://example.com/dump.sql").as_slice(), &[Category::Meta]);
    assert_eq!(detect("https://example.com/server.pem").as_slice(), &[Category::Meta]);
    assert_eq!(
        detect("https://example.com/page?access_token=xyz").as_slice(),
        &[Category::Meta]
    );
    assert_eq!(detect("https://example.com/database-export.tgz").as_slice(), &[
        Category::Archives,
        Category::Meta
    ]);
}

#[test]
fn api_and_graphql_indicators() {
    assert_eq!(
        detect("https://example.com/graphql").as_slice(),
        &[Category::Api, Category::Graphql]
    );
    assert_eq!(detect("https://example.com/graphiql/").as_slice(), &[Category::Graphql]);
    assert_eq!(
        detect("https://example.com/playground?query=%7Bviewer%7D&operationName=x").as_slice(),
        &[Category::Graphql]
    );
    assert_eq!(detect("https://example.com/rest/items").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/services/soap").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/v2/users").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/swagger.yaml").as_slice(), &[Category::Api]);
    assert_eq!(detect("https://example.com/api-docs").as_slice(), &[Category::Api]);
    assert_eq!(
        detect("https://example.com/spec/api.json?format=swagger").as_slice(),
        &[Category::Api]
    );
}

#[test]
fn feeds() {
    assert_eq!(detect("https://example.com/blog/feed").as_slice(), &[Category::Feeds]);
    assert_eq!(detect("https://example.com/rss").as_slice(), &[Category::Feeds]);
    assert_eq!(detect("https://example.com/atom.xml").as_slice(), &[Category::Feeds]);
    assert_eq!(detect("https://example.com/feed.json").as_slice(), &[Category::Feeds]);
}

#[test]
fn output_order_is_fixed() {
    // a route hitting api, json and sensitive rules at once
    let cats = detect("https://example.com/api/v1/secret-config.json?token=1");
    assert_eq!(
        cats.as_slice(),
        &[Category::Api, Category::Json, Category::Meta]
    );
}

#[test]
fn plain_pages_have_no_category() {
    assert!(detect("https://example.com/about").is_empty());
    assert!(detect("https://example.com/").is_empty());
    assert!(detect("").is_empty());
}

#[test]
fn reasons_parallel_the_categories() {
    for route in [
        "https://example.com/backup.zip?token=abc",
        "robots.txt",
        "https://example.com/graphql",
        "https://example.com/feed.json",
    ] {
        let with_reasons = detect_with_reasons(route);
        let plain: Vec<Category> = with_reasons.iter().map(|(c, _)| *c).collect();
        assert_eq!(plain, detect(route).into_iter().collect::<Vec<_>>(), "route {route}");
        assert!(with_reasons.iter().all(|(_, reason)| !reason.is_empty()));
    }
}
