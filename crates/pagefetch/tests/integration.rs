//! Integration tests for PageFetch using wiremock

use pagefetch::{
    fetch, ContentFormat, ErrorKind, FetchError, FetchRequest, Tool, EXTRACTION_FAILED,
    NO_MORE_CONTENT,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn article_html() -> String {
    let sentence =
        "Ownership rules let the compiler check memory safety, without a garbage collector, at build time. ";
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Ownership</title><style>body {{ color: red; }}</style></head>
<body>
    <nav><ul><li><a href="/">Home</a></li><li><a href="/blog">Blog</a></li></ul></nav>
    <article>
        <h1>Understanding Ownership</h1>
        <p>{0}</p>
        <p>{0} See <a href="/docs/borrowing">borrowing</a>.</p>
        <p>{0}</p>
    </article>
    <footer>Copyright 2024 Example Corp</footer>
</body>
</html>"#,
        sentence.repeat(2)
    )
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_plain_text_pagination() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let body = "a".repeat(12_000);
    mount(
        &mock_server,
        "/long.txt",
        ResponseTemplate::new(200)
            .set_body_string(body)
            .insert_header("content-type", "text/plain"),
    )
    .await;

    let url = format!("{}/long.txt", mock_server.uri());
    let prefix = format!(
        "Content type text/plain cannot be simplified to markdown, but here is the raw content:\nContents of {url}:\n"
    );

    let first = fetch(FetchRequest::new(&url)).await.unwrap();
    assert_eq!(first.format, ContentFormat::Raw);
    assert_eq!(
        first.content,
        format!(
            "{prefix}{}\n\n<error>Content truncated. Call the fetch tool with a start_index of 5000 to get more content.</error>",
            "a".repeat(5000)
        )
    );

    let second = fetch(FetchRequest::new(&url).start_index(5000)).await.unwrap();
    assert!(second
        .content
        .ends_with("start_index of 10000 to get more content.</error>"));

    let third = fetch(FetchRequest::new(&url).start_index(10_000)).await.unwrap();
    assert_eq!(third.content, format!("{prefix}{}", "a".repeat(2000)));

    let past = fetch(FetchRequest::new(&url).start_index(12_000)).await.unwrap();
    assert_eq!(past.content, format!("{prefix}{NO_MORE_CONTENT}"));
}

#[tokio::test]
async fn test_article_to_markdown() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/post",
        ResponseTemplate::new(200).set_body_raw(article_html(), "text/html; charset=utf-8"),
    )
    .await;

    let url = format!("{}/post", mock_server.uri());
    let resp = fetch(FetchRequest::new(&url).max_length(100_000)).await.unwrap();

    assert_eq!(resp.format, ContentFormat::Markdown);
    assert_eq!(resp.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert!(resp
        .content
        .starts_with(&format!("Contents of {url}:\n# Understanding Ownership\n\n")));
    assert!(resp.content.contains("Ownership rules let the compiler"));
    assert!(resp
        .content
        .contains(&format!("[borrowing]({}/docs/borrowing)", mock_server.uri())));
    assert!(!resp.content.contains("Blog"));
    assert!(!resp.content.contains("Copyright"));
    assert!(!resp.content.contains("color: red"));
    assert!(!resp.content.contains("<p>"));
}

#[tokio::test]
async fn test_raw_html_passthrough() {
    let mock_server = MockServer::start().await;
    let html = article_html();
    mount(
        &mock_server,
        "/post",
        ResponseTemplate::new(200).set_body_raw(html.clone(), "text/html"),
    )
    .await;

    let url = format!("{}/post", mock_server.uri());
    let resp = fetch(FetchRequest::new(&url).raw().max_length(100_000))
        .await
        .unwrap();

    assert_eq!(resp.format, ContentFormat::Raw);
    assert_eq!(
        resp.content,
        format!(
            "Content type text/html cannot be simplified to markdown, but here is the raw content:\nContents of {url}:\n{html}"
        )
    );
}

#[tokio::test]
async fn test_short_page_extraction_failure() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/tiny",
        ResponseTemplate::new(200)
            .set_body_raw("<html><body><p>Just a line.</p></body></html>", "text/html"),
    )
    .await;

    let url = format!("{}/tiny", mock_server.uri());
    let resp = fetch(FetchRequest::new(&url)).await.unwrap();
    assert_eq!(resp.content, format!("Contents of {url}:\n{EXTRACTION_FAILED}"));
}

#[tokio::test]
async fn test_missing_content_type_is_treated_as_markup() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/bare",
        ResponseTemplate::new(200).set_body_bytes(article_html().into_bytes()),
    )
    .await;

    let url = format!("{}/bare", mock_server.uri());
    let resp = fetch(FetchRequest::new(&url)).await.unwrap();

    assert!(resp.content_type.is_none());
    assert_eq!(resp.format, ContentFormat::Markdown);
    assert!(resp.content.contains("# Understanding Ownership"));
}

#[tokio::test]
async fn test_json_is_returned_raw() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(r#"{"key": "value"}"#, "application/json"),
    )
    .await;

    let url = format!("{}/data.json", mock_server.uri());
    let resp = fetch(FetchRequest::new(&url)).await.unwrap();
    assert_eq!(
        resp.content,
        format!(
            "Content type application/json cannot be simplified to markdown, but here is the raw content:\nContents of {url}:\n{{\"key\": \"value\"}}"
        )
    );
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", format!("{}/new", mock_server.uri())),
    )
    .await;
    mount(
        &mock_server,
        "/new",
        ResponseTemplate::new(200).set_body_raw("moved here", "text/plain"),
    )
    .await;

    let resp = fetch(FetchRequest::new(format!("{}/old", mock_server.uri())))
        .await
        .unwrap();

    let final_url = format!("{}/new", mock_server.uri());
    assert_eq!(resp.url, final_url);
    assert!(resp
        .content
        .contains(&format!("Contents of {final_url}:\nmoved here")));
}

#[tokio::test]
async fn test_http_error_status() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, "/missing", ResponseTemplate::new(404)).await;

    let url = format!("{}/missing", mock_server.uri());
    let err = fetch(FetchRequest::new(&url)).await.unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains(&url));
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_string("late")
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let tool = Tool::builder().timeout(Duration::from_millis(300)).build();
    let err = tool
        .execute(FetchRequest::new(format!("{}/slow", mock_server.uri())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().ends_with("timed out after 300ms"));
}

#[tokio::test]
async fn test_connection_refused() {
    // Port 1 on localhost is not listening
    let err = fetch(FetchRequest::new("http://127.0.0.1:1/"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().starts_with("Failed to fetch http://127.0.0.1:1/"));
}

#[tokio::test]
async fn test_unsupported_scheme() {
    let err = fetch(FetchRequest::new("ftp://example.com/file.txt"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("only http and https"));
}

#[tokio::test]
async fn test_custom_user_agent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .mount(&mock_server)
        .await;

    let tool = Tool::builder().user_agent("TestAgent/1.0").build();
    let resp = tool
        .execute(FetchRequest::new(format!("{}/ua", mock_server.uri())))
        .await
        .unwrap();
    assert!(resp.content.ends_with("\nok"));
}

#[tokio::test]
async fn test_tool_call_outcomes() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/ok",
        ResponseTemplate::new(200).set_body_raw("fine", "text/plain"),
    )
    .await;
    mount(&mock_server, "/broken", ResponseTemplate::new(500)).await;

    let tool = Tool::default();

    let ok = tool
        .call(FetchRequest::new(format!("{}/ok", mock_server.uri())))
        .await;
    assert!(!ok.is_error);
    assert!(ok.text.ends_with("fine"));

    let failed = tool
        .call(FetchRequest::new(format!("{}/broken", mock_server.uri())))
        .await;
    assert!(failed.is_error);
    assert!(failed.text.contains("status code 500"));
}

#[tokio::test]
async fn test_prefix_lists() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/public",
        ResponseTemplate::new(200).set_body_raw("public", "text/plain"),
    )
    .await;

    let tool = Tool::builder()
        .allow_prefix(mock_server.uri())
        .block_prefix(format!("{}/private", mock_server.uri()))
        .build();

    assert!(tool
        .execute(FetchRequest::new(format!("{}/public", mock_server.uri())))
        .await
        .is_ok());

    let blocked = tool
        .execute(FetchRequest::new(format!("{}/private/data", mock_server.uri())))
        .await;
    assert!(matches!(blocked, Err(FetchError::BlockedUrl)));

    let outside = tool
        .execute(FetchRequest::new("https://elsewhere.example/"))
        .await;
    assert!(matches!(outside, Err(FetchError::BlockedUrl)));
}
