//! A pretend application that assumes it owns the site root.
//!
//! Point a route's `upstream` at `http://127.0.0.1:8000`, run this next to
//! the proxy and browse the route prefix to see the links rewritten.

use std::net::SocketAddr;

use axum::{
    http::header,
    response::Html,
    routing::{get, post},
    Router,
};

const INDEX: &str = r#"<!doctype html>
<html>
  <head>
    <link rel="stylesheet" href="/style.css">
    <script src="/main.js"></script>
  </head>
  <body>
    <a href="/">Home</a>
    <a href="/challenges">Challenges</a>
    <form action="/submit" method="post"><input name="flag"></form>
  </body>
</html>
"#;

const STYLE: &str = r#"body { background: url("/img/bg.png"); }"#;

const SCRIPT: &str = r#"fetch("/api/data").then(r => r.json()).then(console.log);"#;

#[tokio::main]
async fn main() {
    let app = Router::new()
        .route("/", get(|| async { Html(INDEX) }))
        .route("/challenges", get(|| async { Html(INDEX) }))
        .route(
            "/style.css",
            get(|| async { ([(header::CONTENT_TYPE, "text/css")], STYLE) }),
        )
        .route(
            "/main.js",
            get(|| async { ([(header::CONTENT_TYPE, "application/javascript")], SCRIPT) }),
        )
        .route(
            "/api/data",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"solves":3}"#) }),
        )
        .route(
            "/submit",
            post(|body: String| async move { format!("received {} bytes", body.len()) }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    println!("Mock upstream listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
