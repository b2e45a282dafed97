//! Read-only HTTP publisher for the named graph files.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;

const JSON_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::CONTENT_TYPE, "application/json"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
];

/// Graph names are plain file stems; anything that could walk the tree is rejected.
pub fn is_plain_stem(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn router(graph_dir: PathBuf) -> Router {
    Router::new()
        .route("/:name", get(serve_graph))
        .with_state(Arc::new(graph_dir))
}

async fn serve_graph(State(graph_dir): State<Arc<PathBuf>>, Path(name): Path<String>) -> Response {
    if !is_plain_stem(&name) {
        return (StatusCode::NOT_FOUND, JSON_HEADERS).into_response();
    }
    let path = graph_dir.join(format!("{name}.json"));
    match tokio::fs::read(&path).await {
        Ok(content) => (StatusCode::OK, JSON_HEADERS, content).into_response(),
        Err(err) => {
            tracing::debug!("[SERVE] {} -> 404 ({})", path.display(), err);
            (StatusCode::NOT_FOUND, JSON_HEADERS).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_stem_rules() {
        assert!(is_plain_stem("full"));
        assert!(is_plain_stem("contract-0xabc"));
        assert!(!is_plain_stem(""));
        assert!(!is_plain_stem("..%2Fsecret"));
        assert!(!is_plain_stem("a.b"));
    }

    #[tokio::test]
    async fn test_serves_file_unmodified_and_404s_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("full.json"), "[{\"kind\":\"ward\"}]").unwrap();
        let app = router(dir.path().to_path_buf());

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/full").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = axum::body::to_bytes(ok.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"[{\"kind\":\"ward\"}]");

        let missing = app
            .oneshot(Request::builder().uri("/oracles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
