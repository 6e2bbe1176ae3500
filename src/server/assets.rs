//! Static file serving for the bundled front end.

use super::error::ApiError;
use super::mime;
use crate::app::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.html";

pub(super) async fn serve_asset(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return ApiError::method_not_allowed().into_response();
    }

    let path = match resolve(state.static_root(), uri.path()).await {
        Ok(path) => path,
        Err(error) => return error.into_response(),
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read static file {}: {}", path.display(), e);
            return not_found().into_response();
        }
    };
    debug!("Serving {} ({} bytes)", path.display(), bytes.len());

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(bytes)
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::content_type_for(&path))],
        body,
    )
        .into_response()
}

/// Map a request path onto an existing file under `root`.
///
/// Paths that would leave `root`, lexically or through a symlink, are
/// rejected with 403 whether or not the target exists.
pub(crate) async fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, ApiError> {
    let decoded = urlencoding::decode(request_path).map_err(|_| {
        ApiError::new(StatusCode::BAD_REQUEST, "validation", "Invalid path encoding")
    })?;
    if decoded.contains('\0') {
        return Err(forbidden());
    }

    let relative = normalize(decoded.trim_start_matches('/')).ok_or_else(|| {
        warn!("Rejected path outside static root: {}", request_path);
        forbidden()
    })?;

    let root = tokio::fs::canonicalize(root).await.map_err(|e| {
        warn!("Static root {} is unavailable: {}", root.display(), e);
        not_found()
    })?;

    let candidate = root.join(&relative);
    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| not_found())?;
    if !resolved.starts_with(&root) {
        warn!("Rejected symlink outside static root: {}", request_path);
        return Err(forbidden());
    }

    let metadata = tokio::fs::metadata(&resolved)
        .await
        .map_err(|_| not_found())?;
    if metadata.is_dir() {
        let index = resolved.join(INDEX_FILE);
        return match tokio::fs::metadata(&index).await {
            Ok(meta) if meta.is_file() => Ok(index),
            _ => Err(not_found()),
        };
    }

    Ok(resolved)
}

/// Lexically resolve `.` and `..`; `None` if the path climbs above its start.
fn normalize(relative: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", "Not found")
}

fn forbidden() -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", "Forbidden")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("public");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("css/site.css"), "body {}").unwrap();
        fs::write(root.join("docs/index.html"), "docs").unwrap();
        fs::write(root.join("my notes.md"), "# notes").unwrap();
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let (_dir, root) = site();
        let path = resolve(&root, "/").await.unwrap();
        assert!(path.ends_with("index.html"));
    }

    #[tokio::test]
    async fn test_directory_serves_its_index() {
        let (_dir, root) = site();
        let path = resolve(&root, "/docs/").await.unwrap();
        assert!(path.ends_with("docs/index.html"));
        let path = resolve(&root, "/docs").await.unwrap();
        assert!(path.ends_with("docs/index.html"));
    }

    #[tokio::test]
    async fn test_nested_and_encoded_paths() {
        let (_dir, root) = site();
        assert!(resolve(&root, "/css/site.css").await.is_ok());
        assert!(resolve(&root, "/my%20notes.md").await.is_ok());
        assert!(resolve(&root, "/css/../index.html").await.is_ok());
    }

    #[tokio::test]
    async fn test_traversal_is_forbidden() {
        let (_dir, root) = site();
        for path in ["/../secret.txt", "/..%2fsecret.txt", "/css/../../secret.txt", "/../nope"] {
            let err = resolve(&root, path).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::FORBIDDEN, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_dir, root) = site();
        let err = resolve(&root, "/missing.js").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_forbidden() {
        let (dir, root) = site();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link.txt")).unwrap();
        let err = resolve(&root, "/link.txt").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/./b/../c"), Some(PathBuf::from("a/c")));
        assert_eq!(normalize(""), Some(PathBuf::new()));
        assert_eq!(normalize(".."), None);
        assert_eq!(normalize("a/../../b"), None);
    }
}
