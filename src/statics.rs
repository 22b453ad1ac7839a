//! Static asset fallback
//!
//! Serves the paired frontend bundle in the standalone runtime. `/` and any
//! non-existent path fall back to the index document so client-side routing
//! keeps working. Resolution is guarded by the same contained-root check as
//! API handler paths.

use crate::http::{self, mime};
use crate::logger;
use crate::routing::guard;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve a static asset for a decoded request path.
pub async fn serve(
    static_root: &Path,
    pathname: &str,
    index_file: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let Some(file_path) = resolve(static_root, pathname, index_file) else {
        logger::log_warning(&format!(
            "static path traversal attempt blocked: {pathname}"
        ));
        return http::build_403_response();
    };

    match fs::read(&file_path).await {
        Ok(content) => {
            let content_type =
                mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
            http::build_asset_response(content, content_type, is_head)
        }
        Err(_) => http::build_404_response(),
    }
}

/// Resolve a request path to a file under the static root, falling back to
/// the index document. `None` means the path escaped the root.
fn resolve(static_root: &Path, pathname: &str, index_file: &str) -> Option<PathBuf> {
    let relative = pathname.trim_start_matches('/');
    let candidate = static_root.join(relative);
    let guarded = guard::ensure_contained(static_root, &candidate).ok()?;

    if guarded.is_file() {
        return Some(guarded);
    }

    // Directory, missing file, or the root itself: index fallback.
    let index = static_root.join(index_file);
    guard::ensure_contained(static_root, &index).ok()
}
