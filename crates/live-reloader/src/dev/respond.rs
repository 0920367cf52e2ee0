//! Response construction for resolved files and rejections.
//!
//! HTML pages are read whole and get the reload client injected; everything
//! else is streamed from disk untouched.

use crate::dev::resolve::{Rejection, ResolvedFile};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mime_guess::mime;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Client snippet injected into every served HTML page.
pub const RELOAD_SNIPPET: &str = "<script>\n\
const es=new EventSource('/__reload');\n\
es.onmessage=()=>location.reload();\n\
</script>";

const BODY_CLOSE: &str = "</body>";

/// Content type of a file, derived from its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    mime: mime::Mime,
}

impl ContentType {
    /// Guess the content type from `path`, defaulting to octet-stream.
    pub fn from_path(path: &Path) -> Self {
        Self {
            mime: mime_guess::from_path(path).first_or_octet_stream(),
        }
    }

    /// Whether this is an HTML document.
    pub fn is_html(&self) -> bool {
        self.mime.type_() == mime::TEXT && self.mime.subtype() == mime::HTML
    }

    /// Header value; text types are declared UTF-8.
    pub fn header_value(&self) -> String {
        if self.mime.type_() == mime::TEXT {
            format!("{}; charset=utf-8", self.mime.essence_str())
        } else {
            self.mime.essence_str().to_string()
        }
    }
}

/// Insert [`RELOAD_SNIPPET`] before the first `</body>`, or append it.
///
/// The match is literal and case-sensitive; `</BODY>` falls through to the
/// append branch.
pub fn inject_reload_script(html: &str) -> String {
    match html.find(BODY_CLOSE) {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SNIPPET.len());
            out.push_str(&html[..pos]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}\n{RELOAD_SNIPPET}\n"),
    }
}

/// Build the `200` response for a resolved file.
///
/// A read failure after resolution (file removed in between, permissions)
/// becomes a `500`.
pub async fn respond(file: &ResolvedFile) -> Response {
    let content_type = ContentType::from_path(file.path());

    let result = if content_type.is_html() {
        respond_html(file.path(), &content_type).await
    } else {
        respond_stream(file.path(), &content_type).await
    };

    result.unwrap_or_else(|e| {
        tracing::error!("Failed to read {}: {}", file.path().display(), e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    })
}

async fn respond_html(path: &Path, content_type: &ContentType) -> std::io::Result<Response> {
    let bytes = tokio::fs::read(path).await?;
    let html = inject_reload_script(&String::from_utf8_lossy(&bytes));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type.header_value())],
        html,
    )
        .into_response())
}

async fn respond_stream(path: &Path, content_type: &ContentType) -> std::io::Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.header_value()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        body,
    )
        .into_response())
}

/// Redirect `/index.html` to `/`, keeping the query string.
pub fn redirect_to_root(query: Option<&str>) -> Response {
    let location = match query {
        Some(q) if !q.is_empty() => format!("/?{q}"),
        _ => "/".to_string(),
    };

    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

impl Rejection {
    /// HTTP status for this rejection.
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::BadRequest => StatusCode::BAD_REQUEST,
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            reason,
        )
            .into_response()
    }
}
