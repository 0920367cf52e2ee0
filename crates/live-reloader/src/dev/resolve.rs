//! Request path to on-disk file resolution.
//!
//! Every candidate path is normalized and checked against the served root
//! before the filesystem is touched, so `..` segments, encoded separators and
//! absolute components can never reach a file outside the root.

use path_clean::PathClean;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};

/// Document served for `/`, and the alias that redirects back to `/`.
pub const INDEX_PATH: &str = "/index.html";

/// The single directory tree files may be served from.
///
/// Always absolute and normalized (symlinks resolved at construction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot {
    path: PathBuf,
}

impl SiteRoot {
    /// Canonicalize `path` into a root.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from canonicalization (usually `NotFound`).
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = std::fs::canonicalize(path)?;
        Ok(Self { path })
    }

    /// Absolute path of the root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `candidate` is the root itself or lies beneath it.
    ///
    /// `Path::starts_with` compares whole components, so `/site-other` is not
    /// inside `/site`.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }

    /// Join a decoded URL path onto the root and normalize it.
    ///
    /// Leading separators are stripped so the URL path is always treated as
    /// relative to the root.
    pub fn candidate(&self, decoded: &str) -> Result<PathBuf, Rejection> {
        let relative = decoded.trim_start_matches(['/', '\\']);
        let candidate = self.path.join(relative).clean();

        if self.contains(&candidate) {
            Ok(candidate)
        } else {
            Err(Rejection::Forbidden)
        }
    }

    /// Re-check containment with symlinks resolved, once the file exists.
    async fn confirm(&self, candidate: PathBuf) -> Result<Resolved, Rejection> {
        let real = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| Rejection::NotFound)?;

        if !self.contains(&real) {
            tracing::debug!(
                "{} resolves outside the root via a symlink",
                candidate.display()
            );
            return Err(Rejection::Forbidden);
        }

        Ok(Resolved::File(ResolvedFile { path: candidate }))
    }
}

/// A file inside the root that exists and may be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    path: PathBuf,
}

impl ResolvedFile {
    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Successful resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Serve this file.
    File(ResolvedFile),
    /// `/index.html` was requested; redirect to `/`.
    RedirectToRoot,
}

/// Request-level rejection, mapped to an HTTP status by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The path is not valid percent-encoded UTF-8.
    BadRequest,
    /// The path escapes the root.
    Forbidden,
    /// Nothing to serve, even after the `.html` fallback.
    NotFound,
}

/// Percent-decode a URL path component.
///
/// Malformed escapes (`%` not followed by two hex digits), invalid UTF-8 and
/// NUL bytes are rejected rather than passed through.
pub fn decode_path(raw: &str) -> Result<String, Rejection> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape_ok = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !escape_ok {
                return Err(Rejection::BadRequest);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| Rejection::BadRequest)?;

    if decoded.contains('\0') {
        return Err(Rejection::BadRequest);
    }

    Ok(decoded.into_owned())
}

/// Extensionless paths that don't name a directory get a `.html` retry.
fn wants_html_fallback(decoded: &str) -> bool {
    !decoded.ends_with('/') && Path::new(decoded).extension().is_none()
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Resolve a raw (still percent-encoded) request path against `root`.
///
/// Rules, in order:
///
/// 1. decode, or reject with [`Rejection::BadRequest`];
/// 2. `/index.html` yields [`Resolved::RedirectToRoot`];
/// 3. `/` is served as `/index.html`;
/// 4. the candidate must stay inside the root ([`Rejection::Forbidden`]);
/// 5. a missing extensionless candidate is retried with `.html` appended;
/// 6. otherwise [`Rejection::NotFound`].
pub async fn resolve(request_path: &str, root: &SiteRoot) -> Result<Resolved, Rejection> {
    let mut decoded = decode_path(request_path)?;

    if decoded == INDEX_PATH {
        return Ok(Resolved::RedirectToRoot);
    }
    if decoded == "/" {
        decoded = INDEX_PATH.to_string();
    }

    let candidate = root.candidate(&decoded)?;
    if is_file(&candidate).await {
        return root.confirm(candidate).await;
    }

    if wants_html_fallback(&decoded) {
        let fallback = root.candidate(&format!("{decoded}.html"))?;
        if is_file(&fallback).await {
            return root.confirm(fallback).await;
        }
    }

    Err(Rejection::NotFound)
}
