//! HTTP server: static files plus a Server-Sent Events reload endpoint.

use crate::dev::{
    redirect_to_root, resolve, respond, ReceiverRegistry, Resolved, SiteRoot, RELOAD_PATH,
};
use crate::error::{CliError, Result};
use axum::{
    extract::State,
    http::{header, Method, Uri},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

/// Reconnect delay suggested to browsers when the stream opens.
const RETRY_HINT: Duration = Duration::from_millis(1000);

/// Interval of keep-alive comments on idle reload streams.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub root: Arc<SiteRoot>,
    pub registry: Arc<ReceiverRegistry>,
}

impl AppState {
    pub fn new(root: SiteRoot, registry: Arc<ReceiverRegistry>) -> Self {
        Self {
            root: Arc::new(root),
            registry,
        }
    }
}

/// Development server.
#[derive(Debug)]
pub struct DevServer {
    state: AppState,
}

impl DevServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Open reload streams are closed as soon as shutdown begins so the
    /// graceful drain does not wait on them.
    pub async fn start(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let registry = Arc::clone(&self.state.registry);
        let app = build_router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let closed = registry.close_all();
                tracing::debug!("closed {} reload stream(s)", closed);
            })
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// Bind the listening socket, telling "address in use" apart.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::bind(addr, e))
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(handle_reload_stream))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Path plus query, for request logs.
fn request_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Open a reload stream for one page.
///
/// The stream owns the receiver's registration; when the client disconnects
/// axum drops the stream and the receiver leaves the registry. The first
/// frame carries only the reconnect hint.
async fn handle_reload_stream(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    let (registration, rx) = state.registry.subscribe();

    tracing::info!("SSE connected (clients={})", state.registry.len());
    tracing::info!("{} {} -> 200", method, request_target(&uri));

    let retry = tokio_stream::once(Ok::<Event, Infallible>(Event::default().retry(RETRY_HINT)));
    let reloads = ReceiverStream::new(rx).map(move |payload| {
        let _held = &registration;
        Ok::<Event, Infallible>(Event::default().data(String::from_utf8_lossy(&payload)))
    });
    let stream = retry.chain(reloads);

    (
        [(header::CACHE_CONTROL, "no-cache, no-transform")],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping")),
    )
}

/// Serve a file from the root, or the matching rejection.
async fn handle_request(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let target = request_target(&uri);

    match resolve(uri.path(), &state.root).await {
        Ok(Resolved::RedirectToRoot) => {
            let response = redirect_to_root(uri.query());
            tracing::info!(
                "{} {} -> {} (redirect to /)",
                method,
                target,
                response.status().as_u16()
            );
            response
        }
        Ok(Resolved::File(file)) => {
            let response = respond(&file).await;
            tracing::info!(
                "{} {} -> {} ({})",
                method,
                target,
                response.status().as_u16(),
                file.path().display()
            );
            response
        }
        Err(rejection) => {
            tracing::info!(
                "{} {} -> {}",
                method,
                target,
                rejection.status().as_u16()
            );
            rejection.into_response()
        }
    }
}
