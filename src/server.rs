//! HTTP front end: one axum fallback handler feeding [`dispatch::handle`].

use crate::catalog::Catalog;
use crate::dispatch::{self, IncomingRequest};
use crate::site::Site;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{COOKIE, HOST, USER_AGENT};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared server state. The site snapshot is swapped whole, so a request
/// keeps the snapshot it started with.
pub struct AppState {
    site: ArcSwap<Site>,
    catalog: Arc<dyn Catalog>,
}

impl AppState {
    pub fn new(site: Site, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            site: ArcSwap::from_pointee(site),
            catalog,
        }
    }

    /// The current snapshot.
    pub fn site(&self) -> Arc<Site> {
        self.site.load_full()
    }

    /// Replace the current snapshot.
    pub fn publish(&self, site: Site) {
        self.site.store(Arc::new(site));
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(serve_request)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await
    .context("Server error")?;

    Ok(())
}

async fn serve_request(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let request = IncomingRequest {
        remote_ip: connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default(),
        user_agent: header_text(&headers, USER_AGENT).unwrap_or_default(),
        url: absolute_url(&headers, &uri),
        cookie_header: header_text(&headers, COOKIE),
    };

    let site = state.site();
    let response = dispatch::handle(&site, state.catalog(), &request).await;

    (response.status, response.headers, Body::from(response.body)).into_response()
}

/// All values of a header joined with `; `, if any are valid text.
fn header_text(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join("; "))
}

/// Origin-form request targets are completed with the `Host` header.
fn absolute_url(headers: &HeaderMap, uri: &Uri) -> String {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("http://{host}{path}")
}
