//! The request pipeline, independent of the HTTP framework.
//!
//! [`handle`] takes a transport-neutral [`IncomingRequest`] through the
//! router and the assembler and always produces a [`SiteResponse`]. Errors
//! from any stage are turned into error pages in one place.

use crate::assembler;
use crate::catalog::Catalog;
use crate::error::SiteError;
use crate::handlers::EndpointResponse;
use crate::router::{self, Target, LANG_KEY};
use crate::site::{RequestContext, Site};
use anyhow::Context;
use axum::http::header::{CACHE_CONTROL, CONTENT_LANGUAGE, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use cookie::Cookie;
use tracing::{info, warn};

const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub remote_ip: String,
    pub user_agent: String,
    /// Absolute request URL
    pub url: String,
    pub cookie_header: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SiteResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl SiteResponse {
    fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    fn html(status: StatusCode, body: String) -> Self {
        let mut response = Self::new(status, body);
        response.set_header(CONTENT_TYPE, HTML_CONTENT_TYPE);
        response
    }

    /// Set a header, skipping values that are not valid header text.
    fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => warn!("Dropping invalid {} header value {:?}", name, value),
        }
    }

    /// Body as text, for tests and tools.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Run one request through the whole pipeline.
pub async fn handle(site: &Site, catalog: &dyn Catalog, request: &IncomingRequest) -> SiteResponse {
    let config = &site.config;

    if router::is_blocked(config, &request.remote_ip, &request.user_agent) {
        if config.log_blocked_requests {
            info!("BLOCKED {} ({}): {}", request.remote_ip, request.user_agent, request.url);
        }
        return blocked(site);
    }
    info!("{} ({}): {}", request.remote_ip, request.user_agent, request.url);

    match dispatch(site, catalog, request).await {
        Ok(response) => response,
        Err(err) => {
            let (status, body) = assembler::render_error(site, catalog, &err).await;
            let mut response = SiteResponse::html(status, body);
            if let SiteError::NotFound { lang, .. } = &err {
                response.set_header(CONTENT_LANGUAGE, lang);
            }
            response
        }
    }
}

/// Blocked requesters get the bare not-found page and nothing else.
fn blocked(site: &Site) -> SiteResponse {
    let status = StatusCode::NOT_FOUND;
    SiteResponse::html(status, assembler::minimal_error(site, status, "The requested URL does not exist."))
}

async fn dispatch(site: &Site, catalog: &dyn Catalog, request: &IncomingRequest) -> Result<SiteResponse, SiteError> {
    let url = router::validate_url(&site.config, &request.url)?;
    let route = router::route(site, url, request.cookie_header.as_deref())?;
    let lang = route.locale.lang.as_str();

    let ctx = RequestContext {
        site,
        catalog,
        url: &route.url,
        lang,
    };

    let mut response = match &route.target {
        Target::Endpoint(endpoint) => {
            let EndpointResponse { body, headers } = site.handler(&endpoint.namespace).respond(&ctx).await?;
            let mut response = SiteResponse::new(StatusCode::OK, body);
            response.set_header(CONTENT_TYPE, &endpoint.content_type);
            response.headers.extend(headers);
            response
        }
        Target::Page(page) => {
            let body = assembler::render_page(&ctx, page).await?;
            let mut response = SiteResponse::html(StatusCode::OK, body);
            response.set_header(CONTENT_LANGUAGE, lang);
            response
        }
        Target::Static(path) => {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read static file {}", path.display()))?;
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let mut response = SiteResponse::new(StatusCode::OK, body);
            response.set_header(CONTENT_TYPE, mime.as_ref());
            response
        }
    };

    response.set_header(CACHE_CONTROL, &format!("max-age={}", site.config.cache_max_age));
    if route.locale.persist {
        let cookie = Cookie::build((LANG_KEY, lang)).path("/").build();
        response.set_header(SET_COOKIE, &cookie.to_string());
    }

    Ok(response)
}
