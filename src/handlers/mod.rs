//! Namespace handlers: the dynamic half of a namespace.
//!
//! Every page or endpoint namespace is resolved to a [`NamespaceHandler`]
//! once, when the site snapshot is built. Page handlers contribute
//! definitions on top of the static translations; endpoint handlers produce
//! the whole response body.

mod search;
mod search_info;
mod view;

use crate::error::SiteError;
use crate::i18n::DefinitionMap;
use crate::site::RequestContext;
use axum::http::HeaderMap;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceHandler {
    /// Catalog search page
    Search,
    /// Single catalog entry page
    View,
    /// JSON statistics endpoint
    SearchInfo,
    /// Static translations only
    Plain,
}

/// Body and extra headers produced by an endpoint handler.
#[derive(Debug, Clone, Default)]
pub struct EndpointResponse {
    pub body: String,
    pub headers: HeaderMap,
}

impl NamespaceHandler {
    pub fn for_namespace(namespace: &str) -> Self {
        match namespace {
            "search" => NamespaceHandler::Search,
            "view" => NamespaceHandler::View,
            "searchinfo" => NamespaceHandler::SearchInfo,
            _ => NamespaceHandler::Plain,
        }
    }

    /// Whether the handler adds definitions to a page.
    pub fn provides_definitions(self) -> bool {
        matches!(self, NamespaceHandler::Search | NamespaceHandler::View)
    }

    /// Whether the handler can answer an endpoint request.
    pub fn serves_endpoints(self) -> bool {
        matches!(self, NamespaceHandler::SearchInfo)
    }

    /// Definitions to merge over the static translations in `defs`.
    pub async fn provide(
        self,
        ctx: &RequestContext<'_>,
        defs: &DefinitionMap,
    ) -> Result<DefinitionMap, SiteError> {
        match self {
            NamespaceHandler::Search => search::provide(ctx, defs).await,
            NamespaceHandler::View => view::provide(ctx).await,
            NamespaceHandler::SearchInfo | NamespaceHandler::Plain => Ok(DefinitionMap::new()),
        }
    }

    /// Complete endpoint response.
    pub async fn respond(self, ctx: &RequestContext<'_>) -> Result<EndpointResponse, SiteError> {
        match self {
            NamespaceHandler::SearchInfo => search_info::respond(ctx),
            other => Err(SiteError::internal(format!(
                "{other:?} handler cannot serve endpoint {}",
                ctx.url
            ))),
        }
    }
}

/// First value of a query parameter.
fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Every value of a repeated query parameter, in order.
fn query_values(url: &Url, name: &str) -> Vec<String> {
    url.query_pairs()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .collect()
}

fn query_flag(url: &Url, name: &str) -> bool {
    query_value(url, name).as_deref() == Some("true")
}
