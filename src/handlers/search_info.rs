use super::EndpointResponse;
use crate::error::SiteError;
use crate::site::RequestContext;
use anyhow::Context;

/// Current catalog statistics as JSON, straight from the active snapshot.
pub(super) fn respond(ctx: &RequestContext<'_>) -> Result<EndpointResponse, SiteError> {
    let body = serde_json::to_string(ctx.site.stats.as_ref())
        .context("Failed to serialize catalog statistics")?;

    Ok(EndpointResponse {
        body,
        ..EndpointResponse::default()
    })
}
