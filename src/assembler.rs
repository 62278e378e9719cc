//! Content assembly: page content rendered into the shared shell, and
//! request errors rendered into error pages.

use crate::catalog::Catalog;
use crate::error::SiteError;
use crate::i18n::{build_defs, sanitize_inject, DefinitionMap};
use crate::site::{PageDescriptor, RequestContext, Site};
use crate::template::{render, ERROR_NAMESPACE, NOT_FOUND_NAMESPACE, SHELL_NAMESPACE};
use axum::http::StatusCode;
use tracing::{error, warn};
use url::Url;

/// Used only when no `error.html` was loaded.
const FALLBACK_ERROR_TEMPLATE: &str = "<h1>{error}</h1>\n<p>{description}</p>";

/// Render a page's content template and compose it into the shell.
pub async fn render_page(ctx: &RequestContext<'_>, page: &PageDescriptor) -> Result<String, SiteError> {
    let content_defs = build_defs(ctx, &page.namespace).await?;
    let template = template_for(ctx.site, &page.namespace)?;
    let content = render(template, &content_defs);

    let mut shell_defs = shell_seed(ctx, page, &content_defs, content);
    shell_defs.overlay(&build_defs(ctx, SHELL_NAMESPACE).await?);

    Ok(render(template_for(ctx.site, SHELL_NAMESPACE)?, &shell_defs))
}

fn template_for<'a>(site: &'a Site, namespace: &str) -> Result<&'a str, SiteError> {
    site.templates
        .main(namespace)
        .ok_or_else(|| SiteError::internal(format!("no template loaded for namespace \"{namespace}\"")))
}

/// Shell definitions derived from the page and its rendered content.
fn shell_seed(
    ctx: &RequestContext<'_>,
    page: &PageDescriptor,
    content_defs: &DefinitionMap,
    content: String,
) -> DefinitionMap {
    let site = ctx.site;
    let site_name = &site.config.site_name;

    let content_title = content_defs.text("Title").filter(|title| !title.is_empty());
    let title = match &content_title {
        Some(title) => format!("{title} - {site_name}"),
        None => site_name.clone(),
    };

    let styles = page
        .styles
        .iter()
        .map(|style| format!("<link rel=\"stylesheet\" href=\"/styles/{style}\">"))
        .collect::<Vec<_>>()
        .join("\n");
    let scripts = page
        .scripts
        .iter()
        .map(|script| format!("<script src=\"/scripts/{script}\" type=\"text/javascript\"></script>"))
        .collect::<Vec<_>>()
        .join("\n");
    let language_select = site
        .locales
        .iter()
        .map(|locale| {
            format!(
                "<a class=\"fp-sidebar-button fp-button fp-alternating\" href=\"?lang={}\">{}</a>",
                locale.code, locale.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let og_title = content_title.map_or_else(|| site_name.clone(), |title| title.into_owned());
    let og_description = content_defs
        .text("Description")
        .map(|description| description.into_owned())
        .unwrap_or_default();

    [
        ("TITLE", title),
        ("STYLES", styles),
        ("SCRIPTS", scripts),
        ("LANGUAGE_SELECT", language_select),
        ("CURRENT_LANGUAGE", site.locales.name(ctx.lang).to_string()),
        ("CONTENT", content),
        ("OG_TITLE", og_title),
        ("OG_DESCRIPTION", og_description),
        ("OG_URL", sanitize_inject(ctx.url.as_str())),
        ("OG_LOCALE", ctx.lang.replace('-', "_")),
    ]
    .into_iter()
    .collect()
}

/// Body for an error response, with the status it should be sent with.
///
/// Not-found errors render the localized `notfound` content inside the
/// shell; if that fails the minimal error page is used instead.
pub async fn render_error(site: &Site, catalog: &dyn Catalog, err: &SiteError) -> (StatusCode, String) {
    if let SiteError::Internal(inner) = err {
        error!("Internal error: {:#}", inner);
    }

    if let SiteError::NotFound { url, lang } = err {
        match render_not_found(site, catalog, url, lang).await {
            Ok(body) => return (err.status(), body),
            Err(fancy_err) => warn!("Failed to render localized not-found page: {}", fancy_err),
        }
    }

    (err.status(), minimal_error(site, err.status(), err.description()))
}

async fn render_not_found(site: &Site, catalog: &dyn Catalog, url: &str, lang: &str) -> Result<String, SiteError> {
    let url = Url::parse(url).map_err(|e| SiteError::internal(format!("{url}: {e}")))?;
    let ctx = RequestContext {
        site,
        catalog,
        url: &url,
        lang,
    };
    render_page(&ctx, &PageDescriptor::bare(NOT_FOUND_NAMESPACE)).await
}

/// The non-localized error page.
pub fn minimal_error(site: &Site, status: StatusCode, description: &str) -> String {
    let template = site.templates.main(ERROR_NAMESPACE).unwrap_or(FALLBACK_ERROR_TEMPLATE);
    let defs: DefinitionMap = [
        (
            "error",
            format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or_default()),
        ),
        ("description", description.to_string()),
    ]
    .into_iter()
    .collect();

    render(template, &defs)
}
