use super::query_value;
use crate::error::SiteError;
use crate::i18n::{sanitize_inject, DefinitionMap};
use crate::site::RequestContext;

/// Definitions for one catalog entry, selected with `?id=`.
pub(super) async fn provide(ctx: &RequestContext<'_>) -> Result<DefinitionMap, SiteError> {
    let not_found = || SiteError::not_found(ctx.url.as_str(), ctx.lang);

    let id = query_value(ctx.url, "id").ok_or_else(not_found)?;
    let record = ctx.catalog.find_game(&id).await?.ok_or_else(not_found)?;

    let title = sanitize_inject(&record.title);
    let description = sanitize_inject(&record.original_description);

    Ok([
        ("Title", title.clone()),
        ("Description", description.clone()),
        ("viewId", sanitize_inject(&record.id)),
        ("viewTitle", title),
        ("viewDescription", description),
        ("viewSeries", sanitize_inject(&record.series)),
        ("viewDeveloper", sanitize_inject(&record.developer)),
        ("viewPublisher", sanitize_inject(&record.publisher)),
        ("viewPlatform", sanitize_inject(&record.platforms.join("/"))),
        ("viewTags", sanitize_inject(&record.tags.join(" - "))),
        ("viewReleaseDate", sanitize_inject(&record.release_date)),
        ("viewDateAdded", sanitize_inject(&record.date_added)),
        (
            "viewLogo",
            format!(
                "{}/Logos/{}/{}/{}.png",
                ctx.site.config.image_url,
                record.id.get(0..2).unwrap_or_default(),
                record.id.get(2..4).unwrap_or_default(),
                sanitize_inject(&record.id)
            ),
        ),
    ]
    .into_iter()
    .collect())
}
