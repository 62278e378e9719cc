use super::{query_flag, query_value, query_values};
use crate::catalog::{FieldFilter, GameRecord, SearchOrder, SearchQuery, SortColumn};
use crate::error::SiteError;
use crate::i18n::{sanitize_inject, DefinitionMap};
use crate::site::RequestContext;
use crate::template::{expand, render};
use tracing::debug;

const NAMESPACE: &str = "search";

const SIMPLE_FRAGMENT: &str = "simple";
const ADVANCED_FRAGMENT: &str = "advanced";
const RESULT_FRAGMENT: &str = "result";
const NAVIGATION_FRAGMENT: &str = "navigation";

/// Translation key for the "by <creator>" line of a result.
const CREATOR_KEY: &str = "ResultCreator";

const GAME_LABEL_KEY: &str = "LibraryGame";
const ANIMATION_LABEL_KEY: &str = "LibraryAnimation";

pub(super) async fn provide(
    ctx: &RequestContext<'_>,
    defs: &DefinitionMap,
) -> Result<DefinitionMap, SiteError> {
    let url = ctx.url;
    let nsfw = query_flag(url, "nsfw");
    let advanced = query_flag(url, "advanced");

    let mut interface_defs = defs.clone();
    interface_defs.insert("nsfwChecked", checked(nsfw));
    interface_defs.insert("anyChecked", checked(query_flag(url, "any")));

    let (interface_template, query) = if advanced {
        (fragment(ctx, ADVANCED_FRAGMENT)?, advanced_query(ctx))
    } else {
        let input = query_value(url, "query");
        interface_defs.insert("searchQuery", sanitize_inject(input.as_deref().unwrap_or_default()));
        (
            fragment(ctx, SIMPLE_FRAGMENT)?,
            input.map(|input| SearchQuery::from_user_input(&input)),
        )
    };
    let search_interface = render(interface_template, &interface_defs);

    let search_navigation = match query {
        Some(mut query) => {
            configure(ctx, &mut query, nsfw, advanced);
            let results = ctx.catalog.search(&query).await?;
            debug!("Search for {:?} returned {} results", query.terms, results.len());
            navigation(ctx, defs, &results)?
        }
        None => String::new(),
    };

    Ok([
        ("searchInterface", search_interface),
        ("searchNavigation", search_navigation),
    ]
    .into_iter()
    .collect())
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

fn fragment<'a>(ctx: &RequestContext<'a>, name: &str) -> Result<&'a str, SiteError> {
    ctx.site
        .templates
        .fragment(NAMESPACE, name)
        .ok_or_else(|| SiteError::internal(format!("search template fragment \"{name}\" is not loaded")))
}

/// Query from the parallel `field`/`compare`/`string` lists. `None` unless
/// the lists are non-empty and of equal length.
fn advanced_query(ctx: &RequestContext<'_>) -> Option<SearchQuery> {
    let fields = query_values(ctx.url, "field");
    let compares = query_values(ctx.url, "compare");
    let strings = query_values(ctx.url, "string");

    if fields.is_empty() || fields.len() != compares.len() || compares.len() != strings.len() {
        return None;
    }

    let filters = fields
        .iter()
        .zip(&compares)
        .zip(&strings)
        .filter_map(|((field, compare), value)| FieldFilter::from_row(field, compare, value))
        .collect();

    Some(SearchQuery {
        filters,
        ..SearchQuery::default()
    })
}

fn configure(ctx: &RequestContext<'_>, query: &mut SearchQuery, nsfw: bool, advanced: bool) {
    if !nsfw {
        query.excluded_tags = ctx.site.filtered_tags.to_vec();
    }
    if advanced && query_flag(ctx.url, "any") {
        query.match_any = true;
    }
    if let Some(column) = query_value(ctx.url, "sort").as_deref().and_then(SortColumn::parse) {
        query.order = Some(SearchOrder {
            column,
            descending: query_value(ctx.url, "dir").as_deref() == Some("desc"),
        });
    }
    query.limit = ctx.site.config.page_size;
}

/// Navigation block with every result, or nothing when there are no hits.
fn navigation(
    ctx: &RequestContext<'_>,
    defs: &DefinitionMap,
    results: &[GameRecord],
) -> Result<String, SiteError> {
    if results.is_empty() {
        return Ok(String::new());
    }

    let result_template = fragment(ctx, RESULT_FRAGMENT)?;
    let rendered: Vec<String> = results
        .iter()
        .map(|record| render(result_template, &result_defs(ctx, defs, record)))
        .collect();

    let mut navigation_defs = defs.clone();
    navigation_defs.insert("searchTotal", results.len());
    navigation_defs.insert("searchResults", rendered.join("\n"));

    Ok(render(fragment(ctx, NAVIGATION_FRAGMENT)?, &navigation_defs))
}

/// Result fragment definitions, layered over the namespace's translations.
fn result_defs(ctx: &RequestContext<'_>, defs: &DefinitionMap, record: &GameRecord) -> DefinitionMap {
    let id = sanitize_inject(&record.id);
    let logo = format!(
        "{}/Logos/{}/{}/{}.png?type=jpg",
        ctx.site.config.image_url,
        id.get(0..2).unwrap_or_default(),
        id.get(2..4).unwrap_or_default(),
        id
    );

    let mut result = defs.clone();
    result.insert("resultId", id);
    result.insert("resultLogo", logo);
    result.insert("resultTitle", sanitize_inject(&record.title));
    result.insert("resultCreator", creator_line(defs, record.creator()));
    result.insert("resultPlatform", sanitize_inject(&record.platforms.join("/")));
    result.insert("resultLibrary", library_label(defs, &record.library));
    result.insert("resultTags", sanitize_inject(&record.tags.join(" - ")));
    result
}

/// Localized "by <creator>", empty when the record names nobody.
fn creator_line(defs: &DefinitionMap, creator: &str) -> String {
    if creator.is_empty() {
        return String::new();
    }
    let creator = sanitize_inject(creator);

    match defs.get(CREATOR_KEY) {
        Some(pattern) => {
            let line_defs: DefinitionMap = [(CREATOR_KEY, pattern.clone()), ("creator", creator.into())]
                .into_iter()
                .collect();
            expand(&format!("{CREATOR_KEY},creator"), &line_defs)
        }
        None => creator,
    }
}

/// `arcade` records are games, everything else is an animation. The
/// `LibraryGame`/`LibraryAnimation` translations override the English label.
fn library_label(defs: &DefinitionMap, library: &str) -> String {
    let (key, fallback) = if library == "arcade" {
        (GAME_LABEL_KEY, "game")
    } else {
        (ANIMATION_LABEL_KEY, "animation")
    };
    defs.text(key)
        .map(|label| label.into_owned())
        .unwrap_or_else(|| fallback.to_string())
}
