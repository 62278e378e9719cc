//! Game catalog: the query/storage collaborator behind the search and view
//! pages.
//!
//! Pages only see the [`Catalog`] trait. [`JsonCatalog`] is a small file-backed
//! implementation that keeps its records behind an `ArcSwap`, so a refresh
//! replaces the whole record set at once and in-flight queries keep the set
//! they started with.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// "arcade" for games, "theatre" for animations
    #[serde(default)]
    pub library: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub date_modified: String,
    #[serde(default)]
    pub original_description: String,
    /// Number of packaged game data entries; zero means a legacy entry
    #[serde(default)]
    pub game_data: u32,
}

impl GameRecord {
    /// Developer, or publisher when no developer is known.
    pub fn creator(&self) -> &str {
        if self.developer.is_empty() {
            &self.publisher
        } else {
            &self.developer
        }
    }

    fn text_values(&self, field: SearchField) -> Vec<&str> {
        match field {
            SearchField::Title => vec![self.title.as_str()],
            SearchField::Series => vec![self.series.as_str()],
            SearchField::Developer => vec![self.developer.as_str()],
            SearchField::Publisher => vec![self.publisher.as_str()],
            SearchField::Platform => self.platforms.iter().map(String::as_str).collect(),
            SearchField::Tags => self.tags.iter().map(String::as_str).collect(),
            SearchField::Library => vec![self.library.as_str()],
            SearchField::ReleaseDate => vec![self.release_date.as_str()],
            SearchField::DateAdded => vec![self.date_added.as_str()],
            SearchField::DateModified => vec![self.date_modified.as_str()],
            SearchField::Format => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Series,
    Developer,
    Publisher,
    Platform,
    Tags,
    Library,
    ReleaseDate,
    DateAdded,
    DateModified,
    Format,
}

impl SearchField {
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "title" => SearchField::Title,
            "series" => SearchField::Series,
            "developer" => SearchField::Developer,
            "publisher" => SearchField::Publisher,
            "platform" => SearchField::Platform,
            "tags" | "tag" => SearchField::Tags,
            "library" => SearchField::Library,
            "releaseDate" => SearchField::ReleaseDate,
            "dateAdded" => SearchField::DateAdded,
            "dateModified" => SearchField::DateModified,
            "format" => SearchField::Format,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_date(self) -> bool {
        matches!(
            self,
            SearchField::ReleaseDate | SearchField::DateAdded | SearchField::DateModified
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    Contains(SearchField, String),
    NotContains(SearchField, String),
    Exactly(SearchField, String),
    NotExactly(SearchField, String),
    Before(SearchField, String),
    After(SearchField, String),
    On(SearchField, String),
    /// Entries packaged as game data (`true`) or legacy entries (`false`)
    GameZip(bool),
}

impl FieldFilter {
    /// Build a filter from an advanced-search row. Unsupported combinations
    /// yield `None` and are ignored.
    pub fn from_row(field: &str, compare: &str, value: &str) -> Option<Self> {
        let field = SearchField::parse(field)?;
        let value = value.to_string();

        if field == SearchField::Format {
            return match (compare, value.as_str()) {
                ("exactly", "GameZIP") => Some(FieldFilter::GameZip(true)),
                ("exactly", "Legacy") => Some(FieldFilter::GameZip(false)),
                _ => None,
            };
        }

        if field.is_date() {
            return match compare {
                "lower" => Some(FieldFilter::Before(field, value)),
                "higher" => Some(FieldFilter::After(field, value)),
                "equals" => Some(FieldFilter::On(field, value)),
                _ => None,
            };
        }

        match compare {
            "contains" => Some(FieldFilter::Contains(field, value)),
            "notContains" => Some(FieldFilter::NotContains(field, value)),
            "exactly" => Some(FieldFilter::Exactly(field, value)),
            "notExactly" => Some(FieldFilter::NotExactly(field, value)),
            _ => None,
        }
    }

    /// Exclusion filters always apply, even when matching any filter.
    fn is_exclusion(&self) -> bool {
        matches!(self, FieldFilter::NotContains(..) | FieldFilter::NotExactly(..))
    }

    fn matches(&self, record: &GameRecord) -> bool {
        match self {
            FieldFilter::Contains(field, value) => {
                let needle = value.to_lowercase();
                record
                    .text_values(*field)
                    .iter()
                    .any(|v| v.to_lowercase().contains(&needle))
            }
            FieldFilter::NotContains(field, value) => {
                !FieldFilter::Contains(*field, value.clone()).matches(record)
            }
            FieldFilter::Exactly(field, value) => record
                .text_values(*field)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            FieldFilter::NotExactly(field, value) => {
                !FieldFilter::Exactly(*field, value.clone()).matches(record)
            }
            FieldFilter::Before(field, value) => date_of(record, *field)
                .is_some_and(|date| date < value.as_str()),
            FieldFilter::After(field, value) => date_of(record, *field)
                .is_some_and(|date| date > value.as_str()),
            FieldFilter::On(field, value) => date_of(record, *field)
                .is_some_and(|date| date.starts_with(value.as_str())),
            FieldFilter::GameZip(packaged) => (record.game_data > 0) == *packaged,
        }
    }
}

fn date_of(record: &GameRecord, field: SearchField) -> Option<&str> {
    record
        .text_values(field)
        .into_iter()
        .next()
        .filter(|date| !date.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Title,
    Developer,
    Publisher,
    Series,
    Platform,
    ReleaseDate,
    DateAdded,
    DateModified,
}

impl SortColumn {
    /// Case-insensitive column name, as passed in `?sort=`.
    pub fn parse(name: &str) -> Option<Self> {
        let column = match name.to_ascii_lowercase().as_str() {
            "title" => SortColumn::Title,
            "developer" => SortColumn::Developer,
            "publisher" => SortColumn::Publisher,
            "series" => SortColumn::Series,
            "platform" => SortColumn::Platform,
            "releasedate" => SortColumn::ReleaseDate,
            "dateadded" => SortColumn::DateAdded,
            "datemodified" => SortColumn::DateModified,
            _ => return None,
        };
        Some(column)
    }

    fn key(self, record: &GameRecord) -> String {
        match self {
            SortColumn::Title => record.title.to_lowercase(),
            SortColumn::Developer => record.developer.to_lowercase(),
            SortColumn::Publisher => record.publisher.to_lowercase(),
            SortColumn::Series => record.series.to_lowercase(),
            SortColumn::Platform => record.platforms.join("/").to_lowercase(),
            SortColumn::ReleaseDate => record.release_date.clone(),
            SortColumn::DateAdded => record.date_added.clone(),
            SortColumn::DateModified => record.date_modified.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOrder {
    pub column: SortColumn,
    pub descending: bool,
}

/// A catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text terms; every term must match title, creator, series or a tag
    pub terms: Vec<String>,
    pub filters: Vec<FieldFilter>,
    /// Match any non-exclusion filter instead of all of them
    pub match_any: bool,
    /// Entries carrying any of these tags are left out
    pub excluded_tags: Vec<String>,
    pub order: Option<SearchOrder>,
    /// Maximum number of results; zero means unlimited
    pub limit: usize,
}

impl SearchQuery {
    /// Split user input into lowercase search terms.
    pub fn from_user_input(input: &str) -> Self {
        Self {
            terms: input.split_whitespace().map(str::to_lowercase).collect(),
            ..Self::default()
        }
    }

    fn matches(&self, record: &GameRecord) -> bool {
        let excluded = record.tags.iter().any(|tag| {
            self.excluded_tags
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(tag))
        });
        if excluded {
            return false;
        }

        let terms_match = self.terms.iter().all(|term| {
            [&record.title, &record.developer, &record.publisher, &record.series]
                .iter()
                .any(|text| text.to_lowercase().contains(term.as_str()))
                || record.tags.iter().any(|tag| tag.to_lowercase().contains(term.as_str()))
        });
        if !terms_match {
            return false;
        }

        let (exclusions, inclusions): (Vec<&FieldFilter>, Vec<&FieldFilter>) =
            self.filters.iter().partition(|f| f.is_exclusion());

        if !exclusions.iter().all(|f| f.matches(record)) {
            return false;
        }
        if inclusions.is_empty() {
            return true;
        }
        if self.match_any {
            inclusions.iter().any(|f| f.matches(record))
        } else {
            inclusions.iter().all(|f| f.matches(record))
        }
    }
}

/// The catalog collaborator.
pub trait Catalog: Send + Sync {
    /// Run a query and return matching records in result order.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Vec<GameRecord>, CatalogError>>;

    /// Look up one record by id.
    fn find_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<GameRecord>, CatalogError>>;

    /// All platform names, sorted.
    fn platforms(&self) -> BoxFuture<'_, Result<Vec<String>, CatalogError>>;

    fn total_games(&self) -> BoxFuture<'_, Result<usize, CatalogError>>;

    /// Pick up new data from the backing store, if the backend supports it.
    fn refresh(&self) -> BoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Catalog backed by a JSON array of [`GameRecord`]s.
pub struct JsonCatalog {
    path: Option<PathBuf>,
    records: ArcSwap<Vec<GameRecord>>,
}

impl JsonCatalog {
    /// Open a catalog file. A missing file yields an empty catalog.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let records = read_records(path)?;
        info!("Loaded {} catalog records from {}", records.len(), path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: ArcSwap::from_pointee(records),
        })
    }

    /// In-memory catalog with no backing file.
    pub fn from_records(records: Vec<GameRecord>) -> Self {
        Self {
            path: None,
            records: ArcSwap::from_pointee(records),
        }
    }

    fn run_search(&self, query: &SearchQuery) -> Vec<GameRecord> {
        let records = self.records.load();
        let mut results: Vec<GameRecord> = records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        if let Some(order) = query.order {
            results.sort_by(|a, b| {
                let ordering = order.column.key(a).cmp(&order.column.key(b));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        } else {
            results.sort_by_key(|record| record.title.to_lowercase());
        }

        if query.limit > 0 {
            results.truncate(query.limit);
        }
        results
    }
}

fn read_records(path: &Path) -> Result<Vec<GameRecord>, CatalogError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Async variant of [`read_records`] for use on the runtime.
async fn read_records_async(path: &Path) -> Result<Vec<GameRecord>, CatalogError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

impl Catalog for JsonCatalog {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Vec<GameRecord>, CatalogError>> {
        Box::pin(async move { Ok(self.run_search(query)) })
    }

    fn find_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<GameRecord>, CatalogError>> {
        Box::pin(async move {
            Ok(self.records.load().iter().find(|record| record.id == id).cloned())
        })
    }

    fn platforms(&self) -> BoxFuture<'_, Result<Vec<String>, CatalogError>> {
        Box::pin(async move {
            let mut platforms: Vec<String> = self
                .records
                .load()
                .iter()
                .flat_map(|record| record.platforms.iter().cloned())
                .collect();
            platforms.sort();
            platforms.dedup();
            Ok(platforms)
        })
    }

    fn total_games(&self) -> BoxFuture<'_, Result<usize, CatalogError>> {
        Box::pin(async move { Ok(self.records.load().len()) })
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(async move {
            if let Some(path) = &self.path {
                let records = read_records_async(path).await?;
                info!("Reloaded {} catalog records", records.len());
                self.records.store(Arc::new(records));
            }
            Ok(())
        })
    }
}

/// Statistics derived from the catalog, recomputed on refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub platforms: Vec<String>,
    pub total_games: usize,
    pub refreshed_at: DateTime<Utc>,
}

impl CatalogStats {
    pub async fn collect(catalog: &dyn Catalog) -> Result<Self, CatalogError> {
        Ok(Self {
            platforms: catalog.platforms().await?,
            total_games: catalog.total_games().await?,
            refreshed_at: Utc::now(),
        })
    }

    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
            total_games: 0,
            refreshed_at: Utc::now(),
        }
    }
}
