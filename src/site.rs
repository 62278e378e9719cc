//! The immutable site snapshot shared by every request.
//!
//! A [`Site`] bundles configuration, templates, locales, the page and
//! endpoint tables, namespace handlers and catalog statistics. It is built
//! once at startup; the statistics refresh builds a new snapshot with
//! [`Site::with_stats`] instead of touching the live one.

use crate::catalog::{Catalog, CatalogStats};
use crate::config::Config;
use crate::handlers::NamespaceHandler;
use crate::i18n::LocaleRegistry;
use crate::router::{Routable, RouteTable};
use crate::template::{TemplateStore, ERROR_NAMESPACE, NOT_FOUND_NAMESPACE, SHELL_NAMESPACE};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// A routable HTML page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageDescriptor {
    pub namespace: String,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Extra `<namespace>_<fragment>.html` templates the page's provider renders
    #[serde(default)]
    pub fragments: Vec<String>,
    /// Prefix-match instead of exact-match routing
    #[serde(default)]
    pub lenient: bool,
}

impl PageDescriptor {
    /// Page with no assets, used for content rendered outside the page table.
    pub fn bare(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            styles: Vec::new(),
            scripts: Vec::new(),
            fragments: Vec::new(),
            lenient: false,
        }
    }
}

impl Routable for PageDescriptor {
    fn lenient(&self) -> bool {
        self.lenient
    }
}

/// A routable non-HTML resource produced entirely by its namespace handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndpointDescriptor {
    pub namespace: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub lenient: bool,
}

impl Routable for EndpointDescriptor {
    fn lenient(&self) -> bool {
        self.lenient
    }
}

#[derive(Debug, Clone)]
pub struct Site {
    pub config: Arc<Config>,
    pub templates: Arc<TemplateStore>,
    pub locales: Arc<LocaleRegistry>,
    pub pages: Arc<RouteTable<PageDescriptor>>,
    pub endpoints: Arc<RouteTable<EndpointDescriptor>>,
    /// Tags hidden from search results unless explicitly requested
    pub filtered_tags: Arc<Vec<String>>,
    pub stats: Arc<CatalogStats>,
    handlers: Arc<HashMap<String, NamespaceHandler>>,
}

impl Site {
    /// Assemble a snapshot and resolve every namespace to its handler.
    ///
    /// # Returns
    /// * `Err` if an endpoint names a namespace without an endpoint handler
    pub fn new(
        config: Config,
        templates: TemplateStore,
        locales: LocaleRegistry,
        pages: RouteTable<PageDescriptor>,
        endpoints: RouteTable<EndpointDescriptor>,
        filtered_tags: Vec<String>,
        stats: CatalogStats,
    ) -> Result<Self> {
        let mut handlers = HashMap::new();

        for (path, page) in pages.iter() {
            let handler = NamespaceHandler::for_namespace(&page.namespace);
            if !handler.provides_definitions() && handler != NamespaceHandler::Plain {
                bail!("Page {} uses endpoint-only namespace \"{}\"", path, page.namespace);
            }
            handlers.insert(page.namespace.clone(), handler);
        }
        for (path, endpoint) in endpoints.iter() {
            let handler = NamespaceHandler::for_namespace(&endpoint.namespace);
            if !handler.serves_endpoints() {
                bail!("Endpoint {} has no handler for namespace \"{}\"", path, endpoint.namespace);
            }
            handlers.insert(endpoint.namespace.clone(), handler);
        }

        Ok(Self {
            config: Arc::new(config),
            templates: Arc::new(templates),
            locales: Arc::new(locales),
            pages: Arc::new(pages),
            endpoints: Arc::new(endpoints),
            filtered_tags: Arc::new(filtered_tags),
            stats: Arc::new(stats),
            handlers: Arc::new(handlers),
        })
    }

    /// Load every site data file named by `config`.
    pub fn load(config: Config, stats: CatalogStats) -> Result<Self> {
        let pages: IndexMap<String, PageDescriptor> = read_json(&config.pages_file())?;
        let endpoints: IndexMap<String, EndpointDescriptor> = read_json(&config.endpoints_file())?;

        let filter_file = config.filter_file();
        let filtered_tags: Vec<String> = if filter_file.is_file() {
            read_json(&filter_file)?
        } else {
            Vec::new()
        };

        let mut namespaces: Vec<String> = Vec::new();
        for page in pages.values() {
            if !namespaces.contains(&page.namespace) {
                namespaces.push(page.namespace.clone());
            }
        }
        for extra in [SHELL_NAMESPACE, NOT_FOUND_NAMESPACE] {
            if !namespaces.iter().any(|ns| ns == extra) {
                namespaces.push(extra.to_string());
            }
        }

        let locales = LocaleRegistry::load(
            &config.locales_file(),
            &config.locales_dir,
            &namespaces,
            &config.default_lang,
        )?;

        let mut templates = TemplateStore::new();
        for page in pages.values() {
            templates.load_namespace(&config.templates_dir, &page.namespace, &page.fragments)?;
        }
        for extra in [SHELL_NAMESPACE, ERROR_NAMESPACE, NOT_FOUND_NAMESPACE] {
            templates.load_namespace(&config.templates_dir, extra, &[])?;
        }

        info!(
            "Loaded {} pages, {} endpoints, {} languages",
            pages.len(),
            endpoints.len(),
            locales.iter().count()
        );

        Site::new(
            config,
            templates,
            locales,
            RouteTable::new(pages),
            RouteTable::new(endpoints),
            filtered_tags,
            stats,
        )
    }

    /// A new snapshot sharing everything but the statistics.
    pub fn with_stats(&self, stats: CatalogStats) -> Self {
        Self {
            stats: Arc::new(stats),
            ..self.clone()
        }
    }

    /// Handler resolved for `namespace` at startup.
    pub fn handler(&self, namespace: &str) -> NamespaceHandler {
        self.handlers
            .get(namespace)
            .copied()
            .unwrap_or(NamespaceHandler::Plain)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Everything one request needs to build definitions and render content.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub site: &'a Site,
    pub catalog: &'a dyn Catalog,
    pub url: &'a Url,
    pub lang: &'a str,
}
