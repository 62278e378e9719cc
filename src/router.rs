//! Request routing.
//!
//! Stages, each a possible terminal outcome:
//!
//! 1. blocklist check (IP prefix or user-agent substring)
//! 2. URL validation, including the optional access-host allowlist
//! 3. locale resolution (`?lang=`, then the `lang` cookie, then the default)
//! 4. path resolution: endpoints, then pages, then static files

use crate::config::Config;
use crate::error::SiteError;
use crate::i18n::LocaleRegistry;
use crate::site::{EndpointDescriptor, PageDescriptor, Site};
use cookie::Cookie;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Name of the query parameter and cookie carrying the language choice.
pub const LANG_KEY: &str = "lang";

/// Entries a [`RouteTable`] can hold.
pub trait Routable {
    /// Whether the entry also matches paths below its own.
    fn lenient(&self) -> bool;
}

/// Ordered path table. Exact matches win over prefix matches; within each
/// kind the first declared entry wins.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    entries: Vec<(String, T)>,
}

impl<T: Routable> RouteTable<T> {
    pub fn new(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(route, _)| route == path)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(route, entry)| entry.lenient() && is_prefix_route(route, path))
            })
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(route, entry)| (route.as_str(), entry))
    }
}

/// `/news` covers `/news/1` but not `/newsletter`.
fn is_prefix_route(route: &str, path: &str) -> bool {
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || route.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// What a request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Endpoint(EndpointDescriptor),
    Page(PageDescriptor),
    Static(PathBuf),
}

/// The language chosen for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleChoice {
    pub lang: String,
    /// Chosen through `?lang=` and should be remembered in a cookie
    pub persist: bool,
}

/// Fully routed request.
#[derive(Debug, Clone)]
pub struct Route {
    pub url: Url,
    pub locale: LocaleChoice,
    pub target: Target,
}

/// Whether the requester matches a configured blocklist.
pub fn is_blocked(config: &Config, remote_ip: &str, user_agent: &str) -> bool {
    config
        .blocked_ips
        .iter()
        .any(|blocked| remote_ip.starts_with(blocked.as_str()))
        || config
            .blocked_uas
            .iter()
            .any(|blocked| user_agent.contains(blocked.as_str()))
}

/// Parse the request URL and check it against the access-host allowlist.
pub fn validate_url(config: &Config, raw: &str) -> Result<Url, SiteError> {
    let url = Url::parse(raw).map_err(|e| SiteError::bad_request(format!("{raw}: {e}")))?;

    if !config.access_hosts.is_empty() {
        let host = url.host_str().unwrap_or_default();
        if !config.access_hosts.iter().any(|allowed| allowed == host) {
            return Err(SiteError::bad_request(format!("host {host} is not allowed")));
        }
    }

    Ok(url)
}

/// Pick the language for a request.
pub fn resolve_locale(locales: &LocaleRegistry, url: &Url, cookie_header: Option<&str>) -> LocaleChoice {
    let requested = url
        .query_pairs()
        .find(|(key, _)| key == LANG_KEY)
        .map(|(_, value)| value.into_owned());
    if let Some(lang) = requested.filter(|lang| locales.is_known(lang)) {
        return LocaleChoice { lang, persist: true };
    }

    let remembered = cookie_header.and_then(|header| {
        Cookie::split_parse(header)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == LANG_KEY)
            .map(|cookie| cookie.value().to_string())
    });
    if let Some(lang) = remembered.filter(|lang| locales.is_known(lang)) {
        return LocaleChoice { lang, persist: false };
    }

    LocaleChoice {
        lang: locales.default_lang().to_string(),
        persist: false,
    }
}

/// Strip leading and trailing slashes from the URL path.
pub fn normalize_path(url: &Url) -> String {
    url.path().trim_matches('/').to_string()
}

/// Resolve a normalized path against endpoints, pages and the static dir.
pub fn resolve_target(site: &Site, path: &str) -> Option<Target> {
    let route = format!("/{path}");

    if let Some(endpoint) = site.endpoints.resolve(&route) {
        return Some(Target::Endpoint(endpoint.clone()));
    }
    if let Some(page) = site.pages.resolve(&route) {
        return Some(Target::Page(page.clone()));
    }

    static_file(&site.config.static_dir, path).map(Target::Static)
}

/// A regular file below `static_dir`, refusing anything that climbs out.
fn static_file(static_dir: &Path, path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let relative = Path::new(path);
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }

    let full = static_dir.join(relative);
    full.is_file().then_some(full)
}

/// Run locale and path resolution on a validated URL.
pub fn route(site: &Site, url: Url, cookie_header: Option<&str>) -> Result<Route, SiteError> {
    let locale = resolve_locale(&site.locales, &url, cookie_header);
    let path = normalize_path(&url);

    match resolve_target(site, &path) {
        Some(target) => Ok(Route { url, locale, target }),
        None => Err(SiteError::not_found(url.as_str(), locale.lang)),
    }
}
