use super::definitions::DefinitionMap;
use super::registry::LocaleRegistry;
use crate::error::SiteError;
use crate::site::RequestContext;
use tracing::debug;

/// Translations for `namespace` in `lang`, falling back key by key to the
/// default language. The registry's maps are cloned, never modified.
pub fn static_defs(locales: &LocaleRegistry, namespace: &str, lang: &str) -> DefinitionMap {
    let default_lang = locales.default_lang();
    let mut defs = locales
        .get(default_lang)
        .and_then(|locale| locale.translations(namespace))
        .cloned()
        .unwrap_or_default();

    if lang != default_lang {
        if let Some(overrides) = locales.get(lang).and_then(|locale| locale.translations(namespace)) {
            defs.overlay(overrides);
        }
    }

    defs
}

/// Full definitions for `namespace`: static translations plus whatever the
/// namespace's handler contributes for this request. Provider keys win.
pub async fn build_defs(ctx: &RequestContext<'_>, namespace: &str) -> Result<DefinitionMap, SiteError> {
    let mut defs = static_defs(&ctx.site.locales, namespace, ctx.lang);

    let handler = ctx.site.handler(namespace);
    let patch = handler.provide(ctx, &defs).await?;
    if !patch.is_empty() {
        debug!("{:?} handler added {} definitions to {}", handler, patch.len(), namespace);
    }
    defs.merge(patch);

    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogStats, JsonCatalog};
    use crate::config::Config;
    use crate::router::RouteTable;
    use crate::site::{PageDescriptor, Site};
    use crate::template::TemplateStore;
    use std::collections::HashMap;
    use url::Url;

    fn registry() -> LocaleRegistry {
        let en: DefinitionMap = [("Title", "Home"), ("Welcome", "Welcome"), ("Only", "English only")]
            .into_iter()
            .collect();
        let fr: DefinitionMap = [("Title", "Accueil"), ("Welcome", "Bienvenue")].into_iter().collect();

        LocaleRegistry::from_locales(
            "en-US",
            vec![
                ("en-US".to_string(), "English".to_string(), HashMap::from([("home".to_string(), en)])),
                ("fr-FR".to_string(), "Français".to_string(), HashMap::from([("home".to_string(), fr)])),
                ("de-DE".to_string(), "Deutsch".to_string(), HashMap::new()),
            ],
        )
    }

    // ==================== Static Definition Tests ====================

    #[test]
    fn test_default_language_map() {
        let defs = static_defs(&registry(), "home", "en-US");
        assert_eq!(defs.text("Title").as_deref(), Some("Home"));
        assert_eq!(defs.len(), 3);
    }

    #[test]
    fn test_request_language_overrides_and_falls_back() {
        let defs = static_defs(&registry(), "home", "fr-FR");
        assert_eq!(defs.text("Title").as_deref(), Some("Accueil"));
        assert_eq!(defs.text("Welcome").as_deref(), Some("Bienvenue"));
        assert_eq!(defs.text("Only").as_deref(), Some("English only"));
    }

    #[test]
    fn test_language_without_namespace_uses_default() {
        let defs = static_defs(&registry(), "home", "de-DE");
        assert_eq!(defs.text("Title").as_deref(), Some("Home"));
    }

    #[test]
    fn test_unknown_namespace_is_empty() {
        assert!(static_defs(&registry(), "missing", "fr-FR").is_empty());
    }

    #[test]
    fn test_registry_is_not_modified() {
        let locales = registry();
        let _ = static_defs(&locales, "home", "fr-FR");

        let defs = static_defs(&locales, "home", "en-US");
        assert_eq!(defs.text("Title").as_deref(), Some("Home"));
    }

    // ==================== Build Tests ====================

    #[tokio::test]
    async fn test_build_defs_without_provider() {
        let site = Site::new(
            Config::default(),
            TemplateStore::new(),
            registry(),
            RouteTable::new(vec![("/".to_string(), PageDescriptor::bare("home"))]),
            RouteTable::new(Vec::new()),
            Vec::new(),
            CatalogStats::empty(),
        )
        .expect("Should build site");
        let catalog = JsonCatalog::from_records(Vec::new());
        let url = Url::parse("http://localhost/").unwrap();
        let ctx = RequestContext {
            site: &site,
            catalog: &catalog,
            url: &url,
            lang: "fr-FR",
        };

        let defs = build_defs(&ctx, "home").await.expect("Should build defs");

        assert_eq!(defs.text("Title").as_deref(), Some("Accueil"));
        assert_eq!(defs.text("Only").as_deref(), Some("English only"));
    }
}
