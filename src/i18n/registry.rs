//! Locale registry: every known language and its translations.
//!
//! Languages come from `locales.json` (an ordered `code -> { name }` object),
//! translations from `<locales_dir>/<code>/<namespace>.json`. Text values are
//! sanitized once here, at load time. The registry is built at startup and is
//! read-only afterwards.

use super::definitions::DefinitionMap;
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Metadata for one language, as declared in `locales.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    /// Display name shown in the language selector (e.g., "Français")
    pub name: String,
}

/// A language with its per-namespace translations.
#[derive(Debug, Clone)]
pub struct Locale {
    /// Language code (e.g., "en-US")
    pub code: String,

    /// Display name of the language
    pub name: String,

    translations: HashMap<String, DefinitionMap>,
}

impl Locale {
    /// Translations for `namespace`, if this language provides any.
    pub fn translations(&self, namespace: &str) -> Option<&DefinitionMap> {
        self.translations.get(namespace)
    }
}

/// All known languages in declaration order, plus the default language.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: IndexMap<String, Locale>,
    default_lang: String,
}

impl LocaleRegistry {
    /// Load languages and translations from disk.
    ///
    /// # Arguments
    /// * `locales_file` - Path to `locales.json`
    /// * `locales_dir` - Directory holding `<code>/<namespace>.json` files
    /// * `namespaces` - Namespaces to load for every language
    /// * `default_lang` - Language whose translations must be complete
    ///
    /// # Returns
    /// * `Err` if the default language is unknown or misses any namespace file
    pub fn load(
        locales_file: &Path,
        locales_dir: &Path,
        namespaces: &[String],
        default_lang: &str,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(locales_file)
            .with_context(|| format!("Failed to read {}", locales_file.display()))?;
        let configs: IndexMap<String, LocaleConfig> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", locales_file.display()))?;

        if !configs.contains_key(default_lang) {
            bail!("Default language \"{}\" is not declared in {}", default_lang, locales_file.display());
        }

        let mut locales = IndexMap::new();
        for (code, config) in configs {
            let mut translations = HashMap::new();

            for namespace in namespaces {
                let path = locales_dir.join(&code).join(format!("{namespace}.json"));
                if path.is_file() {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let defs: DefinitionMap = serde_json::from_str(&text)
                        .with_context(|| format!("Failed to parse {}", path.display()))?;
                    debug!("Loaded {} definitions from {}", defs.len(), path.display());
                    translations.insert(namespace.clone(), defs.sanitized());
                } else if code == default_lang {
                    bail!(
                        "Missing translation file {}.json for default language \"{}\"",
                        namespace,
                        default_lang
                    );
                } else {
                    warn!("No {} translations for {}, using {}", namespace, code, default_lang);
                }
            }

            locales.insert(
                code.clone(),
                Locale {
                    code,
                    name: config.name,
                    translations,
                },
            );
        }

        Ok(Self {
            locales,
            default_lang: default_lang.to_string(),
        })
    }

    /// Build a registry from in-memory locales (used by tests and tools).
    pub fn from_locales(
        default_lang: &str,
        entries: impl IntoIterator<Item = (String, String, HashMap<String, DefinitionMap>)>,
    ) -> Self {
        let locales = entries
            .into_iter()
            .map(|(code, name, translations)| {
                let translations = translations
                    .into_iter()
                    .map(|(namespace, defs)| (namespace, defs.sanitized()))
                    .collect();
                (
                    code.clone(),
                    Locale {
                        code,
                        name,
                        translations,
                    },
                )
            })
            .collect();

        Self {
            locales,
            default_lang: default_lang.to_string(),
        }
    }

    /// Code of the default language.
    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Get a locale by its code.
    pub fn get(&self, code: &str) -> Option<&Locale> {
        self.locales.get(code)
    }

    /// Check whether a language code is known.
    pub fn is_known(&self, code: &str) -> bool {
        self.locales.contains_key(code)
    }

    /// All locales in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.locales.values()
    }

    /// Display name of a language, falling back to its code.
    pub fn name<'a>(&'a self, code: &'a str) -> &'a str {
        self.locales.get(code).map_or(code, |locale| locale.name.as_str())
    }
}
