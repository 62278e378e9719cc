//! HTML templates and the placeholder mini-language that fills them.
//!
//! - `params`: tokenizes a placeholder's parameter list
//! - `render`: finds placeholders, resolves them and stitches the result
//!
//! Templates are read once at startup into a [`TemplateStore`] and never
//! change afterwards.

mod params;
mod render;

pub use params::{parse_parameters, ParamKind, Parameter, FALLBACK};
pub use render::{expand, render};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Namespace of the page shell every page is composed into.
pub const SHELL_NAMESPACE: &str = "shell";
/// Namespace of the minimal, non-localized error document.
pub const ERROR_NAMESPACE: &str = "error";
/// Namespace of the localized not-found content rendered inside the shell.
pub const NOT_FOUND_NAMESPACE: &str = "notfound";

/// Templates belonging to one namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTemplates {
    pub main: String,
    pub fragments: HashMap<String, String>,
}

/// Process-wide, read-only template store.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    namespaces: HashMap<String, NamespaceTemplates>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<namespace>.html` and every `<namespace>_<fragment>.html` from `dir`.
    pub fn load_namespace(&mut self, dir: &Path, namespace: &str, fragments: &[String]) -> Result<()> {
        let main_path = dir.join(format!("{namespace}.html"));
        let main = std::fs::read_to_string(&main_path)
            .with_context(|| format!("Failed to read template {}", main_path.display()))?;

        let mut loaded = HashMap::new();
        for fragment in fragments {
            let path = dir.join(format!("{namespace}_{fragment}.html"));
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            loaded.insert(fragment.clone(), text);
        }

        self.namespaces.insert(
            namespace.to_string(),
            NamespaceTemplates {
                main,
                fragments: loaded,
            },
        );
        Ok(())
    }

    /// Register templates directly (used by tests and tools).
    pub fn insert(&mut self, namespace: impl Into<String>, templates: NamespaceTemplates) {
        self.namespaces.insert(namespace.into(), templates);
    }

    pub fn main(&self, namespace: &str) -> Option<&str> {
        self.namespaces.get(namespace).map(|t| t.main.as_str())
    }

    pub fn fragment(&self, namespace: &str, fragment: &str) -> Option<&str> {
        self.namespaces
            .get(namespace)
            .and_then(|t| t.fragments.get(fragment))
            .map(String::as_str)
    }
}
