//! Internationalization: translated definitions and how a request's
//! definitions are built from them.
//!
//! - `definitions`: `DefinitionMap` and load-time sanitization
//! - `registry`: every known language with its per-namespace translations
//! - `resolver`: default language, request language and provider output
//!   merged into one map per namespace

mod definitions;
mod registry;
mod resolver;

pub use definitions::{sanitize_inject, DefValue, DefinitionMap};
pub use registry::{Locale, LocaleConfig, LocaleRegistry};
pub use resolver::{build_defs, static_defs};
