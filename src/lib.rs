//! Localized, templated HTML site for a game catalog.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod i18n;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod site;
pub mod template;
