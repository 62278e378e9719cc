//! Preview binary - renders one page through the full request pipeline
//! and prints it to stdout.
//!
//! Usage:
//!   cargo run --bin preview -- /search?query=alpha        # default language
//!   cargo run --bin preview -- /view?id=<uuid> fr-FR       # explicit language
//!
//! Reads `config.json` from the working directory if present. The status line
//! goes to stderr so stdout holds only the body.

use anyhow::{Context, Result};
use flashpoint_site::catalog::{CatalogStats, JsonCatalog};
use flashpoint_site::config::Config;
use flashpoint_site::dispatch::{self, IncomingRequest};
use flashpoint_site::router::LANG_KEY;
use flashpoint_site::site::Site;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("flashpoint_site=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "/".to_string());
    let lang = args.next();

    let config = Config::load(Path::new("config.json"))?;
    let catalog = JsonCatalog::open(&config.catalog_file)
        .with_context(|| format!("Failed to open catalog {}", config.catalog_file.display()))?;
    let stats = CatalogStats::collect(&catalog).await?;
    let site = Site::load(config, stats)?;

    let url = preview_url(&site, &target, lang.as_deref())?;
    let request = IncomingRequest {
        remote_ip: "127.0.0.1".to_string(),
        user_agent: "preview".to_string(),
        url: url.to_string(),
        cookie_header: None,
    };

    let response = dispatch::handle(&site, &catalog, &request).await;
    eprintln!("{} {}", response.status, url);
    print!("{}", response.text());

    Ok(())
}

/// Absolute URL for `target` on an allowed host.
fn preview_url(site: &Site, target: &str, lang: Option<&str>) -> Result<Url> {
    let host = site
        .config
        .access_hosts
        .first()
        .map_or("localhost", String::as_str);
    let base = Url::parse(&format!("http://{host}/")).context("Invalid access host")?;
    let mut url = base
        .join(target)
        .with_context(|| format!("Invalid preview path {target}"))?;

    if let Some(lang) = lang {
        url.query_pairs_mut().append_pair(LANG_KEY, lang);
    }
    Ok(url)
}
