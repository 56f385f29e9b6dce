//! Admin tooling.
//!
//! ```text
//! showcase-admin seed <file.json>        replace content per type from a seed file
//! showcase-admin hash-password <secret>  print an ADMIN_PASSWORD_HASH value
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use showcase_api::auth::hash_password;
use showcase_api::config::AppConfig;
use showcase_api::open_store;
use showcase_core::document::validate::{validate_new_content, validate_theme};
use showcase_core::document::{NewContent, NewTheme};
use showcase_core::Store;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: showcase-admin <seed FILE | hash-password PASSWORD>";

/// Seed file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedFile {
    documents: Vec<NewContent>,
    /// Inserted only when the store has no themes yet.
    themes: Vec<NewTheme>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["seed", file] => seed(Path::new(file)).await,
        ["hash-password", password] => {
            println!("{}", hash_password(password)?);
            Ok(())
        }
        _ => bail!(USAGE),
    }
}

async fn seed(file: &Path) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load config")?;
    if config.database_url.is_none() {
        bail!("DATABASE_URL must be set to seed content");
    }

    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let seed: SeedFile =
        serde_json::from_str(&raw).with_context(|| format!("Invalid seed file {}", file.display()))?;

    let store = open_store(&config).await?;
    seed_store(&store, seed).await
}

async fn seed_store(store: &Store, seed: SeedFile) -> anyhow::Result<()> {
    let mut by_type: BTreeMap<String, Vec<NewContent>> = BTreeMap::new();
    for doc in seed.documents {
        validate_new_content(&doc).context("Invalid document in seed file")?;
        by_type.entry(doc.content_type.clone()).or_default().push(doc);
    }

    for (content_type, docs) in by_type {
        let inserted = store.replace_type(&content_type, docs).await?;
        tracing::info!(%content_type, count = inserted.len(), "Seeded content");
    }

    if store.list_themes().await?.is_empty() {
        for theme in seed.themes {
            validate_theme(&theme.settings).context("Invalid theme in seed file")?;
            let created = store.create_theme(theme).await?;
            tracing::info!(name = %created.settings.name, active = created.is_active, "Seeded theme");
        }
    } else if !seed.themes.is_empty() {
        tracing::info!("Themes already present, skipping theme seed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_core::document::ContentQuery;

    const SEED: &str = r##"{
        "documents": [
            {"type": "home-page", "title": "Home", "content": {"hero": {"title": "Hi"}}},
            {"type": "testimonial", "content": {"name": "A", "targetRegions": ["france"]}},
            {"type": "testimonial", "content": {"name": "B", "targetRegions": ["all"]}}
        ],
        "themes": [
            {"name": "Light", "isActive": true},
            {"name": "Dark", "backgroundColor": "#000000"}
        ]
    }"##;

    #[tokio::test]
    async fn seeding_replaces_types_and_sets_one_active_theme() {
        let store = Store::memory();
        store
            .create_content(NewContent::new("testimonial", serde_json::json!({"name": "stale"})))
            .await
            .unwrap();

        let seed: SeedFile = serde_json::from_str(SEED).unwrap();
        seed_store(&store, seed).await.unwrap();

        let testimonials = store
            .list_content(&ContentQuery::active_of_type("testimonial"))
            .await
            .unwrap();
        assert_eq!(testimonials.len(), 2);
        assert!(store.find_by_type("home-page").await.unwrap().is_some());

        let themes = store.list_themes().await.unwrap();
        assert_eq!(themes.len(), 2);
        assert_eq!(themes.iter().filter(|t| t.is_active).count(), 1);

        // Seeding again leaves existing themes alone.
        let seed: SeedFile = serde_json::from_str(SEED).unwrap();
        seed_store(&store, seed).await.unwrap();
        assert_eq!(store.list_themes().await.unwrap().len(), 2);
    }

    #[test]
    fn rejects_documents_without_type() {
        let seed: SeedFile = serde_json::from_str(r#"{"documents": [{"title": "x"}]}"#).unwrap();
        assert!(validate_new_content(&seed.documents[0]).is_err());
    }
}
