mod config;
mod render;

use anyhow::Context as _;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use quill_core::preview::cache::PreviewCache;
use quill_core::{CommentBody, Context, EngineConfig, MutationBuilder, PreviewComposer, RandomIds, Snapshot, SystemClock};
use quill_store::Database;
use quill_types::Phase;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,quill_core=info,quill_store=info".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    // Log every change the replay writes
    let mut changes = db.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => debug!("Store change: {:?}", change),
                Err(RecvError::Lagged(skipped)) => warn!("Change log skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(path) = &config.import {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data: serde_json::Value = serde_json::from_str(&raw).context("Import file is not JSON")?;
        let imported = db.import_json(&data)?;
        info!("Imported {} records from {}", imported, path.display());
    }

    let mut snapshot = Snapshot::new(config.account_id, config.email.clone());
    snapshot.environment_url = config.environment_url.clone();
    snapshot.is_offline = config.is_offline;

    let engine_config = EngineConfig {
        preview_cache_capacity: config.preview_cache,
        ..EngineConfig::default()
    };
    let cache = PreviewCache::new(engine_config.preview_cache_capacity);
    let ctx = Context::new(&snapshot, &db, &db).with_config(&engine_config);
    let composer = PreviewComposer::new(ctx).with_cache(&cache);

    if let Some(text) = &config.comment {
        let (ids, clock) = (RandomIds, SystemClock);
        let builder = MutationBuilder::with_composer(composer, &ids, &clock);
        let (comment, batch) = builder.add_comment_batch(&config.report_id, CommentBody::Text(text))?;
        db.apply_batch(&batch, Phase::Optimistic)?;
        info!(
            "Added optimistic comment {} to report {}",
            comment.action.report_action_id, config.report_id
        );
    }

    let conversation = render::render(&composer, &config.report_id, config.anchor.as_deref());
    println!("{}", conversation);

    // Closing the store ends the change log once it has drained
    drop(db);
    let _ = watcher.await;
    Ok(())
}
