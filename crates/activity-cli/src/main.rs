mod bootstrap;
mod report;

use activity_core::settings::Settings;
use activity_core::BucketKey;
use activity_data::analysis::analyze_paths;
use anyhow::{Context, Result};

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("activity-buckets v{} starting", env!("CARGO_PKG_VERSION"));

    let engine_config = settings.engine_config()?;
    let posts = settings
        .posts
        .clone()
        .context("no posts input given (use --posts or set \"posts\" in the config file)")?;

    tracing::info!(
        "Mode: {:?}, posts: {}, comments: {}",
        engine_config.mode,
        posts.display(),
        settings
            .comments
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    let analysis = analyze_paths(&posts, settings.comments.as_deref(), &engine_config)?;
    let engine_report = &analysis.report;

    tracing::info!(
        "Bucketed {} of {} fragments for {} entities ({} unattributed)",
        engine_report.metadata.fragments_resolved,
        engine_report.metadata.fragments_seen,
        engine_report.metadata.entities_reported,
        engine_report.metadata.unattributed
    );

    let listing = match settings.bucket {
        Some(index) => {
            let bucket = BucketKey::new(usize::from(index))?;
            let entity = settings
                .bucket_entity
                .clone()
                .or_else(|| engine_report.entities.first().cloned());
            match entity {
                Some(entity) => {
                    let entries = engine_report.bucket_listing(&analysis.table, &entity, bucket);
                    Some(report::BucketListing {
                        entity,
                        bucket,
                        entries,
                    })
                }
                None => {
                    tracing::warn!("--bucket given but no entity is available for the listing");
                    None
                }
            }
        }
        None => None,
    };

    if settings.wants_json() {
        println!("{}", report::render_json(engine_report, listing.as_ref())?);
    } else {
        print!("{}", report::render_text(engine_report));
        if let Some(listing) = &listing {
            println!();
            print!("{}", report::render_bucket_listing(listing));
        }
    }

    Ok(())
}
