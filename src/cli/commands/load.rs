//! Load command - fetch declarations for named libraries

use crate::cache::CacheStats;
use crate::cli::args::{LoadArgs, OutputFormat};
use crate::config::Config;
use crate::error::{TypeLoadError, TypeLoadResult};
use crate::factory::{create_pipeline, Output};
use crate::loader::{LibraryLoadResult, LoaderSettings};
use crate::ui::{self, LoadProgress, UiContext};
use serde::Serialize;
use tracing::debug;

/// JSON body of `load --format json`
#[derive(Serialize)]
struct LoadSummary<'a> {
    results: &'a [LibraryLoadResult],
    published: usize,
    cache: CacheStats,
}

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config) -> TypeLoadResult<()> {
    let ctx = UiContext::detect().with_quiet(args.format.is_machine());

    let mut loader = LoaderSettings::from_config(&config.loader);
    if args.any {
        loader.allowed.extend(args.libraries.iter().cloned());
    } else if let Some(name) = args
        .libraries
        .iter()
        .find(|name| !loader.allowed.contains(*name))
    {
        return Err(TypeLoadError::NotAllowed(name.clone()));
    }
    let batch_size = loader.batch_size;

    let output = Output::from(args.out.clone());
    let pipeline = create_pipeline(config, &output, loader).await?;

    ui::intro(&ctx, "typeload load");

    let progress = LoadProgress::new(&ctx, args.libraries.len());
    let mut results = Vec::with_capacity(args.libraries.len());
    for batch in args.libraries.chunks(batch_size) {
        debug!("Loading batch: {}", batch.join(", "));
        progress.batch(batch);
        let loaded = pipeline.coordinator.load_libraries(batch).await;
        progress.advance(loaded.len());
        results.extend(loaded);
    }
    progress.finish();

    let published = pipeline.registrar.published_count();
    let stats = pipeline.cache.stats().await;

    match args.format {
        OutputFormat::Json => {
            let summary = LoadSummary {
                results: &results,
                published,
                cache: stats,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            for result in &results {
                let status = if result.success { "ok" } else { "failed" };
                println!("{}\t{}", result.library, status);
            }
        }
        OutputFormat::Table => print_table(&ctx, &results, published, &stats, &output),
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        ui::outro_warn(
            &ctx,
            &format!("{} of {} libraries failed", failed, results.len()),
        );
        return Err(TypeLoadError::User(format!(
            "{} of {} libraries failed to load",
            failed,
            results.len()
        )));
    }

    ui::outro_success(&ctx, &format!("Loaded {} libraries", results.len()));
    Ok(())
}

fn print_table(
    ctx: &UiContext,
    results: &[LibraryLoadResult],
    published: usize,
    stats: &CacheStats,
    output: &Output,
) {
    for result in results {
        if result.success {
            ui::step_ok(ctx, &result.library);
        } else {
            ui::step_warn_hint(ctx, &result.library, "entry point unavailable, run with -v");
        }
    }

    ui::key_value(ctx, "Published", &published.to_string());
    if let Output::Directory(dir) = output {
        ui::key_value(ctx, "Output", &dir.display().to_string());
    }
    ui::key_value(
        ctx,
        "Cache",
        &format!(
            "{} entries, {} ({:.0}% hits)",
            stats.count, stats.total_size_formatted, stats.hit_rate
        ),
    );
}
