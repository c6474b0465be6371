//! Analyze command - load declarations for a source file's imports

use crate::cli::args::{AnalyzeArgs, OutputFormat};
use crate::config::Config;
use crate::error::{TypeLoadError, TypeLoadResult};
use crate::factory::{create_pipeline, Output};
use crate::loader::{AnalysisReport, LoaderSettings};
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Execute the analyze command
pub async fn execute(args: AnalyzeArgs, config: &Config) -> TypeLoadResult<()> {
    let ctx = UiContext::detect().with_quiet(args.format.is_machine());
    let source = read_source(&args.file).await?;

    let loader = LoaderSettings::from_config(&config.loader);
    let output = Output::from(args.out.clone());
    let pipeline = create_pipeline(config, &output, loader).await?;

    ui::intro(&ctx, "typeload analyze");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Loading imported libraries...");
    let report = pipeline.coordinator.analyze_and_load_types(&source).await;
    let failed = report.loads.iter().filter(|r| !r.success).count();
    if failed > 0 {
        spinner.stop_error(&format!("{} libraries failed", failed));
    } else {
        spinner.stop(&format!("{} libraries loaded", report.loads.len()));
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for name in &report.referenced {
                println!("{}", name);
            }
        }
        OutputFormat::Table => print_report(&ctx, &report, pipeline.coordinator.allowed_count()),
    }

    ui::outro_success(
        &ctx,
        &format!("Published {} declarations", pipeline.registrar.published_count()),
    );
    Ok(())
}

/// Read the source text from a file or from stdin (`-`)
async fn read_source(path: &Path) -> TypeLoadResult<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .map_err(|e| TypeLoadError::io("reading source from stdin", e))?;
        return Ok(source);
    }

    if !path.exists() {
        return Err(TypeLoadError::PathNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path)
        .await
        .map_err(|e| TypeLoadError::io(format!("reading {}", path.display()), e))
}

fn print_report(ctx: &UiContext, report: &AnalysisReport, allowed: usize) {
    if report.referenced.is_empty() {
        ui::step_info(ctx, "No package imports found");
        return;
    }

    for name in &report.referenced {
        match report.loads.iter().find(|r| &r.library == name) {
            Some(result) if result.success => ui::step_ok(ctx, name),
            Some(_) => ui::step_error(ctx, &format!("{} (entry point unavailable)", name)),
            None => ui::remark(ctx, &format!("{} skipped (not allow-listed)", name)),
        }
    }

    for path in &report.inferred {
        ui::step_ok_detail(ctx, "Inferred component shape", path);
    }

    ui::key_value(ctx, "Allow-list", &format!("{} libraries", allowed));
}
