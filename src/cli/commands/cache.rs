//! Cache command - inspect and clear the declaration cache

use crate::cache::persistent::age_secs;
use crate::cache::{format_bytes, CacheEntryInfo, CacheSettings, PersistentTypeCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::TypeLoadResult;
use crate::factory::open_store;
use crate::registrar::{DirectoryLibraryHost, Registrar};
use crate::ui::{self, UiContext};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TypeLoadResult<()> {
    let store = open_store(config).await?;
    let cache = PersistentTypeCache::new(store, None, CacheSettings::from_config(&config.cache));

    match args.action {
        CacheAction::Stats { format } => show_stats(&cache, config, format).await,
        CacheAction::List { format } => list_entries(&cache, format).await,
        CacheAction::Remove { url } => remove_entry(&cache, &url).await,
        CacheAction::Clear { yes, out } => clear_cache(&cache, config, yes, out).await,
    }
}

async fn show_stats(
    cache: &PersistentTypeCache,
    config: &Config,
    format: OutputFormat,
) -> TypeLoadResult<()> {
    let stats = cache.stats().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => println!("{}\t{}", stats.count, stats.total_size),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            let settings = cache.settings();
            ui::key_value(&ctx, "Directory", &cache_location(config));
            ui::key_value(&ctx, "Namespace", &settings.namespace);
            ui::key_value(&ctx, "Entries", &stats.count.to_string());
            ui::key_value(
                &ctx,
                "Size",
                &format!(
                    "{} of {}",
                    stats.total_size_formatted,
                    format_bytes(settings.max_size_bytes)
                ),
            );
            ui::key_value(
                &ctx,
                "Max age",
                &format!("{}h", settings.max_age.num_hours()),
            );
        }
    }

    Ok(())
}

async fn list_entries(cache: &PersistentTypeCache, format: OutputFormat) -> TypeLoadResult<()> {
    let entries = cache.entries().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
        OutputFormat::Table => print_entry_table(&entries),
    }

    Ok(())
}

fn print_entry_table(entries: &[CacheEntryInfo]) {
    if entries.is_empty() {
        println!("No cached declarations.");
        return;
    }

    println!("{:<60} {:>10} {:>8} {:<12}", "KEY", "SIZE", "AGE", "VERSION");
    println!("{}", "-".repeat(93));

    for entry in entries {
        println!(
            "{:<60} {:>10} {:>8} {:<12}",
            truncate(&entry.key, 60),
            format_bytes(entry.size),
            format_age(age_secs(entry.fetched_at)),
            entry.version.as_deref().unwrap_or("-"),
        );
    }

    println!();
    println!("Total: {} entries", entries.len());
}

async fn remove_entry(cache: &PersistentTypeCache, url: &str) -> TypeLoadResult<()> {
    let ctx = UiContext::detect();

    if !cache.contains(url).await {
        ui::step_warn_hint(&ctx, "No entry cached for URL", url);
        return Ok(());
    }

    cache.remove(url).await;
    ui::step_ok_detail(&ctx, "Removed cached entry", url);
    Ok(())
}

async fn clear_cache(
    cache: &PersistentTypeCache,
    config: &Config,
    yes: bool,
    out: Option<PathBuf>,
) -> TypeLoadResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let stats = cache.stats().await;
    let host = out.map(|dir| Arc::new(DirectoryLibraryHost::new(dir)));

    if stats.count == 0 && host.is_none() {
        println!("No cached declarations to clear.");
        return Ok(());
    }

    let prompt = clear_prompt(
        stats.count,
        &stats.total_size_formatted,
        host.as_deref().map(DirectoryLibraryHost::root),
    );
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_info(&ctx, "Aborted (pass --yes to clear without a prompt)");
        return Ok(());
    }

    let removed = cache.clear().await;
    ui::step_ok(&ctx, &format!("Removed {} cached declarations", removed));

    if let Some(host) = host {
        let registrar = Registrar::new(host.clone(), config.registry.virtual_root.clone());
        registrar.reset().await;
        ui::step_ok_detail(
            &ctx,
            "Removed published declarations",
            &host.root().display().to_string(),
        );
    }

    Ok(())
}

fn clear_prompt(count: usize, size: &str, out: Option<&Path>) -> String {
    let cached = format!("{} cached declarations ({})", count, size);
    match out {
        Some(dir) => format!(
            "Remove {} and the declarations typeload published under {}?",
            cached,
            dir.display()
        ),
        None => format!("Remove {}?", cached),
    }
}

fn cache_location(config: &Config) -> String {
    if config.cache.enabled {
        ConfigManager::resolve_cache_dir(config).display().to_string()
    } else {
        style("disabled").dim().to_string()
    }
}

/// Compact age: `42s`, `7m`, `3h`, `2d`
fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
