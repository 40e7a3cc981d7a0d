//! Doctor command implementation
//!
//! Runs environment and storage diagnostics. Warnings keep exit code
//! zero; hard failures make the command exit nonzero.

use std::path::Path;

use anyhow::{bail, Result};
use console::style;

use routeatlas_store::{FeatureStore, MemoryStore, PostgresStore};

use crate::cli::{DoctorArgs, StorageBackend};
use crate::output::OutputWriter;
use crate::storage::postgres_config;

pub async fn execute(
    args: DoctorArgs,
    backend: &StorageBackend,
    config_path: Option<&Path>,
    _output: &OutputWriter,
) -> Result<()> {
    println!("\n{}", style("RouteAtlas Health Check").bold().underlined());
    println!("{}", style("═".repeat(60)).dim());
    println!();

    let mut checks_passed = 0;
    let mut total_checks = 0;
    let mut failures = 0;

    // Check configuration
    total_checks += 1;
    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("{} Config: loaded", style("✓").green());
            checks_passed += 1;

            if args.verbose {
                let mut entries: Vec<_> = config.to_inspection_map().into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, (value, source)) in entries {
                    println!("  {} = {} ({})", key, value, source.as_str());
                }
            }
            Some(config)
        }
        Err(e) => {
            println!("{} Config: {:#}", style("✗").red(), e);
            failures += 1;
            None
        }
    };

    let Some(config) = config else {
        print_summary(checks_passed, total_checks);
        bail!("{} of {} checks failed", failures, total_checks);
    };

    // Map rendering and the tile pyramid assume WGS84 coordinates
    total_checks += 1;
    if config.workspace_crs.value == 4326 {
        println!("{} Workspace CRS: EPSG:4326", style("✓").green());
        checks_passed += 1;
    } else {
        println!(
            "{} Workspace CRS: EPSG:{} (rendering and stored geometry assume EPSG:4326)",
            style("⚠").yellow(),
            config.workspace_crs.value
        );
        println!("  → Set workspace_crs = 4326 in routeatlas.toml");
    }

    println!();
    println!("{}", style("Directory Check").bold());
    println!("{}", style("─".repeat(60)).dim());

    total_checks += 1;
    match check_writable(&config.output_dir.value) {
        Ok(()) => {
            println!(
                "{} Output directory: writable ({})",
                style("✓").green(),
                config.output_dir.value.display()
            );
            checks_passed += 1;
        }
        Err(e) => {
            println!(
                "{} Output directory: {} ({})",
                style("✗").red(),
                e,
                config.output_dir.value.display()
            );
            failures += 1;
        }
    }

    total_checks += 1;
    match check_writable(&config.tile_cache_dir.value) {
        Ok(()) => {
            println!(
                "{} Tile cache directory: writable ({})",
                style("✓").green(),
                config.tile_cache_dir.value.display()
            );
            checks_passed += 1;
        }
        Err(e) => {
            println!(
                "{} Tile cache directory: {} ({})",
                style("✗").red(),
                e,
                config.tile_cache_dir.value.display()
            );
            failures += 1;
        }
    }

    println!();
    println!("{}", style("Storage Check").bold());
    println!("{}", style("─".repeat(60)).dim());

    match backend {
        StorageBackend::Memory => {
            total_checks += 1;
            let store = MemoryStore::new();
            match store.health_check().await {
                Ok(()) => {
                    println!("{} Store: responding (memory)", style("✓").green());
                    checks_passed += 1;
                }
                Err(e) => {
                    println!("{} Store: {}", style("✗").red(), e);
                    failures += 1;
                }
            }
            println!(
                "  {} In-memory data does not persist between runs",
                style("ℹ").blue()
            );
        }
        StorageBackend::Postgres => {
            total_checks += 1;
            match postgres_config(config.database_url.value.as_deref()) {
                Ok(pg_config) => match PostgresStore::new(pg_config).await {
                    Ok(store) => {
                        println!("{} PostgreSQL: connected", style("✓").green());
                        checks_passed += 1;

                        total_checks += 1;
                        match store.postgis_version().await {
                            Ok(Some(version)) => {
                                println!("{} PostGIS: installed", style("✓").green());
                                checks_passed += 1;
                                if args.verbose {
                                    println!("  Version: {}", version);
                                }
                            }
                            Ok(None) => {
                                println!(
                                    "{} PostGIS: extension not installed",
                                    style("✗").red()
                                );
                                println!("  → Run migrations, or: CREATE EXTENSION postgis;");
                                failures += 1;
                            }
                            Err(e) => {
                                println!("{} PostGIS: {}", style("✗").red(), e);
                                failures += 1;
                            }
                        }

                        total_checks += 1;
                        match store.has_pending_migrations().await {
                            Ok(false) => {
                                match store.current_version().await.ok().flatten() {
                                    Some(version) => println!(
                                        "{} Schema: up to date (version {})",
                                        style("✓").green(),
                                        version
                                    ),
                                    None => {
                                        println!("{} Schema: up to date", style("✓").green())
                                    }
                                }
                                checks_passed += 1;
                            }
                            Ok(true) => {
                                println!("{} Schema: migrations pending", style("⚠").yellow());
                                println!("  → They run automatically on the next push");
                            }
                            Err(e) => {
                                println!("{} Schema: {}", style("✗").red(), e);
                                failures += 1;
                            }
                        }

                        total_checks += 1;
                        match store.health_check().await {
                            Ok(()) => {
                                println!("{} Store: responding", style("✓").green());
                                checks_passed += 1;
                            }
                            Err(e) => {
                                println!("{} Store: {}", style("✗").red(), e);
                                failures += 1;
                            }
                        }
                    }
                    Err(e) => {
                        println!("{} PostgreSQL: {}", style("✗").red(), e);
                        println!("  → Check that PostgreSQL is running");
                        println!(
                            "  → Set DATABASE_URL, e.g. postgres://localhost:5432/routeatlas"
                        );
                        failures += 1;
                    }
                },
                Err(e) => {
                    println!("{} Database URL: {:#}", style("✗").red(), e);
                    failures += 1;
                }
            }
        }
    }

    print_summary(checks_passed, total_checks);

    if failures > 0 {
        println!(
            "{}",
            style("Some checks failed. Follow the suggestions above to fix them.").yellow()
        );
        println!();
        bail!("{} of {} checks failed", failures, total_checks);
    }
    if checks_passed < total_checks {
        println!(
            "{}",
            style("Some warnings were raised. Follow the suggestions above.").yellow()
        );
    } else {
        println!("{}", style("All checks passed. RouteAtlas is healthy.").green());
    }
    println!();

    Ok(())
}

fn print_summary(checks_passed: usize, total_checks: usize) {
    println!();
    println!("{}", style("═".repeat(60)).dim());

    let percentage = (checks_passed as f64 / total_checks as f64 * 100.0) as usize;
    let status_icon = if percentage >= 80 {
        style("✓").green()
    } else if percentage >= 50 {
        style("⚠").yellow()
    } else {
        style("✗").red()
    };

    println!(
        "{} Overall Status: {}/{} checks passed ({}%)",
        status_icon, checks_passed, total_checks, percentage
    );
    println!();
}

/// Create the directory if needed and write a probe file inside it
fn check_writable(dir: &Path) -> std::result::Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("not writable: {}", e))?;
    let probe = dir.join(".doctor_probe");
    std::fs::write(&probe, b"ok").map_err(|e| format!("not writable: {}", e))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
