//! Manifest command implementation
//!
//! `check` parses a requirements.in manifest and reports lint findings;
//! `lock` resolves it into deterministic pinned output.

use std::fs;

use anyhow::{bail, Context, Result};

use routeatlas_core::manifest::{LintLevel, Manifest};

use crate::cli::{ManifestArgs, ManifestCheckArgs, ManifestCommands, ManifestLockArgs};
use crate::output::OutputWriter;
use crate::output_types::{FindingInfo, ManifestCheckOutput, ManifestLockOutput};

pub fn execute(args: ManifestArgs, output: &OutputWriter) -> Result<()> {
    match args.command {
        ManifestCommands::Check(args) => check(args, output),
        ManifestCommands::Lock(args) => lock(args, output),
    }
}

fn check(args: ManifestCheckArgs, output: &OutputWriter) -> Result<()> {
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let manifest = Manifest::parse(&text)?;
    let findings = manifest.lint();
    let error_count = findings
        .iter()
        .filter(|f| f.level == LintLevel::Error)
        .count();

    if output.is_json() {
        output.result(ManifestCheckOutput {
            path: args.path.display().to_string(),
            packages: manifest.len(),
            findings: findings
                .iter()
                .map(|f| FindingInfo {
                    level: match f.level {
                        LintLevel::Warning => "warning".to_string(),
                        LintLevel::Error => "error".to_string(),
                    },
                    package: f.name.clone(),
                    lines: f.lines.clone(),
                    message: f.message.clone(),
                })
                .collect(),
            ok: error_count == 0,
        })?;
    } else {
        output.success(format!(
            "Parsed {} packages from {}",
            manifest.len(),
            args.path.display()
        ));
        for finding in &findings {
            match finding.level {
                LintLevel::Warning => {
                    output.warning(format!("{}: {}", finding.name, finding.message));
                }
                LintLevel::Error => {
                    let lines = finding
                        .lines
                        .iter()
                        .map(|l| l.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    output.error(format!(
                        "{} (lines {}): {}",
                        finding.name, lines, finding.message
                    ));
                }
            }
        }
        if findings.is_empty() {
            output.info("No lint findings");
        }
    }

    if error_count > 0 {
        bail!("Manifest has {} unresolvable package(s)", error_count);
    }
    Ok(())
}

fn lock(args: ManifestLockArgs, output: &OutputWriter) -> Result<()> {
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let manifest = Manifest::parse(&text)?;
    let lock_set = manifest.resolve()?;
    let pinned = lock_set.to_pinned_string();

    match &args.output {
        Some(path) => {
            fs::write(path, &pinned)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if output.is_json() {
                output.result(ManifestLockOutput {
                    path: args.path.display().to_string(),
                    output: path.display().to_string(),
                    packages: lock_set.len(),
                })?;
            } else {
                output.success(format!(
                    "Pinned {} packages to {}",
                    lock_set.len(),
                    path.display()
                ));
            }
        }
        None => {
            // The pinned text is the artifact; print it raw even under --json
            print!("{}", pinned);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lock_writes_pinned_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("requirements.in");
        fs::write(&manifest_path, "GeoPandas>=0.14\nsqlalchemy==2.0.35\n").unwrap();
        let lock_path = dir.path().join("requirements.txt");

        let writer = OutputWriter::new(false);
        lock(
            ManifestLockArgs {
                path: manifest_path,
                output: Some(lock_path.clone()),
            },
            &writer,
        )
        .unwrap();

        let pinned = fs::read_to_string(&lock_path).unwrap();
        assert_eq!(pinned, "geopandas>=0.14\nsqlalchemy==2.0.35\n");
    }

    #[test]
    fn test_check_fails_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("requirements.in");
        fs::write(&manifest_path, "folium==0.15.0\nfolium==0.16.0\n").unwrap();

        let writer = OutputWriter::new(false);
        let err = check(
            ManifestCheckArgs {
                path: manifest_path,
            },
            &writer,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unresolvable"));
    }

    #[test]
    fn test_check_missing_file() {
        let writer = OutputWriter::new(false);
        let err = check(
            ManifestCheckArgs {
                path: PathBuf::from("/nonexistent/requirements.in"),
            },
            &writer,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
