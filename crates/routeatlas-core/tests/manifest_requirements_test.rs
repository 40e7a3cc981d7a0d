//! Integration tests for the requirements manifest lifecycle
//!
//! This test suite verifies that:
//! - A realistic requirements.in parses, lints, and resolves end to end
//! - Benign duplicates merge with a warning, conflicts fail naming the package
//! - Resolved output is deterministic and survives a second round trip

use routeatlas_core::manifest::{LintLevel, Manifest, ManifestError};

const REQUIREMENTS_IN: &str = "\
# Core geospatial stack
geopandas>=0.12
pyproj~=3.6.1
Shapely>=2.0,<3

# Rendering
folium>=0.14,<1
branca

# Progress reporting, declared twice by different contributors
tqdm>=4.0
tqdm>=4.62
";

#[test]
fn test_realistic_manifest_parses_and_resolves() {
    let manifest = Manifest::parse(REQUIREMENTS_IN).unwrap();
    assert_eq!(manifest.len(), 7);

    let lock = manifest.resolve().unwrap();
    assert_eq!(lock.len(), 6, "Duplicate tqdm entries should merge");

    // The tighter of the two lower bounds wins
    let tqdm = lock.get("tqdm").unwrap();
    assert_eq!(tqdm.len(), 1);
    assert_eq!(tqdm[0].to_string(), ">=4.62");
}

#[test]
fn test_benign_duplicate_warns_but_resolves() {
    let manifest = Manifest::parse(REQUIREMENTS_IN).unwrap();
    let findings = manifest.lint();

    let tqdm_findings: Vec<_> = findings.iter().filter(|f| f.name == "tqdm").collect();
    assert_eq!(tqdm_findings.len(), 1);
    assert_eq!(tqdm_findings[0].level, LintLevel::Warning);
    assert_eq!(tqdm_findings[0].lines, vec![11, 12]);
    assert!(tqdm_findings[0].message.contains("declared 2 times"));

    // A warning never blocks resolution
    assert!(manifest.resolve().is_ok());
}

#[test]
fn test_conflicting_duplicates_fail_naming_the_package() {
    let input = "\
geopandas==0.12.2
geopandas==0.14.0
";
    let manifest = Manifest::parse(input).unwrap();

    let findings = manifest.lint();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].level, LintLevel::Error);
    assert_eq!(findings[0].name, "geopandas");

    match manifest.resolve() {
        Err(ManifestError::ConstraintConflict { name, .. }) => {
            assert_eq!(name, "geopandas");
        }
        other => panic!("Expected ConstraintConflict, got {:?}", other),
    }
}

#[test]
fn test_lock_output_round_trips() {
    let manifest = Manifest::parse(REQUIREMENTS_IN).unwrap();
    let first = manifest.resolve().unwrap().to_pinned_string();

    let reparsed = Manifest::parse(&first).unwrap();
    let second = reparsed.resolve().unwrap().to_pinned_string();

    assert_eq!(first, second, "Resolving resolved output must be a fixpoint");
}

#[test]
fn test_lock_lookup_uses_canonical_names() {
    let manifest = Manifest::parse("Flask_SQLAlchemy>=3.0\n").unwrap();
    let lock = manifest.resolve().unwrap();

    assert!(lock.get("flask-sqlalchemy").is_some());
    assert!(lock.get("FLASK.SQLALCHEMY").is_some());
    assert!(lock.get("flask").is_none());
}

#[test]
fn test_parse_error_carries_line_number() {
    let input = "\
geopandas>=0.12
tqdm>>4.0
";
    match Manifest::parse(input) {
        Err(ManifestError::InvalidRequirement { line, text, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(text, "tqdm>>4.0");
        }
        other => panic!("Expected InvalidRequirement, got {:?}", other),
    }
}
