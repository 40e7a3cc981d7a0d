//! Dependency manifest parsing, linting, and resolution.
//!
//! A manifest is a `requirements.in` style text file: one package per line,
//! each with optional version constraints, plus `#` comments and blank
//! lines. Package names compare case-insensitively with `-`, `_`, and `.`
//! treated as the same separator, so `Flask-SQLAlchemy` and
//! `flask_sqlalchemy` name one package.
//!
//! Duplicate entries are preserved by the parser. Linting classifies them:
//! entries whose constraints can all hold at once merge into a single
//! requirement with a warning; entries that cannot all hold are reported as
//! conflicts, and resolution refuses to produce a lock set for them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    #[error("line {line}: invalid requirement '{text}': {reason}")]
    InvalidRequirement {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("conflicting constraints for '{name}': {reason}")]
    ConstraintConflict { name: String, reason: String },
}

/// A release version as a dotted tuple of numeric components, e.g. `1.26.4`.
///
/// Comparison pads the shorter tuple with zeros, so `1.4` equals `1.4.0`.
/// The original spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version {
    text: String,
    components: Vec<u64>,
}

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut components = Vec::new();
        for part in text.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            components.push(part.parse().ok()?);
        }
        Some(Self {
            text: text.to_string(),
            components,
        })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Exclusive upper bound implied by a compatible-release constraint:
    /// `~= 2.2` allows versions below `3`, `~= 1.4.5` below `1.5`.
    ///
    /// Callers must ensure the version has at least two components.
    pub fn compatible_upper(&self) -> Version {
        let mut components = self.components.clone();
        components.pop();
        if let Some(last) = components.last_mut() {
            *last += 1;
        }
        let text = components
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Version { text, components }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zeros do not affect equality, so they must not affect the hash
        let trimmed = self.components.iter().rev().skip_while(|c| **c == 0).count();
        self.components[..trimmed].hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> String {
        version.text
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(text: String) -> std::result::Result<Self, Self::Error> {
        Version::parse(&text).ok_or_else(|| format!("invalid version '{}'", text))
    }
}

/// Comparison operator in a version constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    /// Compatible release (`~=`): at least this version, same release series
    Compatible,
}

impl ConstraintOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Le => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Lt => "<",
            ConstraintOp::Compatible => "~=",
        }
    }

    /// Split a leading operator off a constraint string. Two-character
    /// operators are tried first so `>=` never parses as `>` plus garbage.
    fn strip(text: &str) -> Option<(Self, &str)> {
        const OPS: [(&str, ConstraintOp); 7] = [
            ("==", ConstraintOp::Eq),
            ("!=", ConstraintOp::Ne),
            (">=", ConstraintOp::Ge),
            ("<=", ConstraintOp::Le),
            ("~=", ConstraintOp::Compatible),
            (">", ConstraintOp::Gt),
            ("<", ConstraintOp::Lt),
        ];
        OPS.iter()
            .find_map(|(prefix, op)| text.strip_prefix(prefix).map(|rest| (*op, rest)))
    }

    /// Ordering rank used to sort merged constraints deterministically
    fn rank(&self) -> u8 {
        match self {
            ConstraintOp::Eq => 0,
            ConstraintOp::Compatible => 1,
            ConstraintOp::Ge => 2,
            ConstraintOp::Gt => 3,
            ConstraintOp::Le => 4,
            ConstraintOp::Lt => 5,
            ConstraintOp::Ne => 6,
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single version constraint, e.g. `>=2.31`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionConstraint {
    pub op: ConstraintOp,
    pub version: Version,
}

impl VersionConstraint {
    pub fn new(op: ConstraintOp, version: Version) -> Self {
        Self { op, version }
    }

    /// Whether a candidate version satisfies this constraint
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            ConstraintOp::Eq => candidate == &self.version,
            ConstraintOp::Ne => candidate != &self.version,
            ConstraintOp::Ge => candidate >= &self.version,
            ConstraintOp::Le => candidate <= &self.version,
            ConstraintOp::Gt => candidate > &self.version,
            ConstraintOp::Lt => candidate < &self.version,
            ConstraintOp::Compatible => {
                candidate >= &self.version && candidate < &self.version.compatible_upper()
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// Normalize a package name: lowercase, with runs of `-`, `_`, and `.`
/// collapsed to a single `-`.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            if !prev_sep {
                out.push('-');
                prev_sep = true;
            }
        } else {
            out.push(c.to_ascii_lowercase());
            prev_sep = false;
        }
    }
    out
}

/// One requirement line: a package name with zero or more constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Name as written in the manifest
    pub name: String,
    pub constraints: Vec<VersionConstraint>,
    /// 1-based line number in the source text
    pub line: usize,
}

impl PackageSpec {
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", constraint)?;
        }
        Ok(())
    }
}

/// Severity of a lint finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LintLevel {
    /// Benign, the manifest still resolves
    Warning,
    /// The manifest cannot resolve
    Error,
}

/// A single lint finding about one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintFinding {
    pub level: LintLevel,
    /// Canonical package name
    pub name: String,
    /// Manifest lines the package appears on
    pub lines: Vec<usize>,
    pub message: String,
}

/// A parsed manifest, entries in file order with duplicates preserved
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub entries: Vec<PackageSpec>,
}

impl Manifest {
    /// Parse manifest text. Comments start at `#` and run to end of line;
    /// blank lines are skipped. Fails on the first malformed requirement.
    pub fn parse(text: &str) -> std::result::Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            entries.push(parse_requirement(line, idx + 1)?);
        }
        Ok(Self { entries })
    }

    /// Number of requirement lines (duplicates counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the manifest without resolving it.
    ///
    /// Duplicate declarations that merge cleanly are warnings; constraint
    /// sets that no version can satisfy are errors. Findings come back in
    /// canonical name order.
    pub fn lint(&self) -> Vec<LintFinding> {
        let mut findings = Vec::new();
        for (name, specs) in self.grouped() {
            let lines: Vec<usize> = specs.iter().map(|s| s.line).collect();
            let combined: Vec<VersionConstraint> = specs
                .iter()
                .flat_map(|s| s.constraints.iter().cloned())
                .collect();
            match merge_constraints(&combined) {
                Err(reason) => findings.push(LintFinding {
                    level: LintLevel::Error,
                    name,
                    lines,
                    message: reason,
                }),
                Ok(_) if specs.len() > 1 => {
                    let message = format!(
                        "declared {} times (lines {}); entries merge cleanly",
                        specs.len(),
                        lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
                    );
                    findings.push(LintFinding {
                        level: LintLevel::Warning,
                        name,
                        lines,
                        message,
                    });
                }
                Ok(_) => {}
            }
        }
        findings
    }

    /// Merge every package's constraints into a [`LockSet`], or report the
    /// first package whose constraints conflict.
    pub fn resolve(&self) -> std::result::Result<LockSet, ManifestError> {
        let mut packages = BTreeMap::new();
        for (name, specs) in self.grouped() {
            let combined: Vec<VersionConstraint> = specs
                .iter()
                .flat_map(|s| s.constraints.iter().cloned())
                .collect();
            let merged = merge_constraints(&combined)
                .map_err(|reason| ManifestError::ConstraintConflict {
                    name: name.clone(),
                    reason,
                })?;
            packages.insert(name, merged);
        }
        Ok(LockSet { packages })
    }

    /// Entries grouped by canonical name, groups in name order, entries in
    /// file order within each group
    fn grouped(&self) -> BTreeMap<String, Vec<&PackageSpec>> {
        let mut groups: BTreeMap<String, Vec<&PackageSpec>> = BTreeMap::new();
        for spec in &self.entries {
            groups.entry(spec.canonical_name()).or_default().push(spec);
        }
        groups
    }
}

/// The resolved form of a manifest: one merged constraint list per
/// canonical package name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockSet {
    pub packages: BTreeMap<String, Vec<VersionConstraint>>,
}

impl LockSet {
    /// Merged constraints for a package, looked up by any spelling of its name
    pub fn get(&self, name: &str) -> Option<&[VersionConstraint]> {
        self.packages.get(&canonical_name(name)).map(|c| c.as_slice())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Deterministic textual lock output: one line per package in canonical
    /// name order, constraints sorted. Parsing the output again yields the
    /// same lock set.
    pub fn to_pinned_string(&self) -> String {
        let mut out = String::new();
        for (name, constraints) in &self.packages {
            out.push_str(name);
            for (i, constraint) in constraints.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&constraint.to_string());
            }
            out.push('\n');
        }
        out
    }
}

fn parse_requirement(text: &str, line: usize) -> std::result::Result<PackageSpec, ManifestError> {
    let invalid = |reason: String| ManifestError::InvalidRequirement {
        line,
        text: text.to_string(),
        reason,
    };

    let name_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(text.len());
    let name = &text[..name_len];
    if name.is_empty() {
        return Err(invalid("missing package name".to_string()));
    }
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid(
            "package names must start and end with a letter or digit".to_string(),
        ));
    }

    let rest = text[name_len..].trim();
    let mut constraints = Vec::new();
    if !rest.is_empty() {
        for piece in rest.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(invalid("empty constraint".to_string()));
            }
            let (op, version_text) = ConstraintOp::strip(piece).ok_or_else(|| {
                invalid(format!(
                    "unknown operator in '{}' (expected ==, !=, >=, <=, ~=, >, or <)",
                    piece
                ))
            })?;
            let version = Version::parse(version_text)
                .ok_or_else(|| invalid(format!("invalid version '{}'", version_text.trim())))?;
            if op == ConstraintOp::Compatible && version.components().len() < 2 {
                return Err(invalid(format!(
                    "compatible release ~={} requires at least two version components",
                    version
                )));
            }
            constraints.push(VersionConstraint::new(op, version));
        }
    }

    Ok(PackageSpec {
        name: name.to_string(),
        constraints,
        line,
    })
}

/// Merge a combined constraint list, dropping exact duplicates and checking
/// that some version could satisfy everything that remains.
fn merge_constraints(
    constraints: &[VersionConstraint],
) -> std::result::Result<Vec<VersionConstraint>, String> {
    let mut merged: Vec<VersionConstraint> = Vec::new();
    for constraint in constraints {
        if !merged.contains(constraint) {
            merged.push(constraint.clone());
        }
    }

    // Two different pins can never both hold
    let pins: Vec<&Version> = merged
        .iter()
        .filter(|c| c.op == ConstraintOp::Eq)
        .map(|c| &c.version)
        .collect();
    if pins.len() > 1 {
        return Err(format!("pinned to both =={} and =={}", pins[0], pins[1]));
    }

    // With a single pin, every other constraint must admit the pinned version
    if let Some(&pin) = pins.first() {
        for constraint in merged.iter().filter(|c| c.op != ConstraintOp::Eq) {
            if !constraint.matches(pin) {
                return Err(format!("pin =={} violates {}", pin, constraint));
            }
        }
        return Ok(vec![VersionConstraint::new(ConstraintOp::Eq, pin.clone())]);
    }

    // No pin: the tightest lower bound must stay below the tightest upper bound
    let mut lower: Option<(Version, bool)> = None;
    let mut upper: Option<(Version, bool)> = None;
    for constraint in &merged {
        match constraint.op {
            ConstraintOp::Ge => tighten_lower(&mut lower, constraint.version.clone(), true),
            ConstraintOp::Gt => tighten_lower(&mut lower, constraint.version.clone(), false),
            ConstraintOp::Le => tighten_upper(&mut upper, constraint.version.clone(), true),
            ConstraintOp::Lt => tighten_upper(&mut upper, constraint.version.clone(), false),
            ConstraintOp::Compatible => {
                tighten_lower(&mut lower, constraint.version.clone(), true);
                tighten_upper(&mut upper, constraint.version.compatible_upper(), false);
            }
            ConstraintOp::Eq | ConstraintOp::Ne => {}
        }
    }
    if let (Some((lo, lo_inclusive)), Some((hi, hi_inclusive))) = (&lower, &upper) {
        let empty = match lo.cmp(hi) {
            Ordering::Greater => true,
            Ordering::Equal => !(*lo_inclusive && *hi_inclusive),
            Ordering::Less => false,
        };
        if empty {
            return Err(format!(
                "no version satisfies both the lower bound {} and the upper bound {}",
                lo, hi
            ));
        }
        // A range collapsed to one version can still be emptied by an exclusion
        if lo == hi && merged.iter().any(|c| c.op == ConstraintOp::Ne && &c.version == lo) {
            return Err(format!("the only allowed version {} is excluded by !={}", lo, lo));
        }
    }

    merged.sort_by(|a, b| a.op.rank().cmp(&b.op.rank()).then_with(|| a.version.cmp(&b.version)));
    Ok(merged)
}

fn tighten_lower(current: &mut Option<(Version, bool)>, candidate: Version, inclusive: bool) {
    let replace = match current {
        None => true,
        Some((version, current_inclusive)) => match candidate.cmp(version) {
            Ordering::Greater => true,
            // Exclusive is tighter than inclusive at the same version
            Ordering::Equal => *current_inclusive && !inclusive,
            Ordering::Less => false,
        },
    };
    if replace {
        *current = Some((candidate, inclusive));
    }
}

fn tighten_upper(current: &mut Option<(Version, bool)>, candidate: Version, inclusive: bool) {
    let replace = match current {
        None => true,
        Some((version, current_inclusive)) => match candidate.cmp(version) {
            Ordering::Less => true,
            Ordering::Equal => *current_inclusive && !inclusive,
            Ordering::Greater => false,
        },
    };
    if replace {
        *current = Some((candidate, inclusive));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn version(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let manifest = Manifest::parse(
            "# core stack\n\ngeopandas>=0.12\nfolium  # mapping\n\nsqlalchemy~=2.0.23\n",
        )
        .unwrap();

        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.entries[0].name, "geopandas");
        assert_eq!(manifest.entries[1].name, "folium");
        assert!(manifest.entries[1].constraints.is_empty());
        assert_eq!(manifest.entries[2].line, 6);
    }

    #[test]
    fn test_parse_reports_line_numbers() {
        let err = Manifest::parse("tqdm\npandas>>1.0\n").unwrap_err();
        match err {
            ManifestError::InvalidRequirement { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(Manifest::parse("-tqdm\n").is_err());
        assert!(Manifest::parse("tqdm-\n").is_err());
        assert!(Manifest::parse(">=1.0\n").is_err());
    }

    #[test]
    fn test_parse_allows_spaces_around_operators() {
        let manifest = Manifest::parse("requests >= 2.31 , < 3\n").unwrap();
        assert_eq!(manifest.entries[0].constraints.len(), 2);
        assert_eq!(manifest.entries[0].constraints[0].op, ConstraintOp::Ge);
        assert_eq!(manifest.entries[0].constraints[1].op, ConstraintOp::Lt);
    }

    #[test]
    fn test_canonical_name_equivalence() {
        assert_eq!(canonical_name("Flask-SQLAlchemy"), "flask-sqlalchemy");
        assert_eq!(canonical_name("flask_sqlalchemy"), "flask-sqlalchemy");
        assert_eq!(canonical_name("zope.interface"), "zope-interface");
        assert_eq!(canonical_name("a--b__c"), "a-b-c");
    }

    #[test]
    fn test_version_ordering_pads_with_zeros() {
        assert_eq!(version("1.4"), version("1.4.0"));
        assert!(version("1.4.1") > version("1.4"));
        assert!(version("1.10") > version("1.9"));
        assert!(version("2") > version("1.99.99"));
    }

    #[test]
    fn test_compatible_release_bounds() {
        let series = VersionConstraint::new(ConstraintOp::Compatible, version("2.2"));
        assert!(series.matches(&version("2.2")));
        assert!(series.matches(&version("2.9.1")));
        assert!(!series.matches(&version("3.0")));
        assert!(!series.matches(&version("2.1.9")));

        let patch = VersionConstraint::new(ConstraintOp::Compatible, version("1.4.5"));
        assert!(patch.matches(&version("1.4.9")));
        assert!(!patch.matches(&version("1.5.0")));
    }

    #[test]
    fn test_compatible_release_needs_two_components() {
        assert!(Manifest::parse("numpy~=2\n").is_err());
    }

    #[test]
    fn test_benign_duplicates_warn_and_merge() {
        let manifest = Manifest::parse("tqdm\nfolium>=0.14\ntqdm\nfolium>=0.14\n").unwrap();
        let findings = manifest.lint();

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.level == LintLevel::Warning));
        let tqdm = findings.iter().find(|f| f.name == "tqdm").unwrap();
        assert_eq!(tqdm.lines, vec![1, 3]);

        let lock = manifest.resolve().unwrap();
        assert_eq!(lock.len(), 2);
        assert_eq!(lock.get("tqdm"), Some(&[][..]));
        assert_eq!(lock.get("folium").unwrap().len(), 1);
    }

    #[test]
    fn test_conflicting_pins_fail_resolution() {
        let manifest = Manifest::parse("numpy==1.26.4\nnumpy==2.0.0\n").unwrap();

        let findings = manifest.lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, LintLevel::Error);

        let err = manifest.resolve().unwrap_err();
        match err {
            ManifestError::ConstraintConflict { name, .. } => assert_eq!(name, "numpy"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pin_outside_bound_conflicts() {
        let manifest = Manifest::parse("pandas==1.5.3\npandas>=2\n").unwrap();
        assert!(manifest.resolve().is_err());
    }

    #[test]
    fn test_pin_excluded_conflicts() {
        let manifest = Manifest::parse("shapely==2.0.1\nshapely!=2.0.1\n").unwrap();
        assert!(manifest.resolve().is_err());
    }

    #[test]
    fn test_disjoint_bounds_conflict() {
        let manifest = Manifest::parse("pyproj>=3.6,<3\n").unwrap();
        let findings = manifest.lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, LintLevel::Error);
        assert!(manifest.resolve().is_err());
    }

    #[test]
    fn test_equal_bounds_need_inclusivity() {
        assert!(Manifest::parse("a>=1.0,<=1.0\n").unwrap().resolve().is_ok());
        assert!(Manifest::parse("a>=1.0,<1.0\n").unwrap().resolve().is_err());
        assert!(Manifest::parse("a>1.0,<=1.0\n").unwrap().resolve().is_err());
    }

    #[test]
    fn test_pin_collapses_redundant_bounds() {
        let manifest = Manifest::parse("geopandas>=0.12\ngeopandas==0.14.4\n").unwrap();
        let lock = manifest.resolve().unwrap();
        let constraints = lock.get("geopandas").unwrap();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].op, ConstraintOp::Eq);
    }

    #[test]
    fn test_duplicate_pins_same_version_are_benign() {
        // 1.4 and 1.4.0 are the same release, so this merges cleanly
        let manifest = Manifest::parse("rich==1.4\nrich==1.4.0\n").unwrap();
        let findings = manifest.lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, LintLevel::Warning);
        assert!(manifest.resolve().is_ok());
    }

    #[test]
    fn test_lock_output_is_deterministic() {
        let manifest =
            Manifest::parse("tqdm\nGeoPandas>=0.12\npyproj~=3.6.1\nfolium<1,>=0.14\n").unwrap();
        let lock = manifest.resolve().unwrap();

        let expected = "folium>=0.14,<1\ngeopandas>=0.12\npyproj~=3.6.1\ntqdm\n";
        assert_eq!(lock.to_pinned_string(), expected);
    }

    #[test]
    fn test_lock_round_trip_is_idempotent() {
        let text = "SQLAlchemy~=2.0.23\ngeopandas>=0.12,<1\ntqdm\ntqdm\nfolium!=0.15.0,>=0.14\n";
        let lock = Manifest::parse(text).unwrap().resolve().unwrap();
        let rendered = lock.to_pinned_string();

        let relocked = Manifest::parse(&rendered).unwrap().resolve().unwrap();
        assert_eq!(lock, relocked);
        assert_eq!(rendered, relocked.to_pinned_string());
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}(-[a-z0-9]{1,3})?"
    }

    fn requirement_strategy() -> impl Strategy<Value = String> {
        let v = (0u64..20, 0u64..20, 0u64..20).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"));
        (name_strategy(), v.clone(), v).prop_map(|(name, v1, v2)| {
            let lo = Version::parse(&v1).unwrap();
            let hi = Version::parse(&v2).unwrap();
            if lo < hi {
                format!("{name}>={lo},<{hi}")
            } else if lo > hi {
                format!("{name}>={hi},<={lo}")
            } else {
                format!("{name}=={lo}")
            }
        })
    }

    proptest! {
        #[test]
        fn prop_lock_round_trips(lines in prop::collection::vec(requirement_strategy(), 1..12)) {
            let text = lines.join("\n");
            let lock = Manifest::parse(&text).unwrap().resolve().unwrap();
            let rendered = lock.to_pinned_string();
            let relocked = Manifest::parse(&rendered).unwrap().resolve().unwrap();
            prop_assert_eq!(lock, relocked);
        }

        #[test]
        fn prop_canonical_name_is_idempotent(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,15}[A-Za-z0-9]") {
            let once = canonical_name(&name);
            prop_assert_eq!(canonical_name(&once), once.clone());
        }
    }
}
