//! Lenient semantic version handling for catalog versions.

use semver::{Version, VersionReq};

/// Extract the semver version from a catalog version string.
///
/// Strips distribution suffixes like "-debian", "-alpine" and expands
/// partial versions ("8" → 8.0.0, "8.0" → 8.0.0). A leading "v" is ignored.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    let version_part = trimmed.split(['-', '+']).next().unwrap_or(trimmed);

    let normalized = match version_part.matches('.').count() {
        0 => format!("{}.0.0", version_part),
        1 => format!("{}.0", version_part),
        _ => version_part.to_string(),
    };

    Version::parse(&normalized).ok()
}

/// Whether `version` is at least `minimum`. Unparseable input fails closed.
pub fn at_least(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Some(v), Some(min)) => v >= min,
        _ => false,
    }
}

/// Major component of a version, if it parses.
pub fn major(version: &str) -> Option<u64> {
    parse_version(version).map(|v| v.major)
}

/// Match a version against one update constraint.
///
/// A constraint is either a semver range (`>= 8.0.21, < 8.1`) or a bare
/// version, which matches exactly. Returns `None` when the constraint or the
/// version cannot be parsed.
pub fn matches_constraint(version: &str, constraint: &str) -> Option<bool> {
    let version = parse_version(version)?;
    let constraint = constraint.trim();

    if let Some(exact) = parse_bare_version(constraint) {
        return Some(version == exact);
    }

    VersionReq::parse(constraint)
        .ok()
        .map(|req| req.matches(&version))
}

/// Bare versions like "8.0.35" have no comparison operator or wildcard.
fn parse_bare_version(constraint: &str) -> Option<Version> {
    let is_bare = constraint
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '+')
        && constraint.starts_with(|c: char| c.is_ascii_digit() || c == 'v');
    if !is_bare {
        return None;
    }
    parse_version(constraint)
}
