//! Version handling shared by the registry mirrors: pre-release
//! filtering and semver ordering.

/// Substrings that mark a version as a pre-release.
///
/// Matching is case-insensitive and deliberately coarse: downstream SBOM
/// analysis only targets stable releases, so over-filtering is preferred
/// to under-filtering.
const PREVIEW_KEYWORDS: &[&str] = &[
    "alpha",
    "beta",
    "rc",
    "canary",
    "next",
    "dev",
    "experimental",
    "preview",
    "pre",
    "snapshot",
    "nightly",
    "unstable",
];

/// Check whether a version string denotes a pre-release.
pub fn is_prerelease(version: &str) -> bool {
    let version = version.to_lowercase();
    PREVIEW_KEYWORDS
        .iter()
        .any(|keyword| version.contains(keyword))
}

/// Parse a version string leniently.
///
/// Registry data is not uniformly strict semver: Packagist tags carry a
/// `v` prefix, and two-component versions show up in old npm documents.
pub fn parse_loose(version: &str) -> Option<semver::Version> {
    let version = version.trim().trim_start_matches('v');

    if let Ok(parsed) = semver::Version::parse(version) {
        return Some(parsed);
    }

    // pad short versions: "1.2" -> "1.2.0", "1" -> "1.0.0"
    match version.split('.').count() {
        1 => semver::Version::parse(&format!("{version}.0.0")).ok(),
        2 => semver::Version::parse(&format!("{version}.0")).ok(),
        _ => None,
    }
}

/// Pick the greatest version by semver ordering.
///
/// Versions that fail even lenient parsing are ranked below every
/// parseable version, ordered among themselves lexicographically.
pub fn latest<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    versions
        .into_iter()
        .max_by(|a, b| match (parse_loose(a), parse_loose(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => a.cmp(b),
        })
        .map(|version| version.to_string())
}

/// Check whether `candidate` is a strict semver upgrade over `current`.
pub fn is_upgrade(candidate: &str, current: &str) -> bool {
    match (parse_loose(candidate), parse_loose(current)) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prerelease_keywords() {
        for version in [
            "1.0.0-beta",
            "2.0.0-rc.1",
            "1.0.0-alpha.2",
            "3.0.0-next.4",
            "0.1.0-dev",
            "5.0.0-canary.17",
            "1.2.3-SNAPSHOT",
            "4.0.0-Preview.1",
        ] {
            assert!(is_prerelease(version), "{version} should be filtered");
        }

        for version in ["1.0.0", "2.3.4", "0.0.1", "10.20.30"] {
            assert!(!is_prerelease(version), "{version} should pass");
        }
    }

    #[test]
    fn latest_by_semver_not_string_order() {
        // string comparison would pick 9.0.0 over 10.0.0
        assert_eq!(
            latest(["9.0.0", "10.0.0", "1.0.0"]).as_deref(),
            Some("10.0.0")
        );
        assert_eq!(
            latest(["1.0.0", "1.0.0-beta", "0.9.0"]).as_deref(),
            Some("1.0.0")
        );
        assert_eq!(latest([]), None);
    }

    #[test]
    fn lenient_parsing() {
        assert_eq!(parse_loose("v1.2.3"), Some(semver::Version::new(1, 2, 3)));
        assert_eq!(parse_loose("1.2"), Some(semver::Version::new(1, 2, 0)));
        assert_eq!(parse_loose("2"), Some(semver::Version::new(2, 0, 0)));
        assert_eq!(parse_loose("not-a-version"), None);
    }

    #[test]
    fn upgrade_detection() {
        assert!(is_upgrade("1.2.4", "1.2.3"));
        assert!(is_upgrade("10.0.0", "9.9.9"));
        assert!(!is_upgrade("1.2.3", "1.2.3"));
        assert!(!is_upgrade("1.2.3", "garbage"));
    }
}
