//! Core version compatibility policy
//!
//! Releases before 2.0 are pinned to the exact patch. From 2.0 on, patch
//! releases within a minor line are interchangeable, so only major and minor
//! must match. Pre-release and build metadata are ignored.

use devenv_meta::VersionSpec;
use semver::Version;

/// True if `installed` satisfies a request for `desired`.
///
/// The installed version's major decides the rule:
///
/// | installed | required match |
/// |---|---|
/// | `< 2.0` | major, minor, and patch |
/// | `>= 2.0` | major and minor |
pub fn is_version_satisfied(installed: &Version, desired: &Version) -> bool {
    if installed.major < 2 {
        (installed.major, installed.minor, installed.patch)
            == (desired.major, desired.minor, desired.patch)
    } else {
        (installed.major, installed.minor) == (desired.major, desired.minor)
    }
}

/// Apply the policy to a version request. `custom` is always satisfied.
pub fn satisfies(installed: &Version, desired: &VersionSpec) -> bool {
    match desired {
        VersionSpec::Custom => true,
        VersionSpec::Semantic(want) => is_version_satisfied(installed, want),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[rstest]
    #[case("1.16.3", "1.16.3", true)]
    #[case("1.16.3", "1.16.4", false)]
    #[case("1.16.3", "1.17.0", false)]
    #[case("1.16.3", "2.0.0", false)]
    #[case("2.1.0", "2.1.5", true)]
    #[case("2.1.9", "2.1.0", true)]
    #[case("2.1.0", "2.2.0", false)]
    #[case("2.1.0", "3.1.0", false)]
    #[case("2.0.0-beta.1", "2.0.3", true)]
    #[case("1.16.3-rc.1", "1.16.3", true)]
    fn policy(#[case] installed: &str, #[case] desired: &str, #[case] expected: bool) {
        assert_eq!(is_version_satisfied(&v(installed), &v(desired)), expected);
    }

    #[test]
    fn custom_is_always_satisfied() {
        assert!(satisfies(&v("0.1.0"), &VersionSpec::Custom));
    }
}
