//! Remote ref discovery (`git ls-remote` equivalent)

use git2::{Direction, Remote};

use crate::{Error, Result};

/// A ref advertised by a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Name with the matched namespace stripped, e.g. `feature/login`.
    pub name: String,
    /// Full hex commit id.
    pub commit: String,
}

/// A ref-name filter such as `refs/heads/*` or `refs/tags/v*`.
///
/// A trailing `*` matches any suffix, including one containing slashes.
/// The part of the pattern up to its last `/` is stripped from matching
/// names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPattern {
    namespace: String,
    rest: String,
    wildcard: bool,
}

impl RefPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let (body, wildcard) = match pattern.strip_suffix('*') {
            Some(body) => (body, true),
            None => (pattern, false),
        };
        if !pattern.starts_with("refs/") || body.contains('*') {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_string(),
            });
        }
        let split = body.rfind('/').map(|i| i + 1).unwrap_or(0);
        Ok(Self {
            namespace: body[..split].to_string(),
            rest: body[split..].to_string(),
            wildcard,
        })
    }

    /// Every local branch on the remote.
    pub fn heads() -> Self {
        Self {
            namespace: "refs/heads/".into(),
            rest: String::new(),
            wildcard: true,
        }
    }

    /// Strip the namespace from `full` if it matches this pattern.
    pub fn strip<'n>(&self, full: &'n str) -> Option<&'n str> {
        let short = full.strip_prefix(self.namespace.as_str())?;
        let matched = if self.wildcard {
            short.starts_with(self.rest.as_str()) && !short.is_empty()
        } else {
            short == self.rest
        };
        matched.then_some(short)
    }
}

/// List refs on `url` that match any of `patterns`, in advertisement order.
///
/// Peeled tag entries (`^{}`) are skipped. Branch names containing slashes
/// are kept whole.
pub fn list_remote_refs(url: &str, patterns: &[RefPattern]) -> Result<Vec<RemoteRef>> {
    let mut remote = Remote::create_detached(url)?;
    remote
        .connect(Direction::Fetch)
        .map_err(|e| Error::from_transport("ls-remote", e, false))?;

    let heads = remote
        .list()
        .map_err(|e| Error::from_transport("ls-remote", e, false))?;

    let refs = heads
        .iter()
        .filter(|head| !head.name().ends_with("^{}"))
        .filter_map(|head| {
            patterns
                .iter()
                .find_map(|p| p.strip(head.name()))
                .map(|name| RemoteRef {
                    name: name.to_string(),
                    commit: head.oid().to_string(),
                })
        })
        .collect();

    let _ = remote.disconnect();
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("refs/heads/*", "refs/heads/main", Some("main"))]
    #[case("refs/heads/*", "refs/heads/feature/login/v2", Some("feature/login/v2"))]
    #[case("refs/heads/*", "refs/tags/v1", None)]
    #[case("refs/tags/v*", "refs/tags/v1.2.0", Some("v1.2.0"))]
    #[case("refs/tags/v*", "refs/tags/release-1", None)]
    #[case("refs/heads/main", "refs/heads/main", Some("main"))]
    #[case("refs/heads/main", "refs/heads/main2", None)]
    #[case("refs/heads/é", "refs/heads/é", Some("é"))]
    #[case("refs/heads/fix-ü*", "refs/heads/fix-über", Some("fix-über"))]
    fn pattern_matching(#[case] pattern: &str, #[case] name: &str, #[case] expected: Option<&str>) {
        let p = RefPattern::parse(pattern).unwrap();
        assert_eq!(p.strip(name), expected);
    }

    #[test]
    fn heads_equals_parsed_wildcard() {
        assert_eq!(RefPattern::heads(), RefPattern::parse("refs/heads/*").unwrap());
    }

    #[rstest]
    #[case("heads/*")]
    #[case("refs/*/main")]
    fn invalid_patterns(#[case] pattern: &str) {
        assert!(matches!(
            RefPattern::parse(pattern),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
