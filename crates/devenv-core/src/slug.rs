//! Install path to file-name mapping for per-plugin records

use devenv_fs::hash_bytes;

/// Flat, filesystem-safe name for an install path.
///
/// `plugins/org.sample/` becomes `plugins-org-sample-<hash>`. The hash
/// suffix keeps `a/b-c` and `a-b/c` apart.
pub fn path_slug(path_key: &str) -> String {
    let mut result = String::with_capacity(path_key.len() + 9);
    let mut last_was_dash = true;

    for c in path_key.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            result.push('-');
            last_was_dash = true;
        }
    }
    if !last_was_dash {
        result.push('-');
    }

    let digest = hash_bytes(path_key.as_bytes());
    result.push_str(&digest[..8]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plugins/org.sample", "plugins-org-sample-")]
    #[case("Plugins/My Plugin", "plugins-my-plugin-")]
    #[case("--x--", "x-")]
    fn slug_prefix(#[case] path: &str, #[case] prefix: &str) {
        let slug = path_slug(path);
        assert!(slug.starts_with(prefix), "{slug}");
        assert_eq!(slug.len(), prefix.len() + 8);
    }

    #[test]
    fn similar_paths_do_not_collide() {
        assert_ne!(path_slug("a/b-c"), path_slug("a-b/c"));
    }
}
