//! Loading and validating `environment.json`
//!
//! Validation walks the raw JSON tree first so every structural problem is
//! collected before anything is deserialized. A file with any problem is
//! rejected whole.

use std::collections::HashMap;
use std::path::Path;

use devenv_fs::NormalizedPath;
use serde_json::Value;

use crate::config::{
    DEFAULT_CORE_DIR, DesiredEnvironment, PluginSpec, STATE_DIR, VersionSpec, is_same_or_nested,
};
use crate::{Error, Result};

/// File name of the desired-state file at the environment root.
pub const ENVIRONMENT_FILE: &str = "environment.json";

/// Load `<root>/environment.json`.
pub fn load_from_root(root: &Path) -> Result<DesiredEnvironment> {
    load(&root.join(ENVIRONMENT_FILE))
}

/// Load and validate a desired-state file.
///
/// # Errors
///
/// - [`Error::ConfigNotFound`] if the file does not exist
/// - [`Error::InvalidJson`] if it is not JSON
/// - [`Error::Configuration`] listing every structural problem
pub fn load(path: &Path) -> Result<DesiredEnvironment> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = devenv_fs::io::read_text(path)?;
    let env = parse(&text, path)?;
    tracing::debug!(
        path = %path.display(),
        plugins = env.plugins.len(),
        core = %env.core.version,
        "Loaded environment"
    );
    Ok(env)
}

/// Parse desired-state JSON. `path` is used only for error reporting.
pub fn parse(text: &str, path: &Path) -> Result<DesiredEnvironment> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidJson {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let problems = validate(&value);
    if !problems.is_empty() {
        return Err(Error::Configuration {
            path: path.to_path_buf(),
            problems,
        });
    }

    serde_json::from_value(value).map_err(|e| Error::Configuration {
        path: path.to_path_buf(),
        problems: vec![e.to_string()],
    })
}

fn validate(root: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    let Some(obj) = root.as_object() else {
        problems.push("top level must be an object".to_string());
        return problems;
    };

    match obj.get("organization") {
        Some(Value::Object(org)) => {
            for field in ["name", "code"] {
                if non_empty_str(org.get(field)).is_none() {
                    problems.push(format!("organization: missing '{field}'"));
                }
            }
        }
        Some(_) => problems.push("organization: must be an object".into()),
        None => problems.push("missing 'organization'".into()),
    }

    match obj.get("core") {
        Some(Value::Object(core)) => match non_empty_str(core.get("version")) {
            Some(v) => {
                if let Err(e) = v.parse::<VersionSpec>() {
                    problems.push(format!("core: {e}"));
                }
            }
            None => problems.push("core: missing 'version'".into()),
        },
        Some(_) => problems.push("core: must be an object".into()),
        None => problems.push("missing 'core'".into()),
    }

    match obj.get("plugins") {
        None | Some(Value::Null) => {}
        Some(Value::Array(plugins)) => validate_plugins(plugins, &mut problems),
        Some(_) => problems.push("plugins: must be an array".into()),
    }

    problems
}

fn validate_plugins(plugins: &[Value], problems: &mut Vec<String>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut accepted: Vec<(String, usize)> = Vec::new();

    for (i, entry) in plugins.iter().enumerate() {
        let Some(plugin) = entry.as_object() else {
            problems.push(format!("plugins[{i}]: must be an object"));
            continue;
        };

        for field in ["path", "url", "branch"] {
            if non_empty_str(plugin.get(field)).is_none() {
                problems.push(format!("plugins[{i}]: missing '{field}'"));
            }
        }

        let Some(path) = non_empty_str(plugin.get("path")) else {
            continue;
        };
        if !NormalizedPath::new(path).is_contained() {
            problems.push(format!(
                "plugins[{i}]: path '{path}' must be relative to the environment root"
            ));
            continue;
        }
        let key = PluginSpec::new(path, "", "").path_key();
        if key.is_empty() {
            problems.push(format!(
                "plugins[{i}]: path '{path}' must name a directory below the environment root"
            ));
            continue;
        }
        if let Some(reserved) = [DEFAULT_CORE_DIR, STATE_DIR]
            .into_iter()
            .find(|dir| is_same_or_nested(dir, &key))
        {
            problems.push(format!("plugins[{i}]: path '{path}' is inside reserved '{reserved}'"));
            continue;
        }
        if let Some(first) = seen.get(&key) {
            problems.push(format!(
                "plugins[{i}]: path '{path}' is already used by plugins[{first}]"
            ));
            continue;
        }
        if let Some((other, j)) = accepted
            .iter()
            .find(|(other, _)| is_same_or_nested(other, &key) || is_same_or_nested(&key, other))
        {
            problems.push(format!(
                "plugins[{i}]: path '{path}' overlaps '{other}' of plugins[{j}]"
            ));
            continue;
        }
        seen.insert(key.clone(), i);
        accepted.push((key, i));
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
