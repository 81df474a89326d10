//! Canonical `package.json` layout.
//!
//! Top-level keys follow the order npm tooling conventionally writes them in, unknown keys come
//! after in alphabetical order. Dependency maps are sorted by package name and lifecycle scripts
//! stay next to the script they wrap. Nothing else is reordered: arrays and other nested objects
//! (`exports` conditions are order sensitive) are emitted as parsed.

use std::cmp::Ordering;

use serde_json::{Map, Value};

const KEY_ORDER: &[&str] = &[
    "$schema",
    "name",
    "version",
    "description",
    "license",
    "private",
    "author",
    "maintainers",
    "contributors",
    "homepage",
    "repository",
    "bugs",
    "type",
    "exports",
    "main",
    "module",
    "browser",
    "man",
    "preferGlobal",
    "bin",
    "files",
    "directories",
    "scripts",
    "config",
    "sideEffects",
    "types",
    "typings",
    "workspaces",
    "resolutions",
    "dependencies",
    "bundleDependencies",
    "bundledDependencies",
    "peerDependencies",
    "peerDependenciesMeta",
    "optionalDependencies",
    "devDependencies",
    "keywords",
    "engines",
    "engineStrict",
    "os",
    "cpu",
    "publishConfig",
];

const SORTED_MAPS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "engines",
    "optionalDependencies",
    "peerDependencies",
    "peerDependenciesMeta",
    "resolutions",
];

/// Pretty prints `document` with two space indentation and a trailing newline.
pub fn format_manifest(document: &Value) -> serde_json::Result<String> {
    let canonical = match document {
        Value::Object(fields) => Value::Object(order_fields(fields)),
        other => other.clone(),
    };

    let mut out = serde_json::to_string_pretty(&canonical)?;
    out.push('\n');

    Ok(out)
}

fn order_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
    entries.sort_by(|(a, _), (b, _)| key_rank(a).cmp(&key_rank(b)).then_with(|| a.cmp(b)));

    entries.into_iter()
        .map(|(key, value)| (key.clone(), format_field(key, value)))
        .collect()
}

fn key_rank(key: &str) -> usize {
    KEY_ORDER.iter().position(|k| *k == key).unwrap_or(KEY_ORDER.len())
}

fn format_field(key: &str, value: &Value) -> Value {
    match value {
        Value::Object(map) if key == "scripts" => Value::Object(sort_scripts(map)),
        Value::Object(map) if SORTED_MAPS.contains(&key) => Value::Object(sort_by_key(map)),
        other => other.clone(),
    }
}

fn sort_by_key(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    entries.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Pre,
    Main,
    Post,
}

/// Sorts scripts by name, keeping `pre<x>` and `post<x>` around `<x>` when `<x>` exists.
fn sort_scripts(scripts: &Map<String, Value>) -> Map<String, Value> {
    let script_key = |name: &str| -> (String, Phase) {
        for (prefix, phase) in [("pre", Phase::Pre), ("post", Phase::Post)] {
            if let Some(base) = name.strip_prefix(prefix) {
                if scripts.contains_key(base) {
                    return (base.to_string(), phase)
                }
            }
        }

        (name.to_string(), Phase::Main)
    };

    let mut entries: Vec<(&String, &Value)> = scripts.iter().collect();
    entries.sort_by(|(a, _), (b, _)| match script_key(a.as_str()).cmp(&script_key(b.as_str())) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });

    entries.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
