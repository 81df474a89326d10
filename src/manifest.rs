use serde_json::{Map, Value};

use crate::error::EditError;

pub mod format;

/// Outcome of rewriting a single dependency pin.
///
/// `previous` is the specifier that was replaced. A non-string value (`null`, a number) is kept as
/// its JSON text. `content` is the canonically formatted manifest.
#[derive(Debug, PartialEq)]
pub struct DependencyEdit {
    pub package: String,
    pub previous: String,
    pub version: String,
    pub content: String,
}

/// Replaces the version specifier of `package` under `dependencies` and returns the canonically
/// formatted manifest.
pub fn update_dependency_version(manifest: &str, package: &str, version: &str) -> Result<String, EditError> {
    edit_dependency_version(manifest, package, version).map(|edit| edit.content)
}

/// Same as [`update_dependency_version`], but also reports the replaced specifier.
///
/// `manifest` has to be a JSON object, any other document is a [`EditError::Parse`].
pub fn edit_dependency_version(manifest: &str, package: &str, version: &str) -> Result<DependencyEdit, EditError> {
    let mut document: Map<String, Value> = serde_json::from_str(manifest).map_err(EditError::Parse)?;

    // a missing `dependencies` object and a missing key are the same condition
    let Some(entry) = dependencies_mut(&mut document).and_then(|deps| deps.get_mut(package)) else {
        return Err(EditError::DependencyNotFound { package: package.to_string() })
    };

    let previous = entry.as_str().map(str::to_string).unwrap_or_else(|| entry.to_string());

    *entry = Value::String(version.to_string());

    let content = format::format_manifest(&Value::Object(document)).map_err(EditError::FormatterInvariant)?;

    serde_json::from_str::<Value>(&content).map_err(EditError::FormatterInvariant)?;

    Ok(DependencyEdit {
        package: package.to_string(),
        previous,
        version: version.to_string(),
        content,
    })
}

fn dependencies_mut(document: &mut Map<String, Value>) -> Option<&mut Map<String, Value>> {
    document.get_mut("dependencies")?.as_object_mut()
}
