use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{Api, ElementKind, NamedElement};

/// One element of a persisted index with its nested elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTree {
    pub kind: ElementKind,
    pub name: String,
    pub fqn: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementTree>,
}

/// A persisted index: `name` is the module specifier its elements are imported from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDocument {
    pub name: String,
    pub elements: Vec<ElementTree>,
}

/// Indices of already migrated dependencies.
#[derive(Debug, Clone, Default)]
pub struct Libraries {
    apis: Vec<Api>,
}

impl Libraries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_apis(apis: Vec<Api>) -> Self {
        Self { apis }
    }

    /// Loads every `*.json` document of `dir` in file name order, skipping `skip_file`.
    pub fn load(dir: &Utf8Path, skip_file: Option<&str>) -> Result<Self> {
        let mut files: Vec<Utf8PathBuf> = Vec::new();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read API_BASE: {dir}"))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read API_BASE entry in {dir}"))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() != Some("json") || !path.is_file() {
                continue;
            }
            if skip_file.is_some() && path.file_name() == skip_file {
                debug!(path = %path, "Skipping own library index");
                continue;
            }
            files.push(path);
        }
        files.sort();

        let mut apis = Vec::with_capacity(files.len());
        for path in files {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read library index: {path}"))?;
            let document: LibraryDocument = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid library index: {path}"))?;
            let api = Api::from_document(document);
            info!(
                library = %api.name(),
                elements = api.len(),
                path = %path,
                "Loaded library index"
            );
            apis.push(api);
        }
        Ok(Self { apis })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Api> {
        self.apis.iter()
    }

    /// First library element with `fqn`, together with its library.
    pub fn lookup(&self, fqn: &str) -> Option<(&Api, &NamedElement)> {
        self.apis
            .iter()
            .find_map(|api| api.lookup(fqn).map(|element| (api, element)))
    }

    pub fn element_count(&self) -> usize {
        self.apis.iter().map(Api::len).sum()
    }
}

/// Persists `api` as a library document at `path`.
pub fn write_library(api: &Api, path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create dir: {parent}"))?;
    }
    let json = serde_json::to_string_pretty(&api.to_document())
        .context("Failed to serialize library index")?;
    fs::write(path, json).with_context(|| format!("Failed to write library index: {path}"))?;
    info!(library = %api.name(), elements = api.len(), path = %path, "Wrote library index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn core_document() -> &'static str {
        r#"{
  "name": "@eclipse-scout/core",
  "elements": [
    {
      "kind": "class",
      "name": "Widget",
      "fqn": "scout.Widget",
      "customAttributes": { "defaultExport": true },
      "children": [
        { "kind": "staticFunction", "name": "create", "fqn": "scout.Widget.create" }
      ]
    },
    {
      "kind": "utility",
      "name": "strings",
      "fqn": "scout.strings"
    }
  ]
}"#
    }

    #[test]
    fn load_reads_documents_in_name_order_and_skips_own_file() {
        let dir = tempdir().unwrap();
        let base = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(base.join("b-core.json"), core_document()).unwrap();
        fs::write(
            base.join("a-other.json"),
            r#"{"name":"other","elements":[{"kind":"class","name":"Widget","fqn":"scout.Widget"}]}"#,
        )
        .unwrap();
        fs::write(base.join("own.json"), "not json").unwrap();
        fs::write(base.join("notes.txt"), "ignored").unwrap();

        let libraries = Libraries::load(base, Some("own.json")).unwrap();
        let names: Vec<&str> = libraries.iter().map(Api::name).collect();
        assert_eq!(names, vec!["other", "@eclipse-scout/core"]);
        assert_eq!(libraries.element_count(), 4);

        let (api, widget) = libraries.lookup("scout.Widget").unwrap();
        assert_eq!(api.name(), "other");
        assert!(!widget.is_default_export());
        let (api, create) = libraries.lookup("scout.Widget.create").unwrap();
        assert_eq!(api.name(), "@eclipse-scout/core");
        assert_eq!(api.owner(create).unwrap().fqn, "scout.Widget");
    }

    #[test]
    fn invalid_document_is_an_error() {
        let dir = tempdir().unwrap();
        let base = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(base.join("broken.json"), "{").unwrap();
        let err = Libraries::load(base, None).unwrap_err();
        assert!(err.to_string().contains("Invalid library index"));
    }

    #[test]
    fn written_library_loads_back() {
        let dir = tempdir().unwrap();
        let base = Utf8Path::from_path(dir.path()).unwrap();
        let api = Api::from_document(serde_json::from_str(core_document()).unwrap());
        write_library(&api, &base.join("api/core.json")).unwrap();

        let libraries = Libraries::load(&base.join("api"), None).unwrap();
        assert_eq!(libraries.element_count(), 3);
        assert!(libraries.lookup("scout.strings").is_some());
    }
}
