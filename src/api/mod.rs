//! Whole-program index of named elements.
//!
//! An [`Api`] is built once per run from the extracted models of every JS file
//! of the project, and is read-only afterwards. Precompiled indices of
//! dependencies are loaded as [`library::Libraries`].

pub mod library;

use std::collections::{BTreeMap, HashMap};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::{FunctionKind, JsFile};
use library::{ElementTree, LibraryDocument};

pub const ATTR_DEFAULT_EXPORT: &str = "defaultExport";
pub const ATTR_SINGLETON_REFS: &str = "singletonRefs";
pub const ATTR_PARSE_ERRORS: &str = "parseErrors";

pub type ElementId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Library,
    Class,
    Constructor,
    Function,
    StaticFunction,
    Constant,
    Enum,
    TopLevelEnum,
    Utility,
    UtilityFunction,
    UtilityVariable,
}

impl ElementKind {
    /// Kinds that own a module export: the element an import is written for.
    pub fn is_owner(self) -> bool {
        matches!(
            self,
            ElementKind::Class | ElementKind::TopLevelEnum | ElementKind::Utility
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub fqn: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub custom_attributes: BTreeMap<String, Value>,
    /// Source-relative file the element was extracted from. `None` for library elements.
    pub source_file: Option<Utf8PathBuf>,
}

impl NamedElement {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.custom_attributes.get(key)
    }

    pub fn is_default_export(&self) -> bool {
        matches!(self.attribute(ATTR_DEFAULT_EXPORT), Some(Value::Bool(true)))
    }

    pub fn has_parse_errors(&self) -> bool {
        matches!(self.attribute(ATTR_PARSE_ERRORS), Some(Value::Bool(true)))
    }

    /// Alternate fqns denoting this element.
    pub fn singleton_refs(&self) -> Vec<&str> {
        match self.attribute(ATTR_SINGLETON_REFS) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Api {
    name: String,
    elements: Vec<NamedElement>,
    by_fqn: HashMap<String, Vec<ElementId>>,
}

impl Api {
    /// An empty index whose root element is a library called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = NamedElement {
            id: 0,
            kind: ElementKind::Library,
            name: name.clone(),
            fqn: String::new(),
            parent: None,
            children: Vec::new(),
            custom_attributes: BTreeMap::new(),
            source_file: None,
        };
        Self {
            name,
            elements: vec![root],
            by_fqn: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &NamedElement {
        &self.elements[0]
    }

    /// Number of indexed elements, the root excluded.
    pub fn len(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(
        &mut self,
        parent: ElementId,
        kind: ElementKind,
        name: &str,
        fqn: &str,
        source_file: Option<&Utf8Path>,
    ) -> ElementId {
        let id = self.elements.len();
        self.elements.push(NamedElement {
            id,
            kind,
            name: name.to_string(),
            fqn: fqn.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            custom_attributes: BTreeMap::new(),
            source_file: source_file.map(Utf8Path::to_path_buf),
        });
        self.elements[parent].children.push(id);
        self.by_fqn.entry(fqn.to_string()).or_default().push(id);
        id
    }

    pub fn set_attribute(&mut self, id: ElementId, key: &str, value: Value) {
        if let Some(element) = self.elements.get_mut(id) {
            element.custom_attributes.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&NamedElement> {
        self.elements.get(id)
    }

    /// All elements, the root excluded.
    pub fn elements(&self) -> impl Iterator<Item = &NamedElement> {
        self.elements.iter().skip(1)
    }

    /// First element with `fqn`. A class is found before its constructor.
    pub fn lookup(&self, fqn: &str) -> Option<&NamedElement> {
        self.lookup_all(fqn).next()
    }

    pub fn lookup_all<'a>(&'a self, fqn: &str) -> impl Iterator<Item = &'a NamedElement> + 'a {
        self.by_fqn
            .get(fqn)
            .into_iter()
            .flatten()
            .filter_map(|id| self.elements.get(*id))
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.by_fqn.contains_key(fqn)
    }

    pub fn elements_of_kind<F>(&self, kind: ElementKind, exclude: F) -> Vec<&NamedElement>
    where
        F: Fn(&NamedElement) -> bool,
    {
        self.elements()
            .filter(|e| e.kind == kind && !exclude(e))
            .collect()
    }

    pub fn parent(&self, element: &NamedElement) -> Option<&NamedElement> {
        element
            .parent
            .and_then(|id| self.elements.get(id))
            .filter(|p| p.kind != ElementKind::Library)
    }

    /// Nearest element, `element` included, that an import is written for.
    pub fn owner<'a>(&'a self, element: &'a NamedElement) -> Option<&'a NamedElement> {
        let mut current = Some(element);
        while let Some(candidate) = current {
            if candidate.kind.is_owner() {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Owners extracted from `path`, in file order.
    pub fn elements_in_file(&self, path: &Utf8Path) -> Vec<&NamedElement> {
        self.root()
            .children
            .iter()
            .filter_map(|id| self.elements.get(*id))
            .filter(|e| e.source_file.as_deref() == Some(path))
            .collect()
    }

    /// Indexes the given models. Elements of a file keep the file's source-relative path.
    pub fn from_js_files<'a>(name: &str, files: impl IntoIterator<Item = &'a JsFile>) -> Self {
        let mut api = Api::new(name);
        for file in files {
            api.add_js_file(file);
        }
        api
    }

    fn add_js_file(&mut self, file: &JsFile) {
        let path = Some(file.path.as_path());
        for class in &file.classes {
            let class_id = self.add(0, ElementKind::Class, &class.name, &class.fqn, path);
            if class.default_export {
                self.set_attribute(class_id, ATTR_DEFAULT_EXPORT, Value::Bool(true));
            }
            if let Some(ctor) = &class.constructor {
                self.add(class_id, ElementKind::Constructor, &ctor.name, &class.fqn, path);
            }
            for function in &class.functions {
                let id = match function.kind {
                    FunctionKind::Static => {
                        let fqn = format!("{}.{}", class.fqn, function.name);
                        self.add(class_id, ElementKind::StaticFunction, &function.name, &fqn, path)
                    }
                    _ => {
                        let fqn = format!("{}.prototype.{}", class.fqn, function.name);
                        self.add(class_id, ElementKind::Function, &function.name, &fqn, path)
                    }
                };
                if !function.singleton_refs.is_empty() {
                    let refs = function
                        .singleton_refs
                        .iter()
                        .cloned()
                        .map(Value::String)
                        .collect();
                    self.set_attribute(id, ATTR_SINGLETON_REFS, Value::Array(refs));
                }
            }
            for constant in &class.constants {
                self.add(class_id, ElementKind::Constant, &constant.name, &constant.fqn, path);
            }
            for js_enum in &class.enums {
                let id = self.add(class_id, ElementKind::Enum, &js_enum.name, &js_enum.fqn, path);
                if !js_enum.parse_errors.is_empty() {
                    self.set_attribute(id, ATTR_PARSE_ERRORS, Value::Bool(true));
                }
            }
        }

        let single_enum = file.classes.is_empty() && file.top_level_enums.len() == 1;
        for tle in &file.top_level_enums {
            let id = self.add(0, ElementKind::TopLevelEnum, &tle.name, &tle.fqn, path);
            if single_enum {
                self.set_attribute(id, ATTR_DEFAULT_EXPORT, Value::Bool(true));
            }
            if !tle.parse_errors.is_empty() {
                self.set_attribute(id, ATTR_PARSE_ERRORS, Value::Bool(true));
            }
        }

        let single_utility = file.classes.is_empty() && file.utilities.len() == 1;
        for utility in &file.utilities {
            let id = self.add(0, ElementKind::Utility, &utility.name, &utility.fqn, path);
            if single_utility {
                self.set_attribute(id, ATTR_DEFAULT_EXPORT, Value::Bool(true));
            }
            for member in utility.exported_members() {
                let kind = if member.function {
                    ElementKind::UtilityFunction
                } else {
                    ElementKind::UtilityVariable
                };
                self.add(id, kind, &member.name, &member.fqn, path);
            }
        }
    }

    pub fn to_document(&self) -> LibraryDocument {
        LibraryDocument {
            name: self.name.clone(),
            elements: self
                .root()
                .children
                .iter()
                .map(|id| self.to_tree(*id))
                .collect(),
        }
    }

    fn to_tree(&self, id: ElementId) -> ElementTree {
        let element = &self.elements[id];
        ElementTree {
            kind: element.kind,
            name: element.name.clone(),
            fqn: element.fqn.clone(),
            custom_attributes: element.custom_attributes.clone(),
            children: element.children.iter().map(|c| self.to_tree(*c)).collect(),
        }
    }

    pub fn from_document(document: LibraryDocument) -> Self {
        let mut api = Api::new(document.name);
        for tree in document.elements {
            api.add_tree(0, tree);
        }
        api
    }

    fn add_tree(&mut self, parent: ElementId, tree: ElementTree) {
        let id = self.add(parent, tree.kind, &tree.name, &tree.fqn, None);
        for (key, value) in tree.custom_attributes {
            self.set_attribute(id, &key, value);
        }
        for child in tree.children {
            self.add_tree(id, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_js_file;

    fn api_of(files: &[(&str, &str)]) -> Api {
        let models: Vec<JsFile> = files
            .iter()
            .map(|(path, source)| parse_js_file(Utf8Path::new(path), source, 0))
            .collect();
        Api::from_js_files("test", models.iter())
    }

    const FORM_FIELD: &str = "scout.FormField = function() {\n};\n\
scout.FormField.DEFAULT = 5;\n\
scout.FormField.Mode = {\n  A: 1\n};\n\
scout.FormField.prototype.validate = function() {\n};\n\
scout.FormField.create = function() {\n};\n";

    #[test]
    fn class_members_are_children_of_their_class() {
        let api = api_of(&[("src/FormField.js", FORM_FIELD)]);
        let class = api.lookup("scout.FormField").unwrap();
        assert_eq!(class.kind, ElementKind::Class);
        assert!(class.is_default_export());

        let kinds: Vec<ElementKind> = class
            .children
            .iter()
            .map(|id| api.get(*id).unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Constructor,
                ElementKind::Function,
                ElementKind::StaticFunction,
                ElementKind::Constant,
                ElementKind::Enum,
            ]
        );
        assert!(api.contains("scout.FormField.prototype.validate"));

        let constant = api.lookup("scout.FormField.DEFAULT").unwrap();
        assert_eq!(api.owner(constant).unwrap().fqn, "scout.FormField");
    }

    #[test]
    fn utilities_index_exported_members_only() {
        let api = api_of(&[(
            "src/strings.js",
            "scout.strings = {\n  upper: function() {\n  },\n  _hidden: 1\n};\n",
        )]);
        assert!(api.lookup("scout.strings.upper").is_some());
        assert!(api.lookup("scout.strings._hidden").is_none());
        let utility = api.lookup("scout.strings").unwrap();
        assert!(utility.is_default_export());
        assert_eq!(
            api.elements_of_kind(ElementKind::UtilityFunction, |_| false).len(),
            1
        );
    }

    #[test]
    fn singleton_refs_and_parse_errors_are_attributes() {
        let api = api_of(&[(
            "src/Device.js",
            "scout.Device = function() {\n};\nscout.Device.Kind = {};\n\
scout.addAppListener('prepare', function() {\n  scout.device = scout.create('Device');\n});\n",
        )]);
        let get = api.lookup("scout.Device.get").unwrap();
        assert_eq!(get.singleton_refs(), vec!["scout.device"]);
        assert!(api.lookup("scout.Device.Kind").unwrap().has_parse_errors());
    }

    #[test]
    fn elements_in_file_lists_owners() {
        let api = api_of(&[
            ("src/FormField.js", FORM_FIELD),
            ("src/Status.js", "scout.Status = {\n  OK: 1\n};\n"),
        ]);
        let owners: Vec<&str> = api
            .elements_in_file(Utf8Path::new("src/Status.js"))
            .iter()
            .map(|e| e.fqn.as_str())
            .collect();
        assert_eq!(owners, vec!["scout.Status"]);
        assert!(api.lookup("scout.Status").unwrap().is_default_export());
    }

    #[test]
    fn document_keeps_tree_and_attributes() {
        let api = api_of(&[("src/FormField.js", FORM_FIELD)]);
        let restored = Api::from_document(api.to_document());
        assert_eq!(restored.name(), "test");
        assert_eq!(restored.len(), api.len());
        let class = restored.lookup("scout.FormField").unwrap();
        assert!(class.is_default_export());
        assert!(class.source_file.is_none());
        let validate = restored.lookup("scout.FormField.prototype.validate").unwrap();
        assert_eq!(restored.parent(validate).unwrap().fqn, "scout.FormField");
    }
}
