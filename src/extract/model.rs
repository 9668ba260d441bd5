use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use super::import::{ImportRequest, JsImport};
use crate::error::MigrationError;

/// Byte range into the text a model was extracted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Constructor,
    Prototype,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsFunction {
    pub name: String,
    pub kind: FunctionKind,
    pub args: String,
    /// Header line start to the end of the closing `};` line (delimiter excluded).
    pub span: Span,
    /// Lines between header and closing line, delimiters included.
    pub body: Span,
    /// A `/** ... */` block directly above the header, including its last delimiter.
    pub comment: Option<Span>,
    /// Functions that only exist in the model, with their body source.
    pub memory_body: Option<String>,
    pub singleton_refs: Vec<String>,
    pub parse_errors: Vec<String>,
}

impl JsFunction {
    pub fn is_memory_only(&self) -> bool {
        self.memory_body.is_some()
    }

    pub fn is_static(&self) -> bool {
        self.kind == FunctionKind::Static
    }

    /// Start of the region owned by this function, comment included.
    pub fn region_start(&self) -> usize {
        self.comment.map(|c| c.start).unwrap_or(self.span.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsConstant {
    pub name: String,
    pub fqn: String,
    pub value: Option<String>,
    pub span: Span,
}

/// A value block nested in a class: `ns.Foo.Mode = { ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsEnum {
    pub name: String,
    pub fqn: String,
    pub span: Span,
    pub parse_errors: Vec<String>,
}

/// `scout.inherits(Sub, Super);`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsSuperCall {
    pub superclass: String,
    /// The statement line, delimiter included.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsClass {
    pub namespace: String,
    pub name: String,
    pub fqn: String,
    pub constructor: Option<JsFunction>,
    /// Prototype and static functions in file order.
    pub functions: Vec<JsFunction>,
    pub constants: Vec<JsConstant>,
    pub enums: Vec<JsEnum>,
    /// `this.x = ...` assignments at the top level of the constructor.
    pub fields: Vec<String>,
    pub super_call: Option<JsSuperCall>,
    pub default_export: bool,
}

impl JsClass {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            fqn: format!("{namespace}.{name}"),
            constructor: None,
            functions: Vec::new(),
            constants: Vec::new(),
            enums: Vec::new(),
            fields: Vec::new(),
            super_call: None,
            default_export: false,
        }
    }

    /// Constructor first, then the other functions, in file order.
    pub fn all_functions(&self) -> impl Iterator<Item = &JsFunction> {
        self.constructor.iter().chain(self.functions.iter())
    }

    pub fn function(&self, name: &str) -> Option<&JsFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn has_parse_errors(&self) -> bool {
        self.all_functions().any(|f| !f.parse_errors.is_empty())
            || self.enums.iter().any(|e| !e.parse_errors.is_empty())
    }
}

/// A value block directly below the namespace: `ns.Foo = { ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsTopLevelEnum {
    pub namespace: String,
    pub name: String,
    pub fqn: String,
    pub span: Span,
    pub parse_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityStyle {
    /// `ns.util = { key: ..., };`
    Block,
    /// `ns.util.key = ...;` statements.
    Part,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsUtilityMember {
    pub name: String,
    pub fqn: String,
    pub function: bool,
    /// Upper case name, emitted as `const`.
    pub constant: bool,
    /// Header line of the member (delimiter excluded).
    pub tag: Span,
    /// Closing line of a multi-line part style statement.
    pub end_tag: Option<Span>,
}

impl JsUtilityMember {
    pub fn is_exported(&self) -> bool {
        !self.name.starts_with('_')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsUtility {
    pub namespace: Option<String>,
    pub name: String,
    pub fqn: String,
    pub style: UtilityStyle,
    /// Whole block for block style utilities, delimiter excluded.
    pub span: Option<Span>,
    /// `ns.util = {};` declaration line of a part style utility, delimiter included.
    pub declaration: Option<Span>,
    pub members: Vec<JsUtilityMember>,
    pub parse_errors: Vec<String>,
}

impl JsUtility {
    pub fn new(namespace: Option<&str>, name: &str, style: UtilityStyle) -> Self {
        let fqn = match namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        };
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            fqn,
            style,
            span: None,
            declaration: None,
            members: Vec::new(),
            parse_errors: Vec::new(),
        }
    }

    pub fn exported_members(&self) -> impl Iterator<Item = &JsUtilityMember> {
        self.members.iter().filter(|m| m.is_exported())
    }
}

/// `scout.addAppListener('prepare', function() { ... });`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsAppListener {
    pub event: String,
    /// Header line start to the end of the `});` line (delimiter excluded).
    pub span: Span,
    pub header: Span,
    /// `ns.x` assigned from `scout.create(...)` inside the callback.
    pub instance_fqn: Option<String>,
    pub parse_errors: Vec<String>,
}

/// Extracted view of one file's text at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsFile {
    pub path: Utf8PathBuf,
    pub revision: u64,
    pub copyright: Option<Span>,
    pub classes: Vec<JsClass>,
    pub top_level_enums: Vec<JsTopLevelEnum>,
    pub utilities: Vec<JsUtility>,
    pub app_listeners: Vec<JsAppListener>,
    pub imports: Vec<JsImport>,
    pub parse_errors: Vec<String>,
}

impl JsFile {
    pub fn new(path: &Utf8Path, revision: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            revision,
            copyright: None,
            classes: Vec::new(),
            top_level_enums: Vec::new(),
            utilities: Vec::new(),
            app_listeners: Vec::new(),
            imports: Vec::new(),
            parse_errors: Vec::new(),
        }
    }

    pub fn find_class(&self, fqn: &str) -> Option<&JsClass> {
        self.classes.iter().find(|c| c.fqn == fqn)
    }

    /// The class with `fqn`, appended when it is not known yet.
    pub fn last_class_or_append(&mut self, namespace: &str, name: &str) -> &mut JsClass {
        let fqn = format!("{namespace}.{name}");
        let idx = match self.classes.iter().rposition(|c| c.fqn == fqn) {
            Some(idx) => idx,
            None => {
                self.classes.push(JsClass::new(namespace, name));
                self.classes.len() - 1
            }
        };
        &mut self.classes[idx]
    }

    pub fn utility_or_append(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        style: UtilityStyle,
    ) -> &mut JsUtility {
        let fqn = match namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        };
        let idx = match self.utilities.iter().position(|u| u.fqn == fqn) {
            Some(idx) => idx,
            None => {
                self.utilities.push(JsUtility::new(namespace, name, style));
                self.utilities.len() - 1
            }
        };
        &mut self.utilities[idx]
    }

    pub fn import(&self, module: &str) -> Option<&JsImport> {
        self.imports.iter().find(|i| i.module() == module)
    }

    pub fn get_or_create_import(&mut self, module: &str) -> &mut JsImport {
        let idx = match self.imports.iter().position(|i| i.module() == module) {
            Some(idx) => idx,
            None => {
                self.imports.push(JsImport::new(module));
                self.imports.len() - 1
            }
        };
        &mut self.imports[idx]
    }

    pub fn request_import(&mut self, request: &ImportRequest) -> Result<(), MigrationError> {
        self.get_or_create_import(&request.module)
            .request(&request.binding)
    }

    /// Adds imports carried over from an earlier model of the same file.
    pub fn merge_imports(&mut self, imports: Vec<JsImport>) -> Result<(), MigrationError> {
        for import in imports {
            let module = import.module().to_string();
            self.get_or_create_import(&module).merge(import)?;
        }
        Ok(())
    }

    /// Offset where generated import statements go.
    pub fn import_insert_offset(&self) -> usize {
        self.copyright.map(|c| c.end).unwrap_or(0)
    }

    pub fn has_parse_errors(&self) -> bool {
        !self.parse_errors.is_empty()
            || self.classes.iter().any(JsClass::has_parse_errors)
            || self.top_level_enums.iter().any(|e| !e.parse_errors.is_empty())
            || self.utilities.iter().any(|u| !u.parse_errors.is_empty())
            || self.app_listeners.iter().any(|l| !l.parse_errors.is_empty())
    }
}
