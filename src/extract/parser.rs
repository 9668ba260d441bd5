//! Line based extraction of legacy namespace-style JavaScript.
//!
//! The scanner recognizes a fixed set of statement shapes at the start of a
//! line. Anything it cannot confidently delimit is recorded with a parse error
//! and scanning continues with the next line.

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::import::JsImport;
use super::model::{
    FunctionKind, JsAppListener, JsConstant, JsEnum, JsFile, JsFunction, JsSuperCall,
    JsTopLevelEnum, JsUtilityMember, Span, UtilityStyle,
};
use crate::migrate::filters;
use crate::text::{lines_with_offsets, Line};

static START_FUNCTION_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/\*\*\s*$").unwrap());
static START_CONSTRUCTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w$]+)\.([\w$]+)\s*=\s*function\s*\(([^)]*)\)\s*\{\s*(\};?)?\s*$").unwrap()
});
static START_PROTOTYPE_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([\w$]+)\.([\w$]+)\.prototype\.([\w$]+)\s*=\s*function\s*\(([^)]*)\)\s*\{\s*(\};?)?\s*$",
    )
    .unwrap()
});
static START_STATIC_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([\w$]+)\.([\w$]+)\.([\w$]+)\s*=\s*function\s*\(([^)]*)\)\s*\{\s*(\};?)?\s*$",
    )
    .unwrap()
});
static START_ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w$]+)\.([\w$]+)\.([A-Z][\w$]*)\s*=\s*\{\s*(\};?)?\s*$").unwrap()
});
static START_TOP_LEVEL_ENUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w$]+)\.([\w$]+)\s*=\s*\{\s*(\};?)?\s*$").unwrap());
static START_CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w$]+)\.([\w$]+)\.([A-Z0-9_]+)(?:\s*=\s*(.*?))?\s*;\s*$").unwrap()
});
static START_MULTILINE_CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w$]+)\.([\w$]+)\.([A-Z0-9_]+)\s*=\s*(.*[\[(])\s*$").unwrap()
});
static START_UTILITY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([a-z][\w$]*)\.)?([a-z][\w$]*)\s*=\s*\{\s*(\};?)?\s*$").unwrap()
});
static UTILITY_BLOCK_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  ([_$a-zA-Z][\w$]*)\s*:\s*function\b").unwrap());
static UTILITY_BLOCK_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  ([_$a-zA-Z][\w$]*)\s*:\s*(.*?)\s*$").unwrap());
static END_UTILITY_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\}").unwrap());
static UTILITY_FUNCTION_STANDALONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:([a-z][\w$]*)\.)?([a-z][\w$]*)\.([_$a-zA-Z][\w$]*)\s*=\s*function\s*\(([^)]*)\)\s*\{\s*(\};?)?\s*$",
    )
    .unwrap()
});
static UTILITY_VARIABLE_STANDALONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([a-z][\w$]*)\.)?([a-z][\w$]*)\.([_$a-zA-Z][\w$]*)\s*=\s*(.*?)\s*$").unwrap()
});
static START_APP_LISTENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^scout\.addAppListener\(\s*'(bootstrap|prepare)'\s*,\s*function\s*\(\)\s*\{\s*$")
        .unwrap()
});
static END_APP_LISTENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\}\);\s*$").unwrap());
static APP_LISTENER_INSTANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([\w$]+\.[\w$]+)\s*=\s*scout\.create\(").unwrap());
static END_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)\}\s*[;,]?\s*$").unwrap());
static END_VALUE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\]})]").unwrap());
static SUPER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^scout\.inherits\(\s*([\w$.]+)\s*,\s*([\w$.]+)\s*\);\s*$").unwrap()
});
static CONSTRUCTOR_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  this\.([\w$]+)\s*=[^=]").unwrap());

/// Extracts the model of `source`, tagged with the working copy `revision`.
pub fn parse_js_file(path: &Utf8Path, source: &str, revision: u64) -> JsFile {
    JsFileParser::new(path, source, revision).parse()
}

/// Span of a leading `/* ... */` comment, including the delimiter after it.
pub fn leading_comment_span(source: &str) -> Option<Span> {
    let lines = lines_with_offsets(source);
    let first = lines.first()?;
    if !first.text.starts_with("/*") || START_FUNCTION_COMMENT.is_match(first.text) {
        return None;
    }
    let close = lines.iter().find(|l| l.text.contains("*/"))?;
    Some(Span::new(first.start, close.next))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Class,
    Utility,
    Other,
}

struct Block {
    span: Span,
    body: Span,
    errors: Vec<String>,
}

struct JsFileParser<'a> {
    source: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
    kind: FileKind,
    js_file: JsFile,
    pending_comment: Option<Span>,
}

impl<'a> JsFileParser<'a> {
    fn new(path: &Utf8Path, source: &'a str, revision: u64) -> Self {
        let kind = if filters::is_class_file(path) {
            FileKind::Class
        } else if filters::is_utility_file(path) {
            FileKind::Utility
        } else {
            FileKind::Other
        };
        Self {
            source,
            lines: lines_with_offsets(source),
            pos: 0,
            kind,
            js_file: JsFile::new(path, revision),
            pending_comment: None,
        }
    }

    fn parse(mut self) -> JsFile {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if self.pos == 0 && self.read_copyright() {
                continue;
            }
            if START_FUNCTION_COMMENT.is_match(line.text) {
                self.read_function_comment();
                continue;
            }
            let comment = self.pending_comment.take().filter(|c| c.end == line.start);
            if line.text.trim().is_empty() {
                self.pos += 1;
                continue;
            }
            self.parse_statement(line, comment);
        }
        self.finish()
    }

    fn parse_statement(&mut self, line: Line<'a>, comment: Option<Span>) {
        let text = line.text;
        if text.starts_with("import ") {
            if let Some(import) = JsImport::parse_statement(text) {
                let module = import.module().to_string();
                if let Err(err) = self.js_file.get_or_create_import(&module).merge(import) {
                    self.js_file.parse_errors.push(err.to_string());
                }
            }
            self.pos += 1;
            return;
        }
        if self.kind == FileKind::Class {
            if let Some(caps) = START_CONSTRUCTOR.captures(text) {
                self.read_constructor(&caps, comment);
                return;
            }
        }
        if self.kind == FileKind::Utility && self.try_utility(text) {
            return;
        }
        if let Some(caps) = START_PROTOTYPE_FUNCTION.captures(text) {
            let (ns, class, name) = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
            let function = self.read_function(name, FunctionKind::Prototype, &caps, 4, 5, comment);
            self.js_file.last_class_or_append(ns, class).functions.push(function);
            return;
        }
        if let Some(caps) = START_ENUM.captures(text) {
            let (ns, class, name) = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
            let fqn = format!("{ns}.{class}.{name}");
            let block = self.read_value_block(caps.get(4).is_some(), &fqn);
            self.js_file.last_class_or_append(ns, class).enums.push(JsEnum {
                name: name.to_string(),
                fqn,
                span: block.span,
                parse_errors: block.errors,
            });
            return;
        }
        if self.kind == FileKind::Class {
            if let Some(caps) = START_TOP_LEVEL_ENUM.captures(text) {
                let (ns, name) = (group(&caps, 1), group(&caps, 2));
                let fqn = format!("{ns}.{name}");
                let block = self.read_value_block(caps.get(3).is_some(), &fqn);
                self.js_file.top_level_enums.push(JsTopLevelEnum {
                    namespace: ns.to_string(),
                    name: name.to_string(),
                    fqn,
                    span: block.span,
                    parse_errors: block.errors,
                });
                return;
            }
        }
        if let Some(caps) = START_STATIC_FUNCTION.captures(text) {
            let (ns, class, name) = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
            let function = self.read_function(name, FunctionKind::Static, &caps, 4, 5, comment);
            self.js_file.last_class_or_append(ns, class).functions.push(function);
            return;
        }
        if let Some(caps) = START_CONSTANT.captures(text) {
            let (ns, class, name) = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
            let constant = JsConstant {
                name: name.to_string(),
                fqn: format!("{ns}.{class}.{name}"),
                value: caps.get(4).map(|m| m.as_str().to_string()),
                span: Span::new(line.start, line.end),
            };
            self.js_file.last_class_or_append(ns, class).constants.push(constant);
            self.pos += 1;
            return;
        }
        if let Some(caps) = START_MULTILINE_CONSTANT.captures(text) {
            let (ns, class, name) = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
            let fqn = format!("{ns}.{class}.{name}");
            let (end, errors) = self.read_until_value_end();
            for err in errors {
                self.js_file.parse_errors.push(format!("{fqn}: {err}"));
            }
            let constant = JsConstant {
                name: name.to_string(),
                fqn,
                value: None,
                span: Span::new(line.start, end),
            };
            self.js_file.last_class_or_append(ns, class).constants.push(constant);
            return;
        }
        if let Some(caps) = START_APP_LISTENER.captures(text) {
            self.read_app_listener(group(&caps, 1));
            return;
        }
        if let Some(caps) = SUPER_CALL.captures(text) {
            let sub = group(&caps, 1);
            if let Some((ns, name)) = sub.split_once('.') {
                let class = self.js_file.last_class_or_append(ns, name);
                class.super_call = Some(JsSuperCall {
                    superclass: group(&caps, 2).to_string(),
                    span: Span::new(line.start, line.next),
                });
            }
            self.pos += 1;
            return;
        }
        self.pos += 1;
    }

    fn read_copyright(&mut self) -> bool {
        let first = self.lines[0];
        if !first.text.starts_with("/*") || START_FUNCTION_COMMENT.is_match(first.text) {
            return false;
        }
        match self.lines.iter().position(|l| l.text.contains("*/")) {
            Some(end) => {
                self.js_file.copyright = Some(Span::new(first.start, self.lines[end].next));
                self.pos = end + 1;
            }
            None => {
                self.js_file
                    .parse_errors
                    .push("leading comment is not closed".to_string());
                self.pos = self.lines.len();
            }
        }
        true
    }

    fn read_function_comment(&mut self) {
        let start = self.lines[self.pos].start;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if line.text.contains("*/") {
                self.pending_comment = Some(Span::new(start, line.next));
                return;
            }
        }
        self.pending_comment = None;
    }

    /// Reads a block opened on the current line and closed by `};` at `indent`.
    fn read_block(&mut self, indent: &str, single_line: bool, what: &str) -> Block {
        let header = self.lines[self.pos];
        self.pos += 1;
        if single_line {
            return Block {
                span: Span::new(header.start, header.end),
                body: Span::new(header.next, header.next),
                errors: Vec::new(),
            };
        }
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if let Some(caps) = END_BLOCK.captures(line.text) {
                if group(&caps, 1) == indent {
                    self.pos += 1;
                    return Block {
                        span: Span::new(header.start, line.end),
                        body: Span::new(header.next, line.start),
                        errors: Vec::new(),
                    };
                }
            }
            let top_level = !line.text.is_empty() && !line.text.starts_with(char::is_whitespace);
            if indent.is_empty() && top_level {
                let last = self.lines[self.pos - 1];
                return Block {
                    span: Span::new(header.start, last.end),
                    body: Span::new(header.next, line.start),
                    errors: vec![format!("{what} is not closed before line {}", self.pos + 1)],
                };
            }
            self.pos += 1;
        }
        let last = self.lines[self.lines.len() - 1];
        Block {
            span: Span::new(header.start, last.end),
            body: Span::new(header.next.min(last.next), last.next),
            errors: vec![format!("{what} is not closed at end of file")],
        }
    }

    fn read_function(
        &mut self,
        name: &str,
        kind: FunctionKind,
        caps: &Captures<'_>,
        args_group: usize,
        single_line_group: usize,
        comment: Option<Span>,
    ) -> JsFunction {
        let args = group(caps, args_group).trim().to_string();
        let single_line = caps.get(single_line_group).is_some();
        let block = self.read_block("", single_line, &format!("function '{name}'"));
        JsFunction {
            name: name.to_string(),
            kind,
            args,
            span: block.span,
            body: block.body,
            comment,
            memory_body: None,
            singleton_refs: Vec::new(),
            parse_errors: block.errors,
        }
    }

    fn read_constructor(&mut self, caps: &Captures<'_>, comment: Option<Span>) {
        let (ns, name) = (group(caps, 1).to_string(), group(caps, 2).to_string());
        let function = self.read_function(&name, FunctionKind::Constructor, caps, 3, 4, comment);
        let mut fields: Vec<String> = Vec::new();
        for line in lines_with_offsets(function.body.slice(self.source)) {
            if let Some(field) = CONSTRUCTOR_FIELD.captures(line.text) {
                let field = group(&field, 1).to_string();
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        let fqn = format!("{ns}.{name}");
        if self
            .js_file
            .find_class(&fqn)
            .is_some_and(|c| c.constructor.is_some())
        {
            self.js_file
                .parse_errors
                .push(format!("duplicate constructor for {fqn}"));
            return;
        }
        let class = self.js_file.last_class_or_append(&ns, &name);
        class.constructor = Some(function);
        class.fields = fields;
    }

    /// `ns.X = { ... };` blocks. A block that opens and closes on one line is
    /// filled dynamically and cannot be migrated automatically.
    fn read_value_block(&mut self, single_line: bool, fqn: &str) -> Block {
        let indent = crate::text::leading_whitespace(self.lines[self.pos].text).to_string();
        let mut block = self.read_block(&indent, single_line, &format!("block '{fqn}'"));
        if single_line {
            block
                .errors
                .push("Looks like a dynamic enum. Must be migrated by hand.".to_string());
        } else if !braces_balanced(block.body.slice(self.source)) {
            block
                .errors
                .push(format!("braces of '{fqn}' are not balanced"));
        }
        block
    }

    /// Consumes lines up to a column zero `]`, `}` or `)` line.
    fn read_until_value_end(&mut self) -> (usize, Vec<String>) {
        let header = self.lines[self.pos];
        self.pos += 1;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if END_VALUE_BLOCK.is_match(line.text) {
                self.pos += 1;
                return (line.end, Vec::new());
            }
            if !line.text.is_empty() && !line.text.starts_with(char::is_whitespace) {
                let last = self.lines[self.pos - 1];
                return (
                    last.end.max(header.end),
                    vec![format!("value is not closed before line {}", self.pos + 1)],
                );
            }
            self.pos += 1;
        }
        let end = self.lines.last().map(|l| l.end).unwrap_or(header.end);
        (end, vec!["value is not closed at end of file".to_string()])
    }

    fn try_utility(&mut self, text: &str) -> bool {
        if let Some(caps) = START_UTILITY_BLOCK.captures(text) {
            let ns = caps.get(1).map(|m| m.as_str().to_string());
            let name = group(&caps, 2).to_string();
            if caps.get(3).is_some() {
                let line = self.lines[self.pos];
                let utility =
                    self.js_file
                        .utility_or_append(ns.as_deref(), &name, UtilityStyle::Part);
                utility.declaration = Some(Span::new(line.start, line.next));
                self.pos += 1;
            } else {
                self.read_utility_block(ns.as_deref(), &name);
            }
            return true;
        }
        if let Some(caps) = UTILITY_FUNCTION_STANDALONE.captures(text) {
            let ns = caps.get(1).map(|m| m.as_str().to_string());
            let (util, name) = (group(&caps, 2).to_string(), group(&caps, 3).to_string());
            let header = self.lines[self.pos];
            let block = self.read_block("", caps.get(5).is_some(), &format!("function '{name}'"));
            let end_tag = if block.span.end > header.end {
                let closing = self
                    .source
                    .get(..block.span.end)
                    .and_then(|s| s.rfind('\n'))
                    .map(|nl| nl + 1)
                    .unwrap_or(block.span.start);
                Some(Span::new(closing, block.span.end))
            } else {
                None
            };
            let utility = self
                .js_file
                .utility_or_append(ns.as_deref(), &util, UtilityStyle::Part);
            let fqn = format!("{}.{}", utility.fqn, name);
            utility.parse_errors.extend(block.errors);
            utility.members.push(JsUtilityMember {
                constant: false,
                function: true,
                name,
                fqn,
                tag: Span::new(header.start, header.end),
                end_tag,
            });
            return true;
        }
        if let Some(caps) = UTILITY_VARIABLE_STANDALONE.captures(text) {
            let value = group(&caps, 4);
            if value.starts_with("function") {
                return false;
            }
            let ns = caps.get(1).map(|m| m.as_str().to_string());
            let (util, name) = (group(&caps, 2).to_string(), group(&caps, 3).to_string());
            let header = self.lines[self.pos];
            let (end_tag, errors) = if value.ends_with(|c| matches!(c, '{' | '[' | '(')) {
                let (end, errors) = self.read_until_value_end();
                let closing_start = self.lines[self.pos - 1].start;
                (Some(Span::new(closing_start.max(header.next), end)), errors)
            } else {
                self.pos += 1;
                (None, Vec::new())
            };
            let utility = self
                .js_file
                .utility_or_append(ns.as_deref(), &util, UtilityStyle::Part);
            let fqn = format!("{}.{}", utility.fqn, name);
            utility.parse_errors.extend(errors);
            utility.members.push(JsUtilityMember {
                constant: is_constant_name(&name),
                function: false,
                name,
                fqn,
                tag: Span::new(header.start, header.end),
                end_tag,
            });
            return true;
        }
        false
    }

    fn read_utility_block(&mut self, ns: Option<&str>, name: &str) {
        let header = self.lines[self.pos];
        self.pos += 1;
        let mut members = Vec::new();
        let mut end = None;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if END_UTILITY_BLOCK.is_match(line.text) {
                end = Some(line.end);
                break;
            }
            let tag = Span::new(line.start, line.end);
            if let Some(caps) = UTILITY_BLOCK_FUNCTION.captures(line.text) {
                members.push((group(&caps, 1).to_string(), true, tag));
            } else if let Some(caps) = UTILITY_BLOCK_VARIABLE.captures(line.text) {
                members.push((group(&caps, 1).to_string(), false, tag));
            }
        }
        let utility = self
            .js_file
            .utility_or_append(ns, name, UtilityStyle::Block);
        utility.style = UtilityStyle::Block;
        match end {
            Some(end) => utility.span = Some(Span::new(header.start, end)),
            None => {
                let last = self.lines[self.lines.len() - 1];
                utility.span = Some(Span::new(header.start, last.end));
                utility
                    .parse_errors
                    .push(format!("utility block '{}' is not closed", utility.fqn));
            }
        }
        let prefix = utility.fqn.clone();
        for (member, function, tag) in members {
            utility.members.push(JsUtilityMember {
                fqn: format!("{prefix}.{member}"),
                constant: !function && is_constant_name(&member),
                function,
                name: member,
                tag,
                end_tag: None,
            });
        }
    }

    fn read_app_listener(&mut self, event: &str) {
        let header = self.lines[self.pos];
        self.pos += 1;
        let mut instances: Vec<String> = Vec::new();
        let mut listener = JsAppListener {
            event: event.to_string(),
            span: Span::new(header.start, header.end),
            header: Span::new(header.start, header.end),
            instance_fqn: None,
            parse_errors: Vec::new(),
        };
        let mut closed = false;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if END_APP_LISTENER.is_match(line.text) {
                listener.span.end = line.end;
                closed = true;
                break;
            }
            if let Some(caps) = APP_LISTENER_INSTANCE.captures(line.text) {
                instances.push(group(&caps, 1).to_string());
            }
        }
        if !closed {
            listener
                .parse_errors
                .push(format!("app listener '{event}' is not closed"));
        }
        match instances.len() {
            0 => {}
            1 => listener.instance_fqn = instances.pop(),
            n => listener.parse_errors.push(format!(
                "app listener '{event}' assigns {n} instances, expected one"
            )),
        }
        self.js_file.app_listeners.push(listener);
    }

    fn finish(mut self) -> JsFile {
        let file = &mut self.js_file;
        if file.classes.len() == 1 {
            let instance = file
                .app_listeners
                .iter()
                .find_map(|l| l.instance_fqn.clone());
            let class = &mut file.classes[0];
            class.default_export = true;
            if let Some(instance) = instance {
                if class.function("get").is_none() {
                    class.functions.push(instance_getter(instance));
                }
            }
        }
        if self.kind == FileKind::Class && file.classes.is_empty() && file.top_level_enums.is_empty()
        {
            tracing::debug!(path = %file.path, "No legacy class found");
        }
        if file.classes.len() > 1 {
            tracing::debug!(
                path = %file.path,
                classes = file.classes.len(),
                "More than one class in file"
            );
        }
        self.js_file
    }
}

/// The model-only `static get()` accessor for a singleton created by an app listener.
fn instance_getter(instance_fqn: String) -> JsFunction {
    JsFunction {
        name: "get".to_string(),
        kind: FunctionKind::Static,
        args: String::new(),
        span: Span::default(),
        body: Span::default(),
        comment: None,
        memory_body: Some("return instance;".to_string()),
        singleton_refs: vec![instance_fqn],
        parse_errors: Vec::new(),
    }
}

fn group<'t>(caps: &Captures<'t>, idx: usize) -> &'t str {
    caps.get(idx).map(|m| m.as_str()).unwrap_or("")
}

fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

fn braces_balanced(body: &str) -> bool {
    let mut depth = 0i64;
    for c in body.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
