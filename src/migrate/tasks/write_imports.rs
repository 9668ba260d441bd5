use anyhow::Result;
use camino::Utf8Path;

use super::Task;
use crate::extract::{leading_comment_span, JsImport};
use crate::migrate::filters::{is_js_file, is_module_file};
use crate::text::{apply_edits, lines_with_offsets, TextEdit};
use crate::workspace::Context;

/// Serializes the accumulated imports of a file right after its copyright
/// comment. Import statements already in the text are replaced, their
/// members were merged into the model when it was extracted.
pub struct WriteImports;

impl Task for WriteImports {
    fn name(&self) -> &'static str {
        "WriteImports"
    }

    fn order(&self) -> u32 {
        8000
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_js_file(path) && !is_module_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let imports = ctx.current_js_file(path)?.imports.clone();
        if imports.is_empty() {
            return Ok(());
        }
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let existing: Vec<TextEdit> = lines_with_offsets(&source)
            .into_iter()
            .filter(|line| {
                line.text.starts_with("import ") && JsImport::parse_statement(line.text).is_some()
            })
            .map(|line| TextEdit::delete(line.start, line.next))
            .collect();
        let stripped = apply_edits(&source, existing)?;

        let at = leading_comment_span(&stripped).map(|span| span.end).unwrap_or(0);
        let (head, rest) = stripped.split_at(at);
        let rest = rest.trim_start_matches(|c| c == '\n' || c == '\r');

        let mut text = head.to_string();
        if !head.is_empty() && !head.ends_with('\n') {
            text.push_str(nl);
        }
        let statements: Vec<String> = imports.iter().map(|import| import.to_source(nl)).collect();
        text.push_str(&statements.join(nl));
        text.push_str(nl);
        if !rest.is_empty() {
            text.push_str(nl);
            text.push_str(rest);
        }

        if ctx.set_source(path, text)? {
            ctx.stats_mut().imports_written += imports.len();
            tracing::debug!(path = %path, imports = imports.len(), "Wrote imports");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::{AliasedMember, ImportRequest};
    use crate::workspace::MemoryStore;
    use std::sync::Arc;

    fn write(source: &str, requests: &[ImportRequest]) -> (String, usize) {
        let rel = Utf8Path::new("src/Foo.js");
        let mut store = MemoryStore::new().with_file("/m/src/Foo.js", source);
        let mut ctx = Context::new(Arc::new(Config::new("/m")), &mut store);
        for request in requests {
            ctx.request_import(rel, request).unwrap();
        }
        WriteImports.process(rel, &mut ctx).unwrap();
        (ctx.source(rel).unwrap(), ctx.stats().imports_written)
    }

    #[test]
    fn imports_go_after_copyright() {
        let (source, written) = write(
            "/*\n * Copyright\n */\nexport default class Foo extends FormField {\n}\n",
            &[ImportRequest::default_member("./FormField", AliasedMember::new("FormField"))],
        );
        assert_eq!(
            source,
            "/*\n * Copyright\n */\nimport FormField from './FormField';\n\nexport default class Foo extends FormField {\n}\n"
        );
        assert_eq!(written, 1);
    }

    #[test]
    fn members_of_one_module_share_a_statement() {
        let (source, _) = write(
            "foo();\n",
            &[
                ImportRequest::named_member("./enums", AliasedMember::new("Colors")),
                ImportRequest::named_member("./enums", AliasedMember::new("Sizes")),
                ImportRequest::default_member("./Bar", AliasedMember::new("Bar")),
            ],
        );
        assert_eq!(
            source,
            "import {Colors, Sizes} from './enums';\nimport Bar from './Bar';\n\nfoo();\n"
        );
    }

    #[test]
    fn existing_statement_is_merged_not_duplicated() {
        let (source, _) = write(
            "import {a} from './x';\n\nfoo();\n",
            &[ImportRequest::named_member("./x", AliasedMember::new("b"))],
        );
        assert_eq!(source, "import {a, b} from './x';\n\nfoo();\n");
    }

    #[test]
    fn double_quoted_statement_is_merged_not_duplicated() {
        let (source, _) = write(
            "import {a} from \"./x\";\n\nfoo();\n",
            &[ImportRequest::named_member("./x", AliasedMember::new("b"))],
        );
        assert_eq!(source, "import {a, b} from './x';\n\nfoo();\n");
    }

    #[test]
    fn unchanged_imports_are_not_counted() {
        let (source, written) = write("import Bar from './Bar';\n\nfoo();\n", &[]);
        assert_eq!(source, "import Bar from './Bar';\n\nfoo();\n");
        assert_eq!(written, 0);
    }
}
