//! Source model of legacy namespace-style JavaScript files.

pub mod import;
pub mod model;
pub mod parser;

pub use import::{AliasedMember, ImportBinding, ImportRequest, JsImport};
pub use model::{
    FunctionKind, JsAppListener, JsClass, JsConstant, JsEnum, JsFile, JsFunction, JsSuperCall,
    JsTopLevelEnum, JsUtility, JsUtilityMember, Span, UtilityStyle,
};
pub use parser::{leading_comment_span, parse_js_file};
