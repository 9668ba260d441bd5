mod support;

use rstest::rstest;
use scout_es6_migration::api::library::Libraries;
use scout_es6_migration::error::MigrationError;
use support::fixtures::*;
use support::helpers::*;

const FORM_FIELD: &str = concat!(
    "/*\n * Copyright\n */\n",
    "scout.FormField = function() {\n",
    "  this.label = null;\n",
    "};\n",
    "\n",
    "scout.FormField.prototype.render = function() {\n",
    "  return this.label;\n",
    "};\n",
);

const STRING_FIELD: &str = concat!(
    "scout.StringField = function() {\n",
    "  scout.StringField.parent.call(this);\n",
    "  this.maxLength = 10;\n",
    "};\n",
    "scout.inherits(scout.StringField, scout.FormField);\n",
);

const MODULE: &str = concat!(
    "__include(\"scout/form/FormField.js\");\n",
    "__include(\"scout/form/StringField.js\");\n",
);

fn write_form_module(dir: &ModuleDir) {
    dir.write("src/main/js/scout/form/FormField.js", FORM_FIELD);
    dir.write("src/main/js/scout/form/StringField.js", STRING_FIELD);
    dir.write("src/main/js/scout-module.js", MODULE);
}

#[rstest]
fn subclass_imports_its_parent(module_dir: ModuleDir) {
    write_form_module(&module_dir);

    let stats = migrate(module_dir.config()).unwrap();

    let string_field = module_dir.read("src/form/StringField.js");
    assert!(
        string_field.starts_with(concat!(
            "import FormField from './FormField';\n",
            "\n",
            "export default class StringField extends FormField {\n",
            "  constructor() {\n",
            "    super();\n",
            "    this.maxLength = 10;\n",
        )),
        "unexpected output:\n{string_field}"
    );
    assert!(!string_field.contains("scout."));

    let form_field = module_dir.read("src/form/FormField.js");
    assert!(form_field.starts_with("/*\n * Copyright\n */\nexport default class FormField {\n"));
    assert!(form_field.contains("  render() {\n    return this.label;\n  }\n"));

    assert!(!module_dir.exists("src/main/js/scout/form/FormField.js"));
    assert!(!module_dir.exists("src/main/js/scout/form/StringField.js"));
    assert_eq!(stats.task_failures, 0);
    assert_eq!(stats.files_relocated, 2);
    assert!(stats.references_rewritten >= 1);
    assert_eq!(stats.imports_written, 1);
}

#[rstest]
fn module_file_becomes_index(module_dir: ModuleDir) {
    write_form_module(&module_dir);

    let stats = migrate(module_dir.config()).unwrap();

    assert_eq!(
        module_dir.read("src/index.js"),
        concat!(
            "export {default as FormField} from './form/FormField';\n",
            "export {default as StringField} from './form/StringField';\n",
        )
    );
    assert!(!module_dir.exists("src/main/js/scout-module.js"));
    assert!(!module_dir.exists("src/scout-module.js"));
    assert_eq!(stats.files_generated, 1);
}

#[rstest]
fn second_run_changes_nothing(module_dir: ModuleDir) {
    write_form_module(&module_dir);
    migrate(module_dir.config()).unwrap();
    let string_field = module_dir.read("src/form/StringField.js");
    let form_field = module_dir.read("src/form/FormField.js");
    let index = module_dir.read("src/index.js");

    let stats = migrate(module_dir.config()).unwrap();

    assert_eq!(module_dir.read("src/form/StringField.js"), string_field);
    assert_eq!(module_dir.read("src/form/FormField.js"), form_field);
    assert_eq!(module_dir.read("src/index.js"), index);
    assert_eq!(stats.files_written, 0);
    assert_eq!(stats.references_rewritten, 0);
}

#[rstest]
fn utility_members_are_imported_through_the_utility(module_dir: ModuleDir) {
    module_dir.write(
        "src/main/js/scout/util/strings.js",
        concat!(
            "scout.strings = {\n",
            "  upper: function(s) {\n",
            "    return s.toUpperCase();\n",
            "  }\n",
            "};\n",
        ),
    );
    module_dir.write(
        "src/main/js/scout/Label.js",
        concat!(
            "scout.Label = function() {\n",
            "  this.text = scout.strings.upper('x');\n",
            "};\n",
        ),
    );

    let stats = migrate(module_dir.config()).unwrap();

    let strings = module_dir.read("src/util/strings.js");
    assert!(strings.contains("export function upper(s) {\n"));
    assert!(strings.ends_with("export default {\n  upper\n};\n"));

    let label = module_dir.read("src/Label.js");
    assert!(label.contains("from './util/strings';\n"), "unexpected output:\n{label}");
    assert!(label.contains("    this.text = strings.upper('x');\n"));
    assert_eq!(stats.task_failures, 0);
}

#[rstest]
fn vetoed_file_is_marked_and_others_continue(module_dir: ModuleDir) {
    module_dir.write(
        "src/main/js/scout/Broken.js",
        "scout.Broken.prototype.a = function() {\n};\n",
    );
    module_dir.write(
        "src/main/js/scout/Fine.js",
        "scout.Fine = function() {\n};\n",
    );

    let stats = migrate(module_dir.config()).unwrap();

    assert_eq!(
        module_dir.read("src/Broken.js"),
        concat!(
            "// TODO MIG: ClassesToEs6: Class scout.Broken has no constructor\n",
            "scout.Broken.prototype.a = function() {\n",
            "};\n",
        )
    );
    assert!(module_dir.read("src/Fine.js").starts_with("export default class Fine {\n"));
    assert!(stats.task_failures >= 1);
}

#[rstest]
fn relocation_collision_aborts_the_run(module_dir: ModuleDir) {
    module_dir.write("src/main/js/scout/Foo.js", "scout.Foo = function() {\n};\n");
    module_dir.write("src/Foo.js", "legacy();\n");

    let err = migrate(module_dir.config()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MigrationError>(),
        Some(MigrationError::TargetCollision { .. })
    ));
    assert_eq!(
        module_dir.read("src/main/js/scout/Foo.js"),
        "scout.Foo = function() {\n};\n"
    );
    assert_eq!(module_dir.read("src/Foo.js"), "legacy();\n");
}

#[rstest]
fn dry_run_writes_nothing(module_dir: ModuleDir) {
    write_form_module(&module_dir);
    let mut config = module_dir.config();
    config.dry_run = true;

    let stats = migrate(config).unwrap();

    assert_eq!(module_dir.read("src/main/js/scout/form/StringField.js"), STRING_FIELD);
    assert_eq!(module_dir.read("src/main/js/scout-module.js"), MODULE);
    assert!(!module_dir.exists("src/index.js"));
    assert!(!module_dir.exists("src/form/StringField.js"));
    assert_eq!(stats.files_written, 0);
    assert!(stats.references_rewritten >= 1);
}

#[rstest]
fn separate_target_leaves_sources_alone(module_dir: ModuleDir) {
    let out = tempfile::tempdir().unwrap();
    let target = camino::Utf8PathBuf::from_path_buf(dunce::canonicalize(out.path()).unwrap()).unwrap();
    write_form_module(&module_dir);
    module_dir.write("README.md", "docs\n");
    let mut config = module_dir.config();
    config.target_dir = target.clone();

    migrate(config).unwrap();

    assert_eq!(module_dir.read("src/main/js/scout/form/StringField.js"), STRING_FIELD);
    assert!(read_file(&target.join("src/form/StringField.js"))
        .contains("export default class StringField extends FormField {\n"));
    assert_eq!(read_file(&target.join("README.md")), "docs\n");
    assert!(target.join("src/index.js").is_file());
    assert!(!target.join("src/main/js/scout-module.js").exists());
}

#[rstest]
fn library_elements_are_imported_and_project_index_is_persisted(module_dir: ModuleDir) {
    module_dir.write(
        "api/core.json",
        r#"{
  "name": "@eclipse-scout/core",
  "elements": [
    {
      "kind": "class",
      "name": "Widget",
      "fqn": "scout.Widget",
      "customAttributes": { "defaultExport": true }
    }
  ]
}"#,
    );
    module_dir.write(
        "src/main/js/scout/Panel.js",
        concat!(
            "scout.Panel = function() {\n",
            "  scout.Panel.parent.call(this);\n",
            "};\n",
            "scout.inherits(scout.Panel, scout.Widget);\n",
        ),
    );
    let mut config = module_dir.config();
    config.api_base = Some(module_dir.root().join("api"));
    config.persist_library_name = Some("@eclipse-scout/panels".to_string());
    config.persist_library_file = Some("panels.json".to_string());

    let stats = migrate(config).unwrap();

    let panel = module_dir.read("src/Panel.js");
    assert!(
        panel.starts_with(concat!(
            "import {Widget} from '@eclipse-scout/core';\n",
            "\n",
            "export default class Panel extends Widget {\n",
        )),
        "unexpected output:\n{panel}"
    );
    assert!(!panel.contains("TODO MIG"));
    assert_eq!(stats.library_elements, 1);

    let libraries = Libraries::load(&module_dir.root().join("api"), Some("core.json")).unwrap();
    let (api, panel) = libraries.lookup("scout.Panel").unwrap();
    assert_eq!(api.name(), "@eclipse-scout/panels");
    assert!(panel.is_default_export());
}

#[rstest]
fn unknown_namespace_references_are_flagged(module_dir: ModuleDir) {
    module_dir.write(
        "src/main/js/scout/Panel.js",
        concat!(
            "scout.Panel = function() {\n",
            "  this.x = scout.unknownThing.y;\n",
            "};\n",
        ),
    );

    migrate(module_dir.config()).unwrap();

    assert!(module_dir
        .read("src/Panel.js")
        .starts_with("// TODO MIG: unresolved references: scout.unknownThing\n"));
}
