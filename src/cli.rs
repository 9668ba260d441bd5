//! CLI argument parsing and help text

pub fn wants_help(args: &[String]) -> bool {
    args.iter()
        .skip(1)
        .any(|a| a == "-h" || a == "--help" || a == "help")
}

pub fn wants_version(args: &[String]) -> bool {
    args.iter()
        .skip(1)
        .any(|a| a == "-V" || a == "--version" || a == "version")
}

pub fn print_help() {
    println!("scout-migrate");
    println!();
    println!("Migrates a legacy namespace based Scout JavaScript module to ES6 modules.");
    println!();
    println!("Usage:");
    println!("  scout-migrate");
    println!("  scout-migrate --help");
    println!("  scout-migrate --version");
    println!();
    println!("Required env:");
    println!("  SOURCE_DIR=/absolute/path/to/module");
    println!();
    println!("Common env (defaults shown):");
    println!("  TARGET_DIR=/path/to/output           (default: SOURCE_DIR, migrates in place)");
    println!("  NAMESPACE=scout");
    println!("  JS_FOLDER_NAME=scout                 (default: NAMESPACE)");
    println!("  REMOVE_JS_FOLDER=true|false          (default: true)");
    println!("  USE_INDEX_JS=true|false              (default: true)");
    println!("  API_BASE=/path/to/library-indices    (resolved under SOURCE_DIR if relative)");
    println!("  PERSIST_LIBRARY_NAME=@eclipse-scout/core");
    println!("  PERSIST_LIBRARY_FILE=core.json       (written into API_BASE)");
    println!("  INCLUDE_FILES=src/a.js,src/b.js      (default: all files)");
    println!("  EXCLUDE_PATTERNS=node_modules,.git,dist,build,target");
    println!("  DRY_RUN=true|false                   (default: false)");
    println!("  MIGRATION_CONFIG=/path/to/migration.toml");
    println!();
    println!("Logging:");
    println!("  RUST_LOG=info|debug                  (log output goes to stderr)");
    println!();
    println!("The run summary is printed to stdout as JSON.");
}

pub fn print_version() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}
