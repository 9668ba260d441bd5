use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::MigrationError;
use crate::text::is_identifier;

pub const DEFAULT_NAMESPACE: &str = "scout";
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["node_modules", ".git", "dist", "build", "target"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source_dir: Utf8PathBuf,
    pub target_dir: Utf8PathBuf,
    pub namespace: String,
    pub js_folder_name: String,
    pub remove_js_folder: bool,
    pub use_index_js: bool,
    pub api_base: Option<Utf8PathBuf>,
    pub persist_library_name: Option<String>,
    pub persist_library_file: Option<String>,
    pub include_files: Vec<Utf8PathBuf>,
    pub exclude_patterns: Vec<String>,
    pub dry_run: bool,
}

/// Optional TOML file named by `MIGRATION_CONFIG`. Environment variables win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    source_dir: Option<String>,
    target_dir: Option<String>,
    namespace: Option<String>,
    js_folder_name: Option<String>,
    remove_js_folder: Option<bool>,
    use_index_js: Option<bool>,
    api_base: Option<String>,
    persist_library_name: Option<String>,
    persist_library_file: Option<String>,
    include_files: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
    dry_run: Option<bool>,
}

impl FileConfig {
    fn load(path: &Utf8Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read MIGRATION_CONFIG: {path}"))?;
        toml::from_str(&raw).with_context(|| format!("Invalid MIGRATION_CONFIG: {path}"))
    }
}

impl Config {
    /// Defaults for an in-place migration of `source_dir`.
    pub fn new(source_dir: impl Into<Utf8PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            target_dir: source_dir.clone(),
            source_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
            js_folder_name: DEFAULT_NAMESPACE.to_string(),
            remove_js_folder: true,
            use_index_js: true,
            api_base: None,
            persist_library_name: None,
            persist_library_file: None,
            include_files: Vec::new(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            dry_run: false,
        }
    }

    pub fn from_env() -> Result<Self> {
        let file = match optional_env("MIGRATION_CONFIG") {
            Some(raw) => FileConfig::load(Utf8Path::new(&raw))?,
            None => FileConfig::default(),
        };

        let source_raw = optional_env("SOURCE_DIR")
            .or(file.source_dir)
            .ok_or_else(|| anyhow!("Missing required env var: SOURCE_DIR"))?;
        let source_dir = canonicalize_dir(Utf8Path::new(&source_raw))
            .with_context(|| format!("Invalid SOURCE_DIR: {source_raw}"))?;

        let target_dir = optional_env("TARGET_DIR")
            .or(file.target_dir)
            .map(|raw| resolve_under(&source_dir, &raw))
            .unwrap_or_else(|| source_dir.clone());

        let namespace = optional_env("NAMESPACE")
            .or(file.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let js_folder_name = optional_env("JS_FOLDER_NAME")
            .or(file.js_folder_name)
            .unwrap_or_else(|| namespace.clone());

        let remove_js_folder = optional_env("REMOVE_JS_FOLDER")
            .as_deref()
            .map(parse_bool)
            .transpose()?
            .or(file.remove_js_folder)
            .unwrap_or(true);
        let use_index_js = optional_env("USE_INDEX_JS")
            .as_deref()
            .map(parse_bool)
            .transpose()?
            .or(file.use_index_js)
            .unwrap_or(true);
        let dry_run = optional_env("DRY_RUN")
            .as_deref()
            .map(parse_bool)
            .transpose()?
            .or(file.dry_run)
            .unwrap_or(false);

        let api_base = optional_env("API_BASE")
            .or(file.api_base)
            .map(|raw| resolve_under(&source_dir, &raw));
        let persist_library_name = optional_env("PERSIST_LIBRARY_NAME").or(file.persist_library_name);
        let persist_library_file = optional_env("PERSIST_LIBRARY_FILE").or(file.persist_library_file);

        let include_files = match optional_env("INCLUDE_FILES") {
            Some(raw) => parse_csv(&raw),
            None => file.include_files.unwrap_or_default(),
        }
        .into_iter()
        .map(|s| Utf8PathBuf::from(s.replace('\\', "/")))
        .collect();

        let exclude_patterns = match optional_env("EXCLUDE_PATTERNS") {
            Some(raw) => parse_csv(&raw),
            None => parse_list_or_default(file.exclude_patterns, DEFAULT_EXCLUDE_PATTERNS),
        };

        let config = Self {
            source_dir,
            target_dir,
            namespace,
            js_folder_name,
            remove_js_folder,
            use_index_js,
            api_base,
            persist_library_name,
            persist_library_file,
            include_files,
            exclude_patterns,
            dry_run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Structural preconditions. A violation aborts the run before any file is touched.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(MigrationError::Config(msg).into()) };

        let ns_ok = is_identifier(&self.namespace)
            && self.namespace.starts_with(|c: char| c.is_ascii_lowercase());
        if !ns_ok {
            return fail(format!("NAMESPACE '{}' is not a lower case identifier", self.namespace));
        }
        if self.js_folder_name.is_empty() || self.js_folder_name.contains(|c| c == '/' || c == '\\') {
            return fail(format!(
                "JS_FOLDER_NAME '{}' must be a single folder name",
                self.js_folder_name
            ));
        }
        if self.persist_library_file.is_some() {
            if self.api_base.is_none() {
                return fail("PERSIST_LIBRARY_FILE requires API_BASE".to_string());
            }
            if self.persist_library_name.is_none() {
                return fail("PERSIST_LIBRARY_FILE requires PERSIST_LIBRARY_NAME".to_string());
            }
        }
        if !self.in_place() && self.target_dir.starts_with(&self.source_dir) {
            return fail(format!(
                "TARGET_DIR '{}' must not be nested inside SOURCE_DIR '{}'",
                self.target_dir, self.source_dir
            ));
        }
        if let Some(abs) = self.include_files.iter().find(|p| p.is_absolute()) {
            return fail(format!("INCLUDE_FILES entry '{abs}' must be relative to SOURCE_DIR"));
        }
        Ok(())
    }

    pub fn in_place(&self) -> bool {
        self.target_dir == self.source_dir
    }

    pub fn source_path(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.source_dir.join(rel)
    }

    pub fn target_path(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.target_dir.join(rel)
    }

    /// Whether tasks should rewrite `rel`. Every file is still indexed.
    pub fn is_included(&self, rel: &Utf8Path) -> bool {
        self.include_files.is_empty() || self.include_files.iter().any(|p| p == rel)
    }

    /// Source folder holding the namespace sources, e.g. `src/main/js/scout`.
    pub fn js_folder(&self) -> Utf8PathBuf {
        Utf8PathBuf::from("src/main/js").join(&self.js_folder_name)
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

fn canonicalize_dir(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().context("Failed to get current_dir")?;
        Utf8PathBuf::from_path_buf(cwd)
            .map_err(|p| anyhow!("current_dir is not UTF-8: {}", p.display()))?
            .join(path)
    };
    let meta = std::fs::metadata(&path).with_context(|| format!("Path does not exist: {path}"))?;
    if !meta.is_dir() {
        return Err(anyhow!("Expected directory, got file: {path}"));
    }
    let canonical =
        dunce::canonicalize(&path).with_context(|| format!("Failed to canonicalize: {path}"))?;
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|p| anyhow!("Path is not UTF-8: {}", p.display()))
}

fn resolve_under(base_dir: &Utf8Path, raw: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn parse_list_or_default(value: Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match value {
        Some(v) => v,
        None => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(anyhow!("Invalid boolean '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn tmp_dir() -> Utf8PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "scout-migrate-config-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Utf8PathBuf::from_path_buf(dir.canonicalize().unwrap()).unwrap()
    }

    fn clear_env() {
        for k in [
            "MIGRATION_CONFIG",
            "SOURCE_DIR",
            "TARGET_DIR",
            "NAMESPACE",
            "JS_FOLDER_NAME",
            "REMOVE_JS_FOLDER",
            "USE_INDEX_JS",
            "API_BASE",
            "PERSIST_LIBRARY_NAME",
            "PERSIST_LIBRARY_FILE",
            "INCLUDE_FILES",
            "EXCLUDE_PATTERNS",
            "DRY_RUN",
        ] {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn from_env_requires_source_dir() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("SOURCE_DIR"));
    }

    #[test]
    fn from_env_defaults_to_in_place_scout_migration() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        std::env::set_var("SOURCE_DIR", base.as_str());

        let cfg = Config::from_env().unwrap();
        assert!(cfg.in_place());
        assert_eq!(cfg.namespace, "scout");
        assert_eq!(cfg.js_folder_name, "scout");
        assert_eq!(cfg.js_folder(), Utf8PathBuf::from("src/main/js/scout"));
        assert!(cfg.remove_js_folder);
        assert!(cfg.use_index_js);
        assert!(!cfg.dry_run);
        assert!(cfg.exclude_patterns.contains(&"node_modules".to_string()));
        assert!(cfg.is_included(Utf8Path::new("src/main/js/scout/Foo.js")));
    }

    #[test]
    fn js_folder_defaults_to_namespace() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        std::env::set_var("SOURCE_DIR", base.as_str());
        std::env::set_var("NAMESPACE", "jswidgets");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.js_folder_name, "jswidgets");
    }

    #[test]
    fn relative_paths_resolve_under_source_dir() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        std::env::set_var("SOURCE_DIR", base.as_str());
        std::env::set_var("API_BASE", "../apis");
        std::env::set_var("INCLUDE_FILES", " src/main/js/scout/Foo.js , ,src\\main\\js\\scout\\Bar.js");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.api_base, Some(base.join("../apis")));
        assert_eq!(
            cfg.include_files,
            vec![
                Utf8PathBuf::from("src/main/js/scout/Foo.js"),
                Utf8PathBuf::from("src/main/js/scout/Bar.js"),
            ]
        );
        assert!(!cfg.is_included(Utf8Path::new("src/main/js/scout/Baz.js")));
    }

    #[test]
    fn toml_file_is_overridden_by_env() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        let file = base.join("migration.toml");
        std::fs::write(
            &file,
            format!(
                "source_dir = \"{base}\"\nnamespace = \"jswidgets\"\ndry_run = true\nexclude_patterns = [\"vendor\"]\n"
            ),
        )
        .unwrap();
        std::env::set_var("MIGRATION_CONFIG", file.as_str());
        std::env::set_var("DRY_RUN", "no");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.source_dir, base);
        assert_eq!(cfg.namespace, "jswidgets");
        assert!(!cfg.dry_run);
        assert_eq!(cfg.exclude_patterns, vec!["vendor".to_string()]);
    }

    #[test]
    fn persist_file_requires_api_base_and_name() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        std::env::set_var("SOURCE_DIR", base.as_str());
        std::env::set_var("PERSIST_LIBRARY_FILE", "01-api_core.json");
        let err = Config::from_env().unwrap_err();
        assert!(err.downcast_ref::<MigrationError>().is_some());

        std::env::set_var("API_BASE", base.as_str());
        std::env::set_var("PERSIST_LIBRARY_NAME", "@eclipse-scout/core");
        assert!(Config::from_env().is_ok());
    }

    #[test]
    fn validate_rejects_nested_target_and_bad_namespace() {
        let mut cfg = Config::new("/work/module");
        cfg.target_dir = "/work/module/out".into();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::new("/work/module");
        cfg.namespace = "Scout.ui".into();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::new("/work/module");
        cfg.target_dir = "/work/out".into();
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.target_path(Utf8Path::new("src/Foo.js")),
            Utf8PathBuf::from("/work/out/src/Foo.js")
        );
    }

    #[test]
    fn bool_parsing_accepts_multiple_spellings() {
        let _g = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let base = tmp_dir();
        std::env::set_var("SOURCE_DIR", base.as_str());
        std::env::set_var("REMOVE_JS_FOLDER", "n");
        std::env::set_var("USE_INDEX_JS", "0");
        std::env::set_var("DRY_RUN", "yes");
        let cfg = Config::from_env().unwrap();
        assert!(!cfg.remove_js_folder);
        assert!(!cfg.use_index_js);
        assert!(cfg.dry_run);

        std::env::set_var("DRY_RUN", "maybe");
        assert!(Config::from_env().is_err());
    }
}
