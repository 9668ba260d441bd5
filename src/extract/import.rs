use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::MigrationError;

static IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\s+(.+?)\s+from\s+["']([^"']+)["']\s*;?\s*$"#).unwrap());
static IMPORT_SIDE_EFFECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^import\s+["']([^"']+)["']\s*;?\s*$"#).unwrap());
static MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*|[\w$]+)(?:\s+as\s+([\w$]+))?$").unwrap());

/// An imported name with its optional local alias. `*` is a namespace import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasedMember {
    pub name: String,
    pub alias: Option<String>,
}

impl AliasedMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// An alias equal to the name is dropped.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        let name = name.into();
        let alias = alias.into();
        let alias = if alias == name { None } else { Some(alias) };
        Self { name, alias }
    }

    pub fn wildcard(alias: impl Into<String>) -> Self {
        Self {
            name: "*".to_string(),
            alias: Some(alias.into()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }

    /// Name under which the member is visible in the importing module.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn to_source(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} as {}", self.name, alias),
            None => self.name.clone(),
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let caps = MEMBER.captures(raw.trim())?;
        let name = caps.get(1)?.as_str();
        match caps.get(2) {
            Some(alias) => Some(Self::aliased(name, alias.as_str())),
            None if name == "*" => None,
            None => Some(Self::new(name)),
        }
    }
}

/// How a requested import binds its member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    Default(AliasedMember),
    Named(AliasedMember),
}

impl ImportBinding {
    pub fn member(&self) -> &AliasedMember {
        match self {
            ImportBinding::Default(m) | ImportBinding::Named(m) => m,
        }
    }
}

/// One member a rewrite needs from a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub module: String,
    pub binding: ImportBinding,
}

impl ImportRequest {
    pub fn default_member(module: impl Into<String>, member: AliasedMember) -> Self {
        Self {
            module: module.into(),
            binding: ImportBinding::Default(member),
        }
    }

    pub fn named_member(module: impl Into<String>, member: AliasedMember) -> Self {
        Self {
            module: module.into(),
            binding: ImportBinding::Named(member),
        }
    }
}

/// All members a file imports from one module specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsImport {
    module: String,
    default_member: Option<AliasedMember>,
    members: Vec<AliasedMember>,
    /// The statement text when the import was read from existing source.
    statement: Option<String>,
}

impl JsImport {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            default_member: None,
            members: Vec::new(),
            statement: None,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn default_member(&self) -> Option<&AliasedMember> {
        self.default_member.as_ref()
    }

    pub fn members(&self) -> &[AliasedMember] {
        &self.members
    }

    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// Sets the default binding. Requesting the same binding again is a no-op;
    /// a different one is a conflict.
    pub fn set_default_member(&mut self, member: AliasedMember) -> Result<(), MigrationError> {
        match &self.default_member {
            None => {
                self.default_member = Some(member);
                Ok(())
            }
            Some(existing) if *existing == member => Ok(()),
            Some(existing) => Err(MigrationError::ImportConflict {
                module: self.module.clone(),
                existing: existing.to_source(),
                requested: member.to_source(),
            }),
        }
    }

    /// Replaces the default binding, returning the previous one.
    pub fn rebind_default_member(&mut self, member: AliasedMember) -> Option<AliasedMember> {
        self.default_member.replace(member)
    }

    /// Adds a named member. Returns false when it was already present.
    pub fn add_member(&mut self, member: AliasedMember) -> bool {
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Merges `other` (same module) into this import.
    ///
    /// A namespace default is downgraded when the other side brings a plain
    /// default binding.
    pub fn merge(&mut self, other: JsImport) -> Result<(), MigrationError> {
        if let Some(incoming) = other.default_member {
            match &self.default_member {
                Some(existing) if existing.is_wildcard() && !incoming.is_wildcard() => {
                    self.rebind_default_member(incoming);
                }
                Some(existing) if !existing.is_wildcard() && incoming.is_wildcard() => {}
                _ => self.set_default_member(incoming)?,
            }
        }
        for member in other.members {
            self.add_member(member);
        }
        if self.statement.is_none() {
            self.statement = other.statement;
        }
        Ok(())
    }

    /// Applies one request.
    pub fn request(&mut self, binding: &ImportBinding) -> Result<(), MigrationError> {
        match binding {
            ImportBinding::Default(member) => match &self.default_member {
                Some(existing) if existing.is_wildcard() && existing.binding() == member.binding() => {
                    self.rebind_default_member(member.clone());
                    Ok(())
                }
                _ => self.set_default_member(member.clone()),
            },
            ImportBinding::Named(member) => {
                self.add_member(member.clone());
                Ok(())
            }
        }
    }

    /// Renders the import statement(s), without a trailing line delimiter.
    ///
    /// A namespace import cannot share a statement with named members, so that
    /// combination renders as two statements for the same module.
    pub fn to_source(&self, nl: &str) -> String {
        let named = if self.members.is_empty() {
            None
        } else {
            Some(format!(
                "{{{}}}",
                self.members
                    .iter()
                    .map(AliasedMember::to_source)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        };
        match (&self.default_member, named) {
            (None, None) => format!("import '{}';", self.module),
            (None, Some(named)) => format!("import {} from '{}';", named, self.module),
            (Some(default), None) => {
                format!("import {} from '{}';", default.to_source(), self.module)
            }
            (Some(default), Some(named)) if default.is_wildcard() => format!(
                "import {} from '{}';{}import {} from '{}';",
                default.to_source(),
                self.module,
                nl,
                named,
                self.module
            ),
            (Some(default), Some(named)) => format!(
                "import {}, {} from '{}';",
                default.to_source(),
                named,
                self.module
            ),
        }
    }

    /// Reads a single-line ES6 import statement.
    pub fn parse_statement(line: &str) -> Option<JsImport> {
        let trimmed = line.trim();
        if let Some(caps) = IMPORT_SIDE_EFFECT.captures(trimmed) {
            let mut import = JsImport::new(caps.get(1)?.as_str());
            import.statement = Some(trimmed.to_string());
            return Some(import);
        }
        let caps = IMPORT_FROM.captures(trimmed)?;
        let clause = caps.get(1)?.as_str().trim();
        let mut import = JsImport::new(caps.get(2)?.as_str());
        import.statement = Some(trimmed.to_string());

        let (head, braces) = match clause.find('{') {
            Some(open) => {
                let close = clause.rfind('}')?;
                if close < open {
                    return None;
                }
                (&clause[..open], Some(&clause[open + 1..close]))
            }
            None => (clause, None),
        };
        let head = head.trim().trim_end_matches(',').trim();
        if !head.is_empty() {
            let default = if let Some(alias) = head.strip_prefix('*') {
                let alias = alias.trim().strip_prefix("as")?.trim();
                AliasedMember::wildcard(alias)
            } else {
                AliasedMember::parse(head)?
            };
            import.default_member = Some(default);
        }
        if let Some(braces) = braces {
            for raw in braces.split(',').filter(|s| !s.trim().is_empty()) {
                import.add_member(AliasedMember::parse(raw)?);
            }
        }
        Some(import)
    }
}
