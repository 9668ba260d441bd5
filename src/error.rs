//! Error tiers of a migration run.
//!
//! Everything propagates as `anyhow::Error`; the pipeline downcasts to
//! [`MigrationError`] to decide whether a failure only aborts one task for
//! one file or the whole run.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A file-level structural problem. Aborts the current task for the current
    /// file only; the pipeline leaves a TODO marker and moves on.
    #[error("{message}")]
    Veto { message: String },

    /// The configuration is inconsistent. Fatal.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A generated file would overwrite a file that already exists. Fatal.
    #[error("generated file '{target}' (from '{origin}') collides with existing file '{existing}'")]
    TargetCollision {
        origin: Utf8PathBuf,
        target: Utf8PathBuf,
        existing: Utf8PathBuf,
    },

    /// Two different default bindings were requested for one module specifier.
    #[error("module '{module}' already has default import '{existing}', cannot add '{requested}'")]
    ImportConflict {
        module: String,
        existing: String,
        requested: String,
    },
}

impl MigrationError {
    pub fn veto(message: impl Into<String>) -> Self {
        MigrationError::Veto {
            message: message.into(),
        }
    }

    /// Whether this error only affects the file being processed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MigrationError::Veto { .. } | MigrationError::ImportConflict { .. }
        )
    }
}

/// Classifies an arbitrary error: `true` when it should abort only the current file.
pub fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<MigrationError>()
        .map(MigrationError::is_recoverable)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn veto_and_import_conflict_are_recoverable() {
        let veto: anyhow::Error = MigrationError::veto("functions out of order").into();
        assert!(is_recoverable(&veto));
        assert_eq!(veto.to_string(), "functions out of order");

        let conflict: anyhow::Error = MigrationError::ImportConflict {
            module: "./Foo".into(),
            existing: "Foo".into(),
            requested: "Bar".into(),
        }
        .into();
        assert!(is_recoverable(&conflict));
    }

    #[test]
    fn collisions_and_io_errors_are_fatal() {
        let collision: anyhow::Error = MigrationError::TargetCollision {
            origin: "src/main/js/scout-module.js".into(),
            target: "src/index.js".into(),
            existing: "src/index.js".into(),
        }
        .into();
        assert!(!is_recoverable(&collision));
        assert!(collision.to_string().contains("src/index.js"));

        let io: anyhow::Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!is_recoverable(&io));
    }
}
