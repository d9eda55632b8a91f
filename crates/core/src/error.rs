//! Error types for rigging-core operations.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dependency::DependencyKey;

/// Result type for rigging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building the registry, resolving policy, or installing.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Two base descriptors share the same (id, platform) key.
    #[error(
        "Duplicate runtime dependency {key}: entry #{first_index} ({first}) collides with entry #{second_index} ({second})"
    )]
    #[diagnostic(
        code(rigging::registry::duplicate_key),
        help("each (id, platform) pair may appear once in the base set; patch entries with an override instead")
    )]
    DuplicateDependencyKey {
        /// The colliding key.
        key: DependencyKey,
        /// Position of the first entry in the base set.
        first_index: usize,
        /// Summary of the first entry.
        first: String,
        /// Position of the second entry in the base set.
        second_index: usize,
        /// Summary of the second entry.
        second: String,
    },

    /// A query required exactly one dependency and found some other count.
    #[error(
        "Expected exactly one runtime dependency{} for platform '{}', found {}",
        describe_filter(.id_filter),
        .platform,
        .count
    )]
    #[diagnostic(code(rigging::registry::ambiguous_or_missing))]
    AmbiguousOrMissingDependency {
        /// Number of matching descriptors.
        count: usize,
        /// The id filter used, if any.
        id_filter: Option<String>,
        /// The platform tag the query ran against.
        platform: String,
    },

    /// The artifact could not be downloaded.
    #[error("Failed to download '{id}' from {url}: {message}")]
    #[diagnostic(code(rigging::install::transport))]
    Transport {
        /// Dependency id.
        id: String,
        /// Source URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The payload was served but is not the declared archive kind.
    #[error("Payload for '{id}' from {url} is not a valid {kind} archive: {message}")]
    #[diagnostic(
        code(rigging::install::format),
        help("the server may have returned an error page instead of the artifact")
    )]
    Format {
        /// Dependency id.
        id: String,
        /// Source URL.
        url: String,
        /// Declared archive kind.
        kind: String,
        /// Error message.
        message: String,
    },

    /// The post-install command could not be started at all.
    #[error("Failed to launch command for '{id}' in {}: {command}", working_dir.display())]
    #[diagnostic(code(rigging::install::launch))]
    Launch {
        /// Dependency id.
        id: String,
        /// Command as it was going to be executed.
        command: String,
        /// Working directory.
        working_dir: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Standalone mode without bundled artifacts and without network fallback.
    #[error(
        "Standalone mode requires bundled artifacts for '{id}' on {platform}, but none were found and network fallback is disabled (searched: {})",
        describe_paths(.searched)
    )]
    #[diagnostic(
        code(rigging::policy::strict_offline),
        help("set RIGGING_BUNDLED_DIR to a directory containing the bundle, or allow network fallback")
    )]
    StrictOffline {
        /// Dependency id.
        id: String,
        /// Platform tag.
        platform: String,
        /// Every location that was looked at.
        searched: Vec<PathBuf>,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation} at {}: {source}", path.display())]
    #[diagnostic(code(rigging::io))]
    Io {
        /// Description of the operation that failed.
        operation: String,
        /// Path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration (override documents, archive kinds, commands).
    #[error("Configuration error: {message}")]
    #[diagnostic(code(rigging::config::invalid))]
    Configuration {
        /// The error message.
        message: String,
    },
}

impl Error {
    /// Create a transport error.
    #[must_use]
    pub fn transport(
        id: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            id: id.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a format error.
    #[must_use]
    pub fn format(
        id: impl Into<String>,
        url: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Format {
            id: id.into(),
            url: url.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a launch error.
    #[must_use]
    pub fn launch(
        id: impl Into<String>,
        command: impl Into<String>,
        working_dir: &Path,
        source: std::io::Error,
    ) -> Self {
        Self::Launch {
            id: id.into(),
            command: command.into(),
            working_dir: working_dir.to_path_buf(),
            source,
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(source: std::io::Error, path: &Path, operation: impl Into<String>) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

fn describe_filter(filter: &Option<String>) -> String {
    filter
        .as_deref()
        .map(|id| format!(" with id '{id}'"))
        .unwrap_or_default()
}

fn describe_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no bundled directory configured".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
