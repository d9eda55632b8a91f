//! Installation strategies.
//!
//! A descriptor is installed by up to two strategies, in order:
//!
//! - **archive**: download the URL and extract (or place) it into the
//!   install directory through an [`ArchiveFetcher`];
//! - **command**: run the declared command in the install directory through
//!   a [`CommandRunner`].
//!
//! Archive failures are fatal. A command that exits non-zero is logged and
//! reported as [`CommandOutcome::NonZeroExit`], not raised: post-install
//! steps such as permission fix-ups are best-effort and must not undo an
//! otherwise successful placement. Only a command that cannot be launched
//! at all is an error.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dependency::{ArchiveKind, DependencyCommand, RuntimeDependency};
use crate::{Error, Result};

/// Everything an [`ArchiveFetcher`] needs for one download.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Dependency id, for diagnostics.
    pub id: &'a str,
    /// Source URL.
    pub url: &'a str,
    /// Extraction directory, or the exact file path for raw binaries.
    pub destination: &'a Path,
    /// Declared archive kind (zip when the descriptor declares none).
    pub archive_kind: ArchiveKind,
    /// Only extract entries under this archive sub-path.
    pub extract_path: Option<&'a str>,
    /// Declared binary name.
    pub binary_name: Option<&'a str>,
}

/// Downloads and unpacks artifacts.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `request.url` and extract it to `request.destination`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the payload cannot be fetched and
    /// [`Error::Format`] when it is not the declared archive kind.
    async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()>;
}

/// Raw result of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output with standard error merged in.
    pub combined_output: String,
}

/// Executes commands through a shell.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `working_dir` as the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the shell cannot be started. A non-zero
    /// exit is not an error at this layer.
    async fn run(
        &self,
        id: &str,
        command: &DependencyCommand,
        working_dir: &Path,
    ) -> Result<CommandOutput>;
}

/// How a post-install command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit code zero.
    Success {
        /// Combined output.
        output: String,
    },
    /// Non-zero exit or killed by a signal. Logged, not fatal.
    NonZeroExit {
        /// Exit code, if any.
        exit_code: Option<i32>,
        /// Combined output.
        output: String,
    },
}

impl CommandOutcome {
    /// Whether the command exited with code zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Combined output of the command.
    #[must_use]
    pub fn output(&self) -> &str {
        match self {
            Self::Success { output } | Self::NonZeroExit { output, .. } => output,
        }
    }
}

/// Result of installing a single descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDependency {
    /// Dependency id.
    pub id: String,
    /// Binary path, or the install directory when no binary name is declared.
    pub path: PathBuf,
    /// Outcome of the post-install command, if one was declared.
    pub command: Option<CommandOutcome>,
}

/// Result of installing a batch of descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Resolved path per dependency id, in install order.
    pub paths: IndexMap<String, PathBuf>,
    /// Every command that ran, in order.
    pub commands: Vec<(String, CommandOutcome)>,
}

impl InstallReport {
    /// Resolved path for `id`.
    #[must_use]
    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Commands that exited non-zero.
    pub fn soft_failures(&self) -> impl Iterator<Item = (&str, &CommandOutcome)> {
        self.commands
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(id, outcome)| (id.as_str(), outcome))
    }

    pub(crate) fn record(&mut self, installed: InstalledDependency) {
        if let Some(outcome) = installed.command {
            self.commands.push((installed.id.clone(), outcome));
        }
        self.paths.insert(installed.id, installed.path);
    }
}

/// Create `dir` and its parents. Succeeds if it already exists.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be created.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::io(e, dir, "create install directory"))
}

/// Archive strategy: download `url` into `target_dir`.
///
/// Raw binaries with a declared binary name are placed verbatim at
/// `target_dir/<binary_name>`; everything else is extracted into
/// `target_dir` as the declared kind, defaulting to zip.
///
/// # Errors
///
/// Propagates [`Error::Transport`] and [`Error::Format`] from the fetcher.
pub async fn install_from_url(
    dep: &RuntimeDependency,
    url: &str,
    target_dir: &Path,
    fetcher: &dyn ArchiveFetcher,
) -> Result<()> {
    let kind = dep.archive_kind.unwrap_or_default();
    let destination = match (kind, dep.binary_name.as_deref()) {
        (ArchiveKind::RawBinary, Some(name)) => target_dir.join(name),
        _ => target_dir.to_path_buf(),
    };

    info!(id = %dep.id, %url, %kind, destination = ?destination, "Downloading runtime dependency");

    fetcher
        .download_and_extract(&FetchRequest {
            id: &dep.id,
            url,
            destination: &destination,
            archive_kind: kind,
            extract_path: dep.extract_path.as_deref(),
            binary_name: dep.binary_name.as_deref(),
        })
        .await
}

/// Command strategy: run `command` in `target_dir`.
///
/// # Errors
///
/// Returns [`Error::Launch`] if the command could not be started. A
/// non-zero exit is logged and returned as [`CommandOutcome::NonZeroExit`].
pub async fn run_command(
    dep: &RuntimeDependency,
    command: &DependencyCommand,
    target_dir: &Path,
    runner: &dyn CommandRunner,
) -> Result<CommandOutcome> {
    debug!(id = %dep.id, %command, cwd = ?target_dir, "Running post-install command");

    let output = runner.run(&dep.id, command, target_dir).await?;

    if output.exit_code == Some(0) {
        return Ok(CommandOutcome::Success {
            output: output.combined_output,
        });
    }

    warn!(
        id = %dep.id,
        %command,
        exit_code = ?output.exit_code,
        output = %output.combined_output.trim_end(),
        "Post-install command exited unsuccessfully; continuing"
    );

    Ok(CommandOutcome::NonZeroExit {
        exit_code: output.exit_code,
        output: output.combined_output,
    })
}

/// Install one descriptor into `target_dir`.
///
/// Creates the directory if needed, downloads when a URL is declared, then
/// runs the command when one is declared.
///
/// # Errors
///
/// Fails on directory creation, transport, format and launch errors.
pub async fn install_dependency(
    dep: &RuntimeDependency,
    target_dir: &Path,
    fetcher: &dyn ArchiveFetcher,
    runner: &dyn CommandRunner,
) -> Result<InstalledDependency> {
    ensure_dir(target_dir).await?;

    if let Some(url) = &dep.url {
        install_from_url(dep, url, target_dir, fetcher).await?;
    }

    let command = match &dep.command {
        Some(command) => Some(run_command(dep, command, target_dir, runner).await?),
        None => None,
    };

    Ok(InstalledDependency {
        id: dep.id.clone(),
        path: dep.binary_path_in(target_dir),
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        requests: Mutex<Vec<(String, PathBuf, ArchiveKind)>>,
    }

    #[async_trait]
    impl ArchiveFetcher for RecordingFetcher {
        async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()> {
            self.requests.lock().unwrap().push((
                request.url.to_string(),
                request.destination.to_path_buf(),
                request.archive_kind,
            ));
            Ok(())
        }
    }

    struct FixedRunner {
        exit_code: Option<i32>,
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(
            &self,
            _id: &str,
            command: &DependencyCommand,
            _working_dir: &Path,
        ) -> Result<CommandOutput> {
            Ok(CommandOutput {
                exit_code: self.exit_code,
                combined_output: format!("ran {command}"),
            })
        }
    }

    #[tokio::test]
    async fn test_raw_binary_goes_to_binary_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let fetcher = RecordingFetcher::default();
        let dep = RuntimeDependency::new("ls")
            .with_url("https://example/ls")
            .with_archive_kind(ArchiveKind::RawBinary)
            .with_binary_name("ls-bin");

        install_from_url(&dep, "https://example/ls", temp.path(), &fetcher)
            .await
            .unwrap();

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, temp.path().join("ls-bin"));
        assert_eq!(requests[0].2, ArchiveKind::RawBinary);
    }

    #[tokio::test]
    async fn test_archive_defaults_to_zip_into_target_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let fetcher = RecordingFetcher::default();
        let dep = RuntimeDependency::new("sdk").with_url("https://example/sdk");

        install_from_url(&dep, "https://example/sdk", temp.path(), &fetcher)
            .await
            .unwrap();

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].1, temp.path());
        assert_eq!(requests[0].2, ArchiveKind::Zip);
    }

    #[tokio::test]
    async fn test_raw_binary_without_name_extracts_into_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let fetcher = RecordingFetcher::default();
        let dep = RuntimeDependency::new("blob")
            .with_url("https://example/blob")
            .with_archive_kind(ArchiveKind::RawBinary);

        install_from_url(&dep, "https://example/blob", temp.path(), &fetcher)
            .await
            .unwrap();

        assert_eq!(fetcher.requests.lock().unwrap()[0].1, temp.path());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_soft() {
        let temp = tempfile::TempDir::new().unwrap();
        let dep = RuntimeDependency::new("fix").with_command("chmod +x missing");

        let outcome = run_command(
            &dep,
            dep.command.as_ref().unwrap(),
            temp.path(),
            &FixedRunner { exit_code: Some(1) },
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::NonZeroExit {
                exit_code: Some(1),
                output: "ran chmod +x missing".into(),
            }
        );
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_install_dependency_creates_dir_and_runs_both_strategies() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("nested").join("fmt");
        let fetcher = RecordingFetcher::default();
        let dep = RuntimeDependency::new("fmt")
            .with_url("https://example/fmt.zip")
            .with_binary_name("fmt")
            .with_command("chmod +x fmt");

        let installed = install_dependency(&dep, &target, &fetcher, &FixedRunner {
            exit_code: Some(0),
        })
        .await
        .unwrap();

        assert!(target.is_dir());
        assert_eq!(installed.path, target.join("fmt"));
        assert!(installed.command.unwrap().is_success());
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("a");
        ensure_dir(&dir).await.unwrap();
        ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_report_soft_failures() {
        let mut report = InstallReport::default();
        report.record(InstalledDependency {
            id: "a".into(),
            path: PathBuf::from("/t/a"),
            command: Some(CommandOutcome::Success {
                output: String::new(),
            }),
        });
        report.record(InstalledDependency {
            id: "b".into(),
            path: PathBuf::from("/t"),
            command: Some(CommandOutcome::NonZeroExit {
                exit_code: Some(2),
                output: "denied".into(),
            }),
        });

        let failures: Vec<_> = report.soft_failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
        assert_eq!(failures[0].1.output(), "denied");
        assert_eq!(report.path("a"), Some(Path::new("/t/a")));
    }
}
