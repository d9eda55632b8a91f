//! Shell command runner for rigging.
//!
//! Post-install commands always go through a shell: `sh -c` on Unix and
//! `cmd /C` on Windows. Argument sequences are quoted into a single line
//! first. Standard error is merged into the captured output.

use async_trait::async_trait;
use rigging_core::{CommandOutput, CommandRunner, DependencyCommand, Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[cfg(windows)]
const DEFAULT_SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_FLAG: &str = "/C";

#[cfg(not(windows))]
const DEFAULT_SHELL: &str = "sh";
#[cfg(not(windows))]
const SHELL_FLAG: &str = "-c";

/// [`CommandRunner`] that executes through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: PathBuf,
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellCommandRunner {
    /// Runner using `sh` (or `cmd` on Windows) from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shell(DEFAULT_SHELL)
    }

    /// Runner using a specific shell executable.
    #[must_use]
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// The shell executable.
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }

    fn build(&self, line: &str, working_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(SHELL_FLAG);

        #[cfg(windows)]
        cmd.raw_arg(line);
        #[cfg(not(windows))]
        cmd.arg(format!("exec 2>&1\n{line}"));

        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        id: &str,
        command: &DependencyCommand,
        working_dir: &Path,
    ) -> Result<CommandOutput> {
        let line = command.to_shell_line()?;
        debug!(%id, shell = ?self.shell, %line, cwd = ?working_dir, "Spawning shell");

        let output = self
            .build(&line, working_dir)
            .output()
            .await
            .map_err(|e| Error::launch(id, line.as_str(), working_dir, e))?;

        let mut combined_output = String::from_utf8_lossy(&output.stdout).into_owned();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            exit_code: output.status.code(),
            combined_output,
        })
    }
}
