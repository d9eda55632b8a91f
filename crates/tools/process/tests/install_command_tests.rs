//! Real shell commands driven through registry installation.

#![cfg(unix)]

use async_trait::async_trait;
use rigging_core::{
    ArchiveFetcher, CommandOutcome, DependencyRegistry, Error, FetchRequest, Result,
    RuntimeDependency,
};
use rigging_tools_process::ShellCommandRunner;

struct NoDownloads;

#[async_trait]
impl ArchiveFetcher for NoDownloads {
    async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()> {
        panic!("unexpected download from {}", request.url);
    }
}

#[tokio::test]
async fn test_failing_post_install_command_does_not_fail_install() {
    let registry = DependencyRegistry::new(
        vec![
            RuntimeDependency::new("fixup")
                .with_binary_name("tool")
                .with_command("chmod +x tool-that-does-not-exist"),
            RuntimeDependency::new("helper").with_command("echo ready > ready.txt"),
        ],
        Vec::new(),
    )
    .unwrap();

    let temp = tempfile::TempDir::new().unwrap();
    let report = registry
        .install(temp.path(), &NoDownloads, &ShellCommandRunner::new())
        .await
        .unwrap();

    assert_eq!(report.path("fixup"), Some(temp.path().join("tool").as_path()));
    assert!(temp.path().join("ready.txt").is_file());

    let failures: Vec<_> = report.soft_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "fixup");
    match failures[0].1 {
        CommandOutcome::NonZeroExit { exit_code, output } => {
            assert_ne!(*exit_code, Some(0));
            assert!(output.contains("tool-that-does-not-exist"));
        }
        CommandOutcome::Success { .. } => panic!("chmod on a missing file should fail"),
    }
}

#[tokio::test]
async fn test_unlaunchable_shell_fails_install() {
    let registry =
        DependencyRegistry::new(vec![RuntimeDependency::new("helper").with_command("true")], Vec::new())
            .unwrap();

    let temp = tempfile::TempDir::new().unwrap();
    let err = registry
        .install(
            temp.path(),
            &NoDownloads,
            &ShellCommandRunner::with_shell("/nonexistent/sh"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Launch { ref id, .. } if id == "helper"));
}
