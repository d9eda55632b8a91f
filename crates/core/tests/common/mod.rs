//! Collaborator stubs shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rigging_core::{
    ArchiveFetcher, CommandOutput, CommandRunner, DependencyCommand, FetchRequest, Result,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every request and writes nothing.
#[derive(Default)]
pub struct CountingFetcher {
    pub requests: Mutex<Vec<(String, PathBuf)>>,
}

impl CountingFetcher {
    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ArchiveFetcher for CountingFetcher {
    async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((request.id.to_string(), request.destination.to_path_buf()));
        Ok(())
    }
}

/// Fails the test if anything is downloaded.
pub struct ForbiddingFetcher;

#[async_trait]
impl ArchiveFetcher for ForbiddingFetcher {
    async fn download_and_extract(&self, request: &FetchRequest<'_>) -> Result<()> {
        panic!("unexpected download of '{}' from {}", request.id, request.url);
    }
}

/// Answers every command with a fixed exit code.
pub struct StubRunner {
    pub exit_code: Option<i32>,
    pub calls: Mutex<Vec<(String, PathBuf)>>,
}

impl StubRunner {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn run(
        &self,
        id: &str,
        command: &DependencyCommand,
        working_dir: &Path,
    ) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((id.to_string(), working_dir.to_path_buf()));
        Ok(CommandOutput {
            exit_code: self.exit_code,
            combined_output: format!("{command}: permission denied\n"),
        })
    }
}
