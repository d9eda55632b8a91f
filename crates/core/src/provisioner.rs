//! Policy-aware installation of the current platform's dependencies.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::install::{
    ArchiveFetcher, CommandOutcome, CommandRunner, ensure_dir, install_dependency,
};
use crate::policy::{ProvisioningPolicy, ProvisioningSource};
use crate::registry::DependencyRegistry;
use crate::Result;

/// Result of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Resolved path per dependency id.
    pub paths: IndexMap<String, PathBuf>,
    /// Where each dependency id came from.
    pub sources: IndexMap<String, ProvisioningSource>,
    /// Commands run for network installs, in order.
    pub commands: Vec<(String, CommandOutcome)>,
}

impl ProvisionReport {
    /// Resolved path for `id`.
    #[must_use]
    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Source chosen for `id`.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&ProvisioningSource> {
        self.sources.get(id)
    }
}

/// Couples a [`DependencyRegistry`] with a [`ProvisioningPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Provisioner<'a> {
    policy: &'a ProvisioningPolicy,
    registry: &'a DependencyRegistry,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner.
    #[must_use]
    pub fn new(policy: &'a ProvisioningPolicy, registry: &'a DependencyRegistry) -> Self {
        Self { policy, registry }
    }

    /// Make every current-platform dependency available.
    ///
    /// Sources are decided for all ids before anything is fetched, so a
    /// strict-offline failure leaves `target_dir` untouched. Bundled ids
    /// resolve inside the bundle; the rest are installed into `target_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StrictOffline`] before any download, or the
    /// first install error encountered.
    pub async fn provision(
        &self,
        target_dir: &Path,
        fetcher: &dyn ArchiveFetcher,
        runner: &dyn CommandRunner,
    ) -> Result<ProvisionReport> {
        let platform = self.registry.current_platform_tag();
        let deps = self.registry.dependencies_for_platform(&platform);

        let mut report = ProvisionReport::default();
        let mut plan = Vec::with_capacity(deps.len());
        for dep in deps {
            let source = match report.sources.get(&dep.id) {
                Some(source) => source.clone(),
                None => {
                    let source = self.policy.source_for(&dep.id, &platform)?;
                    report.sources.insert(dep.id.clone(), source.clone());
                    source
                }
            };
            plan.push((dep, source));
        }

        if plan
            .iter()
            .any(|(_, source)| *source == ProvisioningSource::Network)
        {
            ensure_dir(target_dir).await?;
        }

        for (dep, source) in plan {
            match source {
                ProvisioningSource::Bundled(dir) => {
                    report
                        .paths
                        .insert(dep.id.clone(), dep.binary_path_in(&dir));
                }
                ProvisioningSource::Network => {
                    let installed = install_dependency(dep, target_dir, fetcher, runner).await?;
                    if let Some(outcome) = installed.command {
                        report.commands.push((installed.id.clone(), outcome));
                    }
                    report.paths.insert(installed.id, installed.path);
                }
            }
        }

        info!(
            %platform,
            provisioned = report.paths.len(),
            bundled = report
                .sources
                .values()
                .filter(|s| matches!(s, ProvisioningSource::Bundled(_)))
                .count(),
            "Provisioned runtime dependencies"
        );

        Ok(report)
    }
}
