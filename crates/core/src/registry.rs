//! Runtime dependency registry.
//!
//! The registry holds descriptors keyed by (id, platform qualifier), merges
//! operator overrides once at construction, and answers platform-filtered
//! queries. It is immutable afterwards and safe to share between threads.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::dependency::{DependencyKey, DependencyOverride, RuntimeDependency};
use crate::install::{ArchiveFetcher, CommandRunner, InstallReport, ensure_dir, install_dependency};
use crate::platform::{HostPlatform, PlatformProvider};
use crate::{Error, Result};

/// Merged set of runtime dependencies.
pub struct DependencyRegistry {
    /// Descriptors in registration order.
    dependencies: IndexMap<DependencyKey, RuntimeDependency>,
    platform: Arc<dyn PlatformProvider>,
}

impl DependencyRegistry {
    /// Build a registry from a base set and operator overrides.
    ///
    /// Overrides are applied in order after every base descriptor has been
    /// registered. An override for an existing key merges field by field
    /// and keeps the entry's position; an override for a new key is
    /// appended as a new descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateDependencyKey`] if two base descriptors
    /// share a key.
    pub fn new(
        base: impl IntoIterator<Item = RuntimeDependency>,
        overrides: impl IntoIterator<Item = DependencyOverride>,
    ) -> Result<Self> {
        let mut dependencies: IndexMap<DependencyKey, RuntimeDependency> = IndexMap::new();

        for (second_index, dep) in base.into_iter().enumerate() {
            let key = dep.key();
            if let Some((first_index, _, first)) = dependencies.get_full(&key) {
                return Err(Error::DuplicateDependencyKey {
                    first: first.summary(),
                    second: dep.summary(),
                    key,
                    first_index,
                    second_index,
                });
            }
            dependencies.insert(key, dep);
        }

        for patch in overrides {
            let key = patch.key();
            if let Some(existing) = dependencies.get_mut(&key) {
                debug!(%key, "Merging override into runtime dependency");
                patch.apply_to(existing);
            } else {
                debug!(%key, "Registering runtime dependency from override");
                dependencies.insert(key, patch.into_dependency());
            }
        }

        Ok(Self {
            dependencies,
            platform: Arc::new(HostPlatform),
        })
    }

    /// Use `provider` for current-platform queries instead of the host.
    #[must_use]
    pub fn with_platform_provider(mut self, provider: Arc<dyn PlatformProvider>) -> Self {
        self.platform = provider;
        self
    }

    /// Tag of the current platform, asked of the provider on every call.
    #[must_use]
    pub fn current_platform_tag(&self) -> String {
        self.platform.current_platform_tag()
    }

    /// Descriptors for `platform`, including unconstrained ones, in
    /// registration order.
    #[must_use]
    pub fn dependencies_for_platform(&self, platform: &str) -> Vec<&RuntimeDependency> {
        self.dependencies
            .values()
            .filter(|dep| dep.matches_platform(platform))
            .collect()
    }

    /// Descriptors for the current platform.
    #[must_use]
    pub fn dependencies_for_current_platform(&self) -> Vec<&RuntimeDependency> {
        self.dependencies_for_platform(&self.current_platform_tag())
    }

    /// The one current-platform descriptor, optionally filtered by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousOrMissingDependency`] unless exactly one
    /// descriptor matches.
    pub fn single_dependency_for_current_platform(
        &self,
        id: Option<&str>,
    ) -> Result<&RuntimeDependency> {
        let platform = self.current_platform_tag();
        let matches: Vec<&RuntimeDependency> = self
            .dependencies_for_platform(&platform)
            .into_iter()
            .filter(|dep| id.is_none_or(|id| dep.id == id))
            .collect();

        if let [dep] = matches.as_slice() {
            return Ok(*dep);
        }

        Err(Error::AmbiguousOrMissingDependency {
            count: matches.len(),
            id_filter: id.map(String::from),
            platform,
        })
    }

    /// Path of the single current-platform artifact inside `target_dir`.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::single_dependency_for_current_platform`].
    pub fn binary_path(&self, target_dir: &Path) -> Result<PathBuf> {
        self.binary_path_for(None, target_dir)
    }

    /// Like [`Self::binary_path`], restricted to `id` when given.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::single_dependency_for_current_platform`].
    pub fn binary_path_for(&self, id: Option<&str>, target_dir: &Path) -> Result<PathBuf> {
        let dep = self.single_dependency_for_current_platform(id)?;
        Ok(dep.binary_path_in(target_dir))
    }

    /// Install every current-platform descriptor into `target_dir`.
    ///
    /// Stops at the first failure; there is no continue-on-error mode.
    /// Callers that want partial tolerance install descriptors one at a time
    /// with [`install_dependency`].
    ///
    /// # Errors
    ///
    /// Fails on directory creation, transport, format and launch errors.
    pub async fn install(
        &self,
        target_dir: &Path,
        fetcher: &dyn ArchiveFetcher,
        runner: &dyn CommandRunner,
    ) -> Result<InstallReport> {
        ensure_dir(target_dir).await?;

        let mut report = InstallReport::default();
        for dep in self.dependencies_for_current_platform() {
            let installed = install_dependency(dep, target_dir, fetcher, runner).await?;
            report.record(installed);
        }
        Ok(report)
    }

    /// Look up a descriptor by exact key.
    #[must_use]
    pub fn get(&self, id: &str, platform: Option<&str>) -> Option<&RuntimeDependency> {
        self.dependencies.get(&DependencyKey::new(id, platform))
    }

    /// Iterate over every descriptor in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RuntimeDependency> {
        self.dependencies.values()
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

impl std::fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("dependencies", &self.dependencies.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
