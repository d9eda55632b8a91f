//! Provisioning policy: bundled artifacts versus network downloads.
//!
//! The policy is resolved once at start-up from the environment, read
//! through an [`EnvSource`], and then passed around as a plain value. It
//! answers three questions before any network activity happens:
//!
//! - is standalone (offline-preferring) mode active;
//! - where do the bundled artifacts and the bundled helper runtime live;
//! - may a missing bundle fall back to a network download.
//!
//! Bundled locations are searched in order, first hit wins:
//!
//! 1. the explicit override variable, if it names an existing path;
//! 2. a fixed location next to the executable, only for packaged builds;
//! 3. nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::paths;
use crate::{Error, Result};

/// Enables standalone mode when set to a truthy token.
pub const STANDALONE_ENV: &str = "RIGGING_STANDALONE";

/// Overrides the bundled artifacts directory.
pub const BUNDLED_DIR_ENV: &str = "RIGGING_BUNDLED_DIR";

/// Overrides the bundled helper runtime executable.
pub const BUNDLED_RUNTIME_ENV: &str = "RIGGING_BUNDLED_RUNTIME";

/// Disables network fallback when set to a falsy token.
pub const NETWORK_FALLBACK_ENV: &str = "RIGGING_ALLOW_NETWORK_FALLBACK";

/// Bundled artifacts directory name next to a packaged executable.
pub const BUNDLED_DIR_NAME: &str = "bundled";

/// Bundled runtime directory name next to a packaged executable.
pub const RUNTIME_DIR_NAME: &str = "runtime";

/// Read access to environment variables.
pub trait EnvSource {
    /// Value of `key`, if set and valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Whether `value` is an accepted truthy token.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether `value` is an accepted falsy token.
#[must_use]
pub fn is_falsy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Facts about the running executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Directory of the executable, set only for packaged builds.
    pub packaged_exe_dir: Option<PathBuf>,
    /// Whether the host is Windows.
    pub windows: bool,
}

impl HostContext {
    /// Describe the current process.
    ///
    /// The executable directory is only consulted when the crate is built
    /// with the `packaged` feature.
    #[must_use]
    pub fn detect() -> Self {
        let packaged_exe_dir = if cfg!(feature = "packaged") {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        } else {
            None
        };

        Self {
            packaged_exe_dir,
            windows: cfg!(windows),
        }
    }

    /// A regular, non-packaged process.
    #[must_use]
    pub fn unpackaged() -> Self {
        Self {
            packaged_exe_dir: None,
            windows: cfg!(windows),
        }
    }

    /// A packaged executable living in `exe_dir`.
    #[must_use]
    pub fn packaged(exe_dir: impl Into<PathBuf>) -> Self {
        Self {
            packaged_exe_dir: Some(exe_dir.into()),
            windows: cfg!(windows),
        }
    }

    /// File name of the bundled runtime executable on this host.
    #[must_use]
    pub fn runtime_executable(&self) -> &'static Path {
        if self.windows {
            Path::new("node.exe")
        } else {
            Path::new("bin/node")
        }
    }
}

/// Where one dependency will come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningSource {
    /// Pre-bundled copy in this directory.
    Bundled(PathBuf),
    /// Regular download and install.
    Network,
}

/// Overall operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningMode {
    /// Standalone mode is off; everything is downloaded.
    Networked,
    /// Standalone with a bundled directory available.
    StandaloneBundled,
    /// Standalone without a bundle; downloads are permitted.
    StandaloneFallback,
    /// Standalone without a bundle; downloads are forbidden.
    StandaloneStrict,
}

/// Resolved provisioning policy. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPolicy {
    standalone: bool,
    bundled_dir: Option<PathBuf>,
    bundled_runtime: Option<PathBuf>,
    allow_network_fallback: bool,
    data_dir: PathBuf,
    static_dir: PathBuf,
}

impl ProvisioningPolicy {
    /// Resolve the policy from `env` and `host`.
    ///
    /// Creates the data directory and its static resources directory,
    /// whether or not standalone mode is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the data directories cannot be created.
    pub fn resolve(env: &dyn EnvSource, host: &HostContext) -> Result<Self> {
        let data_dir = paths::data_dir(env);
        let static_dir = paths::ensure_data_dirs(&data_dir)?;

        let standalone = env.var(STANDALONE_ENV).is_some_and(|v| is_truthy(&v));
        let allow_network_fallback = !env.var(NETWORK_FALLBACK_ENV).is_some_and(|v| is_falsy(&v));
        let bundled_dir = resolve_bundled_dir(env, host);
        let bundled_runtime = resolve_bundled_runtime(env, host);

        let policy = Self {
            standalone,
            bundled_dir,
            bundled_runtime,
            allow_network_fallback,
            data_dir,
            static_dir,
        };

        info!(
            mode = ?policy.mode(),
            bundled_dir = ?policy.bundled_dir,
            bundled_runtime = ?policy.bundled_runtime,
            data_dir = ?policy.data_dir,
            "Resolved provisioning policy"
        );

        Ok(policy)
    }

    /// Resolve from the real process environment and executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the data directories cannot be created.
    pub fn from_process_env() -> Result<Self> {
        Self::resolve(&ProcessEnv, &HostContext::detect())
    }

    /// Replace the network fallback permission.
    #[must_use]
    pub fn with_network_fallback(mut self, allow: bool) -> Self {
        self.allow_network_fallback = allow;
        self
    }

    /// Whether standalone mode is active.
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Bundled artifacts directory, if one was found.
    #[must_use]
    pub fn bundled_dir(&self) -> Option<&Path> {
        self.bundled_dir.as_deref()
    }

    /// Bundled helper runtime executable, if one was found.
    #[must_use]
    pub fn bundled_runtime(&self) -> Option<&Path> {
        self.bundled_runtime.as_deref()
    }

    /// Whether a missing bundle may fall back to downloading.
    #[must_use]
    pub fn allows_network_fallback(&self) -> bool {
        self.allow_network_fallback
    }

    /// Top-level data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Static resources directory.
    #[must_use]
    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Overall operating mode.
    #[must_use]
    pub fn mode(&self) -> ProvisioningMode {
        match (self.standalone, &self.bundled_dir, self.allow_network_fallback) {
            (false, _, _) => ProvisioningMode::Networked,
            (true, Some(_), _) => ProvisioningMode::StandaloneBundled,
            (true, None, true) => ProvisioningMode::StandaloneFallback,
            (true, None, false) => ProvisioningMode::StandaloneStrict,
        }
    }

    /// Decide where dependency `id` comes from on `platform`.
    ///
    /// Outside standalone mode the answer is always the network. In
    /// standalone mode a `<bundled_dir>/<id>` directory wins; without one
    /// the network is used only if fallback is permitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StrictOffline`] when standalone mode finds no bundle
    /// for `id` and fallback is disabled.
    pub fn source_for(&self, id: &str, platform: &str) -> Result<ProvisioningSource> {
        if !self.standalone {
            return Ok(ProvisioningSource::Network);
        }

        let candidate = self.bundled_dir.as_ref().map(|dir| dir.join(id));
        if let Some(dir) = &candidate
            && dir.is_dir()
        {
            debug!(%id, bundled = ?dir, "Using bundled runtime dependency");
            return Ok(ProvisioningSource::Bundled(dir.clone()));
        }

        if self.allow_network_fallback {
            warn!(%id, %platform, "No bundled copy found in standalone mode; falling back to download");
            return Ok(ProvisioningSource::Network);
        }

        Err(Error::StrictOffline {
            id: id.to_string(),
            platform: platform.to_string(),
            searched: candidate.into_iter().collect(),
        })
    }
}

/// Locate the bundled artifacts directory.
#[must_use]
pub fn resolve_bundled_dir(env: &dyn EnvSource, host: &HostContext) -> Option<PathBuf> {
    if let Some(dir) = env.var(BUNDLED_DIR_ENV).filter(|v| !v.is_empty()) {
        let dir = PathBuf::from(dir);
        if dir.is_dir() {
            return Some(dir);
        }
        warn!(path = ?dir, "{BUNDLED_DIR_ENV} does not name an existing directory; ignoring");
    }

    let dir = host.packaged_exe_dir.as_ref()?.join(BUNDLED_DIR_NAME);
    dir.is_dir().then_some(dir)
}

/// Locate the bundled helper runtime executable.
#[must_use]
pub fn resolve_bundled_runtime(env: &dyn EnvSource, host: &HostContext) -> Option<PathBuf> {
    if let Some(path) = env.var(BUNDLED_RUNTIME_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        warn!(path = ?path, "{BUNDLED_RUNTIME_ENV} does not name an existing file; ignoring");
    }

    let path = host
        .packaged_exe_dir
        .as_ref()?
        .join(RUNTIME_DIR_NAME)
        .join(host.runtime_executable());
    path.is_file().then_some(path)
}
