//! Runtime dependency provisioning for rigging.
//!
//! A host application declares the external executables it needs (language
//! servers, formatters, runtimes) as [`RuntimeDependency`] descriptors. This
//! crate:
//!
//! - merges operator overrides into the declared set ([`DependencyRegistry`]);
//! - answers platform-filtered queries and computes binary paths;
//! - installs descriptors through pluggable [`ArchiveFetcher`] and
//!   [`CommandRunner`] implementations;
//! - decides, per dependency, between pre-bundled artifacts and a network
//!   download ([`ProvisioningPolicy`], [`Provisioner`]).
//!
//! Production fetcher and runner implementations live in
//! `rigging-tools-archive` and `rigging-tools-process`.

pub mod config;
pub mod dependency;
pub mod error;
pub mod install;
pub mod paths;
pub mod platform;
pub mod policy;
pub mod provisioner;
pub mod registry;

pub use config::OverrideSet;
pub use dependency::{
    ANY_PLATFORM, ArchiveKind, DependencyCommand, DependencyKey, DependencyOverride,
    PLATFORM_AGNOSTIC, PackageRef, RuntimeDependency,
};
pub use error::{Error, Result};
pub use install::{
    ArchiveFetcher, CommandOutcome, CommandOutput, CommandRunner, FetchRequest,
    InstallReport, InstalledDependency,
};
pub use platform::{Arch, FixedPlatform, HostPlatform, Os, Platform, PlatformProvider};
pub use policy::{
    EnvSource, HostContext, ProcessEnv, ProvisioningMode, ProvisioningPolicy,
    ProvisioningSource,
};
pub use provisioner::{ProvisionReport, Provisioner};
pub use registry::DependencyRegistry;
