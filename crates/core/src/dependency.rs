//! Runtime dependency descriptors and operator overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Explicit "runs anywhere" platform qualifier.
pub const ANY_PLATFORM: &str = "any";

/// Alternate spelling of [`ANY_PLATFORM`].
pub const PLATFORM_AGNOSTIC: &str = "platform-agnostic";

/// Whether a platform qualifier matches every platform.
///
/// An absent qualifier and the `any` / `platform-agnostic` sentinels are
/// unconstrained; everything else names one concrete platform.
#[must_use]
pub fn is_unconstrained(platform: Option<&str>) -> bool {
    platform.is_none_or(|p| {
        p.eq_ignore_ascii_case(ANY_PLATFORM) || p.eq_ignore_ascii_case(PLATFORM_AGNOSTIC)
    })
}

/// Archive format of a downloaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArchiveKind {
    /// Zip archive. Used when a descriptor declares no kind.
    #[default]
    Zip,
    /// Uncompressed tarball.
    Tar,
    /// Gzip-compressed tarball.
    GzipTar,
    /// A single gzip-compressed file.
    Gzip,
    /// The payload is the artifact itself.
    RawBinary,
}

impl ArchiveKind {
    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::GzipTar => "gzip-tar",
            Self::Gzip => "gzip",
            Self::RawBinary => "raw-binary",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "gzip-tar" | "gztar" | "tar.gz" | "tgz" => Ok(Self::GzipTar),
            "gzip" | "gz" => Ok(Self::Gzip),
            "raw-binary" | "binary" | "raw" => Ok(Self::RawBinary),
            other => Err(Error::configuration(format!(
                "unknown archive kind '{other}' (expected zip, tar, gzip-tar, gzip or raw-binary)"
            ))),
        }
    }
}

impl TryFrom<String> for ArchiveKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ArchiveKind> for String {
    fn from(kind: ArchiveKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Command executed in the install directory after placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyCommand {
    /// A single command line, passed to the shell as-is.
    Line(String),
    /// Program and arguments.
    Args(Vec<String>),
}

impl DependencyCommand {
    /// Render the command as one shell-invocable line.
    ///
    /// Argument sequences are quoted so that each element survives the
    /// shell as a single word.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an argument contains a NUL byte.
    pub fn to_shell_line(&self) -> Result<String> {
        match self {
            Self::Line(line) => Ok(line.clone()),
            Self::Args(args) => shlex::try_join(args.iter().map(String::as_str)).map_err(|e| {
                Error::configuration(format!("cannot quote command {args:?}: {e}"))
            }),
        }
    }
}

impl fmt::Display for DependencyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => f.write_str(line),
            Self::Args(args) => f.write_str(&args.join(" ")),
        }
    }
}

impl From<&str> for DependencyCommand {
    fn from(line: &str) -> Self {
        Self::Line(line.to_string())
    }
}

impl From<Vec<String>> for DependencyCommand {
    fn from(args: Vec<String>) -> Self {
        Self::Args(args)
    }
}

/// Package reference for installs mediated by a package manager (npm, pip, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

impl PackageRef {
    /// Create a package reference.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Registry key: logical id plus platform qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyKey {
    /// Logical id.
    pub id: String,
    /// Platform qualifier, `None` when unconstrained.
    pub platform: Option<String>,
}

impl DependencyKey {
    /// Create a key.
    #[must_use]
    pub fn new(id: impl Into<String>, platform: Option<&str>) -> Self {
        Self {
            id: id.into(),
            platform: platform.map(String::from),
        }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.platform {
            Some(platform) => write!(f, "'{}' on '{}'", self.id, platform),
            None => write!(f, "'{}' (no platform)", self.id),
        }
    }
}

/// One installable artifact for one platform, or for every platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDependency {
    /// Logical id shared by all platform variants of the same dependency.
    pub id: String,
    /// Platform tag, an unconstrained sentinel, or `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Archive format of the download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_kind: Option<ArchiveKind>,
    /// File name of the resulting binary inside the install directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_name: Option<String>,
    /// Command to run in the install directory after placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<DependencyCommand>,
    /// Package for package-manager-mediated installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageRef>,
    /// Sub-path inside the archive to extract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_path: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RuntimeDependency {
    /// Create an unconstrained descriptor with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform: None,
            url: None,
            archive_kind: None,
            binary_name: None,
            command: None,
            package: None,
            extract_path: None,
            description: None,
        }
    }

    /// Restrict to a platform tag (or a sentinel).
    #[must_use]
    pub fn for_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the download URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the archive kind.
    #[must_use]
    pub fn with_archive_kind(mut self, kind: ArchiveKind) -> Self {
        self.archive_kind = Some(kind);
        self
    }

    /// Set the binary file name.
    #[must_use]
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = Some(name.into());
        self
    }

    /// Set the post-placement command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<DependencyCommand>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the package reference.
    #[must_use]
    pub fn with_package(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.package = Some(PackageRef::new(name, version));
        self
    }

    /// Set the extraction sub-path.
    #[must_use]
    pub fn with_extract_path(mut self, path: impl Into<String>) -> Self {
        self.extract_path = Some(path.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The registry key of this descriptor.
    #[must_use]
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.id, self.platform.as_deref())
    }

    /// Whether this descriptor applies to every platform.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        is_unconstrained(self.platform.as_deref())
    }

    /// Whether this descriptor applies to `platform`.
    #[must_use]
    pub fn matches_platform(&self, platform: &str) -> bool {
        self.is_unconstrained() || self.platform.as_deref() == Some(platform)
    }

    /// Path of the installed artifact inside `dir`.
    ///
    /// Without a binary name the directory itself is the artifact (an SDK
    /// tree, for example). Pure path arithmetic; touches no filesystem.
    #[must_use]
    pub fn binary_path_in(&self, dir: &Path) -> PathBuf {
        match &self.binary_name {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        }
    }

    /// Short human-readable summary used in diagnostics.
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        if let Some(url) = &self.url {
            return url.clone();
        }
        if let Some(command) = &self.command {
            return format!("command `{command}`");
        }
        format!("id '{}'", self.id)
    }
}

/// Partial descriptor supplied by an operator after the base set is built.
///
/// Every non-key field is independently present or absent. Applied to an
/// existing descriptor, present fields replace the base values; applied to
/// a missing key, the override becomes a new descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyOverride {
    /// Logical id.
    pub id: String,
    /// Platform qualifier.
    #[serde(default)]
    pub platform: Option<String>,
    /// Replacement download URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Replacement archive kind.
    #[serde(default)]
    pub archive_kind: Option<ArchiveKind>,
    /// Replacement binary name.
    #[serde(default)]
    pub binary_name: Option<String>,
    /// Replacement command.
    #[serde(default)]
    pub command: Option<DependencyCommand>,
    /// Replacement package reference.
    #[serde(default)]
    pub package: Option<PackageRef>,
    /// Replacement extraction sub-path.
    #[serde(default)]
    pub extract_path: Option<String>,
    /// Replacement description.
    #[serde(default)]
    pub description: Option<String>,
}

impl DependencyOverride {
    /// Create an empty override for an unconstrained key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform: None,
            url: None,
            archive_kind: None,
            binary_name: None,
            command: None,
            package: None,
            extract_path: None,
            description: None,
        }
    }

    /// Key the override to a platform.
    #[must_use]
    pub fn for_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// The key this override targets.
    #[must_use]
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.id, self.platform.as_deref())
    }

    /// Overlay the present fields onto `base`.
    pub fn apply_to(&self, base: &mut RuntimeDependency) {
        let Self {
            id: _,
            platform: _,
            url,
            archive_kind,
            binary_name,
            command,
            package,
            extract_path,
            description,
        } = self;

        if let Some(url) = url {
            base.url = Some(url.clone());
        }
        if let Some(kind) = archive_kind {
            base.archive_kind = Some(*kind);
        }
        if let Some(name) = binary_name {
            base.binary_name = Some(name.clone());
        }
        if let Some(command) = command {
            base.command = Some(command.clone());
        }
        if let Some(package) = package {
            base.package = Some(package.clone());
        }
        if let Some(path) = extract_path {
            base.extract_path = Some(path.clone());
        }
        if let Some(description) = description {
            base.description = Some(description.clone());
        }
    }

    /// Turn the override into a standalone descriptor.
    #[must_use]
    pub fn into_dependency(self) -> RuntimeDependency {
        let Self {
            id,
            platform,
            url,
            archive_kind,
            binary_name,
            command,
            package,
            extract_path,
            description,
        } = self;

        RuntimeDependency {
            id,
            platform,
            url,
            archive_kind,
            binary_name,
            command,
            package,
            extract_path,
            description,
        }
    }
}
