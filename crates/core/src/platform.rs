//! Platform identification.
//!
//! Runtime dependencies are published per host platform. A platform is
//! identified by a canonical tag such as `linux-x64` or `osx-arm64`; the
//! [`PlatformProvider`] trait is the seam through which the registry learns
//! the tag of the current process.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Get the current platform.
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: Os::current(),
            arch: Arch::current(),
        }
    }

    /// Parse from a tag like "linux-x64" or "darwin-aarch64".
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (os, arch) = s.split_once('-')?;
        if arch.contains('-') {
            return None;
        }
        Some(Self {
            os: Os::parse(os)?,
            arch: Arch::parse(arch)?,
        })
    }

    /// Whether this is a Windows host.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux.
    Linux,
    /// macOS.
    Osx,
    /// Windows.
    Windows,
}

impl Os {
    /// Get the current OS.
    #[must_use]
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        return Self::Osx;
        #[cfg(target_os = "linux")]
        return Self::Linux;
        #[cfg(target_os = "windows")]
        return Self::Windows;
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        compile_error!("Unsupported OS");
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "osx" | "darwin" | "macos" => Some(Self::Osx),
            "win" | "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Osx => write!(f, "osx"),
            Self::Windows => write!(f, "win"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86.
    X64,
    /// 64-bit ARM.
    Arm64,
}

impl Arch {
    /// Get the current architecture.
    #[must_use]
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        return Self::Arm64;
        #[cfg(target_arch = "x86_64")]
        return Self::X64;
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
        compile_error!("Unsupported architecture");
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Some(Self::X64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X64 => write!(f, "x64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Source of the current platform tag.
///
/// Consulted on every current-platform query rather than once at registry
/// construction.
pub trait PlatformProvider: Send + Sync {
    /// Canonical tag of the current platform.
    fn current_platform_tag(&self) -> String;
}

/// Reports the platform this process was compiled for.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl PlatformProvider for HostPlatform {
    fn current_platform_tag(&self) -> String {
        Platform::current().to_string()
    }
}

/// Always reports the same tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPlatform(String);

impl FixedPlatform {
    /// Create a provider that reports `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl From<Platform> for FixedPlatform {
    fn from(platform: Platform) -> Self {
        Self(platform.to_string())
    }
}

impl PlatformProvider for FixedPlatform {
    fn current_platform_tag(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        let p = Platform::parse("osx-arm64").unwrap();
        assert_eq!(p.os, Os::Osx);
        assert_eq!(p.arch, Arch::Arm64);

        let p = Platform::parse("linux-x64").unwrap();
        assert_eq!(p.os, Os::Linux);
        assert_eq!(p.arch, Arch::X64);

        assert!(Platform::parse("invalid").is_none());
    }

    #[test]
    fn test_platform_parse_aliases() {
        assert_eq!(
            Platform::parse("darwin-aarch64"),
            Some(Platform::new(Os::Osx, Arch::Arm64))
        );
        assert_eq!(
            Platform::parse("windows-amd64"),
            Some(Platform::new(Os::Windows, Arch::X64))
        );
        assert_eq!(
            Platform::parse("Linux-X86_64"),
            Some(Platform::new(Os::Linux, Arch::X64))
        );
    }

    #[test]
    fn test_platform_parse_edge_cases() {
        assert!(Platform::parse("linux").is_none());
        assert!(Platform::parse("linux-x64-extra").is_none());
        assert!(Platform::parse("").is_none());
        assert!(Platform::parse("freebsd-x64").is_none());
        assert!(Platform::parse("linux-mips").is_none());
        assert!(Platform::parse("any").is_none());
    }

    #[test]
    fn test_platform_display_all_combinations() {
        let cases = [
            (Os::Linux, Arch::X64, "linux-x64"),
            (Os::Linux, Arch::Arm64, "linux-arm64"),
            (Os::Osx, Arch::X64, "osx-x64"),
            (Os::Osx, Arch::Arm64, "osx-arm64"),
            (Os::Windows, Arch::X64, "win-x64"),
            (Os::Windows, Arch::Arm64, "win-arm64"),
        ];
        for (os, arch, tag) in cases {
            let platform = Platform::new(os, arch);
            assert_eq!(platform.to_string(), tag);
            assert_eq!(Platform::parse(tag), Some(platform));
        }
    }

    #[test]
    fn test_platform_current_matches_host_provider() {
        let tag = HostPlatform.current_platform_tag();
        assert_eq!(Platform::parse(&tag), Some(Platform::current()));
        assert_eq!(Platform::current().is_windows(), cfg!(windows));
    }

    #[test]
    fn test_fixed_platform() {
        let provider = FixedPlatform::new("linux-arm64");
        assert_eq!(provider.current_platform_tag(), "linux-arm64");

        let provider = FixedPlatform::from(Platform::new(Os::Windows, Arch::X64));
        assert_eq!(provider.current_platform_tag(), "win-x64");
    }
}
