//! # Ghostscript Resolver
//!
//! Finds the Ghostscript executable once per process:
//! - Windows: `gswin64c`, then `gswin32c`, then fallback `gs`
//! - everything else: `gs`
//!
//! The resolved name is cached and injected into `GhostscriptTransformer`,
//! so it is never looked up again while a batch runs.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Name used when no candidate is found on PATH
pub const FALLBACK_BINARY: &str = "gs";

/// Platform-specific Ghostscript lookup
pub struct GhostscriptResolver {
    candidates: &'static [&'static str],
    search_path: Option<std::ffi::OsString>,
}

impl GhostscriptResolver {
    /// Create a resolver for the current platform, searching the process PATH
    pub fn new() -> Self {
        Self {
            candidates: Self::platform_candidates(),
            search_path: env::var_os("PATH"),
        }
    }

    /// Create a resolver with explicit candidates and search path
    pub fn with_search_path(candidates: &'static [&'static str], search_path: impl Into<std::ffi::OsString>) -> Self {
        Self {
            candidates,
            search_path: Some(search_path.into()),
        }
    }

    /// The process-wide resolved binary, computed on first use
    pub fn resolved() -> &'static Path {
        static RESOLVED: OnceLock<PathBuf> = OnceLock::new();
        RESOLVED.get_or_init(|| Self::new().resolve())
    }

    fn platform_candidates() -> &'static [&'static str] {
        if cfg!(windows) {
            &["gswin64c", "gswin32c", "gs"]
        } else {
            &["gs"]
        }
    }

    /// First candidate found on the search path, or the bare fallback name
    pub fn resolve(&self) -> PathBuf {
        match self.find_first() {
            Some(path) => {
                debug!("Using Ghostscript at {:?}", path);
                path
            }
            None => {
                warn!("Ghostscript not found on PATH, falling back to '{}'", FALLBACK_BINARY);
                PathBuf::from(FALLBACK_BINARY)
            }
        }
    }

    /// Whether any candidate exists on the search path
    pub fn is_available(&self) -> bool {
        self.find_first().is_some()
    }

    fn find_first(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find_map(|candidate| self.find_in_system_path(candidate))
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let extension = if cfg!(windows) { ".exe" } else { "" };
        let tool_with_ext = format!("{}{}", tool_name, extension);

        env::split_paths(self.search_path.as_ref()?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Resolve Ghostscript or explain how to install it
    pub fn check_with_instructions(&self) -> Result<PathBuf, String> {
        match self.find_first() {
            Some(path) => Ok(path),
            None => Err(format!(
                "Ghostscript was not found on PATH.\n{}",
                install_instructions(&HostInfo::detect())
            )),
        }
    }
}

impl Default for GhostscriptResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Operating system details used for install hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: &'static str,
    /// `ID=` from `/etc/os-release`, Linux only
    pub distro: Option<String>,
}

impl HostInfo {
    pub fn detect() -> Self {
        let distro = if cfg!(target_os = "linux") {
            std::fs::read_to_string("/etc/os-release")
                .ok()
                .and_then(|content| parse_os_release_id(&content))
        } else {
            None
        };

        Self {
            os: env::consts::OS,
            distro,
        }
    }
}

impl std::fmt::Display for HostInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.distro {
            Some(distro) => write!(f, "{} ({})", self.os, distro),
            None => write!(f, "{}", self.os),
        }
    }
}

fn parse_os_release_id(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("ID="))
        .map(|id| id.trim().trim_matches('"').to_string())
        .filter(|id| !id.is_empty())
}

/// Installation hint for Ghostscript on the given host
pub fn install_instructions(host: &HostInfo) -> String {
    match host.os {
        "linux" => {
            let manager = match host.distro.as_deref() {
                Some("ubuntu") | Some("debian") => "sudo apt install",
                Some("fedora") => "sudo dnf install",
                Some("arch") => "sudo pacman -S",
                _ => return "Please install the 'ghostscript' package with your package manager.".to_string(),
            };
            format!("Please run: {} ghostscript", manager)
        }
        "macos" => "Please run: brew install ghostscript".to_string(),
        "windows" => {
            "Please download and install Ghostscript (gswin64c) from the official website.".to_string()
        }
        _ => "Please install Ghostscript for your operating system.".to_string(),
    }
}
