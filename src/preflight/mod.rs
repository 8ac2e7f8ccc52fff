//! Preflight checks run before anything touches disk or libvirt.
//!
//! Validates the host tools, the source image, and that neither the
//! destination image nor the domain name is already taken.
//!
//! # Example
//!
//! ```rust,ignore
//! use vm_register::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists("virsh") {
//!     println!("libvirt client not installed");
//! }
//!
//! let tools = &[("virsh", "libvirt-clients"), ("qemu-img", "qemu-utils")];
//! check_required_tools(tools)?;
//! ```

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{MissingTool, ProvisionError};
use crate::process::{Cmd, Runner};

/// Tools every variant needs. Each tuple is (command_name, package_name).
pub const BASE_REQUIRED_TOOLS: &[(&str, &str)] =
    &[("virt-install", "virt-install"), ("virsh", "libvirt-clients")];

/// Check if a command resolves on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check if a command resolves on an explicit search path.
pub fn command_exists_in(cmd: &str, search_path: &OsStr) -> bool {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    which::which_in(cmd, Some(search_path), cwd).is_ok()
}

/// Check that specific tools are available.
///
/// Every unresolved tool is reported, not just the first.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    check_tools_with(tools, command_exists)
}

/// Same as [`check_required_tools`] against a given search path.
pub fn check_required_tools_in(tools: &[(&str, &str)], search_path: &OsStr) -> Result<()> {
    check_tools_with(tools, |cmd| command_exists_in(cmd, search_path))
}

fn check_tools_with(tools: &[(&str, &str)], exists: impl Fn(&str) -> bool) -> Result<()> {
    let missing: Vec<MissingTool> = tools
        .iter()
        .filter(|(tool, _)| !exists(*tool))
        .map(|(tool, package)| MissingTool {
            command: tool.to_string(),
            package: package.to_string(),
        })
        .collect();

    if !missing.is_empty() {
        return Err(ProvisionError::MissingTools(missing).into());
    }

    Ok(())
}

/// Resolve the source image to an absolute path and make sure it exists.
pub fn resolve_source_image(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to get absolute path for '{}'", path.display()))?;

    if !absolute.exists() {
        return Err(ProvisionError::SourceMissing(absolute).into());
    }

    Ok(absolute)
}

/// Refuse to run if the destination image is already there. Never overwrite.
pub fn ensure_destination_clear(destination: &Path) -> Result<()> {
    if destination.symlink_metadata().is_ok() {
        return Err(ProvisionError::DestinationExists(destination.to_path_buf()).into());
    }
    Ok(())
}

/// Ask libvirt whether a domain is registered.
///
/// Any non-zero exit from `virsh dominfo` (including an unreachable daemon)
/// counts as "not registered".
pub fn domain_exists(runner: &dyn Runner, name: &str) -> Result<bool> {
    let output = Cmd::new("virsh")
        .args(["dominfo", name])
        .allow_fail()
        .run(runner)?;

    if !output.success() {
        tracing::debug!(
            domain = name,
            code = ?output.code,
            "dominfo query failed; treating domain as absent"
        );
    }

    Ok(output.success())
}

/// Fail if a domain with this name is already registered.
pub fn ensure_domain_absent(runner: &dyn Runner, name: &str) -> Result<()> {
    if domain_exists(runner, name)? {
        return Err(ProvisionError::DomainExists(name.to_string()).into());
    }
    Ok(())
}
