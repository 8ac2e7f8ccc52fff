//! Generate the libvirt domain XML with `virt-install --print-xml`.
//!
//! Nothing is applied here; `virt-install` only synthesizes the document and
//! [`crate::registrar`] hands it to libvirt.

use anyhow::{bail, Result};
use std::path::Path;

use crate::process::{Cmd, Runner};

/// Disk bus modifier appended when virtio disk is requested.
pub const VIRTIO_DISK_SUFFIX: &str = "bus=virtio";
/// NIC model modifier appended when virtio network is requested.
pub const VIRTIO_NET_SUFFIX: &str = "model=virtio";

/// `--disk` value: the image path, optionally on the virtio bus.
pub fn disk_option(disk: &Path, virtio: bool) -> String {
    let mut option = disk.display().to_string();
    if virtio {
        option.push(',');
        option.push_str(VIRTIO_DISK_SUFFIX);
    }
    option
}

/// `--network` value: the operator's spec, optionally with a virtio NIC.
pub fn network_option(network: &str, virtio: bool) -> String {
    let mut option = network.to_string();
    if virtio {
        option.push(',');
        option.push_str(VIRTIO_NET_SUFFIX);
    }
    option
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionParams {
    pub name: String,
    pub memory_mb: u32,
    pub vcpus: u32,
    /// Fully assembled `--disk` value.
    pub disk: String,
    /// Fully assembled `--network` value.
    pub network: String,
    pub os_variant: String,
}

/// Generated domain document. Opaque; only ever written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDefinition {
    pub xml: Vec<u8>,
}

fn virt_install_cmd(params: &DefinitionParams) -> Cmd {
    Cmd::new("virt-install")
        .args(["--name", &params.name])
        .args(["--memory", &params.memory_mb.to_string()])
        .args(["--vcpus", &params.vcpus.to_string()])
        .args(["--disk", &params.disk])
        .arg("--import")
        .args(["--os-variant", &params.os_variant])
        .args(["--network", &params.network])
        .arg("--print-xml")
}

/// Run `virt-install` in print-only mode and capture the XML it emits.
///
/// On failure the error carries the exact command line, since this is the
/// invocation most likely to be misconfigured.
pub fn generate(runner: &dyn Runner, params: &DefinitionParams) -> Result<DomainDefinition> {
    let output = virt_install_cmd(params)
        .error_msg("failed to generate VM XML")
        .show_command()
        .run(runner)?;

    if output.stdout.iter().all(u8::is_ascii_whitespace) {
        bail!(
            "virt-install produced no definition\nCommand: {}",
            output.command
        );
    }

    Ok(DomainDefinition { xml: output.stdout })
}
