//! Command-line surface for both binaries.
//!
//! Flags are spelled Go-style (`-image path`, `-memory=2048`); the usual
//! `--image` spelling works too.

use clap::{Args, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::request::{ProvisioningRequest, DEFAULT_MEMORY_MB, DEFAULT_NETWORK, DEFAULT_VCPUS};

/// Shared sizing flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SizingArgs {
    /// Memory size in MB
    #[arg(long, default_value_t = DEFAULT_MEMORY_MB, value_parser = clap::value_parser!(u32).range(1..))]
    pub memory: u32,

    /// Number of virtual CPUs
    #[arg(long, default_value_t = DEFAULT_VCPUS, value_parser = clap::value_parser!(u32).range(1..))]
    pub vcpus: u32,

    /// Network configuration for virt-install
    #[arg(long, default_value = DEFAULT_NETWORK)]
    pub network: String,
}

/// Register a VM from an independent qcow2 copy of an image.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vm-register", version, override_usage = "vm-register [options] <VM_NAME>")]
pub struct ConvertArgs {
    /// Name of the new VM (also its hostname and disk file name)
    #[arg(value_name = "VM_NAME")]
    pub name: String,

    /// Path to the VM image
    #[arg(long, required = true)]
    pub image: PathBuf,

    #[command(flatten)]
    pub sizing: SizingArgs,

    /// Skip hostname change (for FreeBSD or other unsupported OSes)
    #[arg(long)]
    pub no_hostname_change: bool,

    /// Use virtio for disk device
    #[arg(long)]
    pub virtio_disk: bool,

    /// Use virtio for network device
    #[arg(long)]
    pub virtio_network: bool,
}

impl ConvertArgs {
    pub fn into_request(self) -> ProvisioningRequest {
        ProvisioningRequest {
            name: self.name,
            source_image: self.image,
            memory_mb: self.sizing.memory,
            vcpus: self.sizing.vcpus,
            network: self.sizing.network,
            virtio_disk: self.virtio_disk,
            virtio_network: self.virtio_network,
            skip_hostname: self.no_hostname_change,
        }
    }
}

/// Register a VM from a raw byte copy of an image.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "vm-register-raw", version)]
pub struct RawCopyArgs {
    /// Path to the VM image
    #[arg(long, required = true)]
    pub image: PathBuf,

    /// Name of the new VM
    #[arg(long, required = true)]
    pub name: String,

    #[command(flatten)]
    pub sizing: SizingArgs,
}

impl RawCopyArgs {
    pub fn into_request(self) -> ProvisioningRequest {
        ProvisioningRequest {
            memory_mb: self.sizing.memory,
            vcpus: self.sizing.vcpus,
            network: self.sizing.network,
            ..ProvisioningRequest::new(self.name, self.image)
        }
    }
}

/// Long flags that consume the following argument as their value.
const VALUE_FLAGS: &[&str] = &["image", "memory", "vcpus", "network", "name"];

/// Rewrite `-flag` to `--flag` so clap accepts Go-style long flags.
///
/// Single-character flags (`-h`, `-V`), bare `-`, anything after `--`, values
/// that look like negative numbers, and the argument following a value flag
/// (`-image -base.img`) are left alone.
pub fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    let mut value_next = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if i == 0 || passthrough || value_next {
            value_next = false;
            out.push(arg);
            continue;
        }

        let rewritten = match arg.to_str() {
            Some("--") => {
                passthrough = true;
                None
            }
            Some(s) => {
                value_next = takes_separate_value(s);
                is_single_dash_long(s).then(|| OsString::from(format!("-{s}")))
            }
            None => None,
        };
        out.push(rewritten.unwrap_or(arg));
    }

    out
}

fn is_single_dash_long(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let flag = rest.split('=').next().unwrap_or_default();
    flag.len() > 1 && flag.starts_with(|c: char| c.is_ascii_alphabetic())
}

/// `-image` / `--image` without an inline `=value`.
fn takes_separate_value(arg: &str) -> bool {
    let flag = arg.trim_start_matches('-');
    arg.starts_with('-') && !flag.contains('=') && VALUE_FLAGS.contains(&flag)
}

/// Parse arguments, exiting with status 1 on usage errors (0 for help/version).
pub fn parse_or_exit<P: Parser>(args: impl IntoIterator<Item = OsString>) -> P {
    match P::try_parse_from(normalize_flags(args)) {
        Ok(parsed) => parsed,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}
