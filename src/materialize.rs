//! Producing the VM's own copy of the source image.
//!
//! Two strategies share one trait:
//! - [`ConvertMaterializer`] rewrites the source into a standalone qcow2 with
//!   `qemu-img convert`, so the source can later be deleted or reused.
//! - [`RawCopyMaterializer`] byte-copies with `dd`, streaming progress to the
//!   console since these copies take a while.
//!
//! Neither cleans up a partial destination on failure. Preflight has already
//! guaranteed nothing was there before.

use anyhow::Result;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use crate::process::{Cmd, Runner};

/// Which strategy a binary uses. Fixed per binary, never switched mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeMethod {
    Convert,
    RawCopy,
}

impl fmt::Display for MaterializeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterializeMethod::Convert => write!(f, "convert"),
            MaterializeMethod::RawCopy => write!(f, "raw-copy"),
        }
    }
}

pub trait ImageMaterializer {
    fn method(&self) -> MaterializeMethod;

    /// Host tools this strategy invokes, as (command_name, package_name).
    fn required_tools(&self) -> &'static [(&'static str, &'static str)];

    /// Create `destination` from `source`. Blocks until the tool exits.
    fn materialize(&self, runner: &dyn Runner, source: &Path, destination: &Path) -> Result<()>;
}

/// Tools needed by the convert variant. `virt-customize` is listed because
/// that variant may stamp a hostname afterwards.
const CONVERT_TOOLS: &[(&str, &str)] = &[
    ("qemu-img", "qemu-utils"),
    ("virt-customize", "guestfs-tools"),
];

const RAW_COPY_TOOLS: &[(&str, &str)] = &[("dd", "coreutils")];

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertMaterializer;

impl ImageMaterializer for ConvertMaterializer {
    fn method(&self) -> MaterializeMethod {
        MaterializeMethod::Convert
    }

    fn required_tools(&self) -> &'static [(&'static str, &'static str)] {
        CONVERT_TOOLS
    }

    fn materialize(&self, runner: &dyn Runner, source: &Path, destination: &Path) -> Result<()> {
        Cmd::new("qemu-img")
            .args(["convert", "-O", "qcow2"])
            .arg_path(source)
            .arg_path(destination)
            .error_msg("failed to create independent image")
            .run(runner)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RawCopyMaterializer {
    block_size: String,
}

impl RawCopyMaterializer {
    pub fn new(block_size: impl Into<String>) -> Self {
        Self {
            block_size: block_size.into(),
        }
    }
}

impl ImageMaterializer for RawCopyMaterializer {
    fn method(&self) -> MaterializeMethod {
        MaterializeMethod::RawCopy
    }

    fn required_tools(&self) -> &'static [(&'static str, &'static str)] {
        RAW_COPY_TOOLS
    }

    fn materialize(&self, runner: &dyn Runner, source: &Path, destination: &Path) -> Result<()> {
        Cmd::new("dd")
            .arg(operand("if=", source))
            .arg(operand("of=", destination))
            .arg(format!("bs={}", self.block_size))
            .arg("status=progress")
            .inherit_stdio()
            .error_msg("failed to copy image")
            .run(runner)?;
        Ok(())
    }
}

/// `dd` operand such as `if=<path>`, kept byte-exact for non-UTF-8 paths.
fn operand(key: &str, path: &Path) -> OsString {
    let mut operand = OsString::from(key);
    operand.push(path);
    operand
}
