//! Stamp the VM name into the guest image as its hostname.
//!
//! Only the convert variant does this, and the operator can skip it for guests
//! `virt-customize` cannot handle (FreeBSD and friends). A failure leaves the
//! already-materialized image where it is.

use anyhow::Result;
use std::path::Path;

use crate::process::{Cmd, Runner};

pub fn set_hostname(runner: &dyn Runner, image: &Path, hostname: &str) -> Result<()> {
    Cmd::new("virt-customize")
        .arg("-a")
        .arg_path(image)
        .args(["--hostname", hostname])
        .error_msg("failed to set VM hostname")
        .run(runner)?;
    Ok(())
}
