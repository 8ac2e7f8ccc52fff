//! Register a generated definition with libvirt via `virsh define`.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

use crate::definition::DomainDefinition;
use crate::process::{Cmd, Runner};

/// Write the definition to a `vm-*.xml` temp file in `dir`.
///
/// The file is closed before returning and removed when the returned
/// [`TempPath`] is dropped, whichever way the run ends.
pub fn write_definition(definition: &DomainDefinition, dir: &Path) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("vm-")
        .suffix(".xml")
        .tempfile_in(dir)
        .context("Failed to create temporary file")?;

    file.write_all(&definition.xml)
        .context("Failed to write to temporary file")?;
    file.flush().context("Failed to write to temporary file")?;

    Ok(file.into_temp_path())
}

pub fn define_domain(runner: &dyn Runner, definition_path: &Path) -> Result<()> {
    Cmd::new("virsh")
        .arg("define")
        .arg_path(definition_path)
        .error_msg("Failed to define VM")
        .show_command()
        .run(runner)?;
    Ok(())
}

/// Persist `definition` into libvirt's managed domains, staging the XML in a
/// temp file under `dir`.
pub fn register_in(runner: &dyn Runner, definition: &DomainDefinition, dir: &Path) -> Result<()> {
    let path = write_definition(definition, dir)?;
    tracing::debug!(path = %path.display(), "wrote domain definition");

    let result = define_domain(runner, &path);
    drop(path);
    result
}
