//! The provisioning pipeline.
//!
//! ```text
//! Start → ToolsChecked → SourceValidated → DestinationClear
//!       → Materialized → (HostnameSet) → DefinitionGenerated → Registered → Done
//! ```
//!
//! Strictly linear. Any failure is terminal: nothing is retried and nothing
//! already done is rolled back. The domain is never defined unless every
//! earlier step succeeded.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ProvisionConfig;
use crate::definition::{self, DefinitionParams};
use crate::hostname;
use crate::materialize::{ImageMaterializer, MaterializeMethod};
use crate::preflight::{self, BASE_REQUIRED_TOOLS};
use crate::process::Runner;
use crate::registrar;
use crate::request::ProvisioningRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    ToolsChecked,
    SourceValidated,
    DestinationClear,
    Materialized,
    HostnameSet,
    DefinitionGenerated,
    Registered,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::ToolsChecked => "tools-checked",
            Stage::SourceValidated => "source-validated",
            Stage::DestinationClear => "destination-clear",
            Stage::Materialized => "materialized",
            Stage::HostnameSet => "hostname-set",
            Stage::DefinitionGenerated => "definition-generated",
            Stage::Registered => "registered",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub name: String,
    pub disk: PathBuf,
}

pub struct Provisioner<'a> {
    runner: &'a dyn Runner,
    materializer: &'a dyn ImageMaterializer,
    config: &'a ProvisionConfig,
    tool_search_path: Option<OsString>,
    temp_dir: PathBuf,
    stage: Stage,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        runner: &'a dyn Runner,
        materializer: &'a dyn ImageMaterializer,
        config: &'a ProvisionConfig,
    ) -> Self {
        Self {
            runner,
            materializer,
            config,
            tool_search_path: None,
            temp_dir: std::env::temp_dir(),
            stage: Stage::Start,
        }
    }

    /// Resolve required tools against this search path instead of `PATH`.
    pub fn tool_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.tool_search_path = Some(path.into());
        self
    }

    /// Directory for the transient definition file.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Last stage reached successfully.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every tool the run will invoke, as (command_name, package_name).
    pub fn required_tools(&self) -> Vec<(&'a str, &'a str)> {
        let escalation = self.config.escalation.as_str();
        std::iter::once((escalation, escalation))
            .chain(BASE_REQUIRED_TOOLS.iter().copied())
            .chain(self.materializer.required_tools().iter().copied())
            .collect()
    }

    pub fn run(&mut self, request: &ProvisioningRequest) -> Result<Provisioned> {
        self.stage = Stage::Start;
        request.validate()?;

        let tools = self.required_tools();
        match &self.tool_search_path {
            Some(path) => preflight::check_required_tools_in(&tools, path),
            None => preflight::check_required_tools(&tools),
        }?;
        self.advance(Stage::ToolsChecked);

        let source = preflight::resolve_source_image(&request.source_image)?;
        self.advance(Stage::SourceValidated);

        let disk = request.destination(&self.config.images_dir);
        preflight::ensure_destination_clear(&disk)?;
        preflight::ensure_domain_absent(self.runner, &request.name)?;
        self.advance(Stage::DestinationClear);

        self.materialize(&source, &disk)?;
        self.advance(Stage::Materialized);

        if self.stamp_hostname(request, &disk)? {
            self.advance(Stage::HostnameSet);
        }

        let params = DefinitionParams {
            name: request.name.clone(),
            memory_mb: request.memory_mb,
            vcpus: request.vcpus,
            disk: definition::disk_option(&disk, request.virtio_disk),
            network: definition::network_option(&request.network, request.virtio_network),
            os_variant: self.config.os_variant.clone(),
        };
        let domain = definition::generate(self.runner, &params)?;
        self.advance(Stage::DefinitionGenerated);

        registrar::register_in(self.runner, &domain, &self.temp_dir)?;
        self.advance(Stage::Registered);

        println!("VM '{}' registered successfully", request.name);
        self.advance(Stage::Done);

        Ok(Provisioned {
            name: request.name.clone(),
            disk,
        })
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    fn materialize(&self, source: &Path, disk: &Path) -> Result<()> {
        let method = self.materializer.method();
        tracing::debug!(%method, source = %source.display(), "materializing disk");
        match method {
            MaterializeMethod::Convert => {
                println!("Creating independent image file at {}...", disk.display());
                self.materializer
                    .materialize(self.runner, source, disk)
                    .context("Failed to create independent image file")?;
                println!("Independent image file created successfully.");
            }
            MaterializeMethod::RawCopy => {
                println!("Copying image file to {}...", disk.display());
                self.materializer
                    .materialize(self.runner, source, disk)
                    .context("Failed to copy image file")?;
                println!("Image file copied successfully.");
            }
        }
        Ok(())
    }

    /// Returns whether the hostname was stamped.
    fn stamp_hostname(&self, request: &ProvisioningRequest, disk: &Path) -> Result<bool> {
        if self.materializer.method() != MaterializeMethod::Convert {
            return Ok(false);
        }
        if request.skip_hostname {
            println!("Skipping hostname change as requested.");
            return Ok(false);
        }

        println!("Setting VM hostname to {}...", request.name);
        hostname::set_hostname(self.runner, disk, &request.name)
            .context("Failed to set VM hostname")?;
        println!("VM hostname set successfully.");
        Ok(true)
    }
}
