//! Register a libvirt domain from an existing disk image.
//!
//! Everything substantive is delegated to host tools; this crate validates,
//! sequences, and fails fast:
//!
//! - **Preflight** - Host tools, source image, destination and domain collisions
//! - **Materialize** - Independent copy of the image (`qemu-img convert` or `dd`)
//! - **Hostname** - Optional `virt-customize --hostname` on the copy
//! - **Definition** - Domain XML from `virt-install --print-xml`
//! - **Registrar** - `virsh define` from a scoped temp file
//!
//! # Architecture
//!
//! ```text
//! vm-register / vm-register-raw (binaries)
//!     │
//!     ├── cli: flags → ProvisioningRequest
//!     └── pipeline::Provisioner
//!             │
//!             ├── preflight
//!             ├── dyn ImageMaterializer (Convert | RawCopy)
//!             ├── hostname (convert only)
//!             ├── definition
//!             └── registrar
//!
//! every subprocess → dyn Runner (PrivilegedRunner<SystemRunner> in production)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use vm_register::config::ProvisionConfig;
//! use vm_register::materialize::ConvertMaterializer;
//! use vm_register::pipeline::Provisioner;
//! use vm_register::process::{PrivilegedRunner, SystemRunner};
//! use vm_register::request::ProvisioningRequest;
//!
//! let config = ProvisionConfig::load()?;
//! let runner = PrivilegedRunner::new(SystemRunner, config.escalation.clone());
//! let request = ProvisioningRequest::new("web01", "/srv/images/debian-12.qcow2");
//! Provisioner::new(&runner, &ConvertMaterializer, &config).run(&request)?;
//! ```

pub mod cli;
pub mod config;
pub mod definition;
pub mod error;
pub mod hostname;
pub mod logging;
pub mod materialize;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod registrar;
pub mod request;

pub use error::ProvisionError;
pub use materialize::{ImageMaterializer, MaterializeMethod};
pub use pipeline::{Provisioned, Provisioner, Stage};
pub use request::ProvisioningRequest;
