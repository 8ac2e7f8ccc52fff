//! What the operator asked for, fixed once the command line is parsed.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_MEMORY_MB: u32 = 1024;
pub const DEFAULT_VCPUS: u32 = 1;
pub const DEFAULT_NETWORK: &str = "network=default";

/// Disk image extension used for every materialized copy.
pub const IMAGE_EXTENSION: &str = "qcow2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub name: String,
    pub source_image: PathBuf,
    pub memory_mb: u32,
    pub vcpus: u32,
    /// `virt-install --network` value before any model modifier.
    pub network: String,
    pub virtio_disk: bool,
    pub virtio_network: bool,
    /// Do not stamp the VM name into the guest image.
    pub skip_hostname: bool,
}

impl ProvisioningRequest {
    pub fn new(name: impl Into<String>, source_image: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_image: source_image.into(),
            memory_mb: DEFAULT_MEMORY_MB,
            vcpus: DEFAULT_VCPUS,
            network: DEFAULT_NETWORK.to_string(),
            virtio_disk: false,
            virtio_network: false,
            skip_hostname: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("VM name must not be empty");
        }
        if self.name.contains('/') {
            bail!("VM name '{}' must not contain '/'", self.name);
        }
        if self.source_image.as_os_str().is_empty() {
            bail!("image path must not be empty");
        }
        if self.memory_mb == 0 {
            bail!("memory must be at least 1 MB");
        }
        if self.vcpus == 0 {
            bail!("vcpus must be at least 1");
        }
        if self.network.trim().is_empty() {
            bail!("network spec must not be empty");
        }
        Ok(())
    }

    /// `<images_dir>/<name>.qcow2`
    pub fn destination(&self, images_dir: &Path) -> PathBuf {
        images_dir.join(format!("{}.{}", self.name, IMAGE_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_path() {
        let request = ProvisioningRequest::new("web01", "/tmp/base.qcow2");
        assert_eq!(
            request.destination(Path::new("/var/lib/libvirt/images")),
            PathBuf::from("/var/lib/libvirt/images/web01.qcow2")
        );
    }

    #[test]
    fn test_defaults() {
        let request = ProvisioningRequest::new("web01", "base.img");
        assert_eq!(request.memory_mb, 1024);
        assert_eq!(request.vcpus, 1);
        assert_eq!(request.network, "network=default");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut request = ProvisioningRequest::new("../etc/x", "base.img");
        assert!(request.validate().is_err());

        request.name = "ok".into();
        request.vcpus = 0;
        assert!(request.validate().is_err());

        request.vcpus = 2;
        request.memory_mb = 0;
        assert!(request.validate().is_err());
    }
}
