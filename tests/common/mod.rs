#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const SUDO: &str = r#"#!/bin/sh
exec "$@"
"#;

const QEMU_IMG: &str = r#"#!/bin/sh
echo "qemu-img $*" >> "$FAKE_DIR/calls.log"
if [ -n "$FAKE_FAIL_QEMU_IMG" ]; then
    echo "qemu-img: Could not open '$4'" >&2
    exit 1
fi
cp "$4" "$5"
"#;

const DD: &str = r#"#!/bin/sh
echo "dd $*" >> "$FAKE_DIR/calls.log"
for a in "$@"; do
    case "$a" in
        if=*) src="${a#if=}" ;;
        of=*) dst="${a#of=}" ;;
    esac
done
if [ -n "$FAKE_FAIL_DD" ]; then
    echo "dd: failed to open '$src': Permission denied" >&2
    exit 1
fi
echo "1048576 bytes copied" >&2
cp "$src" "$dst"
"#;

const VIRT_CUSTOMIZE: &str = r#"#!/bin/sh
echo "virt-customize $*" >> "$FAKE_DIR/calls.log"
if [ -n "$FAKE_FAIL_VIRT_CUSTOMIZE" ]; then
    echo "virt-customize: no operating systems were found" >&2
    exit 1
fi
"#;

const VIRT_INSTALL: &str = r#"#!/bin/sh
echo "virt-install $*" >> "$FAKE_DIR/calls.log"
if [ -n "$FAKE_FAIL_VIRT_INSTALL" ]; then
    echo "ERROR    Unknown OS name" >&2
    exit 1
fi
printf '<domain type="kvm"><name>%s</name></domain>\n' "$2"
"#;

const VIRSH: &str = r#"#!/bin/sh
echo "virsh $*" >> "$FAKE_DIR/calls.log"
case "$1" in
    dominfo)
        if [ -n "$FAKE_DOMAIN_EXISTS" ]; then
            echo "Name:           $2"
            exit 0
        fi
        echo "error: failed to get domain '$2'" >&2
        exit 1
        ;;
    define)
        if [ ! -f "$2" ]; then
            echo "error: Failed to open file '$2'" >&2
            exit 1
        fi
        echo "$2" > "$FAKE_DIR/defined-path"
        cat "$2" > "$FAKE_DIR/defined.xml"
        if [ -n "$FAKE_FAIL_DEFINE" ]; then
            echo "error: operation failed: domain already exists" >&2
            exit 1
        fi
        echo "Domain defined from $2"
        ;;
esac
"#;

pub const ALL_TOOLS: &[&str] = &[
    "sudo",
    "qemu-img",
    "dd",
    "virt-customize",
    "virt-install",
    "virsh",
];

/// A throwaway host: fake tools on PATH, an images dir, and a private TMPDIR.
pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["bin", "images", "tmp", "fake"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("base.img"), b"QFI\xfbsource image").unwrap();
        fs::write(
            root.join("config.toml"),
            format!("images_dir = \"{}\"\n", root.join("images").display()),
        )
        .unwrap();

        let sandbox = Self { temp };
        for tool in ALL_TOOLS {
            sandbox.install_tool(tool);
        }
        sandbox
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root().join("bin")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root().join("images")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root().join("tmp")
    }

    pub fn source_image(&self) -> PathBuf {
        self.root().join("base.img")
    }

    pub fn install_tool(&self, name: &str) {
        let script = match name {
            "sudo" => SUDO,
            "qemu-img" => QEMU_IMG,
            "dd" => DD,
            "virt-customize" => VIRT_CUSTOMIZE,
            "virt-install" => VIRT_INSTALL,
            "virsh" => VIRSH,
            other => panic!("no fake for {other}"),
        };
        let path = self.bin_dir().join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn remove_tool(&self, name: &str) {
        fs::remove_file(self.bin_dir().join(name)).unwrap();
    }

    /// Every fake tool invocation, one per line.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root().join("fake/calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn tmp_entries(&self) -> usize {
        fs::read_dir(self.tmp_dir()).unwrap().count()
    }

    /// Path of the definition file handed to `virsh define`, if it ran.
    pub fn defined_path(&self) -> Option<PathBuf> {
        fs::read_to_string(self.root().join("fake/defined-path"))
            .ok()
            .map(|s| PathBuf::from(s.trim()))
    }

    fn command(&self, bin_path: &str) -> Command {
        let mut cmd = Command::new(bin_path);
        cmd.timeout(Duration::from_secs(30));
        cmd.env(
            "PATH",
            format!("{}:/usr/bin:/bin", self.bin_dir().display()),
        )
        .env("TMPDIR", self.tmp_dir())
        .env("FAKE_DIR", self.root().join("fake"))
        .env("VM_REGISTER_CONFIG", self.root().join("config.toml"))
        .env_remove("VM_REGISTER_IMAGES_DIR")
        .env_remove("VM_REGISTER_OS_VARIANT")
        .env_remove("RUST_LOG");
        cmd
    }

    pub fn vm_register(&self) -> Command {
        self.command(env!("CARGO_BIN_EXE_vm-register"))
    }

    pub fn vm_register_raw(&self) -> Command {
        self.command(env!("CARGO_BIN_EXE_vm-register-raw"))
    }
}
