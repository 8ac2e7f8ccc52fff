use anyhow::Result;
use vm_register::cli::{parse_or_exit, RawCopyArgs};
use vm_register::config::ProvisionConfig;
use vm_register::materialize::RawCopyMaterializer;
use vm_register::pipeline::Provisioner;
use vm_register::process::{PrivilegedRunner, SystemRunner};

fn main() -> Result<()> {
    vm_register::logging::init();

    let args: RawCopyArgs = parse_or_exit(std::env::args_os());
    let request = args.into_request();

    let config = ProvisionConfig::load()?;
    let runner = PrivilegedRunner::new(SystemRunner, config.escalation.clone());
    let materializer = RawCopyMaterializer::new(config.block_size.clone());

    Provisioner::new(&runner, &materializer, &config).run(&request)?;
    Ok(())
}
