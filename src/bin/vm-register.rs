use anyhow::Result;
use vm_register::cli::{parse_or_exit, ConvertArgs};
use vm_register::config::ProvisionConfig;
use vm_register::materialize::ConvertMaterializer;
use vm_register::pipeline::Provisioner;
use vm_register::process::{PrivilegedRunner, SystemRunner};

fn main() -> Result<()> {
    vm_register::logging::init();

    let args: ConvertArgs = parse_or_exit(std::env::args_os());
    let request = args.into_request();

    let config = ProvisionConfig::load()?;
    let runner = PrivilegedRunner::new(SystemRunner, config.escalation.clone());

    Provisioner::new(&runner, &ConvertMaterializer, &config).run(&request)?;
    Ok(())
}
