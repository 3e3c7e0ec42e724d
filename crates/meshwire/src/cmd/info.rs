use crate::cmd::InfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_device, DeviceReport, OutputFormat};

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let (session, config_id) = args.device.connect()?;

    let report = DeviceReport {
        port: &args.device.port,
        config_id,
        identity: session.identity(),
        config: session.device_config(),
    };
    print_device(&report, format);

    session.close();
    Ok(SUCCESS)
}
