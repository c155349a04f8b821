use nucleolink_transport::list_ports;
use tracing::debug;

use crate::cmd::PortsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_ports, OutputFormat};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = list_ports();
    debug!(count = ports.len(), "serial ports enumerated");
    if ports.is_empty() && format != OutputFormat::Json {
        eprintln!("no serial ports found");
        return Ok(SUCCESS);
    }
    print_ports(&ports, format);
    Ok(SUCCESS)
}
