use canprims_transport::CanSocket;
use tracing::debug;

use crate::cmd::ResolveArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_resolved, OutputFormat};

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let if_index =
        CanSocket::resolve(&args.interface).map_err(|err| transport_error("resolve failed", err))?;
    debug!(interface = %args.interface, if_index, "resolved");
    print_resolved(&args.interface, if_index, format);
    Ok(SUCCESS)
}
