use canprims_frame::{CanFrame, FrameConfig, FrameWriter};
use canprims_transport::{CanSocket, CanSocketOptions};
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    // Reject bad input before touching the network.
    let frame = parse_frame(&args.frame)?;

    let options = CanSocketOptions {
        fd_frames: args.fd || frame.is_fd(),
        ..CanSocketOptions::default()
    };
    let socket = CanSocket::open_with_options(&args.interface, &options)
        .map_err(|err| transport_error("open failed", err))?;

    let mut writer = FrameWriter::with_config_socket(socket, FrameConfig::default())
        .map_err(|err| frame_error("socket setup failed", err))?;
    writer
        .write_frame(&frame)
        .map_err(|err| frame_error("send failed", err))?;

    info!(interface = %args.interface, frame = %frame, "sent");
    Ok(SUCCESS)
}

fn parse_frame(text: &str) -> CliResult<CanFrame> {
    text.parse::<CanFrame>()
        .map_err(|err| frame_error(&format!("invalid frame {text:?}"), err))
}
