use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canprims_frame::{FrameConfig, FrameError, FrameReader};
use canprims_transport::{CanSocket, CanSocketOptions};
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// How long a blocked read waits before rechecking for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let options = socket_options(&args);
    let socket = CanSocket::open_with_options(&args.interface, &options)
        .map_err(|err| transport_error("open failed", err))?;
    info!(
        interface = %args.interface,
        if_index = socket.if_index(),
        fd = options.fd_frames,
        "listening"
    );

    let config = FrameConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config_socket(socket, config)
        .map_err(|err| frame_error("socket setup failed", err))?;

    let cancel = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(cancel.clone())?;

    let mut printed = 0usize;

    loop {
        let frame = match reader.read_frame_cancellable(&cancel) {
            Ok(frame) => frame,
            Err(FrameError::Cancelled) => break,
            // Already logged by the reader; keep listening.
            Err(FrameError::InvalidFrameLength { .. }) => continue,
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        if let Some(ids) = &args.ids {
            if !ids.contains(&frame.id()) {
                continue;
            }
        }

        print_frame(&frame, &args.interface, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    debug!(printed, "listen finished");
    Ok(SUCCESS)
}

fn socket_options(args: &ListenArgs) -> CanSocketOptions {
    CanSocketOptions {
        loopback: !args.no_loopback,
        receive_own_messages: args.receive_own,
        fd_frames: args.fd,
    }
}

fn install_ctrlc_handler(cancel: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
