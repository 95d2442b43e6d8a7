//! Async frame dump with Ctrl-C cancellation.
//!
//! Run with:
//!   cargo run --example async-dump --features async -- vcan0

use canprims::frame::{AsyncFrameReader, FrameError};
use canprims::transport::{AsyncCanSocket, CanSocketOptions};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ifname = std::env::args().nth(1).unwrap_or_else(|| "vcan0".to_string());
    let socket = AsyncCanSocket::open_with_options(&ifname, &CanSocketOptions::fd())?;
    let mut reader = AsyncFrameReader::new(socket);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut received = 0usize;
    loop {
        match reader.read_frame_cancellable(&cancel).await {
            Ok(frame) => {
                received += 1;
                println!("{ifname}  {frame}");
            }
            Err(FrameError::Cancelled) => break,
            Err(err) => return Err(err.into()),
        }
    }

    eprintln!("{received} frames");
    Ok(())
}
