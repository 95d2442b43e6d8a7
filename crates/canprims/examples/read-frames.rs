//! Print every frame seen on an interface until interrupted.
//!
//! Run with:
//!   sudo ip link add dev vcan0 type vcan && sudo ip link set up vcan0
//!   cargo run --example read-frames -- vcan0
//!
//! In another terminal:
//!   cargo run --features cli -- send vcan0 123#DEADBEEF

use canprims::frame::FrameReader;
use canprims::transport::{CanSocket, CanSocketOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ifname = std::env::args().nth(1).unwrap_or_else(|| "vcan0".to_string());

    let socket = CanSocket::open_with_options(&ifname, &CanSocketOptions::fd())?;
    eprintln!("Listening on {ifname} (index {})", socket.if_index());

    let mut reader = FrameReader::new(socket);
    loop {
        let frame = reader.read_frame()?;
        println!("{ifname}  {frame}");
    }
}
