//! Build a frame field by field and send it.
//!
//! Run with:
//!   cargo run --example write-frame -- vcan0

use canprims::frame::{CanFrame, FrameWriter, CANFD_BRS};
use canprims::transport::{CanSocket, CanSocketOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ifname = std::env::args().nth(1).unwrap_or_else(|| "vcan0".to_string());
    let socket = CanSocket::open_with_options(&ifname, &CanSocketOptions::fd())?;
    let mut writer = FrameWriter::new(socket);

    // Classic frame with an 11-bit id.
    let mut classic = CanFrame::classic();
    classic.set_id(0x123);
    classic.set_payload(&[0xDE, 0xAD, 0xBE, 0xEF])?;
    writer.write_frame(&classic)?;
    eprintln!("sent {classic}");

    // Remote request with an extended id.
    let mut remote = CanFrame::classic();
    remote.set_id(0x18DA_F110);
    remote.set_extended(true);
    remote.set_rtr(true);
    writer.write_frame(&remote)?;
    eprintln!("sent {remote}");

    // FD frame with bit-rate switch, parsed from compact form.
    let mut fd: CanFrame = "7FF##0".parse()?;
    fd.set_fd_flags(CANFD_BRS);
    fd.set_payload(&[0x55; 32])?;
    writer.write_frame(&fd)?;
    eprintln!("sent {fd}");

    Ok(())
}
