use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod resolve;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print frames received on an interface.
    Listen(ListenArgs),
    /// Send a single frame in compact `ID#DATA` form.
    Send(SendArgs),
    /// Print the kernel index of an interface.
    Resolve(ResolveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// CAN interface to bind (e.g. can0, vcan0).
    pub interface: String,
    /// Accept CAN FD frames as well as classic ones.
    #[arg(long)]
    pub fd: bool,
    /// Filter to specific identifiers (comma-separated hex, e.g. 123,18DAF110).
    #[arg(long, value_delimiter = ',', value_parser = parse_hex_id)]
    pub ids: Option<Vec<u32>>,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Also receive frames sent by this socket.
    #[arg(long)]
    pub receive_own: bool,
    /// Do not receive frames sent by other local sockets.
    #[arg(long)]
    pub no_loopback: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// CAN interface to send on.
    pub interface: String,
    /// Frame in compact form: 123#DEADBEEF, 12345678#R, 123##1AABB (FD).
    pub frame: String,
    /// Enable CAN FD on the socket. Implied by an FD frame.
    #[arg(long)]
    pub fd: bool,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Interface name to look up.
    pub interface: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_hex_id(input: &str) -> Result<u32, String> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid CAN id {input:?}: expected hex digits"));
    }
    let id = u32::from_str_radix(digits, 16)
        .map_err(|err| format!("invalid CAN id {input:?}: {err}"))?;
    if id > canprims_frame::EFF_MASK {
        return Err(format!("CAN id {input} exceeds 29 bits"));
    }
    Ok(id)
}
