use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use canprims_frame::{CanFrame, CANFD_BRS, CANFD_ESI};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    interface: &'a str,
    id: String,
    extended: bool,
    rtr: bool,
    error: bool,
    fd: bool,
    fd_flags: u8,
    len: usize,
    data: String,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &CanFrame, interface: &'a str) -> Self {
        Self {
            interface,
            id: id_text(frame),
            extended: frame.is_extended(),
            rtr: frame.is_rtr(),
            error: frame.is_error(),
            fd: frame.is_fd(),
            fd_flags: frame.fd_flags(),
            len: frame.payload_len(),
            data: hex::encode_upper(frame.payload()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_frame(frame: &CanFrame, interface: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&FrameOutput::new(frame, interface))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["IFACE", "ID", "FLAGS", "LEN", "DATA"])
                .add_row(vec![
                    interface.to_string(),
                    id_text(frame),
                    flag_summary(frame),
                    frame.payload_len().to_string(),
                    spaced_hex(frame.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", pretty_line(frame, interface));
        }
        OutputFormat::Raw => {
            print_raw(frame.as_bytes());
        }
    }
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    interface: &'a str,
    if_index: i32,
}

pub fn print_resolved(interface: &str, if_index: i32, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&ResolveOutput {
                    interface,
                    if_index
                })
                .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["IFACE", "INDEX"])
                .add_row(vec![interface.to_string(), if_index.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{interface}: index {if_index}"),
        OutputFormat::Raw => println!("{if_index}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// candump-style line: `  can0  123   [4]  DE AD BE EF`.
fn pretty_line(frame: &CanFrame, interface: &str) -> String {
    let id = id_text(frame);
    let len = if frame.is_fd() {
        format!("[{:02}]", frame.payload_len())
    } else {
        format!("[{}]", frame.payload_len())
    };
    let body = if frame.is_rtr() {
        "remote request".to_string()
    } else {
        spaced_hex(frame.payload())
    };
    format!("  {interface}  {id:>8}   {len}  {body}")
}

fn id_text(frame: &CanFrame) -> String {
    if frame.is_extended() {
        format!("{:08X}", frame.id())
    } else {
        format!("{:03X}", frame.id())
    }
}

/// Flag letters: E extended, R remote, X error, F FD, B bit-rate switch, S ESI.
fn flag_summary(frame: &CanFrame) -> String {
    let mut flags = String::new();
    if frame.is_extended() {
        flags.push('E');
    }
    if frame.is_rtr() {
        flags.push('R');
    }
    if frame.is_error() {
        flags.push('X');
    }
    if frame.is_fd() {
        flags.push('F');
        if frame.fd_flags() & CANFD_BRS != 0 {
            flags.push('B');
        }
        if frame.fd_flags() & CANFD_ESI != 0 {
            flags.push('S');
        }
    }
    if flags.is_empty() {
        flags.push('-');
    }
    flags
}

fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
