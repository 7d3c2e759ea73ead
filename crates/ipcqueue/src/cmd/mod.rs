use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use ipcqueue::Timeout;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod limits;
#[cfg(target_os = "linux")]
pub mod posix;
#[cfg(target_os = "linux")]
pub mod sysv;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Work with POSIX priority queues.
    #[cfg(target_os = "linux")]
    Posix(PosixArgs),
    /// Work with System V typed queues.
    #[cfg(target_os = "linux")]
    Sysv(SysvArgs),
    /// Report kernel queue limits and probe both facilities.
    Limits(LimitsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        #[cfg(target_os = "linux")]
        Command::Posix(args) => posix::run(args.command, format),
        #[cfg(target_os = "linux")]
        Command::Sysv(args) => sysv::run(args.command, format),
        Command::Limits(args) => limits::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PosixArgs {
    #[command(subcommand)]
    pub command: PosixCommand,
}

#[derive(Subcommand, Debug)]
pub enum PosixCommand {
    /// Send one message, creating the queue if needed.
    Send(PosixSendArgs),
    /// Receive messages and print them.
    Recv(PosixRecvArgs),
    /// Show queue depth and capacities.
    Attr(PosixOpenArgs),
    /// Remove the queue name.
    Unlink(PosixNameArgs),
}

#[derive(Args, Debug)]
pub struct PosixNameArgs {
    /// Queue name, starting with '/'.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct PosixOpenArgs {
    /// Queue name, starting with '/'.
    pub name: String,
    /// Largest message, in bytes, when the queue is created.
    #[arg(long, default_value = "1024")]
    pub max_msg_size: usize,
    /// Queue depth when the queue is created.
    #[arg(long, default_value = "10")]
    pub max_messages: usize,
}

#[derive(Args, Debug)]
pub struct PosixSendArgs {
    #[command(flatten)]
    pub queue: PosixOpenArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Message priority; higher is delivered first.
    #[arg(long, short = 'p', default_value = "0")]
    pub priority: u32,
    /// How long to wait for room (forever, 0, 500ms, 2s, 1.5).
    #[arg(long, default_value = "forever")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct PosixRecvArgs {
    #[command(flatten)]
    pub queue: PosixOpenArgs,
    /// How long to wait for each message (forever, 0, 500ms, 2s, 1.5).
    #[arg(long, default_value = "forever")]
    pub timeout: String,
    /// Number of messages to receive.
    #[arg(long, default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct SysvArgs {
    #[command(subcommand)]
    pub command: SysvCommand,
}

#[derive(Subcommand, Debug)]
pub enum SysvCommand {
    /// Send one message, creating the queue if needed.
    Send(SysvSendArgs),
    /// Receive messages from an existing queue and print them.
    Recv(SysvRecvArgs),
    /// Show message count and byte budget of an existing queue.
    Attr(SysvKeyArgs),
    /// Change the queue's byte budget, creating the queue if needed.
    SetMaxBytes(SysvSetMaxBytesArgs),
    /// Remove an existing queue system-wide.
    Remove(SysvKeyArgs),
}

#[derive(Args, Debug)]
pub struct SysvKeyArgs {
    /// Queue key, decimal or 0x-prefixed hex, in 1..=0xffffffff.
    #[arg(value_parser = parse_key)]
    pub key: u32,
}

#[derive(Args, Debug)]
pub struct SysvSendArgs {
    /// Queue key, decimal or 0x-prefixed hex, in 1..=0xffffffff.
    #[arg(value_parser = parse_key)]
    pub key: u32,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Message type; must be at least 1.
    #[arg(long = "type", short = 't', default_value = "1")]
    pub msg_type: i64,
    /// Wait for room (forever) or fail at once (0).
    #[arg(long, default_value = "forever")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SysvRecvArgs {
    /// Queue key, decimal or 0x-prefixed hex, in 1..=0xffffffff.
    #[arg(value_parser = parse_key)]
    pub key: u32,
    /// Type selector; 0 takes the oldest message of any type.
    #[arg(long = "type", short = 't', default_value = "0", allow_negative_numbers = true)]
    pub msg_type: i64,
    /// Wait for a message (forever) or fail at once (0).
    #[arg(long, default_value = "forever")]
    pub timeout: String,
    /// Number of messages to receive.
    #[arg(long, default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct SysvSetMaxBytesArgs {
    /// Queue key, decimal or 0x-prefixed hex, in 1..=0xffffffff.
    #[arg(value_parser = parse_key)]
    pub key: u32,
    /// New byte budget.
    pub max_bytes: usize,
}

#[derive(Args, Debug, Default)]
pub struct LimitsArgs {
    /// Skip creating throwaway queues; only read /proc.
    #[arg(long)]
    pub no_probe: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a CLI timeout. `forever`/`inf` block, `0` never waits, `250ms` and
/// `2s` carry a unit and a bare number is seconds.
pub fn parse_timeout(input: &str) -> CliResult<Timeout> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    match input.to_ascii_lowercase().as_str() {
        "forever" | "inf" | "infinite" | "none" => return Ok(Timeout::Forever),
        _ => {}
    }

    if let Some(num) = input.strip_suffix("ms") {
        let millis: u64 = num
            .parse()
            .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
        return Ok(Timeout::After(Duration::from_millis(millis)));
    }

    let number = input.strip_suffix('s').unwrap_or(input);
    let secs: f64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if !secs.is_finite() {
        return Err(CliError::new(
            USAGE,
            format!("invalid timeout value: {input} (use 'forever' to block)"),
        ));
    }
    Timeout::from_secs_f64(secs)
        .ok_or_else(|| CliError::new(USAGE, format!("timeout must not be negative: {input}")))
}

pub fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn parse_key(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse::<u32>(),
    };
    match parsed {
        Ok(0) => Err("key must be positive (private queues are not reachable from the CLI)".into()),
        Ok(key) => Ok(key),
        Err(err) => Err(format!("invalid key {input:?}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_keywords() {
        assert_eq!(parse_timeout("forever").unwrap(), Timeout::Forever);
        assert_eq!(parse_timeout("INF").unwrap(), Timeout::Forever);
        assert_eq!(parse_timeout("0").unwrap(), Timeout::NON_BLOCKING);
    }

    #[test]
    fn parse_timeout_units() {
        assert_eq!(
            parse_timeout("250ms").unwrap(),
            Timeout::After(Duration::from_millis(250))
        );
        assert_eq!(
            parse_timeout("2s").unwrap(),
            Timeout::After(Duration::from_secs(2))
        );
        assert_eq!(
            parse_timeout("1.5").unwrap(),
            Timeout::After(Duration::from_millis(1500))
        );
    }

    #[test]
    fn parse_timeout_invalid() {
        for input in ["", "bad", "-1", "1.5ms", "nan"] {
            let err = parse_timeout(input).unwrap_err();
            assert_eq!(err.code, USAGE, "input {input:?}");
        }
    }

    #[test]
    fn parse_key_accepts_hex_and_decimal() {
        assert_eq!(parse_key("42"), Ok(42));
        assert_eq!(parse_key("0x2A"), Ok(42));
        assert_eq!(parse_key("0x900028fb"), Ok(0x9000_28fb));
        assert_eq!(parse_key("4294967295"), Ok(u32::MAX));
        assert!(parse_key("0x100000000").is_err());
        assert!(parse_key("0").is_err());
        assert!(parse_key("-3").is_err());
        assert!(parse_key("0xzz").is_err());
    }

    #[test]
    fn payload_sources() {
        let json = PayloadArgs {
            json: Some("{\"id\":1}".to_string()),
            data: None,
            file: None,
        };
        assert_eq!(resolve_payload(&json).unwrap(), b"{\"id\":1}");

        let bad = PayloadArgs {
            json: Some("{".to_string()),
            data: None,
            file: None,
        };
        assert_eq!(resolve_payload(&bad).unwrap_err().code, USAGE);

        let empty = PayloadArgs {
            json: None,
            data: None,
            file: None,
        };
        assert!(resolve_payload(&empty).unwrap().is_empty());
    }
}
