mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ipcqueue", version, about = "Kernel message queue CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_os = "linux")]
    use crate::cmd::{PosixCommand, SysvCommand};

    #[cfg(target_os = "linux")]
    #[test]
    fn parses_posix_send() {
        let cli = Cli::try_parse_from([
            "ipcqueue",
            "posix",
            "send",
            "/jobs",
            "--priority",
            "7",
            "--data",
            "hello",
        ])
        .expect("posix send args should parse");

        let Command::Posix(posix) = cli.command else {
            panic!("expected posix command");
        };
        let PosixCommand::Send(args) = posix.command else {
            panic!("expected send");
        };
        assert_eq!(args.priority, 7);
        assert_eq!(args.payload.data.as_deref(), Some("hello"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "ipcqueue",
            "posix",
            "send",
            "/jobs",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn parses_sysv_key_in_hex() {
        let cli = Cli::try_parse_from(["ipcqueue", "sysv", "recv", "0x1f", "--type", "2"])
            .expect("sysv recv args should parse");

        let Command::Sysv(sysv) = cli.command else {
            panic!("expected sysv command");
        };
        let SysvCommand::Recv(args) = sysv.command else {
            panic!("expected recv");
        };
        assert_eq!(args.key, 0x1f);
        assert_eq!(args.msg_type, 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn rejects_private_sysv_key() {
        let err = Cli::try_parse_from(["ipcqueue", "sysv", "attr", "0"])
            .expect_err("key 0 should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ipcqueue", "limits", "--format", "json"])
            .expect("limits args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Limits(_)));
    }
}
