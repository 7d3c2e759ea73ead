use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::cmd::LimitsArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct LimitsOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

/// Kernel tunables that bound both queue facilities.
const PROC_LIMITS: &[(&str, &str)] = &[
    ("posix_msg_max", "/proc/sys/fs/mqueue/msg_max"),
    ("posix_msgsize_max", "/proc/sys/fs/mqueue/msgsize_max"),
    ("posix_queues_max", "/proc/sys/fs/mqueue/queues_max"),
    ("sysv_msgmax", "/proc/sys/kernel/msgmax"),
    ("sysv_msgmnb", "/proc/sys/kernel/msgmnb"),
    ("sysv_msgmni", "/proc/sys/kernel/msgmni"),
];

pub fn run(args: LimitsArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks: Vec<CheckResult> = PROC_LIMITS
        .iter()
        .map(|(name, path)| proc_limit_check(name, Path::new(path)))
        .collect();

    if args.no_probe {
        checks.push(CheckResult {
            name: "probes".to_string(),
            status: CheckStatus::Skip,
            detail: "--no-probe given".to_string(),
        });
    } else {
        checks.push(posix_probe_check());
        checks.push(sysv_probe_check());
    }

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };
    let output = LimitsOutput { checks, overall };

    print_limits(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn proc_limit_check(name: &str, path: &Path) -> CheckResult {
    match fs::read_to_string(path) {
        Ok(value) => CheckResult {
            name: name.to_string(),
            status: CheckStatus::Info,
            detail: value.trim().to_string(),
        },
        Err(err) => CheckResult {
            name: name.to_string(),
            status: CheckStatus::Skip,
            detail: format!("{} unreadable: {err}", path.display()),
        },
    }
}

#[cfg(target_os = "linux")]
fn posix_probe_check() -> CheckResult {
    use ipcqueue::posix::{mq, PosixQueue, PosixQueueConfig};

    let name = format!("/ipcqueue-limits-{}", std::process::id());
    let config = PosixQueueConfig {
        max_messages: 1,
        max_msg_size: 64,
    };
    let result = PosixQueue::open(name.as_str(), config).and_then(|queue| {
        queue.put_nowait(b"probe", 1)?;
        let received = queue.get_nowait()?;
        queue.unlink()?;
        queue.close()?;
        Ok(received)
    });

    match result {
        Ok((payload, 1)) if payload == b"probe" => CheckResult {
            name: "posix_probe".to_string(),
            status: CheckStatus::Pass,
            detail: "create/send/receive/unlink succeeded".to_string(),
        },
        Ok(_) => {
            let _ = mq::unlink(&name);
            CheckResult {
                name: "posix_probe".to_string(),
                status: CheckStatus::Fail,
                detail: "probe message came back altered".to_string(),
            }
        }
        Err(err) => {
            let _ = mq::unlink(&name);
            CheckResult {
                name: "posix_probe".to_string(),
                status: CheckStatus::Fail,
                detail: err.to_string(),
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn sysv_probe_check() -> CheckResult {
    use ipcqueue::sysv::SysvQueue;

    let queue = match SysvQueue::private() {
        Ok(queue) => queue,
        Err(err) => {
            return CheckResult {
                name: "sysv_probe".to_string(),
                status: CheckStatus::Fail,
                detail: err.to_string(),
            }
        }
    };
    let result = queue
        .put_nowait(b"probe", 3)
        .and_then(|()| queue.get_message(3, ipcqueue::Timeout::NON_BLOCKING));
    let removed = queue.close();

    match (result, removed) {
        (Ok(message), Ok(())) if message.payload == b"probe" && message.tag == 3 => CheckResult {
            name: "sysv_probe".to_string(),
            status: CheckStatus::Pass,
            detail: "create/send/receive/remove succeeded".to_string(),
        },
        (Ok(_), Ok(())) => CheckResult {
            name: "sysv_probe".to_string(),
            status: CheckStatus::Fail,
            detail: "probe message came back altered".to_string(),
        },
        (Err(err), _) | (_, Err(err)) => CheckResult {
            name: "sysv_probe".to_string(),
            status: CheckStatus::Fail,
            detail: err.to_string(),
        },
    }
}

#[cfg(not(target_os = "linux"))]
fn posix_probe_check() -> CheckResult {
    CheckResult {
        name: "posix_probe".to_string(),
        status: CheckStatus::Skip,
        detail: "POSIX queues are only supported on Linux".to_string(),
    }
}

#[cfg(not(target_os = "linux"))]
fn sysv_probe_check() -> CheckResult {
    CheckResult {
        name: "sysv_probe".to_string(),
        status: CheckStatus::Skip,
        detail: "System V queues are only supported on Linux".to_string(),
    }
}

fn print_limits(output: &LimitsOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => crate::output::print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("ipcqueue limits\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<20} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}
