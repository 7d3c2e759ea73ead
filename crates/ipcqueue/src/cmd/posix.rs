use ipcqueue::posix::{mq, PosixQueue, PosixQueueConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{parse_timeout, resolve_payload, PosixCommand, PosixOpenArgs, PosixSendArgs};
use crate::cmd::{PosixNameArgs, PosixRecvArgs};
use crate::exit::{posix_error, CliResult, SUCCESS};
use crate::output::{print_message, print_record, MessageOutput, OutputFormat};

#[derive(Serialize)]
struct AttrOutput<'a> {
    queue: &'a str,
    current_messages: usize,
    max_messages: usize,
    max_msg_size: usize,
}

pub fn run(command: PosixCommand, format: OutputFormat) -> CliResult<i32> {
    match command {
        PosixCommand::Send(args) => send(args),
        PosixCommand::Recv(args) => recv(args, format),
        PosixCommand::Attr(args) => attr(args, format),
        PosixCommand::Unlink(args) => unlink(args),
    }
}

fn open(args: &PosixOpenArgs) -> CliResult<PosixQueue> {
    let config = PosixQueueConfig {
        max_messages: args.max_messages,
        max_msg_size: args.max_msg_size,
    };
    PosixQueue::open(&args.name, config).map_err(|err| posix_error("open failed", err))
}

fn send(args: PosixSendArgs) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let payload = resolve_payload(&args.payload)?;
    let queue = open(&args.queue)?;

    queue
        .put(&payload, args.priority, timeout)
        .map_err(|err| posix_error("send failed", err))?;
    debug!(
        queue = queue.name(),
        size = payload.len(),
        priority = args.priority,
        "message sent"
    );

    queue.close().map_err(|err| posix_error("close failed", err))?;
    Ok(SUCCESS)
}

fn recv(args: PosixRecvArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let queue = open(&args.queue)?;

    for _ in 0..args.count {
        let (payload, priority) = queue
            .get(timeout)
            .map_err(|err| posix_error("receive failed", err))?;
        let mut message = MessageOutput::new(queue.name(), &payload);
        message.priority = Some(priority);
        print_message(&message, &payload, format);
    }

    queue.close().map_err(|err| posix_error("close failed", err))?;
    Ok(SUCCESS)
}

fn attr(args: PosixOpenArgs, format: OutputFormat) -> CliResult<i32> {
    let queue = open(&args)?;
    let attrs = queue
        .attributes()
        .map_err(|err| posix_error("attributes failed", err))?;

    let out = AttrOutput {
        queue: queue.name(),
        current_messages: attrs.current_messages,
        max_messages: attrs.max_messages,
        max_msg_size: attrs.max_msg_size,
    };
    let rows = [
        ("current_messages", out.current_messages.to_string()),
        ("max_messages", out.max_messages.to_string()),
        ("max_msg_size", out.max_msg_size.to_string()),
    ];
    print_record(&format!("POSIX queue {}", out.queue), &out, &rows, format);
    Ok(SUCCESS)
}

fn unlink(args: PosixNameArgs) -> CliResult<i32> {
    mq::unlink(&args.name).map_err(|err| posix_error("unlink failed", err))?;
    info!(queue = %args.name, "queue unlinked");
    Ok(SUCCESS)
}
