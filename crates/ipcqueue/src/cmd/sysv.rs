use ipcqueue::sysv::{SysvQueue, SysvQueueConfig};
use ipcqueue::MessageQueue;
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{parse_timeout, resolve_payload, SysvCommand, SysvKeyArgs, SysvRecvArgs};
use crate::cmd::{SysvSendArgs, SysvSetMaxBytesArgs};
use crate::exit::{sysv_error, CliResult, SUCCESS};
use crate::output::{print_message, print_record, MessageOutput, OutputFormat};

#[derive(Serialize)]
struct AttrOutput {
    key: u32,
    msqid: i32,
    current_messages: usize,
    max_bytes: usize,
}

pub fn run(command: SysvCommand, format: OutputFormat) -> CliResult<i32> {
    match command {
        SysvCommand::Send(args) => send(args),
        SysvCommand::Recv(args) => recv(args, format),
        SysvCommand::Attr(args) => attr(args, format),
        SysvCommand::SetMaxBytes(args) => set_max_bytes(args),
        SysvCommand::Remove(args) => remove(args),
    }
}

fn open(key: u32) -> CliResult<SysvQueue> {
    SysvQueue::open(Some(key), SysvQueueConfig::default())
        .map_err(|err| sysv_error("open failed", err))
}

/// Look up an existing queue; a missing key is an error, never created.
fn attach(key: u32) -> CliResult<SysvQueue> {
    SysvQueue::attach(key).map_err(|err| sysv_error("attach failed", err))
}

fn send(args: SysvSendArgs) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let payload = resolve_payload(&args.payload)?;
    let queue = open(args.key)?;

    queue
        .send(&payload, args.msg_type, timeout)
        .map_err(|err| sysv_error("send failed", err))?;
    debug!(
        key = args.key,
        size = payload.len(),
        msg_type = args.msg_type,
        "message sent"
    );
    Ok(SUCCESS)
}

fn recv(args: SysvRecvArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let queue = attach(args.key)?;
    let label = format!("{:#x}", args.key);

    for _ in 0..args.count {
        let message = queue
            .get_message(args.msg_type, timeout)
            .map_err(|err| sysv_error("receive failed", err))?;
        let mut out = MessageOutput::new(label.as_str(), &message.payload);
        out.msg_type = Some(message.tag);
        print_message(&out, &message.payload, format);
    }
    Ok(SUCCESS)
}

fn attr(args: SysvKeyArgs, format: OutputFormat) -> CliResult<i32> {
    let queue = attach(args.key)?;
    let attrs = queue
        .attributes()
        .map_err(|err| sysv_error("attributes failed", err))?;

    let out = AttrOutput {
        key: args.key,
        msqid: queue.id().as_raw(),
        current_messages: attrs.current_messages,
        max_bytes: attrs.max_bytes,
    };
    let rows = [
        ("msqid", out.msqid.to_string()),
        ("current_messages", out.current_messages.to_string()),
        ("max_bytes", out.max_bytes.to_string()),
    ];
    print_record(&format!("System V queue {:#x}", out.key), &out, &rows, format);
    Ok(SUCCESS)
}

fn set_max_bytes(args: SysvSetMaxBytesArgs) -> CliResult<i32> {
    let queue = open(args.key)?;
    queue
        .set_max_bytes(args.max_bytes)
        .map_err(|err| sysv_error("set max bytes failed", err))?;
    info!(key = args.key, max_bytes = args.max_bytes, "byte budget updated");
    Ok(SUCCESS)
}

fn remove(args: SysvKeyArgs) -> CliResult<i32> {
    let queue = attach(args.key)?;
    queue
        .close()
        .map_err(|err| sysv_error("remove failed", err))?;
    info!(key = args.key, "queue removed");
    Ok(SUCCESS)
}
