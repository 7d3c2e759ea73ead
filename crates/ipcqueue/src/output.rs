use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

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
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A message taken off either kind of queue.
#[derive(Debug, Serialize)]
pub struct MessageOutput {
    pub queue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_type: Option<i64>,
    pub payload_size: usize,
    pub payload: String,
    pub timestamp: String,
}

impl MessageOutput {
    pub fn new(queue: impl Into<String>, payload: &[u8]) -> Self {
        Self {
            queue: queue.into(),
            priority: None,
            msg_type: None,
            payload_size: payload.len(),
            payload: payload_preview(payload),
            timestamp: now_unix_seconds(),
        }
    }

    fn tag(&self) -> (&'static str, String) {
        match (self.priority, self.msg_type) {
            (Some(priority), _) => ("PRIORITY", priority.to_string()),
            (None, Some(msg_type)) => ("TYPE", msg_type.to_string()),
            (None, None) => ("TAG", "-".to_string()),
        }
    }
}

pub fn print_message(message: &MessageOutput, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(message),
        OutputFormat::Table => {
            let (tag_name, tag_value) = message.tag();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["QUEUE", tag_name, "SIZE", "PAYLOAD"])
                .add_row(vec![
                    message.queue.clone(),
                    tag_value,
                    message.payload_size.to_string(),
                    message.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let (tag_name, tag_value) = message.tag();
            println!(
                "queue={} {}={} size={} payload={}",
                message.queue,
                tag_name.to_lowercase(),
                tag_value,
                message.payload_size,
                message.payload
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

/// Print a flat record: JSON as-is, otherwise as name/value rows.
pub fn print_record<T: Serialize>(
    title: &str,
    record: &T,
    rows: &[(&str, String)],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{title}");
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{title}:");
            for (name, value) in rows {
                println!("  {:<18} {}", format!("{name}:"), value);
            }
        }
        OutputFormat::Raw => {
            let values: Vec<&str> = rows.iter().map(|(_, value)| value.as_str()).collect();
            println!("{}", values.join(" "));
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_payloads_are_summarized() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }

    #[test]
    fn message_json_omits_missing_tag() {
        let mut message = MessageOutput::new("/jobs", b"ping");
        message.priority = Some(5);
        let json = serde_json::to_string(&message).expect("message should serialize");
        assert!(json.contains("\"priority\":5"));
        assert!(!json.contains("msg_type"));
        assert!(json.contains("\"payload_size\":4"));
    }
}
