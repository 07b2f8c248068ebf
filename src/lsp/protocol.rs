// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Content-Length framed JSON-RPC over stdio.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::lsp::session::{LspSession, OutboundMessage};

/// How often finished analyses are checked for while the client is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn run_stdio() -> io::Result<()> {
    let stdout = io::stdout();
    let mut writer = io::BufWriter::new(stdout.lock());
    let inbound_rx = spawn_stdin_reader();
    info!("asmscope-lsp listening on stdio");
    serve(LspSession::new(), &inbound_rx, &mut writer)
}

enum InboundMessage {
    Payload(Value),
    Eof,
}

fn serve(
    mut session: LspSession,
    inbound_rx: &Receiver<InboundMessage>,
    writer: &mut impl Write,
) -> io::Result<()> {
    loop {
        write_all(writer, session.poll_async_notifications())?;

        match inbound_rx.recv_timeout(POLL_INTERVAL) {
            Ok(InboundMessage::Payload(message)) => {
                let outbound = session.handle_message(&message);
                write_all(writer, outbound)?;
                if session.should_exit() {
                    debug!("exit requested");
                    break;
                }
            }
            Ok(InboundMessage::Eof) | Err(RecvTimeoutError::Disconnected) => {
                debug!("client closed the input stream");
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
    Ok(())
}

fn write_all(writer: &mut impl Write, outbound: Vec<OutboundMessage>) -> io::Result<()> {
    for item in outbound {
        write_lsp_message(writer, &outbound_to_json(item))?;
    }
    writer.flush()
}

fn spawn_stdin_reader() -> Receiver<InboundMessage> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin.lock());
        loop {
            match read_lsp_message(&mut reader) {
                Ok(Some(value)) => {
                    if tx.send(InboundMessage::Payload(value)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send(InboundMessage::Eof);
                    break;
                }
                Err(err) => {
                    warn!(%err, "cannot read from client");
                    let _ = tx.send(InboundMessage::Eof);
                    break;
                }
            }
        }
    });
    rx
}

/// Next well-formed message, or `None` at end of input. Frames without a
/// Content-Length header or with a body that is not JSON are skipped.
fn read_lsp_message(reader: &mut impl BufRead) -> io::Result<Option<Value>> {
    loop {
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                break;
            }
            if let Some((name, value)) = trimmed.split_once(':') {
                if name.eq_ignore_ascii_case("Content-Length") {
                    content_length = value.trim().parse::<usize>().ok();
                }
            }
        }

        let Some(length) = content_length else {
            warn!("skipping frame without Content-Length");
            continue;
        };
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body)?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => warn!(%err, "skipping malformed message body"),
        }
    }
}

fn write_lsp_message(writer: &mut impl Write, payload: &Value) -> io::Result<()> {
    let body = payload.to_string();
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)
}

fn outbound_to_json(message: OutboundMessage) -> Value {
    match message {
        OutboundMessage::Response { id, result } => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        OutboundMessage::Error { id, code, message } => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": code,
                "message": message,
            }
        }),
        OutboundMessage::Notification { method, params } => json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }),
    }
}
