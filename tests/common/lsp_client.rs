use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

/// Drives an `asmscope-lsp` child process over stdio.
pub struct LspTestClient {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<Value>,
    pending: VecDeque<Value>,
    next_id: u64,
}

impl LspTestClient {
    pub fn spawn() -> io::Result<Self> {
        let mut child = Command::new(lsp_binary_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .env("ASMSCOPE_LOG", "warn")
            .spawn()?;

        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        let rx = spawn_reader_thread(stdout);

        Ok(Self {
            child,
            stdin,
            rx,
            pending: VecDeque::new(),
            next_id: 1,
        })
    }

    /// `initialize` followed by `initialized`, with a short analysis delay
    /// so tests do not wait for the default debounce.
    pub fn initialize(&mut self, settings: Value) -> Value {
        let mut options = json!({ "asmscope": { "analysis": { "debounceMs": 20 } } });
        if let (Some(target), Some(extra)) = (
            options["asmscope"].as_object_mut(),
            settings.get("asmscope").and_then(Value::as_object),
        ) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        let result = self.request(
            "initialize",
            json!({
                "processId": std::process::id(),
                "rootUri": Value::Null,
                "capabilities": {},
                "initializationOptions": options,
            }),
        );
        self.notify("initialized", json!({}));
        result
    }

    pub fn did_open(&mut self, uri: &str, version: i64, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "version": version,
                    "languageId": "asm",
                    "text": text,
                }
            }),
        );
    }

    pub fn did_change(&mut self, uri: &str, version: i64, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }],
            }),
        );
    }

    pub fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.send_message(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .expect("send request");
        self.wait_for(Duration::from_secs(5), |msg| message_id(msg) == Some(id))
            .map(extract_result_or_error)
            .expect("request response")
    }

    pub fn position_request(&mut self, method: &str, uri: &str, line: u32, character: u32) -> Value {
        self.request(
            method,
            json!({
                "textDocument": {"uri": uri},
                "position": {"line": line, "character": character},
            }),
        )
    }

    pub fn notify(&mut self, method: &str, params: Value) {
        self.send_message(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .expect("send notification");
    }

    pub fn wait_for_publish_diagnostics(&mut self, uri: &str, timeout: Duration) -> Option<Value> {
        self.wait_for(timeout, |msg| {
            msg.get("method").and_then(Value::as_str) == Some("textDocument/publishDiagnostics")
                && msg
                    .get("params")
                    .and_then(|params| params.get("uri"))
                    .and_then(Value::as_str)
                    == Some(uri)
        })
        .and_then(|msg| msg.get("params").cloned())
    }

    /// Waits for diagnostics of `uri` published for `version`, skipping
    /// earlier ones.
    pub fn wait_for_version_diagnostics(
        &mut self,
        uri: &str,
        version: i64,
        timeout: Duration,
    ) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let params = self.wait_for_publish_diagnostics(uri, remaining)?;
            if params.get("version").and_then(Value::as_i64) == Some(version) {
                return Some(params);
            }
        }
        None
    }

    pub fn shutdown(&mut self) {
        let _ = self.request("shutdown", Value::Null);
        let _ = self.wait_for_exit(Duration::from_secs(2));
    }

    fn wait_for(&mut self, timeout: Duration, matches: impl Fn(&Value) -> bool) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(index) = self.pending.iter().position(&matches) {
                return self.pending.remove(index);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.rx.recv_timeout(remaining.min(Duration::from_millis(50))) {
                Ok(message) => self.pending.push_back(message),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn send_message(&mut self, value: &Value) -> io::Result<()> {
        let body = value.to_string();
        write!(self.stdin, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
        self.stdin.flush()
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(_)) = self.child.try_wait() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for LspTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn path_to_file_uri(path: &Path) -> String {
    let mut out = String::from("file://");
    for b in path.to_string_lossy().bytes() {
        let c = b as char;
        if c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~' | ':') {
            out.push(c);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn lsp_binary_path() -> PathBuf {
    option_env!("CARGO_BIN_EXE_asmscope-lsp")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/asmscope-lsp"))
}

fn spawn_reader_thread(stdout: ChildStdout) -> Receiver<Value> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        while let Ok(Some(value)) = read_lsp_message(&mut reader) {
            if tx.send(value).is_err() {
                break;
            }
        }
    });
    rx
}

fn read_lsp_message(reader: &mut impl BufRead) -> io::Result<Option<Value>> {
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
        return Ok(None);
    };
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    Ok(serde_json::from_slice::<Value>(&body).ok())
}

fn message_id(value: &Value) -> Option<u64> {
    value.get("id").and_then(Value::as_u64)
}

fn extract_result_or_error(message: Value) -> Value {
    if let Some(result) = message.get("result") {
        return result.clone();
    }
    if let Some(error) = message.get("error") {
        return error.clone();
    }
    Value::Null
}
