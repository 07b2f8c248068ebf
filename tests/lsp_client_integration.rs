mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use common::lsp_client::{path_to_file_uri, LspTestClient};

fn unique_temp_dir() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("asmscope-lsp-it-{}-{now}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    fs::canonicalize(&dir).expect("canonical temp dir")
}

fn write_text(path: &Path, text: &str) {
    fs::write(path, text).expect("write file");
}

fn labels(items: &Value) -> Vec<String> {
    items
        .as_array()
        .expect("completion array")
        .iter()
        .filter_map(|item| item.get("label").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

fn codes(params: &Value) -> Vec<String> {
    params["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .filter_map(|diag| diag.get("code").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

#[test]
fn initialize_reports_core_capabilities() {
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let result = client.initialize(json!({}));
    let caps = result.get("capabilities").expect("capabilities");
    assert!(caps.get("completionProvider").is_some());
    assert!(caps.get("hoverProvider").is_some());
    assert!(caps.get("signatureHelpProvider").is_some());
    assert!(caps.get("definitionProvider").is_some());
    assert!(caps.get("referencesProvider").is_some());
    assert!(caps.get("foldingRangeProvider").is_some());
    assert_eq!(result["serverInfo"]["name"], "asmscope-lsp");
    client.shutdown();
}

#[test]
fn unknown_request_answers_method_not_found() {
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    let error = client.request("textDocument/rename", json!({}));
    assert_eq!(error["code"], -32601);
    client.shutdown();
}

#[test]
fn label_problems_are_published_as_diagnostics() {
    let uri = path_to_file_uri(&unique_temp_dir().join("labels.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    client.did_open(&uri, 1, "start:\nstart:\n  jmp finish\n");

    let params = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("diagnostics");
    assert_eq!(params["version"], 1);
    let mut found = codes(&params);
    found.sort();
    assert_eq!(found, vec!["duplicate-label", "duplicate-label", "undefined-label"]);

    client.did_change(&uri, 2, "start:\n  jmp start\n");
    let params = client
        .wait_for_version_diagnostics(&uri, 2, Duration::from_secs(5))
        .expect("diagnostics for version 2");
    assert!(codes(&params).is_empty());
    client.shutdown();
}

#[test]
fn burst_of_changes_publishes_newest_version() {
    let uri = path_to_file_uri(&unique_temp_dir().join("burst.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({ "asmscope": { "analysis": { "debounceMs": 200 } } }));
    client.did_open(&uri, 1, "");
    for version in 2..=10 {
        client.did_change(&uri, version, &format!("LABEL{version}:\n  jmp LABEL{version}\n"));
    }
    let params = client
        .wait_for_version_diagnostics(&uri, 10, Duration::from_secs(5))
        .expect("diagnostics for newest version");
    assert!(codes(&params).is_empty());

    let hover = client.position_request("textDocument/hover", &uri, 1, 8);
    let text = hover["contents"]["value"].as_str().unwrap_or_default();
    assert!(text.contains("LABEL10"), "hover: {hover}");
    client.shutdown();
}

#[test]
fn include_diagnostics_go_to_the_included_file() {
    let dir = unique_temp_dir();
    let main = dir.join("main.asm");
    let defs = dir.join("defs.inc");
    write_text(&defs, "twice:\ntwice:\n");
    write_text(&main, "%include \"defs.inc\"\n%include \"missing.inc\"\n  jmp twice\n");
    let main_uri = path_to_file_uri(&main);
    let defs_uri = path_to_file_uri(&defs);

    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    client.did_open(&main_uri, 1, &fs::read_to_string(&main).expect("read main"));

    let include_params = client
        .wait_for_publish_diagnostics(&defs_uri, Duration::from_secs(5))
        .expect("include diagnostics");
    assert_eq!(codes(&include_params), vec!["duplicate-label", "duplicate-label"]);

    let main_params = client
        .wait_for_publish_diagnostics(&main_uri, Duration::from_secs(5))
        .expect("main diagnostics");
    assert_eq!(codes(&main_params), vec!["unresolved-include"]);
    assert_eq!(main_params["diagnostics"][0]["severity"], 2);

    let definition = client.position_request("textDocument/definition", &main_uri, 2, 7);
    let locations = definition.as_array().expect("locations");
    assert_eq!(locations.len(), 2);
    assert!(locations.iter().all(|loc| loc["uri"] == defs_uri.as_str()));
    client.shutdown();
}

#[test]
fn completion_hover_and_signature_help() {
    let uri = path_to_file_uri(&unique_temp_dir().join("queries.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({ "asmscope": { "completion": { "useCapitals": false } } }));
    client.did_open(&uri, 1, "  mo\n  mov eax, 0x10\n  movzx eax, bl\n");

    let completion = client.position_request("textDocument/completion", &uri, 0, 4);
    assert!(labels(&completion).contains(&"MOV".to_string()));
    let mov = completion
        .as_array()
        .and_then(|items| items.iter().find(|item| item["label"] == "MOV"))
        .expect("MOV item");
    assert_eq!(mov["insertText"], "mov");

    let hover = client.position_request("textDocument/hover", &uri, 1, 8);
    let text = hover["contents"]["value"].as_str().unwrap_or_default();
    assert!(text.to_ascii_uppercase().contains("EAX"), "hover: {hover}");

    let hover = client.position_request("textDocument/hover", &uri, 1, 12);
    let text = hover["contents"]["value"].as_str().unwrap_or_default();
    assert!(text.contains("16"), "constant hover: {hover}");

    let help = client.position_request("textDocument/signatureHelp", &uri, 2, 14);
    let signatures = help["signatures"].as_array().expect("signatures");
    assert!(!signatures.is_empty());
    assert_eq!(help["activeParameter"], 1);
    client.shutdown();
}

#[test]
fn references_and_folding_ranges() {
    let uri = path_to_file_uri(&unique_temp_dir().join("refs.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    client.did_open(
        &uri,
        1,
        "; #region loop\ntop:\n  dec ecx\n  jnz top\n; #endregion\n  jmp top\n",
    );
    let _ = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("diagnostics");

    let refs = client.request(
        "textDocument/references",
        json!({
            "textDocument": {"uri": uri},
            "position": {"line": 1, "character": 1},
            "context": {"includeDeclaration": false}
        }),
    );
    let lines: Vec<u64> = refs
        .as_array()
        .expect("locations")
        .iter()
        .filter_map(|loc| loc["range"]["start"]["line"].as_u64())
        .collect();
    assert_eq!(lines, vec![3, 5]);

    let folds = client.request("textDocument/foldingRange", json!({ "textDocument": {"uri": uri} }));
    assert_eq!(folds, json!([{ "startLine": 0, "endLine": 4, "kind": "region" }]));
    client.shutdown();
}

#[test]
fn configuration_change_reanalyses_open_documents() {
    let uri = path_to_file_uri(&unique_temp_dir().join("config.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    client.did_open(&uri, 1, "Start:\n  jmp start\n");
    let params = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("diagnostics");
    assert!(codes(&params).is_empty());

    client.notify(
        "workspace/didChangeConfiguration",
        json!({ "settings": { "asmscope": { "caseSensitive": true } } }),
    );
    let params = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("diagnostics after reconfiguration");
    assert_eq!(codes(&params), vec!["undefined-label"]);
    client.shutdown();
}

#[test]
fn close_clears_published_diagnostics() {
    let uri = path_to_file_uri(&unique_temp_dir().join("close.asm"));
    let mut client = LspTestClient::spawn().expect("spawn lsp");
    let _ = client.initialize(json!({}));
    client.did_open(&uri, 1, "  jmp nowhere\n");
    let params = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("diagnostics");
    assert_eq!(codes(&params), vec!["undefined-label"]);

    client.notify("textDocument/didClose", json!({ "textDocument": {"uri": uri} }));
    let params = client
        .wait_for_publish_diagnostics(&uri, Duration::from_secs(5))
        .expect("clearing diagnostics");
    assert_eq!(params["diagnostics"], json!([]));
    client.shutdown();
}
