// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use serde_json::{json, Value};

use crate::core::query::HoverInfo;

pub fn hover_response(info: &HoverInfo, line: u32) -> Value {
    json!({
        "contents": {
            "kind": "markdown",
            "value": info.contents,
        },
        "range": {
            "start": {"line": line, "character": info.span.start},
            "end": {"line": line, "character": info.span.end},
        }
    })
}
