// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use serde_json::{json, Value};

use crate::core::query::SignatureHelpInfo;

/// Parameter labels are sent as `[start, end]` offsets into the signature
/// label so that repeated operand names stay distinguishable.
pub fn signature_help_response(info: &SignatureHelpInfo) -> Value {
    let signatures: Vec<Value> = info
        .signatures
        .iter()
        .map(|signature| {
            let parameters: Vec<Value> = signature
                .parameters
                .iter()
                .map(|param| {
                    json!({
                        "label": [param.label.start, param.label.end],
                        "documentation": param.documentation,
                    })
                })
                .collect();
            json!({
                "label": signature.label,
                "documentation": {
                    "kind": "markdown",
                    "value": signature.documentation,
                },
                "parameters": parameters,
                "activeParameter": signature.active_parameter,
            })
        })
        .collect();
    json!({
        "signatures": signatures,
        "activeSignature": info.active_signature,
        "activeParameter": info.active_parameter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keyword_id::Span;
    use crate::core::query::{ParameterInfo, SignatureInfo};

    #[test]
    fn parameters_are_label_offsets() {
        let info = SignatureHelpInfo {
            signatures: vec![SignatureInfo {
                label: "MOV r32, r/m32".to_string(),
                documentation: "Move".to_string(),
                parameters: vec![
                    ParameterInfo {
                        label: Span::new(4, 7),
                        documentation: "r32".to_string(),
                    },
                    ParameterInfo {
                        label: Span::new(9, 14),
                        documentation: "r/m32".to_string(),
                    },
                ],
                active_parameter: 1,
            }],
            active_signature: 0,
            active_parameter: 1,
        };
        let value = signature_help_response(&info);
        assert_eq!(value["activeParameter"], 1);
        assert_eq!(value["signatures"][0]["parameters"][1]["label"], json!([9, 14]));
    }
}
