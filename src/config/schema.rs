use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "reporting": {
                "type": "object",
                "properties": {
                    "endpoint_scan_types": { "type": "array", "items": { "type": "string" } },
                    "url_scan_types": { "type": "array", "items": { "type": "string" } },
                    "default_report_epoch": { "type": "string" }
                }
            },
            "severity": {
                "type": "array",
                "items": { "$ref": "#/$defs/severity_rule" }
            },
            "dispatch": {
                "type": "object",
                "properties": {
                    "workers": { "type": "integer", "minimum": 1 },
                    "max_retries": { "type": "integer", "minimum": 0 }
                }
            },
            "api": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
                }
            }
        },
        "$defs": {
            "severity_rule": {
                "type": "object",
                "required": ["scan_type", "rating", "impact"],
                "properties": {
                    "scan_type": { "type": "string" },
                    "rating": { "type": "string" },
                    "impact": { "type": "string", "enum": ["high", "medium", "low", "ok"] },
                    "explanation": { "type": "string" }
                }
            }
        }
    })
});
