//! Common test helpers and JSON builders

use serde_json::{json, Value};

use crate::types::ProxyResponse;

/// Must match upstream.api_key_env in the test config
pub const E2E_API_KEY_ENV: &str = "E2E_GEMINI_API_KEY";

/// Key the spawned proxy reads from `E2E_API_KEY_ENV`
pub const E2E_API_KEY: &str = "e2e-test-key";

/// Model configured in test_configs/proxy.yaml
pub const E2E_MODEL: &str = "gemini-e2e-model";

/// Separator configured in test_configs/proxy.yaml
pub const SEPARATOR: &str = "\n\nUser Question: ";

// ─── Request builders ────────────────────────────────────────────────────────

/// Build a chat request the way the front end sends it
pub fn chat_request(message: &str, system_prompt: &str) -> Value {
    json!({
        "message": message,
        "systemPrompt": system_prompt
    })
}

// ─── Response builders ────────────────────────────────────────────────────────

/// Build a normal generateContent response with one text candidate
pub fn gemini_text_response(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": text}]
            },
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": 12,
            "candidatesTokenCount": 4,
            "totalTokenCount": 16
        }
    })
    .to_string()
}

/// Build a Gemini error body
pub fn gemini_error_response(code: u16, message: &str, status: &str) -> String {
    json!({
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    })
    .to_string()
}

/// Build a response with no candidates, optionally blocked at the prompt
pub fn gemini_no_candidates_response(block_reason: Option<&str>) -> String {
    match block_reason {
        Some(reason) => json!({
            "promptFeedback": {"blockReason": reason}
        })
        .to_string(),
        None => json!({"candidates": []}).to_string(),
    }
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

pub fn assert_status(resp: &ProxyResponse, expected: u16) -> anyhow::Result<()> {
    assert_true(
        resp.status == expected,
        &format!("Expected {}, got {}: {}", expected, resp.status, resp.body_text),
    )
}

/// Assert the body is exactly `{"error": <expected>}`
pub fn assert_error_body(resp: &ProxyResponse, expected: &str) -> anyhow::Result<()> {
    let error = resp
        .get_str("error")
        .ok_or_else(|| anyhow::anyhow!("Missing error field: {}", resp.body_text))?;
    assert_eq_str(error, expected, "error message")?;
    assert_true(
        resp.body.as_object().map(|o| o.len()) == Some(1),
        &format!("Error body should only carry `error`: {}", resp.body_text),
    )
}

/// Assert the four permissive CORS headers are present
pub fn assert_cors_headers(resp: &ProxyResponse) -> anyhow::Result<()> {
    assert_true(
        resp.header("access-control-allow-origin") == Some("*"),
        "Missing Access-Control-Allow-Origin: *",
    )?;
    assert_true(
        resp.header("access-control-allow-credentials") == Some("true"),
        "Missing Access-Control-Allow-Credentials: true",
    )?;
    let methods = resp.header("access-control-allow-methods").unwrap_or("");
    assert_true(
        methods.contains("POST") && methods.contains("OPTIONS"),
        &format!("Access-Control-Allow-Methods should list POST and OPTIONS, got {:?}", methods),
    )?;
    let headers = resp.header("access-control-allow-headers").unwrap_or("");
    assert_true(
        headers.contains("Content-Type"),
        &format!("Access-Control-Allow-Headers should list Content-Type, got {:?}", headers),
    )
}
