//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Each test:
/// 1. Queues a mock Gemini response (what generateContent would return)
/// 2. Sends a request to the REAL proxy
/// 3. Validates the response and what the upstream received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Chat contract ─────────────────────────────────────────────────────
        test!(
            "chat/simple_reply",
            "First candidate text is relayed as {\"reply\": ...}",
            basic::test_simple_reply
        ),
        test!(
            "chat/prompt_concatenation",
            "Upstream receives one user turn: systemPrompt + separator + message",
            basic::test_prompt_concatenation
        ),
        test!(
            "chat/safety_settings_and_key",
            "Upstream call carries the key and four BLOCK_NONE safety settings",
            basic::test_safety_settings_and_key
        ),
        test!(
            "chat/missing_field",
            "Missing systemPrompt is a 400 and never reaches the upstream",
            basic::test_missing_field
        ),
        test!(
            "chat/malformed_json",
            "Non-JSON body is a 500 with the generic internal message",
            basic::test_malformed_json
        ),

        // ── Upstream failures ─────────────────────────────────────────────────
        test!(
            "upstream/error_body",
            "Gemini error message is relayed with the connection-error prefix",
            basic::test_upstream_error
        ),
        test!(
            "upstream/empty_candidates",
            "Zero candidates maps to the no-response error",
            basic::test_empty_candidates
        ),
        test!(
            "upstream/blocked_prompt",
            "Safety-blocked prompt maps to the blocked error",
            basic::test_blocked_prompt
        ),

        // ── CORS and routing ──────────────────────────────────────────────────
        test!(
            "cors/preflight",
            "OPTIONS returns 200, empty body and CORS headers",
            cors::test_preflight
        ),
        test!(
            "cors/get_not_allowed",
            "GET on the chat route is 405 with CORS headers",
            cors::test_get_not_allowed
        ),
        test!("routes/health", "/health answers OK", cors::test_health),
        test!(
            "routes/unknown",
            "Unknown routes answer a JSON 404",
            cors::test_unknown_route
        ),

        // ── CLI ───────────────────────────────────────────────────────────────
        test!(
            "cli/test_upstream",
            "test-upstream looks up the configured model with the key",
            cli::test_upstream_check_succeeds
        ),
        test!(
            "cli/test_upstream_without_key",
            "test-upstream fails without a key and never calls the upstream",
            cli::test_upstream_check_without_key
        ),
    ]
}
