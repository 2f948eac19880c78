// harvestgate-core/src/escalation.rs
// ============================================================================
// Module: Escalation policy (C3)
// Description: Pure decision function over (engine, HTML, status, counts)
//              that emits escalate/stop (spec §4.3).
// ============================================================================

//! ## Overview
//! [`decide_escalation`] is deterministic and idempotent (spec §8): calling
//! it twice with identical inputs yields identical `EscalationDecision`s. It
//! never performs I/O and never consults mutable state — the run loop (C7)
//! is solely responsible for acting on its output.

use crate::core::Engine;

/// The concrete JS-framework sentinels that drive the `js_app_detected`
/// signal. Matched case-insensitively against the raw HTML.
pub const SPA_MARKERS: &[&str] = &[
    "__next_data__",
    "data-reactroot",
    "ng-version",
    "v-cloak",
    "__nuxt__",
    "__svelte",
    "id=\"root\">/",
    "id=\"app\">/",
];

/// Block-interstitial phrases driving the `blocked_detected` signal.
/// Matched case-insensitively.
pub const BLOCK_INTERSTITIAL_PHRASES: &[&str] = &[
    "checking your browser",
    "access denied",
    "verify you are human",
    "cloudflare",
    "ddos protection",
    "captcha",
    "are you a robot",
    "unusual traffic",
    "blocked",
];

/// Meta-tag marker for `robots_noindex` (case-insensitive substring match).
pub const ROBOTS_NOINDEX_MARKER: &str = "noindex";

/// Inputs to the escalation decision, gathered by the run loop after one
/// engine attempt (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct EscalationInput<'a> {
    /// The engine tier that was just tried.
    pub current_engine: Engine,
    /// The raw HTML returned by the adapter, if any.
    pub html: Option<&'a str>,
    /// The HTTP status returned by the adapter, if any.
    pub status: Option<u16>,
    /// How many items were extracted on this attempt.
    pub extracted_count: usize,
    /// How many FieldMaps the Job declares (drives the
    /// `extraction_confidence_fail` trigger: it only fires when this is
    /// greater than zero).
    pub required_selector_count: usize,
    /// Whether the browser adapter reported a navigation failure.
    pub navigation_failed: bool,
    /// Whether a CAPTCHA challenge was detected.
    pub captcha: bool,
    /// `true` when the Job forces a single engine tier (spec §4.3: "the
    /// function never escalates" in that case).
    pub engine_forced: bool,
}

/// The emitted decision: escalate one tier with a reason and the signals
/// that produced it, or `None` to stop (neither escalate nor force a
/// particular terminal outcome — that remains the run loop's call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationDecision {
    /// The tier being left.
    pub from: Engine,
    /// The tier being entered.
    pub to: Engine,
    /// The single highest-precedence trigger reason.
    pub reason: &'static str,
    /// Every signal observed, in evaluation order.
    pub signals: Vec<String>,
}

fn contains_any_case_insensitive(haystack: &str, needles: &[&str]) -> Vec<String> {
    let lower = haystack.to_lowercase();
    needles
        .iter()
        .filter(|needle| lower.contains(*needle))
        .map(|needle| (*needle).to_string())
        .collect()
}

/// Decides whether to escalate after one engine attempt (spec §4.3).
///
/// Status-code-based triggers take precedence over HTML-based ones;
/// within a tier, triggers
/// are evaluated in the order listed in spec §4.3 and the first match wins,
/// but every signal actually observed is still collected into
/// [`EscalationDecision::signals`] for the engine-attempts log.
#[must_use]
pub fn decide_escalation(input: &EscalationInput<'_>) -> Option<EscalationDecision> {
    if input.engine_forced {
        return None;
    }
    let Some(to) = input.current_engine.next_tier() else {
        return None;
    };

    match input.current_engine {
        Engine::Http => decide_http_to_browser(input, to),
        Engine::Browser => decide_browser_to_provider(input, to),
        Engine::Provider => None,
    }
}

fn decide_http_to_browser(input: &EscalationInput<'_>, to: Engine) -> Option<EscalationDecision> {
    let mut signals = Vec::new();

    if let Some(status) = input.status {
        if matches!(status, 401 | 403 | 429) {
            signals.push(format!("status_{status}"));
            return Some(EscalationDecision {
                from: input.current_engine,
                to,
                reason: "blocked_status_code",
                signals,
            });
        }
    }

    if let Some(html) = input.html {
        let spa_hits = contains_any_case_insensitive(html, SPA_MARKERS);
        if !spa_hits.is_empty() {
            signals.extend(spa_hits);
            return Some(EscalationDecision {
                from: input.current_engine,
                to,
                reason: "js_app_detected",
                signals,
            });
        }
    }

    if input.extracted_count == 0 && input.required_selector_count > 0 {
        signals.push("zero_extraction".to_string());
        return Some(EscalationDecision {
            from: input.current_engine,
            to,
            reason: "extraction_confidence_fail",
            signals,
        });
    }

    if let Some(html) = input.html {
        if html.to_lowercase().contains(ROBOTS_NOINDEX_MARKER) {
            signals.push("robots_noindex".to_string());
            return Some(EscalationDecision {
                from: input.current_engine,
                to,
                reason: "robots_noindex",
                signals,
            });
        }
    }

    None
}

fn decide_browser_to_provider(input: &EscalationInput<'_>, to: Engine) -> Option<EscalationDecision> {
    let mut signals = Vec::new();

    let block_status = input.status.is_some_and(|status| matches!(status, 401 | 403 | 429));
    let block_text = input
        .html
        .map(|html| contains_any_case_insensitive(html, BLOCK_INTERSTITIAL_PHRASES))
        .unwrap_or_default();
    if block_status || !block_text.is_empty() {
        if block_status {
            signals.push(format!("status_{}", input.status.unwrap_or_default()));
        }
        signals.extend(block_text);
        return Some(EscalationDecision {
            from: input.current_engine,
            to,
            reason: "blocked_detected",
            signals,
        });
    }

    if input.navigation_failed {
        signals.push("navigation_failed".to_string());
        return Some(EscalationDecision {
            from: input.current_engine,
            to,
            reason: "navigation_failed",
            signals,
        });
    }

    if input.captcha {
        signals.push("captcha".to_string());
        return Some(EscalationDecision {
            from: input.current_engine,
            to,
            reason: "captcha_detected",
            signals,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> EscalationInput<'static> {
        EscalationInput {
            current_engine: Engine::Http,
            html: None,
            status: None,
            extracted_count: 1,
            required_selector_count: 1,
            navigation_failed: false,
            captcha: false,
            engine_forced: false,
        }
    }

    #[test]
    fn forced_engine_never_escalates() {
        let mut input = base_input();
        input.status = Some(403);
        input.engine_forced = true;
        assert_eq!(decide_escalation(&input), None);
    }

    #[test]
    fn http_escalates_to_browser_on_blocked_status() {
        let mut input = base_input();
        input.status = Some(403);
        let decision = decide_escalation(&input).expect("escalates");
        assert_eq!(decision.to, Engine::Browser);
        assert_eq!(decision.reason, "blocked_status_code");
    }

    #[test]
    fn status_code_precedes_html_signal() {
        let mut input = base_input();
        input.status = Some(429);
        input.html = Some("<div id=\"__NEXT_DATA__\"></div>");
        let decision = decide_escalation(&input).expect("escalates");
        assert_eq!(decision.reason, "blocked_status_code");
    }

    #[test]
    fn spa_marker_triggers_js_app_detected() {
        let mut input = base_input();
        input.html = Some("<script id=\"__NEXT_DATA__\">{}</script>");
        let decision = decide_escalation(&input).expect("escalates");
        assert_eq!(decision.reason, "js_app_detected");
    }

    #[test]
    fn zero_extraction_with_required_selectors_escalates() {
        let mut input = base_input();
        input.extracted_count = 0;
        let decision = decide_escalation(&input).expect("escalates");
        assert_eq!(decision.reason, "extraction_confidence_fail");
    }

    #[test]
    fn zero_extraction_with_no_required_selectors_does_not_escalate() {
        let mut input = base_input();
        input.extracted_count = 0;
        input.required_selector_count = 0;
        assert_eq!(decide_escalation(&input), None);
    }

    #[test]
    fn browser_escalates_to_provider_on_captcha() {
        let mut input = base_input();
        input.current_engine = Engine::Browser;
        input.extracted_count = 0;
        input.required_selector_count = 0;
        input.captcha = true;
        let decision = decide_escalation(&input).expect("escalates");
        assert_eq!(decision.to, Engine::Provider);
        assert_eq!(decision.reason, "captcha_detected");
    }

    #[test]
    fn provider_is_the_top_of_the_ladder() {
        let mut input = base_input();
        input.current_engine = Engine::Provider;
        input.status = Some(403);
        assert_eq!(decide_escalation(&input), None);
    }

    #[test]
    fn decision_is_deterministic_given_identical_inputs() {
        let mut input = base_input();
        input.status = Some(403);
        assert_eq!(decide_escalation(&input), decide_escalation(&input));
    }
}
