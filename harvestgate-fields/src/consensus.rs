// harvestgate-fields/src/consensus.rs
// ============================================================================
// Module: Multi-Source Consensus
// Description: Stage 5 of the pipeline (optional) — cross-checks the
//              selector-extracted value against the same logical field
//              pulled from JSON-LD, OpenGraph/Twitter meta, and embedded JS
//              state, and rewards agreement.
// ============================================================================

/// Where a consensus candidate string was extracted from. Enumerated in a
/// fixed order, since the tie-break rule ("prefer the larger set; on tie,
/// prefer the primary value") needs a stable ordering to be deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsensusSource {
    /// A `<script type="application/ld+json">` block.
    JsonLd,
    /// `og:*` / `twitter:*` meta tags.
    OpenGraph,
    /// An embedded JS state blob (e.g. `window.__NEXT_DATA__`, `__NUXT__`).
    EmbeddedJs,
}

/// The raw candidate strings pulled from page context for one logical
/// field, one per source that actually yielded something.
#[derive(Debug, Clone, Default)]
pub struct ConsensusContext {
    candidates: Vec<(ConsensusSource, String)>,
}

impl ConsensusContext {
    /// Starts an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a candidate string pulled from `source`.
    pub fn push(&mut self, source: ConsensusSource, raw: &str) {
        self.candidates.push((source, raw.to_string()));
    }

    /// True when no source produced a candidate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The result of evaluating consensus against a primary (selector-extracted)
/// raw value.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    /// The winning consensus group's original (pre-normalization) string.
    pub value: String,
    /// Confidence bonus to add: `0.2` for a two-source agreement, `0.3` for
    /// three or more.
    pub bonus: f64,
    /// True when the primary value was null/empty and this consensus value
    /// was promoted to stand in for it.
    pub promoted: bool,
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Evaluates consensus for one field given its primary (selector) raw value
/// and the candidates gathered from page context.
///
/// Returns `None` when fewer than two sources agree, or when the two largest
/// agreeing groups are tied in size (ambiguous, so this defers to the
/// primary value rather than guess — i.e. no consensus override).
#[must_use]
pub fn evaluate(primary_raw: Option<&str>, ctx: &ConsensusContext) -> Option<ConsensusOutcome> {
    if ctx.candidates.len() < 2 {
        return None;
    }

    // Group by normalized value, preserving first-seen original string and
    // first-seen source order for deterministic tie-breaking.
    let mut groups: Vec<(String, String, usize)> = Vec::new();
    for (_, original) in &ctx.candidates {
        let key = normalize(original);
        if let Some(group) = groups.iter_mut().find(|(k, ..)| *k == key) {
            group.2 += 1;
        } else {
            groups.push((key, original.clone(), 1));
        }
    }

    let agreeing: Vec<&(String, String, usize)> = groups.iter().filter(|(.., count)| *count >= 2).collect();
    if agreeing.is_empty() {
        return None;
    }

    let max_count = agreeing.iter().map(|(.., c)| *c).max().unwrap_or(0);
    let top: Vec<&&(String, String, usize)> = agreeing.iter().filter(|(.., c)| *c == max_count).collect();
    if top.len() > 1 {
        // Two non-overlapping groups tied for largest: defer to the primary.
        return None;
    }

    let (_, winning_original, count) = *top[0];
    let bonus = if count >= 3 { 0.3 } else { 0.2 };
    let primary_present = primary_raw.is_some_and(|p| !p.trim().is_empty());

    Some(ConsensusOutcome {
        value: winning_original.clone(),
        bonus,
        promoted: !primary_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_agreeing_sources_yield_small_bonus() {
        let mut ctx = ConsensusContext::new();
        ctx.push(ConsensusSource::JsonLd, "Widget Pro");
        ctx.push(ConsensusSource::OpenGraph, "widget pro");
        let outcome = evaluate(Some("Widget Pro"), &ctx).expect("consensus");
        assert!((outcome.bonus - 0.2).abs() < f64::EPSILON);
        assert!(!outcome.promoted);
    }

    #[test]
    fn three_agreeing_sources_yield_larger_bonus() {
        let mut ctx = ConsensusContext::new();
        ctx.push(ConsensusSource::JsonLd, "Widget Pro");
        ctx.push(ConsensusSource::OpenGraph, "widget pro");
        ctx.push(ConsensusSource::EmbeddedJs, "Widget  Pro");
        let outcome = evaluate(Some("Widget Pro"), &ctx).expect("consensus");
        assert!((outcome.bonus - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn null_primary_is_promoted_with_flag() {
        let mut ctx = ConsensusContext::new();
        ctx.push(ConsensusSource::JsonLd, "Widget Pro");
        ctx.push(ConsensusSource::OpenGraph, "widget pro");
        let outcome = evaluate(None, &ctx).expect("consensus");
        assert!(outcome.promoted);
    }

    #[test]
    fn tied_groups_defer_to_primary() {
        let mut ctx = ConsensusContext::new();
        ctx.push(ConsensusSource::JsonLd, "Alpha");
        ctx.push(ConsensusSource::OpenGraph, "Alpha");
        ctx.push(ConsensusSource::EmbeddedJs, "Beta");
        // third candidate needed to create a genuine second pair
        ctx.push(ConsensusSource::JsonLd, "Beta");
        assert!(evaluate(Some("Alpha"), &ctx).is_none());
    }
}
