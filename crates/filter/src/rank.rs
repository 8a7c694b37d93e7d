//! Fuzzy ranking of autocomplete options against typed input.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Text the autocomplete shows for one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionText {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit { pub idx: usize, pub score: i64 }

#[derive(Debug, Clone, Copy, Default)]
pub struct RankOpts {
    pub limit: Option<usize>,
    pub min_score: Option<i64>,
}

/// Rank `options` for `input`. Blank input keeps the original order.
/// Ties break on label, then value.
pub fn rank_options(options: &[OptionText], input: &str, opts: RankOpts) -> Vec<Hit> {
    let started = std::time::Instant::now();
    let q = input.trim();
    let mut hits: Vec<Hit> = if q.is_empty() {
        (0..options.len()).map(|idx| Hit { idx, score: 0 }).collect()
    } else {
        let matcher = SkimMatcherV2::default();
        let mut hits: Vec<Hit> = options
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| {
                let text = format!("{} {}", o.label, o.value);
                matcher.fuzzy_match(&text, q).map(|score| Hit { idx, score })
            })
            .filter(|h| opts.min_score.map(|m| h.score >= m).unwrap_or(true))
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| options[a.idx].label.cmp(&options[b.idx].label))
                .then_with(|| options[a.idx].value.cmp(&options[b.idx].value))
        });
        hits
    };
    if let Some(limit) = opts.limit { hits.truncate(limit); }
    metrics::histogram!("option_rank_ms", started.elapsed().as_secs_f64() * 1_000.0);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> Vec<OptionText> {
        pairs.iter().map(|(l, v)| OptionText { label: l.to_string(), value: v.to_string() }).collect()
    }

    #[test]
    fn blank_input_keeps_order_and_limit() {
        let o = opts(&[("b", "group:default/b"), ("a", "group:default/a"), ("c", "group:default/c")]);
        let hits = rank_options(&o, "  ", RankOpts { limit: Some(2), min_score: None });
        assert_eq!(hits.iter().map(|h| h.idx).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn non_matching_options_are_dropped() {
        let o = opts(&[("platform", "x"), ("billing", "y")]);
        let hits = rank_options(&o, "plat", RankOpts::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(o[hits[0].idx].label, "platform");
    }

    #[test]
    fn equal_scores_break_on_label() {
        let o = opts(&[("ops-b", "x"), ("ops-a", "x")]);
        let hits = rank_options(&o, "ops", RankOpts::default());
        assert_eq!(hits.len(), 2);
        assert_eq!(o[hits[0].idx].label, "ops-a");
    }
}
