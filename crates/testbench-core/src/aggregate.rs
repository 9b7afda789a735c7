//! Pure reductions from run records to batch statistics.

use std::collections::BTreeMap;

use crate::domain::{BatchSummary, CategoryAccuracy, ComplianceBatchSummary, Emotion, RunRecord};

/// Rounded percentage of `part` in `whole`; `0` when `whole` is zero.
fn pct(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Emotion statistics over `records`.
///
/// `total` counts every record, errored ones included, so that a batch of
/// `n` scenarios always summarizes to `total == n`. Average confidence only
/// considers records that produced one.
pub fn summarize(records: &[RunRecord]) -> BatchSummary {
    let total = records.len();
    let correct_count = records.iter().filter(|r| r.is_correct()).count();
    let errored_count = records.iter().filter(|r| r.is_error()).count();

    let confidences: Vec<f64> = records
        .iter()
        .filter(|r| !r.is_error())
        .filter_map(|r| r.confidence)
        .collect();
    let avg_confidence_pct = if confidences.is_empty() {
        0
    } else {
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        (100.0 * mean).round() as u32
    };

    let per_category = Emotion::ALL
        .iter()
        .map(|&label| {
            let subset = records
                .iter()
                .filter(|r| r.expected_emotion() == Some(label));
            let (correct, total) = subset.fold((0, 0), |(c, t), r| {
                (c + usize::from(r.is_correct()), t + 1)
            });
            (
                label,
                CategoryAccuracy {
                    correct,
                    total,
                    accuracy_pct: pct(correct, total),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    BatchSummary {
        total,
        correct_count,
        errored_count,
        accuracy_pct: pct(correct_count, total),
        avg_confidence_pct,
        per_category,
    }
}

/// Compliance statistics over the compliance-shaped records in `records`.
pub fn summarize_compliance(records: &[RunRecord]) -> ComplianceBatchSummary {
    let total = records.len();
    let errored_count = records.iter().filter(|r| r.is_error()).count();

    let scored: Vec<_> = records
        .iter()
        .filter_map(|r| r.result().and_then(|res| res.as_compliance()).map(|c| (r, c)))
        .collect();

    let expectations_checked = scored
        .iter()
        .filter(|(r, _)| r.expectation_met.is_some())
        .count();
    let expectations_met = scored
        .iter()
        .filter(|(r, _)| r.expectation_met == Some(true))
        .count();

    let avg_score = if scored.is_empty() {
        0.0
    } else {
        let mean = scored.iter().map(|(_, c)| c.overall_score).sum::<f64>() / scored.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    let mut rule_counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (_, analysis) in &scored {
        for (rule, passed) in &analysis.summary.rules {
            let entry = rule_counts.entry(rule.clone()).or_default();
            entry.0 += usize::from(*passed);
            entry.1 += 1;
        }
    }
    let rule_pass_pct = rule_counts
        .into_iter()
        .map(|(rule, (passed, seen))| (rule, pct(passed, seen)))
        .collect();

    ComplianceBatchSummary {
        total,
        errored_count,
        scored: scored.len(),
        expectations_met,
        expectations_checked,
        avg_score,
        rule_pass_pct,
    }
}
