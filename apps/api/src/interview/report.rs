use std::collections::BTreeMap;

use crate::models::interview::{InterviewReport, InterviewSession, Speaker};
use crate::models::resume::ScoreBand;

pub const RESPONSE_QUALITY_KEY: &str = "response_quality";

/// Aggregates every evaluated answer into the final report. Depends on nothing
/// but the transcript, so rebuilding it from a stored session gives the same
/// report.
pub fn build_report(session: &InterviewSession) -> InterviewReport {
    let evaluations: Vec<_> = session
        .transcript
        .iter()
        .filter(|t| t.speaker == Speaker::Candidate)
        .filter_map(|t| t.evaluation.as_ref())
        .collect();

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for evaluation in &evaluations {
        for (criterion, score) in &evaluation.criteria {
            let entry = sums.entry(criterion.clone()).or_insert((0.0, 0));
            entry.0 += f64::from(*score);
            entry.1 += 1;
        }
        let entry = sums
            .entry(RESPONSE_QUALITY_KEY.to_string())
            .or_insert((0.0, 0));
        entry.0 += f64::from(evaluation.quality.quality_score);
        entry.1 += 1;
    }
    let scores_breakdown: BTreeMap<String, f64> = sums
        .into_iter()
        .map(|(criterion, (sum, n))| (criterion, round1(sum / n as f64)))
        .collect();

    let overall_score = if evaluations.is_empty() {
        0
    } else {
        let total: f64 = evaluations.iter().map(|e| f64::from(e.score)).sum();
        (total / evaluations.len() as f64).round().clamp(0.0, 100.0) as u8
    };
    let band = ScoreBand::from_score(overall_score);

    InterviewReport {
        session_id: session.id,
        summary_text: summary(band, evaluations.len(), &scores_breakdown),
        scores_breakdown,
        overall_score,
        band: band.as_str().to_string(),
        generated_at: session.updated_at,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn summary(band: ScoreBand, answered: usize, breakdown: &BTreeMap<String, f64>) -> String {
    let mut text = format!("{} {} answer(s) evaluated.", band.summary(), answered);

    // Ties keep the alphabetically first criterion.
    let strongest = breakdown
        .iter()
        .fold(None::<(&String, f64)>, |best, (k, v)| match best {
            Some((_, b)) if b >= *v => best,
            _ => Some((k, *v)),
        });
    let weakest = breakdown
        .iter()
        .fold(None::<(&String, f64)>, |worst, (k, v)| match worst {
            Some((_, w)) if w <= *v => worst,
            _ => Some((k, *v)),
        });

    if let (Some((best, best_score)), Some((worst, worst_score))) = (strongest, weakest) {
        if best == worst {
            text.push_str(&format!(" Scored {best_score:.1} on {}.", label(best)));
        } else {
            text.push_str(&format!(
                " Strongest area: {} ({best_score:.1}). Needs the most work: {} ({worst_score:.1}).",
                label(best),
                label(worst)
            ));
        }
    }
    text
}

fn label(criterion: &str) -> String {
    criterion.replace('_', " ")
}
