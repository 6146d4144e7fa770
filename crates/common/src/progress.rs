//! Dashboard progress overview

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::domain::TestResultRecord;

pub const CHART_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// Short form such as "Mar 4"
    pub label: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub total_materials: u64,
    pub tests_taken: usize,
    pub average_score: u8,
    pub chart: Vec<ChartPoint>,
}

impl ProgressOverview {
    /// Summarise `results` as of `today` (UTC calendar days)
    pub fn build(total_materials: u64, results: &[TestResultRecord], today: NaiveDate) -> Self {
        Self {
            total_materials,
            tests_taken: results.len(),
            average_score: rounded_mean(results.iter().map(|r| r.score)),
            chart: chart(results, today),
        }
    }
}

fn rounded_mean(scores: impl Iterator<Item = u8>) -> u8 {
    let (total, count) = scores.fold((0u64, 0u64), |(total, count), score| {
        (total + u64::from(score), count + 1)
    });
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as u8
}

fn point(date: NaiveDate, score: u8) -> ChartPoint {
    ChartPoint {
        date,
        label: date.format("%b %-d").to_string(),
        score,
    }
}

/// Daily averages for the last seven days, oldest first. If every day is
/// empty but there are older results, the single most recent result is
/// charted instead.
fn chart(results: &[TestResultRecord], today: NaiveDate) -> Vec<ChartPoint> {
    let days: Vec<ChartPoint> = (0..CHART_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|day| {
            let score = rounded_mean(
                results
                    .iter()
                    .filter(|r| r.completion_date.date_naive() == day)
                    .map(|r| r.score),
            );
            point(day, score)
        })
        .collect();

    if days.iter().any(|p| p.score > 0) {
        return days;
    }

    match results.iter().max_by_key(|r| r.completion_date) {
        Some(latest) => vec![point(latest.completion_date.date_naive(), latest.score)],
        None => days,
    }
}
