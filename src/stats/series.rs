//! Pure helpers that turn sparse aggregates into dashboard figures.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::types::{ChartSeries, TeamLeadPerformance};
use crate::date_util::{iso_week_of, month_abbrev, start_of_iso_week};

pub const WEEKS_IN_CHART: usize = 8;
pub const TOP_TEAM_LEADS: usize = 5;

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// `part / total` as a percentage with one decimal; 0 when `total` is 0.
pub fn completion_rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

/// Mean of `completed - created` in hours, one decimal; 0 for an empty set.
pub fn average_hours(spans: &[(DateTime<Utc>, DateTime<Utc>)]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    let total_ms: i64 = spans
        .iter()
        .map(|(created, completed)| (*completed - *created).num_milliseconds())
        .sum();
    round1(total_ms as f64 / 3_600_000.0 / spans.len() as f64)
}

/// Twelve monthly buckets (Jan..Dec) from counts keyed by month number.
pub fn monthly_series(by_month: &HashMap<u32, u64>) -> ChartSeries {
    let mut series = ChartSeries::default();
    for m in 1..=12u32 {
        series.labels.push(month_abbrev(m).to_string());
        series.counts.push(by_month.get(&m).copied().unwrap_or(0));
    }
    series
}

/// Four quarterly buckets (Q1..Q4) folded from counts keyed by month number.
pub fn quarterly_series(by_month: &HashMap<u32, u64>) -> ChartSeries {
    let mut counts = [0u64; 4];
    for (&month, &n) in by_month {
        if (1..=12).contains(&month) {
            counts[((month - 1) / 3) as usize] += n;
        }
    }
    ChartSeries {
        labels: (1..=4).map(|q| format!("Q{q}")).collect(),
        counts: counts.to_vec(),
    }
}

/// First day covered by the weekly chart ending in the week of `today`.
pub fn weekly_window_start(today: NaiveDate) -> NaiveDate {
    start_of_iso_week(today) - Duration::weeks(WEEKS_IN_CHART as i64 - 1)
}

/// Eight ISO-week buckets ending with the week containing `today`.
/// Timestamps outside the window are ignored.
pub fn weekly_series(timestamps: &[DateTime<Utc>], today: NaiveDate) -> ChartSeries {
    let first_monday = weekly_window_start(today);
    let mondays: Vec<NaiveDate> = (0..WEEKS_IN_CHART as i64)
        .map(|i| first_monday + Duration::weeks(i))
        .collect();

    let mut by_week: HashMap<NaiveDate, u64> = HashMap::new();
    for ts in timestamps {
        *by_week.entry(start_of_iso_week(ts.date_naive())).or_insert(0) += 1;
    }

    ChartSeries {
        labels: mondays
            .iter()
            .map(|d| format!("W{}", iso_week_of(*d)))
            .collect(),
        counts: mondays
            .iter()
            .map(|d| by_week.get(d).copied().unwrap_or(0))
            .collect(),
    }
}

/// Highest completion rate first; ties go to more completed work, then name.
pub fn rank_team_leads(mut leads: Vec<TeamLeadPerformance>) -> Vec<TeamLeadPerformance> {
    leads.sort_by(|a, b| {
        b.completion_rate
            .total_cmp(&a.completion_rate)
            .then(b.completed_subtasks.cmp(&a.completed_subtasks))
            .then_with(|| a.name.cmp(&b.name))
    });
    leads.truncate(TOP_TEAM_LEADS);
    leads
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn lead(name: &str, total: u64, completed: u64) -> TeamLeadPerformance {
        TeamLeadPerformance {
            id: name.to_lowercase(),
            name: name.to_string(),
            total_subtasks: total,
            completed_subtasks: completed,
            completion_rate: completion_rate(completed, total),
        }
    }

    #[test]
    fn test_completion_rate_zero_total() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(5, 0), 0.0);
    }

    #[test]
    fn test_completion_rate_rounds_to_one_decimal() {
        assert_eq!(completion_rate(1, 3), 33.3);
        assert_eq!(completion_rate(2, 3), 66.7);
        assert_eq!(completion_rate(4, 4), 100.0);
    }

    #[test]
    fn test_average_hours() {
        assert_eq!(average_hours(&[]), 0.0);
        assert_eq!(average_hours(&[(at(2025, 1, 1, 8), at(2025, 1, 1, 10))]), 2.0);
        assert_eq!(
            average_hours(&[
                (at(2025, 1, 1, 0), at(2025, 1, 1, 1)),
                (at(2025, 1, 1, 0), at(2025, 1, 1, 4)),
            ]),
            2.5
        );
    }

    #[test]
    fn test_monthly_series_is_dense() {
        let sparse = HashMap::from([(2, 3), (11, 1)]);
        let series = monthly_series(&sparse);
        assert_eq!(series.labels.len(), 12);
        assert_eq!(series.counts.len(), 12);
        assert_eq!(series.labels[0], "Jan");
        assert_eq!(series.labels[11], "Dec");
        assert_eq!(series.counts, vec![0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0]);

        let empty = monthly_series(&HashMap::new());
        assert_eq!(empty.counts, vec![0; 12]);
    }

    #[test]
    fn test_quarterly_series_folds_months() {
        let sparse = HashMap::from([(1, 1), (3, 2), (4, 5), (12, 7)]);
        let series = quarterly_series(&sparse);
        assert_eq!(series.labels, vec!["Q1", "Q2", "Q3", "Q4"]);
        assert_eq!(series.counts, vec![3, 5, 0, 7]);
    }

    #[test]
    fn test_weekly_series_window() {
        // Wednesday of ISO week 25, 2025
        let today = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
        let stamps = vec![
            at(2025, 6, 16, 9),  // week 25
            at(2025, 6, 22, 23), // week 25 (Sunday)
            at(2025, 4, 28, 9),  // week 18, first bucket
            at(2025, 4, 27, 9),  // week 17, outside window
        ];
        let series = weekly_series(&stamps, today);
        assert_eq!(series.labels.len(), WEEKS_IN_CHART);
        assert_eq!(series.labels.first().map(String::as_str), Some("W18"));
        assert_eq!(series.labels.last().map(String::as_str), Some("W25"));
        assert_eq!(series.counts, vec![1, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_weekly_series_crosses_year_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(); // week 2
        let series = weekly_series(&[at(2024, 11, 25, 12)], today);
        assert_eq!(
            series.labels,
            vec!["W47", "W48", "W49", "W50", "W51", "W52", "W1", "W2"]
        );
        assert_eq!(series.counts, vec![0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_rank_team_leads() {
        let ranked = rank_team_leads(vec![
            lead("Ada", 4, 2),
            lead("Bo", 2, 2),
            lead("Cy", 10, 5),
            lead("Di", 0, 0),
            lead("Ed", 3, 1),
            lead("Fu", 1, 1),
            lead("Gil", 5, 4),
        ]);
        let names: Vec<&str> = ranked.iter().map(|l| l.name.as_str()).collect();
        // Bo and Fu tie at 100%: Bo has more completed. Cy beats Ada at 50% the same way.
        assert_eq!(names, vec!["Bo", "Fu", "Gil", "Cy", "Ada"]);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].completion_rate >= w[1].completion_rate));
    }
}
