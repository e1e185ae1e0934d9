//! Spend-vs-budget series for the dashboard chart.
//!
//! Entries are bucketed by calendar day (`last-month`) or calendar month
//! (`last-6-months`, `last-12-months`). Every bucket of the window is emitted,
//! oldest first, including empty ones.
//!
//! Month buckets compare their own total against the budget limit. Day buckets
//! compare the month-to-date running total, so the opening month of a
//! `last-month` window also counts entries dated before the window start.
//!
//! Sums saturate at `Decimal::MAX` rather than overflow.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::database::models::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisRange {
    #[serde(rename = "last-month")]
    LastMonth,
    #[serde(rename = "last-6-months")]
    LastSixMonths,
    #[serde(rename = "last-12-months")]
    LastTwelveMonths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

impl AnalysisRange {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "last-month" => Some(AnalysisRange::LastMonth),
            "last-6-months" => Some(AnalysisRange::LastSixMonths),
            "last-12-months" => Some(AnalysisRange::LastTwelveMonths),
            _ => None,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            AnalysisRange::LastMonth => Granularity::Day,
            AnalysisRange::LastSixMonths | AnalysisRange::LastTwelveMonths => Granularity::Month,
        }
    }

    /// First and last day (inclusive) of the window ending on `today`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            AnalysisRange::LastMonth => today
                .checked_sub_months(Months::new(1))
                .and_then(|d| d.succ_opt())
                .unwrap_or(today),
            AnalysisRange::LastSixMonths => months_back(first_of_month(today), 5),
            AnalysisRange::LastTwelveMonths => months_back(first_of_month(today), 11),
        };
        (start, today)
    }

    /// Earliest entry date that influences the result.
    pub fn fetch_from(&self, today: NaiveDate) -> NaiveDate {
        let (start, _) = self.window(today);
        match self.granularity() {
            Granularity::Day => first_of_month(start),
            Granularity::Month => start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entry_count: usize,
    pub total: Decimal,
    pub cumulative: Decimal,
    pub exceeded: bool,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAnalysis {
    pub range: AnalysisRange,
    pub granularity: Granularity,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub budget_limit: Decimal,
    pub buckets: Vec<Bucket>,
    pub total_spent: Decimal,
    pub average_per_bucket: Decimal,
    pub exceeded_count: usize,
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d - Days::new(u64::from(d.day0()))
}

fn months_back(d: NaiveDate, n: u32) -> NaiveDate {
    d.checked_sub_months(Months::new(n)).unwrap_or(NaiveDate::MIN)
}

fn month_index(d: NaiveDate) -> i64 {
    i64::from(d.year()) * 12 + i64::from(d.month0())
}

fn empty_bucket(label: String, start: NaiveDate, end: NaiveDate) -> Bucket {
    Bucket {
        label,
        start,
        end,
        entry_count: 0,
        total: Decimal::ZERO,
        cumulative: Decimal::ZERO,
        exceeded: false,
        remaining: Decimal::ZERO,
    }
}

fn layout(granularity: Granularity, start: NaiveDate, end: NaiveDate) -> Vec<Bucket> {
    match granularity {
        Granularity::Day => start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| empty_bucket(d.format("%Y-%m-%d").to_string(), d, d))
            .collect(),
        Granularity::Month => {
            let mut buckets = Vec::new();
            let mut month_start = start;
            while month_start <= end {
                let next = month_start
                    .checked_add_months(Months::new(1))
                    .unwrap_or(NaiveDate::MAX);
                let month_end = next.pred_opt().unwrap_or(next).min(end);
                buckets.push(empty_bucket(
                    month_start.format("%Y-%m").to_string(),
                    month_start,
                    month_end,
                ));
                if next == NaiveDate::MAX {
                    break;
                }
                month_start = next;
            }
            buckets
        }
    }
}

/// Aggregates `entries` into the buckets of `range` as seen on `today`.
/// Entries outside the window are ignored.
pub fn analyze(
    range: AnalysisRange,
    today: NaiveDate,
    budget_limit: Decimal,
    entries: &[Entry],
) -> BudgetAnalysis {
    let granularity = range.granularity();
    let (start, end) = range.window(today);
    let mut buckets = layout(granularity, start, end);

    // month-to-date spend before the first day bucket
    let mut carry = Decimal::ZERO;

    for entry in entries.iter().filter(|e| e.date <= end) {
        if entry.date < start {
            if granularity == Granularity::Day && month_index(entry.date) == month_index(start) {
                carry = carry.saturating_add(entry.price);
            }
            continue;
        }

        let idx = match granularity {
            Granularity::Day => (entry.date - start).num_days(),
            Granularity::Month => month_index(entry.date) - month_index(start),
        };
        if let Some(bucket) = usize::try_from(idx).ok().and_then(|i| buckets.get_mut(i)) {
            bucket.total = bucket.total.saturating_add(entry.price);
            bucket.entry_count += 1;
        }
    }

    let mut running = Decimal::ZERO;
    let mut month_to_date = carry;
    let mut current_month = month_index(start);

    for bucket in buckets.iter_mut() {
        let compared = match granularity {
            Granularity::Day => {
                if month_index(bucket.start) != current_month {
                    current_month = month_index(bucket.start);
                    month_to_date = Decimal::ZERO;
                }
                month_to_date = month_to_date.saturating_add(bucket.total);
                bucket.cumulative = month_to_date;
                month_to_date
            }
            Granularity::Month => {
                running = running.saturating_add(bucket.total);
                bucket.cumulative = running;
                bucket.total
            }
        };

        bucket.exceeded = compared > budget_limit;
        bucket.remaining = (budget_limit - compared).max(Decimal::ZERO);
    }

    let total_spent = buckets
        .iter()
        .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.total));
    let average_per_bucket = if buckets.is_empty() {
        Decimal::ZERO
    } else {
        (total_spent / Decimal::from(buckets.len())).round_dp(2)
    };
    let exceeded_count = buckets.iter().filter(|b| b.exceeded).count();

    BudgetAnalysis {
        range,
        granularity,
        from: start,
        to: end,
        budget_limit,
        buckets,
        total_spent,
        average_per_bucket,
        exceeded_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(day: &str, price: Decimal) -> Entry {
        Entry {
            id: 0,
            user_id: 1,
            title: format!("spend on {day}"),
            price,
            date: date(day),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_range_keywords() {
        assert_eq!(AnalysisRange::parse("last-month"), Some(AnalysisRange::LastMonth));
        assert_eq!(AnalysisRange::parse("last-6-months"), Some(AnalysisRange::LastSixMonths));
        assert_eq!(AnalysisRange::parse("last-12-months"), Some(AnalysisRange::LastTwelveMonths));
        assert_eq!(AnalysisRange::parse("last-week"), None);
        assert_eq!(AnalysisRange::parse(""), None);
    }

    #[test]
    fn test_six_month_window_has_one_bucket_per_month() {
        let analysis = analyze(AnalysisRange::LastSixMonths, date("2025-03-15"), dec!(100), &[]);

        let labels: Vec<&str> = analysis.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["2024-10", "2024-11", "2024-12", "2025-01", "2025-02", "2025-03"]);
        assert_eq!(analysis.from, date("2024-10-01"));
        assert_eq!(analysis.to, date("2025-03-15"));
        assert_eq!(analysis.buckets[5].end, date("2025-03-15"));
        assert_eq!(analysis.buckets[4].end, date("2025-02-28"));
        assert_eq!(analysis.granularity, Granularity::Month);
    }

    #[test]
    fn test_month_buckets_compare_own_total() {
        let entries = vec![
            entry("2024-09-30", dec!(999)), // before window
            entry("2025-01-05", dec!(120)),
            entry("2025-01-20", dec!(50)),
            entry("2025-02-14", dec!(40)),
            entry("2025-03-16", dec!(999)), // after today
        ];
        let analysis = analyze(AnalysisRange::LastSixMonths, date("2025-03-15"), dec!(100), &entries);

        let jan = &analysis.buckets[3];
        assert_eq!(jan.label, "2025-01");
        assert_eq!(jan.total, dec!(170));
        assert_eq!(jan.entry_count, 2);
        assert!(jan.exceeded);
        assert_eq!(jan.remaining, dec!(0));

        let feb = &analysis.buckets[4];
        assert_eq!(feb.total, dec!(40));
        assert!(!feb.exceeded);
        assert_eq!(feb.remaining, dec!(60));
        assert_eq!(feb.cumulative, dec!(210));

        let mar = &analysis.buckets[5];
        assert_eq!(mar.total, dec!(0));
        assert_eq!(mar.remaining, dec!(100));

        assert_eq!(analysis.total_spent, dec!(210));
        assert_eq!(analysis.average_per_bucket, dec!(35));
        assert_eq!(analysis.exceeded_count, 1);
    }

    #[test]
    fn test_twelve_month_window() {
        let analysis = analyze(AnalysisRange::LastTwelveMonths, date("2025-03-31"), dec!(10), &[]);
        assert_eq!(analysis.buckets.len(), 12);
        assert_eq!(analysis.buckets[0].label, "2024-04");
        assert_eq!(analysis.buckets[11].label, "2025-03");
        assert_eq!(analysis.exceeded_count, 0);
    }

    #[test]
    fn test_last_month_uses_day_buckets() {
        let analysis = analyze(AnalysisRange::LastMonth, date("2025-03-15"), dec!(100), &[]);
        assert_eq!(analysis.granularity, Granularity::Day);
        assert_eq!(analysis.buckets.len(), 28);
        assert_eq!(analysis.buckets[0].label, "2025-02-16");
        assert_eq!(analysis.buckets[27].label, "2025-03-15");
    }

    #[test]
    fn test_last_month_clamps_short_months() {
        let (start, end) = AnalysisRange::LastMonth.window(date("2025-03-31"));
        assert_eq!(start, date("2025-03-01"));
        assert_eq!(end, date("2025-03-31"));
        assert_eq!(AnalysisRange::LastMonth.fetch_from(date("2025-03-15")), date("2025-02-01"));
    }

    #[test]
    fn test_day_buckets_track_month_to_date() {
        let entries = vec![
            entry("2025-02-10", dec!(80)), // before window, same month as its start
            entry("2025-02-20", dec!(30)),
            entry("2025-03-01", dec!(5)),
            entry("2025-03-01", dec!(5)),
        ];
        let analysis = analyze(AnalysisRange::LastMonth, date("2025-03-15"), dec!(100), &entries);

        let feb_16 = &analysis.buckets[0];
        assert_eq!(feb_16.cumulative, dec!(80));
        assert_eq!(feb_16.remaining, dec!(20));
        assert!(!feb_16.exceeded);

        let feb_20 = &analysis.buckets[4];
        assert_eq!(feb_20.label, "2025-02-20");
        assert_eq!(feb_20.total, dec!(30));
        assert_eq!(feb_20.cumulative, dec!(110));
        assert!(feb_20.exceeded);
        assert_eq!(feb_20.remaining, dec!(0));

        let mar_1 = &analysis.buckets[13];
        assert_eq!(mar_1.label, "2025-03-01");
        assert_eq!(mar_1.total, dec!(10));
        assert_eq!(mar_1.cumulative, dec!(10));
        assert!(!mar_1.exceeded);

        // carry is not part of the window's spend
        assert_eq!(analysis.total_spent, dec!(40));
        assert_eq!(analysis.exceeded_count, 9);
    }

    #[test]
    fn test_zero_limit() {
        let entries = vec![entry("2025-03-02", dec!(0.01))];
        let analysis = analyze(AnalysisRange::LastSixMonths, date("2025-03-15"), dec!(0), &entries);
        assert!(!analysis.buckets[0].exceeded);
        assert!(analysis.buckets[5].exceeded);
        assert_eq!(analysis.buckets[5].remaining, dec!(0));
    }

    #[test]
    fn test_huge_totals_saturate() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let entries = vec![
            entry("2025-02-01", huge),
            entry("2025-02-02", huge),
            entry("2025-03-01", huge),
        ];

        let monthly = analyze(AnalysisRange::LastSixMonths, date("2025-03-15"), Decimal::MAX, &entries);
        assert_eq!(monthly.buckets[4].total, Decimal::MAX);
        assert_eq!(monthly.buckets[5].cumulative, Decimal::MAX);
        assert_eq!(monthly.total_spent, Decimal::MAX);
        assert_eq!(monthly.exceeded_count, 0);

        let daily = analyze(AnalysisRange::LastMonth, date("2025-03-01"), dec!(100), &entries);
        assert_eq!(daily.buckets.last().map(|b| b.cumulative), Some(huge));
        assert!(daily.buckets.iter().all(|b| b.remaining >= Decimal::ZERO));
        assert_eq!(daily.total_spent, Decimal::MAX);
    }
}
