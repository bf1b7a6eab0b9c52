//! Tax record aggregation.
//!
//! Turns a user's completed donations for a year into denormalized line
//! items and the rolled-up summary stored on the tax record. PDF layout
//! lives in [`crate::pdf`]; persistence in the tax record repository.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::matching::round_cents;
use crate::models::charity;
use crate::models::donation;
use crate::models::tax_record::{TaxLineItem, TaxSummary};

/// Inclusive UTC bounds of a calendar tax year. The year is clamped into
/// a range chrono can always represent, so this never panics on filter
/// input; handlers reject unreasonable years before any query runs.
pub fn year_bounds(tax_year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let year = tax_year.clamp(1, 9999);
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(year, 12, 31, 23, 59, 59).unwrap();
    (start, end)
}

/// Build per-donation line items, resolving charity names/EINs from the
/// supplied lookup. A donation is tax deductible unless its tax info says
/// otherwise.
pub fn build_line_items(
    donations: &[donation::Model],
    charities: &HashMap<Uuid, charity::Model>,
) -> Vec<TaxLineItem> {
    donations
        .iter()
        .map(|d| {
            let (name, ein) = charities
                .get(&d.charity_id)
                .map(|c| (c.name.clone(), c.ein.clone()))
                .unwrap_or_else(|| ("Unknown Charity".to_string(), String::new()));

            TaxLineItem {
                donation_id: d.id,
                charity_name: name,
                charity_ein: ein,
                amount: d.amount,
                date: d.created_at.with_timezone(&Utc),
                is_tax_deductible: d.tax_info.tax_deductible,
            }
        })
        .collect()
}

/// Roll up line items into the stored summary.
pub fn compute_summary(items: &[TaxLineItem]) -> TaxSummary {
    let mut total = 0.0;
    let mut deductible = 0.0;
    let mut eins = HashSet::new();

    for item in items {
        total += item.amount;
        if item.is_tax_deductible {
            deductible += item.amount;
        }
        eins.insert(item.charity_ein.as_str());
    }

    TaxSummary {
        total_donations: round_cents(total),
        total_tax_deductible: round_cents(deductible),
        donation_count: items.len() as i64,
        unique_charities: eins.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn item(amount: f64, ein: &str, deductible: bool) -> TaxLineItem {
        TaxLineItem {
            donation_id: Uuid::new_v4(),
            charity_name: format!("Charity {ein}"),
            charity_ein: ein.to_string(),
            amount,
            date: Utc::now(),
            is_tax_deductible: deductible,
        }
    }

    #[test]
    fn summary_sums_counts_and_distinct_eins() {
        let items = vec![
            item(100.0, "A", true),
            item(50.0, "A", true),
            item(25.0, "B", true),
        ];

        let summary = compute_summary(&items);
        assert_eq!(summary.total_donations, 175.0);
        assert_eq!(summary.total_tax_deductible, 175.0);
        assert_eq!(summary.donation_count, 3);
        assert_eq!(summary.unique_charities, 2);
    }

    #[test]
    fn non_deductible_amounts_stay_out_of_the_deductible_total() {
        let items = vec![item(100.0, "A", true), item(40.0, "B", false)];

        let summary = compute_summary(&items);
        assert_eq!(summary.total_donations, 140.0);
        assert_eq!(summary.total_tax_deductible, 100.0);
        assert_eq!(summary.donation_count, 2);
    }

    #[test]
    fn empty_year_has_empty_summary() {
        let summary = compute_summary(&[]);
        assert_eq!(summary.donation_count, 0);
        assert_eq!(summary.unique_charities, 0);
        assert_eq!(summary.total_donations, 0.0);
    }

    #[test]
    fn year_bounds_cover_the_whole_calendar_year() {
        let (start, end) = year_bounds(2024);
        assert_eq!(start.year(), 2024);
        assert_eq!(start.month(), 1);
        assert_eq!(start.day(), 1);
        assert_eq!(end.year(), 2024);
        assert_eq!(end.month(), 12);
        assert_eq!(end.day(), 31);
    }

    #[test]
    fn year_bounds_clamp_out_of_range_years() {
        let (start, _) = year_bounds(i32::MAX);
        assert_eq!(start.year(), 9999);

        let (start, end) = year_bounds(i32::MIN);
        assert_eq!(start.year(), 1);
        assert_eq!(end.year(), 1);
    }
}
