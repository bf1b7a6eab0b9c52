//! In-memory aggregation helpers for dashboards, summaries and CSV reports.
//!
//! Every reporting endpoint follows the same pattern: fetch the candidate
//! donations, then make one linear pass here to sum, count, collect distinct
//! ids and bucket by a secondary key. Nothing is grouped database-side.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::matching::round_cents;
use crate::models::donation;

/// Flat totals over a set of donations.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DonationTotals {
    pub total_amount: f64,
    pub total_matching: f64,
    pub total_combined: f64,
    pub donation_count: i64,
    pub unique_donors: i64,
    pub unique_charities: i64,
}

impl DonationTotals {
    pub fn collect<'a, I>(donations: I) -> Self
    where
        I: IntoIterator<Item = &'a donation::Model>,
    {
        let mut totals = DonationTotals::default();
        let mut donors = HashSet::new();
        let mut charities = HashSet::new();

        for d in donations {
            totals.total_amount += d.amount;
            totals.total_matching += d.matching_amount;
            totals.total_combined += d.total_amount;
            totals.donation_count += 1;
            donors.insert(d.user_id);
            charities.insert(d.charity_id);
        }

        totals.total_amount = round_cents(totals.total_amount);
        totals.total_matching = round_cents(totals.total_matching);
        totals.total_combined = round_cents(totals.total_combined);
        totals.unique_donors = donors.len() as i64;
        totals.unique_charities = charities.len() as i64;
        totals
    }
}

/// Per-month totals, keyed "YYYY-MM".
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyBucket {
    pub month: String,
    pub total_amount: f64,
    pub matching_amount: f64,
    pub donation_count: i64,
}

/// Bucket donations by calendar month of creation, in chronological order.
pub fn monthly_breakdown<'a, I>(donations: I) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = &'a donation::Model>,
{
    let mut buckets: BTreeMap<String, MonthlyBucket> = BTreeMap::new();

    for d in donations {
        let key = d.created_at.format("%Y-%m").to_string();
        let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyBucket {
            month: key,
            total_amount: 0.0,
            matching_amount: 0.0,
            donation_count: 0,
        });
        bucket.total_amount += d.total_amount;
        bucket.matching_amount += d.matching_amount;
        bucket.donation_count += 1;
    }

    buckets
        .into_values()
        .map(|mut b| {
            b.total_amount = round_cents(b.total_amount);
            b.matching_amount = round_cents(b.matching_amount);
            b
        })
        .collect()
}

/// Totals for one group (charity, company, department) of donations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupTotals {
    pub name: String,
    pub total_amount: f64,
    pub donation_count: i64,
    pub unique_donors: i64,
}

/// Group donations by a caller-supplied key, resolve display names, and
/// return groups sorted by total amount descending, truncated to `limit`.
pub fn top_groups<'a, I, K, N>(donations: I, key_of: K, name_of: N, limit: usize) -> Vec<GroupTotals>
where
    I: IntoIterator<Item = &'a donation::Model>,
    K: Fn(&donation::Model) -> Uuid,
    N: Fn(Uuid) -> String,
{
    struct Acc {
        total: f64,
        count: i64,
        donors: HashSet<Uuid>,
    }

    let mut groups: HashMap<Uuid, Acc> = HashMap::new();
    for d in donations {
        let acc = groups.entry(key_of(d)).or_insert_with(|| Acc {
            total: 0.0,
            count: 0,
            donors: HashSet::new(),
        });
        acc.total += d.total_amount;
        acc.count += 1;
        acc.donors.insert(d.user_id);
    }

    let mut out: Vec<GroupTotals> = groups
        .into_iter()
        .map(|(id, acc)| GroupTotals {
            name: name_of(id),
            total_amount: round_cents(acc.total),
            donation_count: acc.count,
            unique_donors: acc.donors.len() as i64,
        })
        .collect();

    out.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out.truncate(limit);
    out
}

/// One row of a donation CSV export.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub date: String,
    pub employee: String,
    pub charity: String,
    pub amount: f64,
    pub matching_amount: f64,
    pub total_amount: f64,
    pub status: String,
}

/// Join donation rows with the resolved employee and charity names.
pub fn csv_rows(
    donations: &[donation::Model],
    users: &HashMap<Uuid, crate::models::user::Model>,
    charities: &HashMap<Uuid, crate::models::charity::Model>,
) -> Vec<CsvRow> {
    donations
        .iter()
        .map(|d| CsvRow {
            date: d.created_at.format("%Y-%m-%d").to_string(),
            employee: users
                .get(&d.user_id)
                .map(|u| u.full_name())
                .unwrap_or_else(|| "Unknown".to_string()),
            charity: charities
                .get(&d.charity_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown Charity".to_string()),
            amount: d.amount,
            matching_amount: d.matching_amount,
            total_amount: d.total_amount,
            status: format!("{:?}", d.status).to_lowercase(),
        })
        .collect()
}

/// Render donation rows as CSV with a fixed header.
pub fn donations_csv(rows: &[CsvRow]) -> String {
    let mut csv = String::from("Date,Employee,Charity,Amount,Matching Amount,Total Amount,Status\n");
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{:.2},{:.2},{:.2},{}\n",
            csv_escape(&row.date),
            csv_escape(&row.employee),
            csv_escape(&row.charity),
            row.amount,
            row.matching_amount,
            row.total_amount,
            csv_escape(&row.status),
        ));
    }
    csv
}

/// Quote a CSV field when it contains a comma, quote or newline, doubling
/// any embedded quotes.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        let escaped = s.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}
