//! Employer matching computation.
//!
//! Pure arithmetic over a company's matching program. The caller supplies the
//! remaining annual budget so the check-and-reserve against the yearly cap
//! can happen inside the same database transaction as the donation insert.

use crate::models::company::{MatchType, MatchingProgram};

/// Result of applying a matching program to one contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub matching_amount: f64,
    pub total_amount: f64,
}

/// Compute the employer match for `amount` under `program`.
///
/// The raw match is `amount * percentage / 100` for percentage programs or
/// the flat `fixed_amount`, capped per employee by `max_match_per_employee`
/// and trimmed to the remaining annual budget when a limit is configured.
/// Disabled programs and the `none` match type yield a zero match.
pub fn compute_match(program: &MatchingProgram, amount: f64) -> MatchOutcome {
    if !program.enabled {
        return MatchOutcome {
            matching_amount: 0.0,
            total_amount: round_cents(amount),
        };
    }

    let raw = match program.match_type {
        MatchType::Percentage => amount * program.percentage.unwrap_or(0.0) / 100.0,
        MatchType::Fixed => program.fixed_amount.unwrap_or(0.0),
        MatchType::None => 0.0,
    };

    let mut matching = match program.max_match_per_employee {
        Some(cap) => raw.min(cap),
        None => raw,
    };

    if let Some(limit) = program.annual_limit {
        let remaining = (limit - program.used_amount).max(0.0);
        matching = matching.min(remaining);
    }

    let matching = round_cents(matching.max(0.0));
    MatchOutcome {
        matching_amount: matching,
        total_amount: round_cents(amount + matching),
    }
}

/// Round a currency amount to whole cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
