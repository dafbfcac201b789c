//! Small-number disclosure control
//!
//! A count column of one measure table (its numerators, or its denominators) is a
//! stratification. Within a stratification:
//!
//! 1. every count in `1..threshold` is replaced by [`CountCell::Suppressed`];
//! 2. if anything was suppressed and no cell is rounded yet, the smallest remaining
//!    non-zero count is rounded half-to-even to a multiple of the rounding base.
//!
//! The two columns are suppressed independently, so a row can come out with an
//! emitted numerator above its emitted denominator (a numerator of 13 rounded up
//! to 15 over a denominator of 13). Such a numerator is lowered to the largest
//! multiple of the rounding base not above the denominator and emitted as rounded.
//!
//! Zero is never disclosive. A column that already carries a rounded cell is
//! considered protected, so applying the engine twice gives the same table.

use crate::table::{CountCell, MeasureTable, rate};
use cohort_diagnostics::{CohortError, Result};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionPolicy {
    /// Counts strictly below this (and above zero) are redacted
    pub threshold: u64,
    pub rounding_base: u64,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            threshold: 8,
            rounding_base: 5,
        }
    }
}

impl SuppressionPolicy {
    pub fn new(threshold: u64, rounding_base: u64) -> Self {
        Self {
            threshold,
            rounding_base,
        }
    }

    pub fn is_disclosive(&self, count: u64) -> bool {
        count > 0 && count < self.threshold
    }
}

/// Round `n` to the nearest multiple of `base`, ties to the even multiple.
/// A zero base leaves `n` unchanged.
pub fn round_half_even(n: u64, base: u64) -> u64 {
    if base == 0 {
        return n;
    }
    let quotient = n / base;
    let remainder = n % base;
    let twice = remainder.saturating_mul(2);
    let rounded_quotient = if twice < base {
        quotient
    } else if twice > base {
        quotient + 1
    } else if quotient % 2 == 0 {
        quotient
    } else {
        quotient + 1
    };
    rounded_quotient.saturating_mul(base)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressionEngine {
    policy: SuppressionPolicy,
}

impl SuppressionEngine {
    pub fn new(policy: SuppressionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SuppressionPolicy {
        &self.policy
    }

    /// Suppress one stratification
    pub fn suppress(&self, counts: &[CountCell]) -> Vec<CountCell> {
        let mut out: Vec<CountCell> = counts
            .iter()
            .map(|cell| match *cell {
                CountCell::Count(n) if self.policy.is_disclosive(n) => CountCell::Suppressed,
                other => other,
            })
            .collect();

        let any_suppressed = out.iter().any(CountCell::is_suppressed);
        let protected = out.iter().any(CountCell::is_rounded);
        if any_suppressed && !protected {
            let smallest = out
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| match cell {
                    CountCell::Count(n) if *n > 0 => Some((i, *n)),
                    _ => None,
                })
                .min_by_key(|&(_, n)| n);
            if let Some((index, n)) = smallest {
                out[index] = CountCell::Rounded(round_half_even(n, self.policy.rounding_base));
            }
        }
        out
    }

    /// Keep an emitted numerator within its row's emitted denominator
    fn clamp_numerator(&self, numerator: CountCell, denominator: CountCell) -> CountCell {
        match (numerator.value(), denominator.value()) {
            (Some(n), Some(d)) if n > d => {
                let base = self.policy.rounding_base;
                let floor = if base == 0 { d } else { d - d % base };
                CountCell::Rounded(floor)
            }
            _ => numerator,
        }
    }

    /// Suppress both count columns of a table, recompute rates from the emitted
    /// counts, and verify that nothing disclosive is left.
    pub fn apply(&self, table: &mut MeasureTable) -> Result<()> {
        let numerators = self.suppress(&table.numerators());
        let denominators = self.suppress(&table.denominators());

        for ((row, numerator), denominator) in
            table.rows.iter_mut().zip(numerators).zip(denominators)
        {
            row.numerator = self.clamp_numerator(numerator, denominator);
            row.denominator = denominator;
            row.rate = rate(row.numerator, denominator);
        }
        table.suppression_applied = true;

        let suppressed = table.suppressed_cells();
        if suppressed > 0 {
            warn!(
                "measure '{}': {} cell(s) suppressed below {}",
                table.measure_id, suppressed, self.policy.threshold
            );
        }
        self.verify(table)
    }

    /// Check an emitted table for a leaked small count
    pub fn verify(&self, table: &MeasureTable) -> Result<()> {
        for row in &table.rows {
            let label = row.group_label();
            if row.rate.is_some() && (row.numerator.is_suppressed() || row.denominator.is_suppressed()) {
                return Err(CohortError::suppression_violation(
                    &table.measure_id,
                    format!("group '{}' reports a rate derived from a suppressed count", label),
                ));
            }
            for cell in [row.numerator, row.denominator] {
                if let CountCell::Count(n) = cell {
                    if self.policy.is_disclosive(n) {
                        return Err(CohortError::suppression_violation(
                            &table.measure_id,
                            format!("group '{}' emits unsuppressed count {}", label, n),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
