//! Turns an amount and a split strategy into the per-member `Split` of an
//! event.
//!
//! Shares are truncated to the currency precision and whatever is left over
//! goes to a single member, so the shares always add up to the amount
//! exactly. The residual receiver is the first id in the caller's list
//! (equal split) or the first entry with a positive weight (weighted split).
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::{LedgerError, LedgerResult};
use crate::money::{ensure_amount, truncate, DEFAULT_PRECISION, HUNDRED, PERCENT_TOLERANCE};
use crate::schemas::{Member, MemberId, Split};

/// Percentage assigned to a member in a weighted split.
pub type Weight = (MemberId, Decimal);

#[derive(Clone, Copy, Debug)]
pub struct Splitter<'g> {
    members: &'g [Member],
    precision: u32,
}

impl<'g> Splitter<'g> {
    pub fn new(members: &'g [Member]) -> Self {
        Self {
            members,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    fn is_member(&self, id: &str) -> bool {
        self.members.iter().any(|member| member.id == id)
    }

    /// Divides `amount` evenly among `member_ids`.
    pub fn equal(&self, amount: Decimal, member_ids: &[MemberId]) -> LedgerResult<Split> {
        ensure_amount(amount, self.precision)?;
        if member_ids.is_empty() {
            return Err(LedgerError::InvalidSplitInput(
                "at least one member must share the expense".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in member_ids {
            if !self.is_member(id) {
                return Err(LedgerError::UnknownMember(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(LedgerError::InvalidSplitInput(format!(
                    "\"{id}\" listed twice"
                )));
            }
        }

        let share = truncate(amount / Decimal::from(member_ids.len()), self.precision);
        let mut split: Split = member_ids.iter().map(|id| (id.clone(), share)).collect();
        let residual = amount - share * Decimal::from(member_ids.len());
        if let Some(first) = split.get_mut(&member_ids[0]) {
            *first += residual;
        }

        tracing::debug!(%amount, members = member_ids.len(), %share, %residual, "equal split");
        Ok(split)
    }

    /// Divides `amount` by percentage. The weights must add up to 100.
    pub fn weighted(&self, amount: Decimal, weights: &[Weight]) -> LedgerResult<Split> {
        ensure_amount(amount, self.precision)?;
        if weights.is_empty() {
            return Err(LedgerError::InvalidSplitInput(
                "at least one member must share the expense".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut total = Decimal::ZERO;
        for (id, weight) in weights {
            if *weight < Decimal::ZERO {
                return Err(LedgerError::InvalidWeight(format!(
                    "negative percentage {weight} for \"{id}\""
                )));
            }
            if !self.is_member(id) {
                return Err(LedgerError::InvalidWeight(format!(
                    "\"{id}\" is not a member of the group"
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(LedgerError::InvalidWeight(format!("\"{id}\" listed twice")));
            }
            total += *weight;
        }

        if (total - HUNDRED).abs() > PERCENT_TOLERANCE {
            return Err(LedgerError::InvalidSplitTotal(total));
        }

        // Dividing by the accepted total rather than 100 keeps the truncated
        // shares at or below `amount`, so the residual is never negative.
        let mut split = Split::new();
        let mut assigned = Decimal::ZERO;
        for (id, weight) in weights {
            let share = amount
                .checked_mul(*weight)
                .and_then(|scaled| scaled.checked_div(total))
                .ok_or_else(|| {
                    LedgerError::InvalidSplitInput(format!(
                        "share of {amount} for \"{id}\" is out of range"
                    ))
                })?;
            let share = truncate(share, self.precision);
            assigned += share;
            split.insert(id.clone(), share);
        }

        let residual = amount - assigned;
        let receiver = weights
            .iter()
            .find(|(_, weight)| *weight > Decimal::ZERO)
            .map(|(id, _)| id);
        if let Some(share) = receiver.and_then(|id| split.get_mut(id)) {
            *share += residual;
        }

        tracing::debug!(%amount, members = weights.len(), %residual, "weighted split");
        Ok(split)
    }
}
