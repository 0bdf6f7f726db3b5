use rust_decimal::Decimal;
use serde::Serialize;

use crate::schemas::Group;

/// Totals shown on a group's overview.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_amount: Decimal,
    pub total_owed: Decimal,
    pub total_paid: Decimal,
}

/// Sums the group's events and stored payables. `current_user` is whoever
/// the caller's session belongs to.
pub fn summarize(group: &Group, current_user: &str) -> Summary {
    let total_amount = group.events.iter().map(|event| event.amount).sum();
    let total_owed = group.payable.iter().map(|payable| payable.amount).sum();
    let total_paid = group
        .events
        .iter()
        .filter(|event| event.payer == current_user)
        .map(|event| event.amount)
        .sum();

    Summary {
        total_amount,
        total_owed,
        total_paid,
    }
}
