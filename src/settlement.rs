use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::{compute_balance_from_group, Balance};
use crate::error::LedgerResult;
use crate::money::{is_negligible, DEFAULT_PRECISION};
use crate::schemas::{Group, MemberId, Payable};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub payables: Vec<Payable>,
    pub net_balances: Balance,
}

#[derive(Clone, Debug)]
struct Position {
    id: MemberId,
    // Index in the group's member list, lower wins ties
    order: usize,
    // Always positive: what is still owed, or still to be received
    outstanding: Decimal,
}

/// Recomputes net balances and payables for `group` using cents.
pub fn recompute_settlement(group: &Group) -> LedgerResult<Settlement> {
    settle(group, DEFAULT_PRECISION)
}

/// Recomputes net balances and the greedy payable list for `group`.
///
/// Largest debtor is matched with largest creditor until nobody owes anything.
/// Ties go to the member listed first in the group. The result depends only
/// on the group's members and events.
pub fn settle(group: &Group, precision: u32) -> LedgerResult<Settlement> {
    let people_balances = compute_balance_from_group(group)?;

    // Divide people into payers and receivers
    let mut payers = Vec::new();
    let mut receivers = Vec::new();
    for (order, person) in people_balances.iter().enumerate() {
        if is_negligible(person.balance, precision) {
            continue;
        }
        let position = Position {
            id: person.id.clone(),
            order,
            outstanding: person.balance.abs(),
        };
        if person.balance.is_sign_negative() {
            payers.push(position);
        } else {
            receivers.push(position);
        }
    }

    let payables = get_simplified_payables(payers, receivers, precision);
    tracing::debug!(
        group = %group.id,
        events = group.events.len(),
        payables = payables.len(),
        "settlement recomputed"
    );

    Ok(Settlement {
        payables,
        net_balances: people_balances
            .into_iter()
            .map(|person| (person.id, person.balance))
            .collect(),
    })
}

// Biggest outstanding amount last, so `last_mut`/`pop` take the top priority.
fn sort_by_priority(positions: &mut [Position]) {
    positions.sort_by(|a, b| {
        a.outstanding
            .cmp(&b.outstanding)
            .then_with(|| b.order.cmp(&a.order))
    });
}

fn get_simplified_payables(
    mut payers: Vec<Position>,
    mut receivers: Vec<Position>,
    precision: u32,
) -> Vec<Payable> {
    sort_by_priority(&mut payers);
    sort_by_priority(&mut receivers);

    let mut payables = Vec::new();

    while let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) {
        let amount = payer.outstanding.min(receiver.outstanding);
        payer.outstanding -= amount;
        receiver.outstanding -= amount;

        if !is_negligible(amount, precision) {
            payables.push(Payable {
                from: payer.id.clone(),
                to: receiver.id.clone(),
                amount,
            });
        }

        let payer_done = is_negligible(payer.outstanding, precision);
        let receiver_done = is_negligible(receiver.outstanding, precision);
        if payer_done {
            payers.pop();
        }
        if receiver_done {
            receivers.pop();
        }
        sort_by_priority(&mut payers);
        sort_by_priority(&mut receivers);
    }

    payables
}
