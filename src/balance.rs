use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Group, MemberId};

pub type Balance = BTreeMap<MemberId, Decimal>;

/// Net position of one member: positive when the group owes them.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonalBalance {
    pub id: MemberId,
    pub balance: Decimal,
}

/// Computes every member's net balance, in member display order.
///
/// A payer or split key that is not a member of the group is an error; the
/// event list is never silently partially counted.
pub fn compute_balance_from_group(group: &Group) -> LedgerResult<Vec<PersonalBalance>> {
    let mut balances: Vec<PersonalBalance> = group
        .members
        .iter()
        .map(|member| PersonalBalance {
            id: member.id.clone(),
            balance: Decimal::ZERO,
        })
        .collect();

    for event in &group.events {
        let payer = group
            .member_index(&event.payer)
            .ok_or_else(|| LedgerError::UnknownMember(event.payer.clone()))?;
        balances[payer].balance += event.amount;

        for (receiver, owed) in &event.split_between {
            let receiver = group
                .member_index(receiver)
                .ok_or_else(|| LedgerError::UnknownMember(receiver.clone()))?;
            balances[receiver].balance -= *owed;
        }
    }

    Ok(balances)
}

/// Same as [`compute_balance_from_group`], keyed by member id.
pub fn net_balances(group: &Group) -> LedgerResult<Balance> {
    Ok(compute_balance_from_group(group)?
        .into_iter()
        .map(|person| (person.id, person.balance))
        .collect())
}
