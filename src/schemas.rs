use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type MemberId = String;

/// Amount owed by each member for a single event. Members missing from the
/// map owe nothing for that event.
pub type Split = BTreeMap<MemberId, Decimal>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Equal,
    Percentage,
}

/// A recorded shared expense.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub payer: MemberId,
    pub split_between: Split,
    #[serde(default)]
    pub split_type: SplitType,
}

/// "`from` owes `to`". Always derived by the settlement engine.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Payable {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub payable: Vec<Payable>,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            members: vec![],
            events: vec![],
            payable: vec![],
        }
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn has_member(&self, id: &str) -> bool {
        self.member(id).is_some()
    }

    /// Position of the member in display order, used for tie-breaks.
    pub fn member_index(&self, id: &str) -> Option<usize> {
        self.members.iter().position(|member| member.id == id)
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|member| member.id.clone()).collect()
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }
}
