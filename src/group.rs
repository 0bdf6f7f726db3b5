//! Mutations of a [`Group`].
//!
//! Every operation validates its input, applies the change to a copy of the
//! group, recomputes the payables and only then replaces `self`. On error the
//! group is left exactly as it was.
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::money::{ensure_amount, ensure_share};
use crate::schemas::{Event, Group, Member, MemberId, Split, SplitType};
use crate::settlement::settle;
use crate::split::{Splitter, Weight};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WeightEntry {
    pub member: MemberId,
    pub percent: Decimal,
}

/// How the amount of a new or edited event is shared.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SplitRequest {
    /// Everyone listed pays the same; no list means the whole group.
    Equal {
        #[serde(default)]
        members: Option<Vec<MemberId>>,
    },
    Percentage { weights: Vec<WeightEntry> },
}

/// User input for an event, before an id and a timestamp are assigned.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub amount: Decimal,
    pub payer: MemberId,
    pub split: SplitRequest,
}

impl Group {
    pub fn splitter(&self, precision: u32) -> Splitter<'_> {
        Splitter::new(&self.members).with_precision(precision)
    }

    /// Equal split where the payer, when sharing, absorbs the rounding residual.
    pub fn equal_split(
        &self,
        amount: Decimal,
        payer: &str,
        member_ids: &[MemberId],
        precision: u32,
    ) -> LedgerResult<Split> {
        let mut ordered: Vec<MemberId> = member_ids.to_vec();
        if let Some(position) = ordered.iter().position(|id| id == payer) {
            let payer = ordered.remove(position);
            ordered.insert(0, payer);
        }
        self.splitter(precision).equal(amount, &ordered)
    }

    /// Weighted split where the payer, when sharing, absorbs the rounding residual.
    pub fn weighted_split(
        &self,
        amount: Decimal,
        payer: &str,
        weights: &[Weight],
        precision: u32,
    ) -> LedgerResult<Split> {
        let mut ordered: Vec<Weight> = weights.to_vec();
        if let Some(position) = ordered
            .iter()
            .position(|(id, weight)| id == payer && *weight > Decimal::ZERO)
        {
            let payer = ordered.remove(position);
            ordered.insert(0, payer);
        }
        self.splitter(precision).weighted(amount, &ordered)
    }

    /// Builds a complete event out of `draft` using the split engine.
    pub fn build_event(
        &self,
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        draft: EventDraft,
        precision: u32,
    ) -> LedgerResult<Event> {
        if !self.has_member(&draft.payer) {
            return Err(LedgerError::UnknownMember(draft.payer));
        }

        let (split_between, split_type) = match &draft.split {
            SplitRequest::Equal { members } => {
                let members = members.clone().unwrap_or_else(|| self.member_ids());
                let split = self.equal_split(draft.amount, &draft.payer, &members, precision)?;
                (split, SplitType::Equal)
            }
            SplitRequest::Percentage { weights } => {
                let weights: Vec<Weight> = weights
                    .iter()
                    .map(|entry| (entry.member.clone(), entry.percent))
                    .collect();
                let split = self.weighted_split(draft.amount, &draft.payer, &weights, precision)?;
                (split, SplitType::Percentage)
            }
        };

        Ok(Event {
            id: id.into(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            amount: draft.amount,
            timestamp,
            payer: draft.payer,
            split_between,
            split_type,
        })
    }

    /// Checks that `event` only references members, that its amount and
    /// shares are whole minor units at `precision`, and that the split adds
    /// up to the amount.
    pub fn validate_event(&self, event: &Event, precision: u32) -> LedgerResult<()> {
        ensure_amount(event.amount, precision)?;
        if !self.has_member(&event.payer) {
            return Err(LedgerError::UnknownMember(event.payer.clone()));
        }
        if event.split_between.is_empty() {
            return Err(LedgerError::InvalidSplitInput(
                "at least one member must share the expense".to_string(),
            ));
        }
        for (id, owed) in &event.split_between {
            if !self.has_member(id) {
                return Err(LedgerError::UnknownMember(id.clone()));
            }
            ensure_share(*owed, precision)?;
        }

        let actual: Decimal = event.split_between.values().copied().sum();
        if actual != event.amount {
            return Err(LedgerError::SplitMismatch {
                expected: event.amount,
                actual,
            });
        }
        Ok(())
    }

    /// Recomputes `payable` from scratch.
    pub fn recompute(&mut self, precision: u32) -> LedgerResult<()> {
        self.payable = settle(self, precision)?.payables;
        Ok(())
    }

    fn commit(&mut self, mut next: Group, precision: u32) -> LedgerResult<()> {
        next.recompute(precision)?;
        *self = next;
        Ok(())
    }

    pub fn add_event(&mut self, event: Event, precision: u32) -> LedgerResult<()> {
        if self.event(&event.id).is_some() {
            return Err(LedgerError::ExistingKey(event.id));
        }
        self.validate_event(&event, precision)?;

        let (event_id, amount) = (event.id.clone(), event.amount);
        let mut next = self.clone();
        next.events.push(event);
        self.commit(next, precision)?;
        tracing::info!(group = %self.id, event = %event_id, %amount, "event added");
        Ok(())
    }

    /// Replaces the event `event_id` as a whole. The replacement keeps the id
    /// and the timestamp of the stored event.
    pub fn edit_event(
        &mut self,
        event_id: &str,
        mut event: Event,
        precision: u32,
    ) -> LedgerResult<()> {
        let position = self
            .events
            .iter()
            .position(|existing| existing.id == event_id)
            .ok_or_else(|| LedgerError::KeyNotFound(event_id.to_string()))?;
        event.id = event_id.to_string();
        event.timestamp = self.events[position].timestamp;
        self.validate_event(&event, precision)?;

        let mut next = self.clone();
        next.events[position] = event;
        self.commit(next, precision)?;
        tracing::info!(group = %self.id, event = %event_id, "event replaced");
        Ok(())
    }

    pub fn delete_event(&mut self, event_id: &str, precision: u32) -> LedgerResult<Event> {
        let position = self
            .events
            .iter()
            .position(|existing| existing.id == event_id)
            .ok_or_else(|| LedgerError::KeyNotFound(event_id.to_string()))?;

        let mut next = self.clone();
        let removed = next.events.remove(position);
        self.commit(next, precision)?;
        tracing::info!(group = %self.id, event = %event_id, "event deleted");
        Ok(removed)
    }

    pub fn add_member(&mut self, member: Member, precision: u32) -> LedgerResult<()> {
        if self.has_member(&member.id) {
            return Err(LedgerError::ExistingKey(member.id));
        }

        let member_id = member.id.clone();
        let mut next = self.clone();
        next.members.push(member);
        self.commit(next, precision)?;
        tracing::info!(group = %self.id, member = %member_id, "member added");
        Ok(())
    }

    /// Removes a member who neither paid for nor shares any event.
    pub fn remove_member(&mut self, member_id: &str, precision: u32) -> LedgerResult<Member> {
        let position = self
            .member_index(member_id)
            .ok_or_else(|| LedgerError::KeyNotFound(member_id.to_string()))?;
        let referenced = self.events.iter().any(|event| {
            event.payer == member_id || event.split_between.contains_key(member_id)
        });
        if referenced {
            return Err(LedgerError::MemberInUse(member_id.to_string()));
        }

        let mut next = self.clone();
        let removed = next.members.remove(position);
        self.commit(next, precision)?;
        tracing::info!(group = %self.id, member = %member_id, "member removed");
        Ok(removed)
    }

    /// Edits the display fields, leaving members and events untouched.
    pub fn update_details(&mut self, name: Option<String>, description: Option<String>) {
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
    }
}
