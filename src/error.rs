//! Errors raised by the split and settlement core.
//!
//! Every validation failure is returned before a group is touched, so a
//! caller holding an `Err` can be sure nothing was partially applied.
use rust_decimal::Decimal;
use thiserror::Error;

use crate::schemas::MemberId;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid split input: {0}")]
    InvalidSplitInput(String),
    #[error("Percentages add up to {0}, expected 100")]
    InvalidSplitTotal(Decimal),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("\"{0}\" is not a member of the group")]
    UnknownMember(MemberId),
    #[error("Split adds up to {actual}, expected {expected}")]
    SplitMismatch { expected: Decimal, actual: Decimal },
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" still takes part in recorded events")]
    MemberInUse(MemberId),
}
