//! Delivery state machine: `sent -> delivered -> seen`.
//!
//! Status only ever moves forward. Every write path goes through
//! [`MessageStatus::can_advance_to`] in Rust or [`RANK_SQL`] inside a
//! conditional `UPDATE`, so applying the same transition twice, or racing two
//! writers, ends in the same state.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Seen,
}

/// SQL expression yielding the rank of the `status` column.
pub(crate) const RANK_SQL: &str =
    "(CASE status WHEN 'sent' THEN 0 WHEN 'delivered' THEN 1 ELSE 2 END)";

impl MessageStatus {
    pub fn rank(self) -> i64 {
        use MessageStatus::*;
        match self {
            Sent => 0,
            Delivered => 1,
            Seen => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        use MessageStatus::*;
        match self {
            Sent => "sent",
            Delivered => "delivered",
            Seen => "seen",
        }
    }

    /// Whether moving to `target` is a real transition. Equal or earlier
    /// targets are no-ops, never errors.
    pub fn can_advance_to(self, target: MessageStatus) -> bool {
        target.rank() > self.rank()
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use MessageStatus::*;
        match s {
            "sent" => Ok(Sent),
            "delivered" => Ok(Delivered),
            "seen" => Ok(Seen),
            other => Err(anyhow::anyhow!("unknown message status {other:?}")),
        }
    }
}
