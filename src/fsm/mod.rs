//! Valve activation lifecycle.
//!
//! ```text
//!  IDLE ─▶ MASTER_OPENING ─▶ ZONE_OPENING ─▶ WAITING
//!                                               │ duration elapsed
//!                                               │ or cancelled
//!                                               ▼
//!  COMPLETE ◀─ MASTER_CLOSING ◀──────────── ZONE_CLOSING
//! ```
//!
//! `MASTER_*` phases are skipped for zones without a master relay.  The
//! phases only ever advance; the [`sprinkle::Sprinkle`] guard drives them
//! and guarantees the closing half runs on every exit path.

pub mod sprinkle;

pub use sprinkle::{ActivationOutcome, ActivationPlan, Sprinkle};

use core::fmt;

/// Where an activation is in its open → wait → close sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    MasterOpening = 1,
    ZoneOpening = 2,
    Waiting = 3,
    ZoneClosing = 4,
    MasterClosing = 5,
    Complete = 6,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::MasterOpening => "MasterOpening",
            Self::ZoneOpening => "ZoneOpening",
            Self::Waiting => "Waiting",
            Self::ZoneClosing => "ZoneClosing",
            Self::MasterClosing => "MasterClosing",
            Self::Complete => "Complete",
        }
    }

    /// Any relay may be energised in this phase.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Idle | Self::Complete)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
