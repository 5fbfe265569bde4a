use serde::Serialize;

use crate::interval::{Cycle, IntervalCounter};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BankState {
    #[default]
    Precharged,
    Active,
}

/// Per-bank command tallies.  `pre` counts transitions into the precharged
/// state, not PRE commands: an implicit auto-precharge bumps it, a PRE on an
/// already precharged bank does not.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandCounters {
    pub act: u64,
    pub pre: u64,
    pub reads: u64,
    pub writes: u64,
    pub read_auto: u64,
    pub write_auto: u64,
    pub ref_all_bank: u64,
    pub ref_per_bank: u64,
    pub ref_same_bank: u64,
    pub ref_per_two_banks: u64,
}

#[derive(Debug, Default, Clone)]
pub struct BankCycles {
    pub act: IntervalCounter,
    pub power_down_act: IntervalCounter,
    pub power_down_pre: IntervalCounter,
}

/// Owned exclusively by its rank; mutated only through the rank's transition
/// helpers for the lifetime of the replay.
#[derive(Debug, Default, Clone)]
pub struct Bank {
    pub state: BankState,
    pub counter: CommandCounters,
    pub cycles: BankCycles,
    /// Timestamp of the latest precharge, for earliest power-down entry.
    pub latest_pre: Cycle,
    /// End of the latest refresh on this bank, for earliest power-down entry.
    pub refresh_end_time: Cycle,
}

impl Bank {
    pub fn is_active(&self) -> bool {
        self.state == BankState::Active
    }
}
