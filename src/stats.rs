use std::collections::BTreeMap;

use serde::Serialize;

use crate::dram::{CommandCounters, RankCounters};
use crate::interval::Cycle;

/// How the timeline up to the snapshot time splits across states.  For any
/// bank or rank, `act + pre + power_down_act + power_down_pre + self_refresh
/// + deep_sleep` equals the snapshot time; `pre` is derived from the others,
/// never tracked directly.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CycleStats {
    pub act: Cycle,
    pub pre: Cycle,
    pub power_down_act: Cycle,
    pub power_down_pre: Cycle,
    pub self_refresh: Cycle,
    pub deep_sleep: Cycle,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BankStats {
    pub counter: CommandCounters,
    pub cycles: CycleStats,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RankStats {
    pub counter: RankCounters,
    pub cycles: CycleStats,
}

/// Snapshot of bank/rank state at a query time, with all implicit commands
/// up to that time resolved.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SimulationStats {
    pub window_end: Cycle,
    /// Rank-major: entry `rank * number_of_banks + bank`.
    pub bank: Vec<BankStats>,
    pub rank_total: Vec<RankStats>,
    /// Dispatched explicit commands by mnemonic; zero counts omitted.
    pub command_count: BTreeMap<&'static str, u64>,
}
