/*
Rank state and the bank-level transition helpers.

"Rank active" means at least one bank is active; that equivalence is the
single source of truth, so every helper that flips a bank derives the rank
active interval from the banks instead of re-deriving it independently.
Command handlers and scheduled continuations go through these helpers and
never touch the intervals directly.
*/

use serde::Serialize;

use crate::dram::bank::{Bank, BankState};
use crate::interval::{Cycle, IntervalCounter};

/// Power-down and self-refresh related rank states.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemState {
    #[default]
    NotInPd,
    PdnAct,
    PdnPre,
    Sref,
    Dsm,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankCounters {
    pub self_refresh: u64,
    pub deep_sleep: u64,
}

#[derive(Debug, Default, Clone)]
pub struct RankCycles {
    pub act: IntervalCounter,
    pub power_down_act: IntervalCounter,
    pub power_down_pre: IntervalCounter,
    pub sref: IntervalCounter,
    pub deep_sleep: IntervalCounter,
}

#[derive(Debug, Clone)]
pub struct Rank {
    pub mem_state: MemState,
    pub counter: RankCounters,
    pub cycles: RankCycles,
    pub banks: Vec<Bank>,
}

impl Rank {
    pub fn new(num_banks: usize) -> Self {
        Self {
            mem_state: MemState::default(),
            counter: RankCounters::default(),
            cycles: RankCycles::default(),
            banks: vec![Bank::default(); num_banks],
        }
    }

    pub fn is_active(&self) -> bool {
        self.banks.iter().any(Bank::is_active)
    }

    pub fn count_active_banks(&self) -> usize {
        self.banks.iter().filter(|bank| bank.is_active()).count()
    }

    /// ACT: open the bank active interval, and the rank's if this is the
    /// first active bank.  An ACT on an already active bank (a reported
    /// trace violation) keeps the running interval.
    pub fn activate_bank(&mut self, bank: usize, timestamp: Cycle) {
        let bank = &mut self.banks[bank];
        bank.counter.act += 1;
        bank.state = BankState::Active;
        bank.cycles.act.start_interval_if_not_running(timestamp);
        self.cycles.act.start_interval_if_not_running(timestamp);
    }

    /// PRE: close the bank active interval and, if this was the last active
    /// bank, the rank's.  No-op on an already precharged bank.  Returns
    /// whether a transition happened.
    pub fn precharge_bank(&mut self, bank: usize, timestamp: Cycle) -> bool {
        let bank = &mut self.banks[bank];
        if bank.state == BankState::Precharged {
            return false;
        }
        bank.counter.pre += 1;
        bank.state = BankState::Precharged;
        bank.cycles.act.close_interval(timestamp);
        bank.latest_pre = timestamp;
        if !self.is_active() {
            self.cycles.act.close_interval(timestamp);
        }
        true
    }

    /// Refresh entry: the bank draws active current until `end` without an
    /// ACT counter increment.  The matching refresh counter is bumped by the
    /// caller, which knows the refresh granularity.
    pub fn begin_refresh(&mut self, bank: usize, timestamp: Cycle, end: Cycle) {
        let bank = &mut self.banks[bank];
        bank.state = BankState::Active;
        bank.refresh_end_time = end;
        bank.cycles.act.start_interval_if_not_running(timestamp);
        self.cycles.act.start_interval_if_not_running(timestamp);
    }

    /// Refresh end: implicit precharge without a `pre` counter increment and
    /// without updating `latest_pre`.
    pub fn end_refresh(&mut self, bank: usize, timestamp: Cycle) {
        let bank = &mut self.banks[bank];
        bank.state = BankState::Precharged;
        bank.cycles.act.close_interval(timestamp);
        if !self.is_active() {
            self.cycles.act.close_interval(timestamp);
        }
    }

    /// Power-down entry at the resolved entry time.  Active intervals pause
    /// while the rank is powered down; bank states are left untouched so the
    /// exit can restore them.
    pub fn enter_power_down(&mut self, state: MemState, timestamp: Cycle) {
        debug_assert!(matches!(state, MemState::PdnAct | MemState::PdnPre));
        for bank in &mut self.banks {
            bank.cycles.act.close_interval(timestamp);
            match state {
                MemState::PdnAct => bank.cycles.power_down_act.start_interval(timestamp),
                _ => bank.cycles.power_down_pre.start_interval(timestamp),
            }
        }
        self.cycles.act.close_interval(timestamp);
        match state {
            MemState::PdnAct => self.cycles.power_down_act.start_interval(timestamp),
            _ => self.cycles.power_down_pre.start_interval(timestamp),
        }
        self.mem_state = state;
    }

    /// Power-down exit at the resolved exit time: resume the active interval
    /// of every bank that was active on entry, and the rank's if any.
    pub fn exit_power_down(&mut self, timestamp: Cycle) {
        match self.mem_state {
            MemState::PdnAct => {
                self.cycles.power_down_act.close_interval(timestamp);
            }
            MemState::PdnPre => {
                self.cycles.power_down_pre.close_interval(timestamp);
            }
            _ => {}
        }
        for bank in &mut self.banks {
            bank.cycles.power_down_act.close_interval(timestamp);
            bank.cycles.power_down_pre.close_interval(timestamp);
            if bank.is_active() {
                bank.cycles.act.start_interval(timestamp);
            }
        }
        if self.is_active() {
            self.cycles.act.start_interval_if_not_running(timestamp);
        }
        self.mem_state = MemState::NotInPd;
    }

    pub fn enter_self_refresh(&mut self, timestamp: Cycle) {
        self.counter.self_refresh += 1;
        self.cycles.sref.start_interval(timestamp);
        self.mem_state = MemState::Sref;
    }

    pub fn exit_self_refresh(&mut self, timestamp: Cycle) {
        self.cycles.sref.close_interval(timestamp);
        self.mem_state = MemState::NotInPd;
    }

    pub fn enter_deep_sleep(&mut self, timestamp: Cycle) {
        self.counter.deep_sleep += 1;
        self.cycles.deep_sleep.start_interval(timestamp);
        self.mem_state = MemState::Dsm;
    }

    pub fn exit_deep_sleep(&mut self, timestamp: Cycle) {
        self.cycles.deep_sleep.close_interval(timestamp);
        self.mem_state = MemState::Sref;
    }
}
