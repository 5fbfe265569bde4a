/*
DDR4-style command-driven state machine.

Handlers mutate bank/rank state through the rank transition helpers and
defer anything with JEDEC-mandated latency (auto-precharge, refresh end,
power-down entry/exit, self-refresh entry) to the implicit command queue.
Every read path drains the queue to the query time first, so a stats or
energy query never observes state older than everything knowable at that
time.

Contract violations in the trace (RD on a precharged bank, REF while a bank
is active, power-down in the wrong state) are reported and replay continues:
upstream traces often carry minor inaccuracies, and a best-effort estimate
beats aborting a long run.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use log::warn;
use num_traits::FromPrimitive;

use crate::command::{CmdType, Command};
use crate::dram::{MemState, Rank};
use crate::energy::{Calculation, EnergyResult};
use crate::interval::Cycle;
use crate::memspec::MemSpec;
use crate::router::CommandRouter;
use crate::scheduler::ImplicitCommandQueue;
use crate::stats::{BankStats, RankStats, SimulationStats};

/// Which refresh counter a refresh entry bumps.
#[derive(Debug, Clone, Copy)]
enum RefreshKind {
    AllBank,
    PerBank,
    SameBank,
    PerTwoBanks,
}

pub struct Ddr4Core {
    spec: Arc<MemSpec>,
    ranks: Vec<Rank>,
    router: CommandRouter<Ddr4Core>,
    queue: ImplicitCommandQueue<Vec<Rank>>,
    command_count: Vec<u64>,
    last_command_time: Cycle,
}

impl Ddr4Core {
    pub fn new(spec: Arc<MemSpec>) -> Result<Self> {
        spec.validate()?;

        let mut router = CommandRouter::new();
        router.route(CmdType::Nop, Self::handle_nop);
        router.route(CmdType::Act, Self::handle_act);
        router.route(CmdType::Pre, Self::handle_pre);
        router.route(CmdType::PreA, Self::handle_pre_all);
        router.route(CmdType::RefA, Self::handle_ref_all);
        router.route(CmdType::RefB, Self::handle_ref_per_bank);
        router.route(CmdType::RefSb, Self::handle_ref_same_bank);
        router.route(CmdType::RefP2b, Self::handle_ref_per_two_banks);
        router.route(CmdType::Rd, Self::handle_read);
        router.route(CmdType::RdA, Self::handle_read_auto);
        router.route(CmdType::Wr, Self::handle_write);
        router.route(CmdType::WrA, Self::handle_write_auto);
        router.route(CmdType::PdeA, Self::handle_power_down_act_entry);
        router.route(CmdType::PdeP, Self::handle_power_down_pre_entry);
        router.route(CmdType::PdxA, Self::handle_power_down_act_exit);
        router.route(CmdType::PdxP, Self::handle_power_down_pre_exit);
        router.route(CmdType::SrefEn, Self::handle_self_refresh_entry);
        router.route(CmdType::SrefEx, Self::handle_self_refresh_exit);
        router.route(CmdType::DsmEn, Self::handle_deep_sleep_entry);
        router.route(CmdType::DsmEx, Self::handle_deep_sleep_exit);
        router.route(CmdType::EndOfSimulation, Self::handle_end_of_simulation);

        let ranks = (0..spec.geometry.number_of_ranks)
            .map(|_| Rank::new(spec.geometry.number_of_banks))
            .collect();

        Ok(Self {
            spec,
            ranks,
            router,
            queue: ImplicitCommandQueue::new(),
            command_count: vec![0; CmdType::COUNT],
            last_command_time: 0,
        })
    }

    pub fn spec(&self) -> &MemSpec {
        &self.spec
    }

    pub fn last_command_time(&self) -> Cycle {
        self.last_command_time
    }

    pub fn pending_implicit_commands(&self) -> usize {
        self.queue.len()
    }

    /// Replays one explicit command: drains every implicit command due by
    /// its timestamp, then dispatches.  The only mutation entry point.
    pub fn do_command(&mut self, cmd: &Command) -> Result<()> {
        self.drain(cmd.timestamp);
        let handler = self.router.lookup(cmd.kind)?;
        self.command_count[cmd.kind as usize] += 1;
        handler(self, cmd);
        self.last_command_time = cmd.timestamp;
        Ok(())
    }

    /// Counters and cycle snapshot at `timestamp`, implicit commands
    /// resolved.  Idempotent: two calls with no commands in between return
    /// identical results.
    pub fn get_window_stats(&mut self, timestamp: Cycle) -> SimulationStats {
        self.drain(timestamp);

        let num_banks = self.spec.geometry.number_of_banks;
        let mut stats = SimulationStats {
            window_end: timestamp,
            bank: Vec::with_capacity(self.ranks.len() * num_banks),
            rank_total: Vec::with_capacity(self.ranks.len()),
            command_count: self.command_count_by_mnemonic(),
        };

        for rank in &self.ranks {
            let sref_total = rank.cycles.sref.count_at(timestamp);
            let deep_sleep = rank.cycles.deep_sleep.count_at(timestamp);

            for bank in &rank.banks {
                let mut entry = BankStats {
                    counter: bank.counter,
                    ..BankStats::default()
                };
                entry.cycles.act = bank.cycles.act.count_at(timestamp);
                entry.cycles.power_down_act = bank.cycles.power_down_act.count_at(timestamp);
                entry.cycles.power_down_pre = bank.cycles.power_down_pre.count_at(timestamp);
                entry.cycles.self_refresh = sref_total - deep_sleep;
                entry.cycles.deep_sleep = deep_sleep;
                entry.cycles.pre = timestamp
                    - (entry.cycles.act
                        + entry.cycles.power_down_act
                        + entry.cycles.power_down_pre
                        + sref_total);
                stats.bank.push(entry);
            }

            let mut total = RankStats {
                counter: rank.counter,
                ..RankStats::default()
            };
            total.cycles.act = rank.cycles.act.count_at(timestamp);
            total.cycles.power_down_act = rank.cycles.power_down_act.count_at(timestamp);
            total.cycles.power_down_pre = rank.cycles.power_down_pre.count_at(timestamp);
            total.cycles.self_refresh = sref_total - deep_sleep;
            total.cycles.deep_sleep = deep_sleep;
            total.cycles.pre = timestamp
                - (total.cycles.act
                    + total.cycles.power_down_act
                    + total.cycles.power_down_pre
                    + sref_total);
            stats.rank_total.push(total);
        }

        stats
    }

    /// Stats at the time of the last explicit or implicit command.
    pub fn get_stats(&mut self) -> SimulationStats {
        self.get_window_stats(self.last_command_time)
    }

    pub fn calc_energy(&mut self, timestamp: Cycle) -> EnergyResult {
        let stats = self.get_window_stats(timestamp);
        Calculation::new(&self.spec).calc_energy(&stats)
    }

    fn drain(&mut self, timestamp: Cycle) {
        if let Some(due) = self.queue.drain_up_to(timestamp, &mut self.ranks) {
            self.last_command_time = self.last_command_time.max(due);
        }
    }

    fn command_count_by_mnemonic(&self) -> BTreeMap<&'static str, u64> {
        self.command_count
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(ordinal, &count)| {
                let kind = CmdType::from_usize(ordinal).expect("table sized to CmdType::COUNT");
                (kind.mnemonic(), count)
            })
            .collect()
    }

    /// Resolves a command target to (rank, bank) indices; out-of-range
    /// targets are reported and the command dropped.
    fn target(&self, cmd: &Command) -> Option<(usize, usize)> {
        let geom = &self.spec.geometry;
        if cmd.target.rank >= geom.number_of_ranks || cmd.target.bank >= geom.number_of_banks {
            warn!(
                "{} at {} targets rank {} bank {} outside {}x{} geometry, dropped",
                cmd.kind,
                cmd.timestamp,
                cmd.target.rank,
                cmd.target.bank,
                geom.number_of_ranks,
                geom.number_of_banks
            );
            return None;
        }
        Some((cmd.target.rank, cmd.target.bank))
    }

    fn target_rank(&self, cmd: &Command) -> Option<usize> {
        if cmd.target.rank >= self.spec.geometry.number_of_ranks {
            warn!(
                "{} at {} targets rank {} outside {}-rank geometry, dropped",
                cmd.kind,
                cmd.timestamp,
                cmd.target.rank,
                self.spec.geometry.number_of_ranks
            );
            return None;
        }
        Some(cmd.target.rank)
    }

    // --- command handlers -------------------------------------------------

    fn handle_nop(&mut self, _cmd: &Command) {}

    fn handle_act(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        let rank = &mut self.ranks[r];
        if rank.banks[b].is_active() {
            warn!("ACT at {} on already active bank {}/{}", cmd.timestamp, r, b);
        }
        rank.activate_bank(b, cmd.timestamp);
    }

    fn handle_pre(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        self.ranks[r].precharge_bank(b, cmd.timestamp);
    }

    fn handle_pre_all(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        let rank = &mut self.ranks[r];
        for b in 0..rank.banks.len() {
            rank.precharge_bank(b, cmd.timestamp);
        }
    }

    /// Refresh entry on one bank: draws active current for `timing` cycles,
    /// then an implicit precharge closes it.
    fn refresh_on_bank(&mut self, r: usize, b: usize, timestamp: Cycle, timing: Cycle, kind: RefreshKind) {
        let end = timestamp + timing;
        let rank = &mut self.ranks[r];
        {
            let counter = &mut rank.banks[b].counter;
            match kind {
                RefreshKind::AllBank => counter.ref_all_bank += 1,
                RefreshKind::PerBank => counter.ref_per_bank += 1,
                RefreshKind::SameBank => counter.ref_same_bank += 1,
                RefreshKind::PerTwoBanks => counter.ref_per_two_banks += 1,
            }
        }
        rank.begin_refresh(b, timestamp, end);
        self.queue
            .add_implicit_command(end, move |ranks, _| ranks[r].end_refresh(b, end));
    }

    fn ref_all(&mut self, r: usize, timestamp: Cycle) {
        if self.ranks[r].is_active() {
            warn!(
                "REFA at {} with {} active bank(s) on rank {}",
                timestamp,
                self.ranks[r].count_active_banks(),
                r
            );
        }
        let t_rfc = self.spec.timing.t_rfc;
        for b in 0..self.spec.geometry.number_of_banks {
            self.refresh_on_bank(r, b, timestamp, t_rfc, RefreshKind::AllBank);
        }
    }

    fn handle_ref_all(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.ref_all(r, cmd.timestamp);
    }

    fn handle_ref_per_bank(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        if self.ranks[r].banks[b].is_active() {
            warn!("REFB at {} on active bank {}/{}", cmd.timestamp, r, b);
        }
        let timing = self.spec.timing.t_rfc_pb();
        self.refresh_on_bank(r, b, cmd.timestamp, timing, RefreshKind::PerBank);
    }

    /// Refreshes the bank with the same in-group index in every bank group.
    fn handle_ref_same_bank(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        let banks_per_group = self.spec.banks_per_group();
        let in_group = b % banks_per_group;
        let timing = self.spec.timing.t_rfc_sb();
        for group in 0..self.spec.geometry.number_of_bank_groups {
            let bank = group * banks_per_group + in_group;
            if self.ranks[r].banks[bank].is_active() {
                warn!("REFSB at {} on active bank {}/{}", cmd.timestamp, r, bank);
            }
            self.refresh_on_bank(r, bank, cmd.timestamp, timing, RefreshKind::SameBank);
        }
    }

    fn handle_ref_per_two_banks(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        let geom = &self.spec.geometry;
        let pair = (b + geom.per_two_bank_offset) % geom.number_of_banks;
        let timing = self.spec.timing.t_rfc_pb();
        for bank in [b, pair] {
            if self.ranks[r].banks[bank].is_active() {
                warn!("REFP2B at {} on active bank {}/{}", cmd.timestamp, r, bank);
            }
            self.refresh_on_bank(r, bank, cmd.timestamp, timing, RefreshKind::PerTwoBanks);
        }
    }

    fn handle_read(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        if !self.ranks[r].banks[b].is_active() {
            warn!("RD at {} on precharged bank {}/{}", cmd.timestamp, r, b);
        }
        self.ranks[r].banks[b].counter.reads += 1;
    }

    fn handle_write(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        if !self.ranks[r].banks[b].is_active() {
            warn!("WR at {} on precharged bank {}/{}", cmd.timestamp, r, b);
        }
        self.ranks[r].banks[b].counter.writes += 1;
    }

    /// RDA/WRA: the implicit precharge fires once both the minimum bank
    /// active time (tRAS from activate) and the command's own precharge
    /// offset have elapsed.
    fn auto_precharge(&mut self, r: usize, b: usize, timestamp: Cycle, offset: Cycle) {
        let bank = &self.ranks[r].banks[b];
        let min_bank_active = bank.cycles.act.start_time() + self.spec.timing.t_ras;
        let min_cmd_active = timestamp + offset;
        let delayed = min_bank_active.max(min_cmd_active);
        self.queue.add_implicit_command(delayed, move |ranks, _| {
            ranks[r].precharge_bank(b, delayed);
        });
    }

    fn handle_read_auto(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        if !self.ranks[r].banks[b].is_active() {
            warn!("RDA at {} on precharged bank {}/{}", cmd.timestamp, r, b);
        }
        self.ranks[r].banks[b].counter.read_auto += 1;
        self.auto_precharge(r, b, cmd.timestamp, self.spec.precharge_offset_rd());
    }

    fn handle_write_auto(&mut self, cmd: &Command) {
        let Some((r, b)) = self.target(cmd) else { return };
        if !self.ranks[r].banks[b].is_active() {
            warn!("WRA at {} on precharged bank {}/{}", cmd.timestamp, r, b);
        }
        self.ranks[r].banks[b].counter.write_auto += 1;
        self.auto_precharge(r, b, cmd.timestamp, self.spec.precharge_offset_wr());
    }

    /// Earliest cycle at which the rank may legally enter (or leave)
    /// power-down: every bank must have finished its activate latency, its
    /// precharge, and any refresh.
    fn earliest_power_down_entry(&self, r: usize) -> Cycle {
        let timing = &self.spec.timing;
        let mut entry_time = 0;
        for bank in &self.ranks[r].banks {
            if bank.counter.act != 0 {
                entry_time = entry_time.max(bank.cycles.act.start_time() + timing.t_rcd);
            }
            if bank.counter.pre != 0 {
                entry_time = entry_time.max(bank.latest_pre + timing.t_rp);
            }
            entry_time = entry_time.max(bank.refresh_end_time);
        }
        entry_time
    }

    fn power_down_entry(&mut self, r: usize, timestamp: Cycle, state: MemState) {
        if self.ranks[r].mem_state != MemState::NotInPd {
            warn!(
                "power-down entry at {} while rank {} is in {:?}",
                timestamp, r, self.ranks[r].mem_state
            );
        }
        let entry_time = timestamp.max(self.earliest_power_down_entry(r));
        self.queue.add_implicit_command(entry_time, move |ranks, _| {
            ranks[r].enter_power_down(state, entry_time);
        });
    }

    fn power_down_exit(&mut self, r: usize, timestamp: Cycle, expected: MemState) {
        if self.ranks[r].mem_state != expected {
            warn!(
                "power-down exit at {} expects rank {} in {:?}, found {:?}",
                timestamp, r, expected, self.ranks[r].mem_state
            );
        }
        // Exit cannot happen before the earliest legal entry either.
        let exit_time = timestamp.max(self.earliest_power_down_entry(r));
        self.queue.add_implicit_command(exit_time, move |ranks, _| {
            ranks[r].exit_power_down(exit_time);
        });
    }

    fn handle_power_down_act_entry(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.power_down_entry(r, cmd.timestamp, MemState::PdnAct);
    }

    fn handle_power_down_pre_entry(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.power_down_entry(r, cmd.timestamp, MemState::PdnPre);
    }

    fn handle_power_down_act_exit(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.power_down_exit(r, cmd.timestamp, MemState::PdnAct);
    }

    fn handle_power_down_pre_exit(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.power_down_exit(r, cmd.timestamp, MemState::PdnPre);
    }

    /// SREFEN issues an implicit all-bank refresh; the mode flag itself is
    /// chained tRFC later, after the per-bank refresh-end entries scheduled
    /// first (FIFO among equal due times).
    fn handle_self_refresh_entry(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        self.ref_all(r, cmd.timestamp);
        let entry_time = cmd.timestamp + self.spec.timing.t_rfc;
        self.queue.add_implicit_command(entry_time, move |ranks, _| {
            ranks[r].enter_self_refresh(entry_time);
        });
    }

    fn handle_self_refresh_exit(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        if self.ranks[r].mem_state != MemState::Sref {
            warn!(
                "SREFEX at {} while rank {} is in {:?}",
                cmd.timestamp, r, self.ranks[r].mem_state
            );
        }
        self.ranks[r].exit_self_refresh(cmd.timestamp);
    }

    fn handle_deep_sleep_entry(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        if self.ranks[r].mem_state != MemState::Sref {
            warn!(
                "DSMEN at {} while rank {} is in {:?}",
                cmd.timestamp, r, self.ranks[r].mem_state
            );
        }
        self.ranks[r].enter_deep_sleep(cmd.timestamp);
    }

    fn handle_deep_sleep_exit(&mut self, cmd: &Command) {
        let Some(r) = self.target_rank(cmd) else { return };
        if self.ranks[r].mem_state != MemState::Dsm {
            warn!(
                "DSMEX at {} while rank {} is in {:?}",
                cmd.timestamp, r, self.ranks[r].mem_state
            );
        }
        self.ranks[r].exit_deep_sleep(cmd.timestamp);
    }

    fn handle_end_of_simulation(&mut self, cmd: &Command) {
        if !self.queue.is_empty() {
            warn!(
                "end of simulation at {} with {} implicit command(s) still pending",
                cmd.timestamp,
                self.queue.len()
            );
        }
    }
}
