/*
End-to-end replay scenarios against the DDR4 core: counter bookkeeping,
implicit command resolution and the timeline partition invariant.
*/

use super::common::{bank_cmd, core, ddr4_spec, rank_cmd};
use crate::command::CmdType;
use crate::stats::SimulationStats;

fn assert_partition(stats: &SimulationStats) {
    for bank in &stats.bank {
        let c = &bank.cycles;
        assert_eq!(
            stats.window_end,
            c.act + c.pre + c.power_down_act + c.power_down_pre + c.self_refresh + c.deep_sleep
        );
    }
    for rank in &stats.rank_total {
        let c = &rank.cycles;
        assert_eq!(
            stats.window_end,
            c.act + c.pre + c.power_down_act + c.power_down_pre + c.self_refresh + c.deep_sleep
        );
    }
}

#[test]
fn act_then_pre_accumulates_one_interval() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(10, CmdType::Act, 0)).unwrap();
    core.do_command(&bank_cmd(25, CmdType::Pre, 0)).unwrap();

    let stats = core.get_window_stats(25);
    assert_eq!(1, stats.bank[0].counter.act);
    assert_eq!(1, stats.bank[0].counter.pre);
    assert_eq!(15, stats.bank[0].cycles.act);
    assert_eq!(10, stats.bank[0].cycles.pre);
    assert_eq!(15, stats.rank_total[0].cycles.act);
    assert_partition(&stats);
}

#[test]
fn activate_on_an_active_bank_is_reported_not_fatal() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    // a trace violation: warned about, then replay continues
    core.do_command(&bank_cmd(5, CmdType::Act, 0)).unwrap();
    core.do_command(&bank_cmd(30, CmdType::Pre, 0)).unwrap();

    let stats = core.get_window_stats(30);
    assert_eq!(2, stats.bank[0].counter.act);
    assert_eq!(1, stats.bank[0].counter.pre);
    // the bank was continuously active from the first ACT
    assert_eq!(30, stats.bank[0].cycles.act);
    assert_partition(&stats);
}

#[test]
fn reference_two_bank_scenario() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    core.do_command(&bank_cmd(15, CmdType::Rd, 0)).unwrap();
    core.do_command(&bank_cmd(20, CmdType::Act, 3)).unwrap();
    core.do_command(&bank_cmd(35, CmdType::Rd, 3)).unwrap();
    core.do_command(&bank_cmd(40, CmdType::Rd, 0)).unwrap();
    core.do_command(&rank_cmd(50, CmdType::PreA)).unwrap();
    core.do_command(&rank_cmd(70, CmdType::EndOfSimulation))
        .unwrap();

    let stats = core.get_window_stats(70);

    assert_eq!(1, stats.bank[0].counter.act);
    assert_eq!(2, stats.bank[0].counter.reads);
    assert_eq!(1, stats.bank[0].counter.pre);
    assert_eq!(50, stats.bank[0].cycles.act);

    assert_eq!(1, stats.bank[3].counter.act);
    assert_eq!(1, stats.bank[3].counter.reads);
    assert_eq!(1, stats.bank[3].counter.pre);
    assert_eq!(30, stats.bank[3].cycles.act);

    // untouched banks never left precharge
    assert_eq!(70, stats.bank[5].cycles.pre);

    // rank is active from the first ACT to the all-bank precharge
    assert_eq!(50, stats.rank_total[0].cycles.act);
    assert_eq!(20, stats.rank_total[0].cycles.pre);

    assert_eq!(Some(&2), stats.command_count.get("ACT"));
    assert_eq!(Some(&3), stats.command_count.get("RD"));
    assert_eq!(Some(&1), stats.command_count.get("PREA"));
    assert_eq!(Some(&1), stats.command_count.get("END"));
    assert_partition(&stats);
}

#[test]
fn all_bank_refresh_closes_exactly_trfc_later() {
    let mut core = core(ddr4_spec());
    // bank 1 sees a normal activate cycle before the refresh
    core.do_command(&bank_cmd(0, CmdType::Act, 1)).unwrap();
    core.do_command(&bank_cmd(5, CmdType::Pre, 1)).unwrap();
    core.do_command(&rank_cmd(10, CmdType::RefA)).unwrap();

    // tRFC = 10: refresh holds every bank active over 10..20 and no longer
    let stats = core.get_window_stats(20);
    assert_eq!(10, stats.bank[0].cycles.act);
    assert_eq!(15, stats.bank[1].cycles.act);
    let stats = core.get_window_stats(25);
    assert_eq!(10, stats.bank[0].cycles.act);
    assert_eq!(15, stats.bank[1].cycles.act);

    // refresh bumps only the refresh counter
    for bank in &stats.bank {
        assert_eq!(1, bank.counter.ref_all_bank);
    }
    assert_eq!(0, stats.bank[0].counter.act);
    assert_eq!(0, stats.bank[0].counter.pre);
    assert_eq!(1, stats.bank[1].counter.act);
    assert_eq!(1, stats.bank[1].counter.pre);
    assert_partition(&stats);
}

#[test]
fn same_bank_refresh_hits_one_bank_per_group() {
    let mut core = core(ddr4_spec());
    // 8 banks in 2 groups of 4; in-group index of bank 5 is 1
    core.do_command(&bank_cmd(0, CmdType::RefSb, 5)).unwrap();

    let stats = core.get_window_stats(30);
    assert_eq!(1, stats.bank[1].counter.ref_same_bank);
    assert_eq!(1, stats.bank[5].counter.ref_same_bank);
    assert_eq!(0, stats.bank[0].counter.ref_same_bank);
    assert_eq!(10, stats.bank[1].cycles.act);
    assert_eq!(0, stats.bank[0].cycles.act);
}

#[test]
fn per_two_bank_refresh_pairs_by_offset() {
    let mut core = core(ddr4_spec());
    // per_two_bank_offset = 4: bank 6 pairs with bank (6 + 4) % 8 = 2
    core.do_command(&bank_cmd(0, CmdType::RefP2b, 6)).unwrap();

    let stats = core.get_window_stats(30);
    assert_eq!(1, stats.bank[6].counter.ref_per_two_banks);
    assert_eq!(1, stats.bank[2].counter.ref_per_two_banks);
    assert_eq!(0, stats.bank[3].counter.ref_per_two_banks);
}

#[test]
fn auto_precharge_honours_both_lower_bounds() {
    // tRAS dominates: ACT@0 + RDA@5 precharges at 0 + tRAS = 32
    let mut ras_bound = core(ddr4_spec());
    ras_bound.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    ras_bound.do_command(&bank_cmd(5, CmdType::RdA, 0)).unwrap();
    let stats = ras_bound.get_window_stats(60);
    assert_eq!(1, stats.bank[0].counter.read_auto);
    assert_eq!(1, stats.bank[0].counter.pre);
    assert_eq!(32, stats.bank[0].cycles.act);

    // read offset dominates: RDA@25 precharges at 25 + tAL + tRTP = 37
    let mut rd_bound = core(ddr4_spec());
    rd_bound.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    rd_bound.do_command(&bank_cmd(25, CmdType::RdA, 0)).unwrap();
    let stats = rd_bound.get_window_stats(60);
    assert_eq!(37, stats.bank[0].cycles.act);

    // write offset: WRA@10 precharges at 10 + tWL + tBurst + tWR = 36
    let mut wr_bound = core(ddr4_spec());
    wr_bound.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    wr_bound.do_command(&bank_cmd(10, CmdType::WrA, 0)).unwrap();
    let stats = wr_bound.get_window_stats(60);
    assert_eq!(1, stats.bank[0].counter.write_auto);
    assert_eq!(36, stats.bank[0].cycles.act);
}

#[test]
fn power_down_entry_waits_for_bank_timings() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    // entry resolves at ACT start + tRCD = 22, not at 5
    core.do_command(&rank_cmd(5, CmdType::PdeA)).unwrap();
    core.do_command(&rank_cmd(40, CmdType::PdxA)).unwrap();

    let stats = core.get_window_stats(60);
    assert_eq!(18, stats.rank_total[0].cycles.power_down_act);
    assert_eq!(18, stats.bank[0].cycles.power_down_act);
    // bank 0 active 0..22, then again from the exit at 40
    assert_eq!(42, stats.bank[0].cycles.act);
    assert_eq!(42, stats.rank_total[0].cycles.act);
    assert_partition(&stats);
}

#[test]
fn precharge_power_down_partitions_the_timeline() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    core.do_command(&bank_cmd(20, CmdType::Pre, 0)).unwrap();
    // entry deferred to latest_pre + tRP = 42
    core.do_command(&rank_cmd(30, CmdType::PdeP)).unwrap();
    core.do_command(&rank_cmd(60, CmdType::PdxP)).unwrap();

    let stats = core.get_window_stats(100);
    assert_eq!(20, stats.bank[0].cycles.act);
    assert_eq!(18, stats.bank[0].cycles.power_down_pre);
    assert_eq!(62, stats.bank[0].cycles.pre);
    assert_eq!(18, stats.bank[1].cycles.power_down_pre);
    assert_eq!(82, stats.bank[1].cycles.pre);
    assert_eq!(18, stats.rank_total[0].cycles.power_down_pre);
    assert_partition(&stats);
}

#[test]
fn self_refresh_and_deep_sleep_cycles() {
    let mut core = core(ddr4_spec());
    // SREFEN runs an implicit all-bank refresh; the mode begins tRFC later
    core.do_command(&rank_cmd(10, CmdType::SrefEn)).unwrap();
    core.do_command(&rank_cmd(30, CmdType::DsmEn)).unwrap();
    core.do_command(&rank_cmd(40, CmdType::DsmEx)).unwrap();
    core.do_command(&rank_cmd(45, CmdType::SrefEx)).unwrap();

    let stats = core.get_window_stats(50);
    assert_eq!(1, stats.rank_total[0].counter.self_refresh);
    assert_eq!(1, stats.rank_total[0].counter.deep_sleep);
    // in self-refresh 20..45, of which 30..40 is deep sleep
    assert_eq!(15, stats.rank_total[0].cycles.self_refresh);
    assert_eq!(10, stats.rank_total[0].cycles.deep_sleep);
    // the entry refresh keeps the banks active 10..20
    assert_eq!(10, stats.rank_total[0].cycles.act);
    assert_eq!(10, stats.bank[4].cycles.act);
    assert_eq!(1, stats.bank[4].counter.ref_all_bank);
    assert_partition(&stats);
}

#[test]
fn stats_queries_are_idempotent() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    core.do_command(&bank_cmd(5, CmdType::RdA, 0)).unwrap();
    core.do_command(&bank_cmd(40, CmdType::Wr, 2)).unwrap();

    let first = serde_json::to_string(&core.get_window_stats(80)).unwrap();
    let second = serde_json::to_string(&core.get_window_stats(80)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn end_of_simulation_leaves_pending_work_queued() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 0)).unwrap();
    // auto-precharge due at 32, after the end marker
    core.do_command(&bank_cmd(5, CmdType::RdA, 0)).unwrap();
    core.do_command(&rank_cmd(10, CmdType::EndOfSimulation))
        .unwrap();
    assert_eq!(1, core.pending_implicit_commands());

    // a later query still resolves it
    let stats = core.get_window_stats(40);
    assert_eq!(0, core.pending_implicit_commands());
    assert_eq!(1, stats.bank[0].counter.pre);
    assert_eq!(32, stats.bank[0].cycles.act);
}

#[test]
fn out_of_range_targets_are_dropped() {
    let mut core = core(ddr4_spec());
    core.do_command(&bank_cmd(0, CmdType::Act, 9)).unwrap();
    let stats = core.get_window_stats(10);
    for bank in &stats.bank {
        assert_eq!(0, bank.counter.act);
    }
    // the command still counts as seen
    assert_eq!(Some(&1), stats.command_count.get("ACT"));
}
