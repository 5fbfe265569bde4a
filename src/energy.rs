/*
Energy calculation over a stats snapshot.

Converts accumulated cycle and command counts into the JEDEC IDDx energy
terms.  Inputs are milliamps, volts and nanoseconds throughout, so every
energy value here is in picojoules.

Background energy is split the bankwise way: each bank carries its excess
over the shared standby level (`e_bg_act`, divided by the bank count), and
the shared level itself is a single rank-wide term (`e_bg_act_shared`).
Precharged-state background comes from the rank's derived precharge cycles.
*/

use std::ops::AddAssign;

use serde::Serialize;

use crate::memspec::{MemSpec, PowerDomain};
use crate::stats::SimulationStats;

/// Per-bank energy breakdown in pJ.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct BankEnergy {
    pub e_act: f64,
    pub e_pre: f64,
    pub e_bg_act: f64,
    pub e_bg_pre: f64,
    pub e_rd: f64,
    pub e_wr: f64,
    pub e_rda: f64,
    pub e_wra: f64,
    pub e_pre_rda: f64,
    pub e_pre_wra: f64,
    pub e_ref_ab: f64,
    pub e_ref_pb: f64,
    pub e_ref_sb: f64,
    pub e_ref_2b: f64,
}

impl BankEnergy {
    pub fn total(&self) -> f64 {
        self.e_act
            + self.e_pre
            + self.e_bg_act
            + self.e_bg_pre
            + self.e_rd
            + self.e_wr
            + self.e_rda
            + self.e_wra
            + self.e_pre_rda
            + self.e_pre_wra
            + self.e_ref_ab
            + self.e_ref_pb
            + self.e_ref_sb
            + self.e_ref_2b
    }
}

impl AddAssign<&BankEnergy> for BankEnergy {
    fn add_assign(&mut self, other: &BankEnergy) {
        self.e_act += other.e_act;
        self.e_pre += other.e_pre;
        self.e_bg_act += other.e_bg_act;
        self.e_bg_pre += other.e_bg_pre;
        self.e_rd += other.e_rd;
        self.e_wr += other.e_wr;
        self.e_rda += other.e_rda;
        self.e_wra += other.e_wra;
        self.e_pre_rda += other.e_pre_rda;
        self.e_pre_wra += other.e_pre_wra;
        self.e_ref_ab += other.e_ref_ab;
        self.e_ref_pb += other.e_ref_pb;
        self.e_ref_sb += other.e_ref_sb;
        self.e_ref_2b += other.e_ref_2b;
    }
}

/// Full energy breakdown in pJ: one `BankEnergy` per (rank, device, bank)
/// plus the rank/device-shared terms.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyResult {
    /// Indexed `rank * devices * banks + device * banks + bank`.
    pub bank_energy: Vec<BankEnergy>,
    pub e_bg_act_shared: f64,
    pub e_sref: f64,
    pub e_dsm: f64,
    pub e_pdna: f64,
    pub e_pdnp: f64,
}

impl EnergyResult {
    fn new(num_banks: usize) -> Self {
        Self {
            bank_energy: vec![BankEnergy::default(); num_banks],
            e_bg_act_shared: 0.0,
            e_sref: 0.0,
            e_dsm: 0.0,
            e_pdna: 0.0,
            e_pdnp: 0.0,
        }
    }

    pub fn bank_total(&self) -> BankEnergy {
        let mut total = BankEnergy::default();
        for bank in &self.bank_energy {
            total += bank;
        }
        total
    }

    pub fn total(&self) -> f64 {
        self.bank_total().total()
            + self.e_bg_act_shared
            + self.e_sref
            + self.e_dsm
            + self.e_pdna
            + self.e_pdnp
    }
}

fn e_bg_pre(banks: f64, vdd: f64, idd2n: f64, t_bg_pre: f64) -> f64 {
    (1.0 / banks) * vdd * idd2n * t_bg_pre
}

fn e_bg_act_shared(vdd: f64, i_rho: f64, t_bg_act: f64) -> f64 {
    vdd * i_rho * t_bg_act
}

fn e_bg_act_star(banks: f64, vdd: f64, idd3n: f64, i_rho: f64, t_bg_act_star: f64) -> f64 {
    vdd * (1.0 / banks) * (idd3n - i_rho) * t_bg_act_star
}

fn e_pre(vdd: f64, i_beta: f64, idd2n: f64, t_rp: f64, n_pre: u64) -> f64 {
    vdd * (i_beta - idd2n) * t_rp * n_pre as f64
}

fn e_act(vdd: f64, i_theta: f64, i_1: f64, t_ras: f64, n_act: u64) -> f64 {
    vdd * (i_theta - i_1) * t_ras * n_act as f64
}

fn e_burst(vdd: f64, idd4: f64, idd3n: f64, burst_time: f64, n: u64) -> f64 {
    vdd * (idd4 - idd3n) * burst_time * n as f64
}

fn e_ref_ab(banks: f64, vdd: f64, idd5b: f64, idd3n: f64, t_rfc: f64, n_ref: u64) -> f64 {
    (1.0 / banks) * vdd * (idd5b - idd3n) * t_rfc * n_ref as f64
}

fn e_ref_bank(vdd: f64, idd5pb: f64, idd3n: f64, t_rfc: f64, n_ref: u64) -> f64 {
    vdd * (idd5pb - idd3n) * t_rfc * n_ref as f64
}

pub struct Calculation<'a> {
    spec: &'a MemSpec,
}

impl<'a> Calculation<'a> {
    pub fn new(spec: &'a MemSpec) -> Self {
        Self { spec }
    }

    pub fn calc_energy(&self, stats: &SimulationStats) -> EnergyResult {
        let geom = &self.spec.geometry;
        let ranks = geom.number_of_ranks;
        let devices = geom.number_of_devices;
        let banks = geom.number_of_banks;

        let mut energy = EnergyResult::new(ranks * devices * banks);
        for domain in &self.spec.power {
            self.accumulate_domain(domain, stats, &mut energy);
        }
        energy
    }

    fn accumulate_domain(&self, domain: &PowerDomain, stats: &SimulationStats, energy: &mut EnergyResult) {
        let timing = &self.spec.timing;
        let geom = &self.spec.geometry;

        let t_ck = timing.t_ck;
        let t_ras = timing.t_ras as f64 * t_ck;
        let t_rp = timing.t_rp as f64 * t_ck;
        let t_rfc = timing.t_rfc as f64 * t_ck;
        let t_rfc_pb = timing.t_rfc_pb() as f64 * t_ck;
        let t_rfc_sb = timing.t_rfc_sb() as f64 * t_ck;
        let burst_time = geom.burst_length as f64 / geom.data_rate as f64 * t_ck;

        let rho = self.spec.bank_wise.rho;
        let banks = geom.number_of_banks as f64;
        let devices = geom.number_of_devices as f64;

        let vdd = domain.vdd;
        let i_beta = domain.i_beta();
        let i_rho = rho * (domain.idd3n - domain.idd2n) + domain.idd2n;
        let i_theta = (domain.idd0 * (t_rp + t_ras) - i_beta * t_rp) / t_ras;
        let i_1 = (1.0 / banks) * (domain.idd3n + (banks - 1.0) * i_rho);

        for r in 0..geom.number_of_ranks {
            let rank_total = &stats.rank_total[r];

            for d in 0..geom.number_of_devices {
                // one device is simulated; stats carry one device per rank
                let energy_offset = r * geom.number_of_devices * geom.number_of_banks
                    + d * geom.number_of_banks;
                let bank_offset = r * geom.number_of_banks;

                for b in 0..geom.number_of_banks {
                    let bank = &stats.bank[bank_offset + b];
                    let out = &mut energy.bank_energy[energy_offset + b];

                    out.e_act += e_act(vdd, i_theta, i_1, t_ras, bank.counter.act);
                    out.e_pre += e_pre(vdd, i_beta, domain.idd2n, t_rp, bank.counter.pre);
                    out.e_bg_act += e_bg_act_star(
                        banks,
                        vdd,
                        domain.idd3n,
                        i_rho,
                        bank.cycles.act as f64 * t_ck,
                    );
                    out.e_bg_pre += e_bg_pre(banks, vdd, domain.idd2n, rank_total.cycles.pre as f64 * t_ck);
                    out.e_rd += e_burst(vdd, domain.idd4r, domain.idd3n, burst_time, bank.counter.reads);
                    out.e_wr += e_burst(vdd, domain.idd4w, domain.idd3n, burst_time, bank.counter.writes);
                    out.e_rda += e_burst(vdd, domain.idd4r, domain.idd3n, burst_time, bank.counter.read_auto);
                    out.e_wra += e_burst(vdd, domain.idd4w, domain.idd3n, burst_time, bank.counter.write_auto);
                    out.e_pre_rda += e_pre(vdd, i_beta, domain.idd2n, t_rp, bank.counter.read_auto);
                    out.e_pre_wra += e_pre(vdd, i_beta, domain.idd2n, t_rp, bank.counter.write_auto);
                    out.e_ref_ab += e_ref_ab(
                        banks,
                        vdd,
                        domain.idd5b,
                        domain.idd3n,
                        t_rfc,
                        bank.counter.ref_all_bank,
                    );
                    out.e_ref_pb += e_ref_bank(
                        vdd,
                        domain.idd5pb(),
                        domain.idd3n,
                        t_rfc_pb,
                        bank.counter.ref_per_bank,
                    );
                    out.e_ref_sb += e_ref_bank(
                        vdd,
                        domain.idd5pb(),
                        domain.idd3n,
                        t_rfc_sb,
                        bank.counter.ref_same_bank,
                    );
                    out.e_ref_2b += e_ref_bank(
                        vdd,
                        domain.idd5pb(),
                        domain.idd3n,
                        t_rfc_pb,
                        bank.counter.ref_per_two_banks,
                    );
                }
            }

            energy.e_sref += vdd * domain.idd6 * rank_total.cycles.self_refresh as f64 * t_ck * devices;
            energy.e_dsm += vdd * domain.idd6_dsm() * rank_total.cycles.deep_sleep as f64 * t_ck * devices;
            energy.e_pdna += vdd * domain.idd3p * rank_total.cycles.power_down_act as f64 * t_ck * devices;
            energy.e_pdnp += vdd * domain.idd2p * rank_total.cycles.power_down_pre as f64 * t_ck * devices;
            energy.e_bg_act_shared +=
                e_bg_act_shared(vdd, i_rho, rank_total.cycles.act as f64 * t_ck) * devices;
        }
    }
}
