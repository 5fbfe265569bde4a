use std::sync::Arc;

use crate::command::{CmdType, Command, TargetCoordinate};
use crate::ddr4::Ddr4Core;
use crate::interval::Cycle;
use crate::memspec::{BankWiseParams, Geometry, MemSpec, PowerDomain, TimingSpec};

/// Small DDR4-flavoured spec with test-friendly timings (tCK of 1 ns keeps
/// cycle counts and nanoseconds interchangeable).
pub fn ddr4_spec_with_devices(devices: usize) -> Arc<MemSpec> {
    Arc::new(MemSpec {
        geometry: Geometry {
            number_of_ranks: 1,
            number_of_banks: 8,
            number_of_bank_groups: 2,
            number_of_devices: devices,
            burst_length: 8,
            data_rate: 2,
            per_two_bank_offset: 4,
        },
        timing: TimingSpec {
            t_ck: 1.0,
            t_ras: 32,
            t_rcd: 22,
            t_rp: 22,
            t_rfc: 10,
            t_rfc_pb: None,
            t_rfc_sb: None,
            t_rtp: 12,
            t_wr: 12,
            t_wl: 10,
            t_al: 0,
        },
        power: vec![PowerDomain {
            vdd: 1.2,
            idd0: 60.0,
            idd2n: 40.0,
            idd3n: 55.0,
            idd4r: 150.0,
            idd4w: 145.0,
            idd5b: 200.0,
            idd6: 25.0,
            idd2p: 20.0,
            idd3p: 30.0,
            i_beta: None,
            idd5pb: None,
            idd6_dsm: None,
        }],
        bank_wise: BankWiseParams { rho: 0.5 },
    })
}

pub fn ddr4_spec() -> Arc<MemSpec> {
    ddr4_spec_with_devices(1)
}

pub fn core(spec: Arc<MemSpec>) -> Ddr4Core {
    Ddr4Core::new(spec).expect("test spec is valid")
}

pub fn bank_cmd(timestamp: Cycle, kind: CmdType, bank: usize) -> Command {
    Command::new(timestamp, kind, TargetCoordinate::bank(0, 0, bank))
}

pub fn rank_cmd(timestamp: Cycle, kind: CmdType) -> Command {
    Command::new(timestamp, kind, TargetCoordinate::rank(0))
}
