use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::interval::Cycle;

/// Device geometry, fixed for the engine's lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub number_of_ranks: usize,
    pub number_of_banks: usize,
    pub number_of_bank_groups: usize,
    pub number_of_devices: usize,
    pub burst_length: u64,
    pub data_rate: u64,
    /// Distance between the two banks refreshed by a REFP2B, modulo the bank
    /// count.
    #[serde(default = "default_per_two_bank_offset")]
    pub per_two_bank_offset: usize,
}

fn default_per_two_bank_offset() -> usize {
    8
}

/// JEDEC timing set.  All values are clock cycles except `t_ck` (ns).
#[derive(Debug, Clone, Deserialize)]
pub struct TimingSpec {
    pub t_ck: f64,
    pub t_ras: Cycle,
    pub t_rcd: Cycle,
    pub t_rp: Cycle,
    pub t_rfc: Cycle,
    /// Per-bank and same-bank refresh cycle times fall back to `t_rfc` when
    /// a memspec does not provide them.
    #[serde(default)]
    pub t_rfc_pb: Option<Cycle>,
    #[serde(default)]
    pub t_rfc_sb: Option<Cycle>,
    pub t_rtp: Cycle,
    pub t_wr: Cycle,
    pub t_wl: Cycle,
    #[serde(default)]
    pub t_al: Cycle,
}

impl TimingSpec {
    pub fn t_rfc_pb(&self) -> Cycle {
        self.t_rfc_pb.unwrap_or(self.t_rfc)
    }

    pub fn t_rfc_sb(&self) -> Cycle {
        self.t_rfc_sb.unwrap_or(self.t_rfc)
    }
}

/// IDDx/VDD table for one voltage domain (VDD, and VPP where the standard
/// has one).  Currents in mA, voltage in V.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerDomain {
    pub vdd: f64,
    pub idd0: f64,
    pub idd2n: f64,
    pub idd3n: f64,
    pub idd4r: f64,
    pub idd4w: f64,
    pub idd5b: f64,
    pub idd6: f64,
    pub idd2p: f64,
    pub idd3p: f64,
    /// Activate floor current used by the I_theta derivation; defaults to
    /// IDD0.
    #[serde(default)]
    pub i_beta: Option<f64>,
    #[serde(default)]
    pub idd5pb: Option<f64>,
    #[serde(default)]
    pub idd6_dsm: Option<f64>,
}

impl PowerDomain {
    pub fn i_beta(&self) -> f64 {
        self.i_beta.unwrap_or(self.idd0)
    }

    pub fn idd5pb(&self) -> f64 {
        self.idd5pb.unwrap_or(self.idd5b)
    }

    pub fn idd6_dsm(&self) -> f64 {
        self.idd6_dsm.unwrap_or(self.idd6)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BankWiseParams {
    /// Background-current sharing factor between bank groups (rho).
    pub rho: f64,
}

impl Default for BankWiseParams {
    fn default() -> Self {
        Self { rho: 0.5 }
    }
}

/// Immutable memory specification, loaded from TOML and validated once at
/// engine construction.  Malformed input here is fatal (unlike trace-level
/// contract violations, which are only reported).
#[derive(Debug, Clone, Deserialize)]
pub struct MemSpec {
    pub geometry: Geometry,
    pub timing: TimingSpec,
    /// One entry per voltage domain; `[[power]]` tables in the TOML.
    pub power: Vec<PowerDomain>,
    #[serde(default)]
    pub bank_wise: BankWiseParams,
}

impl MemSpec {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let spec: MemSpec = toml::from_str(raw).context("cannot parse memspec toml")?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read memspec {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let geom = &self.geometry;
        ensure!(geom.number_of_ranks >= 1, "memspec needs at least one rank");
        ensure!(geom.number_of_banks >= 1, "memspec needs at least one bank");
        ensure!(
            geom.number_of_bank_groups >= 1 && geom.number_of_bank_groups <= geom.number_of_banks,
            "bank group count {} out of range for {} banks",
            geom.number_of_bank_groups,
            geom.number_of_banks
        );
        ensure!(
            geom.number_of_banks % geom.number_of_bank_groups == 0,
            "{} banks do not divide into {} bank groups",
            geom.number_of_banks,
            geom.number_of_bank_groups
        );
        ensure!(geom.number_of_devices >= 1, "memspec needs at least one device");
        ensure!(geom.data_rate >= 1, "data rate must be at least 1");
        ensure!(geom.burst_length >= 1, "burst length must be at least 1");
        ensure!(
            geom.per_two_bank_offset < geom.number_of_banks,
            "per-two-bank offset {} exceeds bank count {}",
            geom.per_two_bank_offset,
            geom.number_of_banks
        );
        ensure!(self.timing.t_ck > 0.0, "tCK must be positive");
        ensure!(self.timing.t_ras > 0, "tRAS must be positive");
        ensure!(
            !self.power.is_empty() && self.power.len() <= 2,
            "expected one or two voltage domains, got {}",
            self.power.len()
        );
        Ok(())
    }

    pub fn banks_per_group(&self) -> usize {
        self.geometry.number_of_banks / self.geometry.number_of_bank_groups
    }

    /// Cycles between an RDA and its implicit precharge.
    pub fn precharge_offset_rd(&self) -> Cycle {
        self.timing.t_al + self.timing.t_rtp
    }

    /// Cycles between a WRA and its implicit precharge: write latency, the
    /// burst on the bus, then write recovery.
    pub fn precharge_offset_wr(&self) -> Cycle {
        self.timing.t_wl + self.geometry.burst_length / self.geometry.data_rate + self.timing.t_wr
    }
}
