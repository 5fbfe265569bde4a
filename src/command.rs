use std::fmt;
use std::str::FromStr;

use num_derive::FromPrimitive;

use crate::interval::Cycle;

/// Every command type an input trace can carry.  The discriminant doubles as
/// the dispatch-table index, so `COUNT` must stay in sync with the last
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum CmdType {
    Nop = 0,
    Rd,
    Wr,
    RdA,
    WrA,
    Act,
    Pre,
    RefB,
    RefP2b,
    RefSb,
    PreA,
    RefA,
    PdeA,
    PdeP,
    PdxA,
    PdxP,
    SrefEn,
    SrefEx,
    DsmEn,
    DsmEx,
    EndOfSimulation,
}

impl CmdType {
    pub const COUNT: usize = CmdType::EndOfSimulation as usize + 1;

    pub fn mnemonic(self) -> &'static str {
        match self {
            CmdType::Nop => "NOP",
            CmdType::Rd => "RD",
            CmdType::Wr => "WR",
            CmdType::RdA => "RDA",
            CmdType::WrA => "WRA",
            CmdType::Act => "ACT",
            CmdType::Pre => "PRE",
            CmdType::RefB => "REFB",
            CmdType::RefP2b => "REFP2B",
            CmdType::RefSb => "REFSB",
            CmdType::PreA => "PREA",
            CmdType::RefA => "REFA",
            CmdType::PdeA => "PDEA",
            CmdType::PdeP => "PDEP",
            CmdType::PdxA => "PDXA",
            CmdType::PdxP => "PDXP",
            CmdType::SrefEn => "SREFEN",
            CmdType::SrefEx => "SREFEX",
            CmdType::DsmEn => "DSMEN",
            CmdType::DsmEx => "DSMEX",
            CmdType::EndOfSimulation => "END",
        }
    }
}

static MNEMONICS: phf::Map<&'static str, CmdType> = phf::phf_map! {
    "NOP" => CmdType::Nop,
    "RD" => CmdType::Rd,
    "WR" => CmdType::Wr,
    "RDA" => CmdType::RdA,
    "WRA" => CmdType::WrA,
    "ACT" => CmdType::Act,
    "PRE" => CmdType::Pre,
    "REFB" => CmdType::RefB,
    "REFP2B" => CmdType::RefP2b,
    "REFSB" => CmdType::RefSb,
    "PREA" => CmdType::PreA,
    "REFA" => CmdType::RefA,
    "PDEA" => CmdType::PdeA,
    "PDEP" => CmdType::PdeP,
    "PDXA" => CmdType::PdxA,
    "PDXP" => CmdType::PdxP,
    "SREFEN" => CmdType::SrefEn,
    "SREFEX" => CmdType::SrefEx,
    "DSMEN" => CmdType::DsmEn,
    "DSMEX" => CmdType::DsmEx,
    "END" => CmdType::EndOfSimulation,
};

impl FromStr for CmdType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MNEMONICS
            .get(value)
            .copied()
            .ok_or_else(|| format!("unknown command mnemonic '{}'", value))
    }
}

impl fmt::Display for CmdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Address of the bank (or rank) a command is aimed at.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TargetCoordinate {
    pub rank: usize,
    pub bank_group: usize,
    pub bank: usize,
    pub row: usize,
    pub column: usize,
}

impl TargetCoordinate {
    pub fn bank(rank: usize, bank_group: usize, bank: usize) -> Self {
        Self {
            rank,
            bank_group,
            bank,
            ..Self::default()
        }
    }

    pub fn rank(rank: usize) -> Self {
        Self {
            rank,
            ..Self::default()
        }
    }
}

/// One entry of the input trace.  Immutable once issued; timestamps across a
/// replay must be non-decreasing.
#[derive(Debug, Clone)]
pub struct Command {
    pub timestamp: Cycle,
    pub kind: CmdType,
    pub target: TargetCoordinate,
    /// Burst payload, consumed only by interface-power collaborators.
    pub data: Option<Vec<u8>>,
}

impl Command {
    pub fn new(timestamp: Cycle, kind: CmdType, target: TargetCoordinate) -> Self {
        Self {
            timestamp,
            kind,
            target,
            data: None,
        }
    }

    pub fn with_data(timestamp: Cycle, kind: CmdType, target: TargetCoordinate, data: Vec<u8>) -> Self {
        Self {
            timestamp,
            kind,
            target,
            data: Some(data),
        }
    }
}
