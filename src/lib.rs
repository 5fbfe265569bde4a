//! DRAM energy and power estimation from memory-command traces.
//!
//! A trace is replayed against a bank/rank state model with interval-based
//! cycle accounting; accumulated cycle and command counts are then folded
//! into JEDEC IDDx energy terms.  `Ddr4Core` is the engine, `MemSpec` the
//! immutable device description, `Calculation` the energy stage.

pub mod command;
pub mod ddr4;
pub mod dram;
pub mod energy;
pub mod interval;
pub mod memspec;
pub mod router;
pub mod scheduler;
pub mod stats;
pub mod trace;

mod unit_tests;

pub use command::{CmdType, Command, TargetCoordinate};
pub use ddr4::Ddr4Core;
pub use energy::{BankEnergy, EnergyResult};
pub use interval::{Cycle, IntervalCounter};
pub use memspec::MemSpec;
pub use stats::SimulationStats;
