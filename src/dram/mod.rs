pub mod bank;
pub mod rank;

pub use bank::{Bank, BankState, CommandCounters};
pub use rank::{MemState, Rank, RankCounters};
