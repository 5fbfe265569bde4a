use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use dramwatt::ddr4::Ddr4Core;
use dramwatt::energy::EnergyResult;
use dramwatt::interval::Cycle;
use dramwatt::memspec::MemSpec;
use dramwatt::stats::SimulationStats;
use dramwatt::trace;

#[derive(Parser)]
#[command(version, about)]
struct DramwattArgs {
    #[arg(help = "Path to the memspec TOML")]
    memspec_path: PathBuf,
    #[arg(help = "Path to the command trace CSV")]
    trace_path: PathBuf,
    #[arg(long, help = "End-of-window timestamp (default: last command)")]
    window_end: Option<Cycle>,
    #[arg(long, help = "Print the stats snapshot only, skip energy")]
    stats_only: bool,
}

#[derive(Serialize)]
struct Report {
    stats: SimulationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<EnergyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_energy_pj: Option<f64>,
}

pub fn main() -> Result<()> {
    env_logger::init();

    let argv = DramwattArgs::parse();
    let spec = Arc::new(MemSpec::load(&argv.memspec_path)?);
    let commands = trace::read_trace(&argv.trace_path)?;

    let mut core = Ddr4Core::new(spec)?;
    for cmd in &commands {
        core.do_command(cmd)?;
    }

    let window_end = argv.window_end.unwrap_or(core.last_command_time());
    let stats = core.get_window_stats(window_end);
    let report = if argv.stats_only {
        Report {
            stats,
            energy: None,
            total_energy_pj: None,
        }
    } else {
        let energy = core.calc_energy(window_end);
        Report {
            stats,
            total_energy_pj: Some(energy.total()),
            energy: Some(energy),
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
