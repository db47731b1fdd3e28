//! Fault-injection run over a fleet of external node processes.
//!
//! Launches `n` generator->node pipelines, kills the first half of the fleet
//! and later the whole fleet at fixed deadlines, and reports whether the
//! per-node output files converged. Ctrl-C at any point skips the rest of
//! the schedule, kills everything and verifies the full range at once.
//!
//! ```bash
//! cargo run --package runner -- 10 1.5
//! ```

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

use fleet_harness::{
    FaultScheduler, FleetLauncher, FleetSpec, HarnessConfig, InterruptController, OutputVerifier,
    RunReport,
};

#[derive(Parser, Debug)]
#[command(name = "runner")]
#[command(about = "Launches a node fleet, kills it in waves, verifies output convergence")]
struct Args {
    /// Number of node pipelines to launch (1..=99)
    n: usize,

    /// Transaction rate handed to every generator, in tx/s
    rate: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the index and verdict lines
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .unwrap();
    let args = Args::parse();

    // Everything is validated before the first spawn
    let spec = match FleetSpec::new(args.n, args.rate) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("invalid arguments: {}", e);
            return ExitCode::from(2);
        }
    };
    let config = HarnessConfig::default();
    let mut scheduler = match FaultScheduler::from_config(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    let started = Instant::now();
    let mut interrupt = InterruptController::install();
    let verifier = OutputVerifier::new(config.output_dir.clone());

    let mut fleet = match FleetLauncher::new(config).launch(&spec).await {
        Ok(fleet) => fleet,
        Err(e) => {
            eprintln!("launch failed: {}", e);
            return ExitCode::from(2);
        }
    };
    let spawn_failures = fleet.spawn_failures();

    let outcome = scheduler.run(&mut fleet, &verifier, &mut interrupt).await;

    let report = RunReport {
        outcome,
        elapsed: started.elapsed(),
        spawn_failures,
    };
    print!("{}", report);
    info!("[Runner] run finished in {:?}", report.elapsed);
    ExitCode::from(report.exit_code())
}
