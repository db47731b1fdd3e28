// Fault-injection harness for fleets of external node processes.
//
// The harness launches N generator->node pipelines with staggered starts,
// kills half of the fleet and then all of it at fixed deadlines (or
// everything at once on Ctrl-C), and afterwards checks that the per-node
// output files converged byte for byte.

pub mod config;
pub mod fleet;
pub mod interrupt;
pub mod report;
pub mod scheduler;
pub mod verifier;

pub mod test_utils; // Shared across the unit and scenario tests

pub use config::{ConfigError, FleetSpec, HarnessConfig};
pub use fleet::{Fleet, FleetLauncher, NodeHandle, NodeStatus};
pub use interrupt::{InterruptController, InterruptHandle};
pub use report::{RunOutcome, RunReport};
pub use scheduler::{FaultEvent, FaultScheduler, KillScope, SchedulerState};
pub use verifier::{OutputVerifier, RangeVerdict, VerifyFailure};
