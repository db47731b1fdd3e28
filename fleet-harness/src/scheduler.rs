use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::{self, ConfigError, HarnessConfig};
use crate::fleet::Fleet;
use crate::interrupt::InterruptController;
use crate::report::RunOutcome;
use crate::verifier::OutputVerifier;

/// Which part of the fleet a fault event takes down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum KillScope {
    FirstHalf,
    All,
}

/// One scheduled mass termination, anchored to the start of the schedule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaultEvent {
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
    pub scope: KillScope,
}

/// Progress of the kill schedule. The states only ever advance in this
/// order; an interrupt freezes the machine wherever it stands and the
/// interrupt path takes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    HalfKilled,
    FullyKilled,
}

/// Drives the two kill waves against a launched fleet and produces the
/// run's verdicts.
///
/// The deadlines are absolute offsets from the moment [`run`] starts, not
/// gaps between waves: a wave that fires late does not push the next one
/// back.
///
/// [`run`]: FaultScheduler::run
pub struct FaultScheduler {
    events: Vec<FaultEvent>,
    grace_period: Duration,
    state: SchedulerState,
}

impl FaultScheduler {
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(FaultScheduler {
            events: vec![
                FaultEvent {
                    deadline: config.half_kill_after,
                    scope: KillScope::FirstHalf,
                },
                FaultEvent {
                    deadline: config.full_kill_after,
                    scope: KillScope::All,
                },
            ],
            grace_period: config.grace_period,
            state: SchedulerState::Idle,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn events(&self) -> &[FaultEvent] {
        &self.events
    }

    /// Walks the kill schedule to completion, or hands the run to the
    /// interrupt path the moment the interrupt fires.
    ///
    /// Exactly one shutdown sequence ever runs: an interrupt received while
    /// waiting on a deadline skips that wave and every later one.
    pub async fn run(
        &mut self,
        fleet: &mut Fleet,
        verifier: &OutputVerifier,
        interrupt: &mut InterruptController,
    ) -> RunOutcome {
        let started = Instant::now();
        self.state = SchedulerState::Running;
        log::info!(
            "[Scheduler] schedule armed: half kill at {:?}, full kill at {:?}",
            self.events.first().map(|e| e.deadline),
            self.events.last().map(|e| e.deadline)
        );

        let events = self.events.clone();
        for event in &events {
            let wakeup = started + event.deadline;
            let interrupted = tokio::select! {
                _ = tokio::time::sleep_until(wakeup) => false,
                _ = interrupt.triggered() => true,
            };
            if interrupted {
                log::info!("[Scheduler] interrupted before the {:?} wave", event.scope);
                let verdict =
                    InterruptController::shutdown_fleet(fleet, verifier, self.grace_period).await;
                return RunOutcome::Interrupted {
                    total: fleet.len(),
                    verdict,
                };
            }
            self.apply_wave(event.scope, fleet).await;
        }

        // Natural completion: grace period for final writes, then a verdict
        // per half over disjoint index ranges.
        tokio::time::sleep(self.grace_period).await;
        let (first_half, second_half) = config::half_split(fleet.len());
        let first = verifier.verify(&first_half);
        let second = verifier.verify(&second_half);
        log::info!(
            "[Scheduler] verdicts: first half {}, second half {}",
            first.label(),
            second.label()
        );
        RunOutcome::Completed {
            total: fleet.len(),
            first,
            second,
        }
    }

    pub(crate) async fn apply_wave(&mut self, scope: KillScope, fleet: &mut Fleet) {
        match scope {
            KillScope::FirstHalf => {
                let (first_half, _) = config::half_split(fleet.len());
                log::info!(
                    "[Scheduler] half-kill wave: terminating nodes {:?}",
                    first_half
                );
                fleet.terminate_indices(&first_half).await;
                self.state = SchedulerState::HalfKilled;
            }
            KillScope::All => {
                log::info!(
                    "[Scheduler] full-kill wave: terminating the remaining {} pipelines",
                    fleet.running_count()
                );
                fleet.terminate_all().await;
                self.state = SchedulerState::FullyKilled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::FleetLauncher;
    use crate::test_utils::{constant_node, silent_generator};
    use crate::FleetSpec;
    use tempfile::TempDir;

    fn stub_config(dir: &TempDir) -> HarnessConfig {
        let root = dir.path();
        HarnessConfig {
            inter_launch_delay: Duration::from_millis(10),
            node_command: constant_node(root, "X"),
            generator_command: silent_generator(root),
            config_dir: root.join("config"),
            output_dir: root.to_path_buf(),
            half_kill_after: Duration::from_millis(100),
            full_kill_after: Duration::from_millis(200),
            grace_period: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_schedule_from_config() {
        let scheduler = FaultScheduler::from_config(&HarnessConfig::default()).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(
            scheduler.events(),
            &[
                FaultEvent {
                    deadline: Duration::from_secs(100),
                    scope: KillScope::FirstHalf,
                },
                FaultEvent {
                    deadline: Duration::from_secs(200),
                    scope: KillScope::All,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_half_wave_kills_exactly_the_first_half() {
        let dir = TempDir::new().unwrap();
        let config = stub_config(&dir);
        let spec = FleetSpec::new(4, 1.0).unwrap();
        let mut fleet = FleetLauncher::new(config.clone())
            .launch(&spec)
            .await
            .unwrap();
        let mut scheduler = FaultScheduler::from_config(&config).unwrap();

        scheduler.apply_wave(KillScope::FirstHalf, &mut fleet).await;
        assert_eq!(scheduler.state(), SchedulerState::HalfKilled);
        assert!(!fleet.get(1).unwrap().is_running());
        assert!(!fleet.get(2).unwrap().is_running());
        assert!(fleet.get(3).unwrap().is_running());
        assert!(fleet.get(4).unwrap().is_running());

        scheduler.apply_wave(KillScope::All, &mut fleet).await;
        assert_eq!(scheduler.state(), SchedulerState::FullyKilled);
        assert_eq!(fleet.running_count(), 0);
    }

    #[tokio::test]
    async fn test_single_node_fleet_completes() {
        let dir = TempDir::new().unwrap();
        let config = stub_config(&dir);
        let spec = FleetSpec::new(1, 1.0).unwrap();
        let mut fleet = FleetLauncher::new(config.clone())
            .launch(&spec)
            .await
            .unwrap();
        let verifier = OutputVerifier::new(config.output_dir.clone());
        let (_handle, mut interrupt) = InterruptController::manual();
        let mut scheduler = FaultScheduler::from_config(&config).unwrap();

        let outcome = scheduler.run(&mut fleet, &verifier, &mut interrupt).await;
        assert_eq!(scheduler.state(), SchedulerState::FullyKilled);
        match outcome {
            RunOutcome::Completed { total, first, second } => {
                // The first half of a one-node fleet is empty; both halves
                // are trivially converged
                assert_eq!(total, 1);
                assert!(first.indices.is_empty());
                assert_eq!(second.indices, vec![1]);
                assert!(first.converged);
                assert!(second.converged);
            }
            other => panic!("expected natural completion, got {:?}", other),
        }
    }

    #[test]
    fn test_fault_event_serializes_with_humantime() {
        let event = FaultEvent {
            deadline: Duration::from_secs(100),
            scope: KillScope::FirstHalf,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["deadline"], serde_json::json!("1m 40s"));
        assert_eq!(json["scope"], serde_json::json!("FirstHalf"));
    }
}
