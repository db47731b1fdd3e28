use crate::config::{self, ConfigError, FleetSpec, HarnessConfig};

use super::pipeline::GeneratorPipe;
use super::{Fleet, NodeHandle, NodeStatus};

/// Brings the whole fleet up, one pipeline at a time.
///
/// Launches are staggered by the configured inter-launch delay so the nodes
/// never race each other for ports or config files. A spawn failure is
/// recorded on the handle and the launch moves on; only a configuration
/// problem aborts the launch as a whole.
pub struct FleetLauncher {
    config: HarnessConfig,
}

impl FleetLauncher {
    pub fn new(config: HarnessConfig) -> Self {
        FleetLauncher { config }
    }

    pub async fn launch(&self, spec: &FleetSpec) -> Result<Fleet, ConfigError> {
        spec.validate()?;
        self.config.validate()?;

        log::info!(
            "[Launcher] launching {} pipelines at {} tx/s",
            spec.size,
            spec.rate
        );

        let mut fleet = Fleet::default();
        for index in 1..=spec.size {
            let port = config::derive_port(index)?;
            let config_path = config::config_path(&self.config.config_dir, spec.size, index);
            let output_path = config::output_path(&self.config.output_dir, index);

            // Announce the index, then hold the stagger delay before the spawn
            println!("{}", index);
            tokio::time::sleep(self.config.inter_launch_delay).await;

            let status = match GeneratorPipe::spawn(
                &self.config,
                spec.rate,
                index,
                port,
                &config_path,
                &output_path,
            ) {
                Ok(pipe) => {
                    log::debug!(
                        "[Launcher] node {} up on port {} (config {})",
                        index,
                        port,
                        config_path.display()
                    );
                    NodeStatus::Running(pipe)
                }
                Err(e) => {
                    log::warn!("[Launcher] node {} failed to spawn: {}", index, e);
                    NodeStatus::SpawnFailed(e.to_string())
                }
            };
            fleet.push(NodeHandle::new(index, port, config_path, output_path, status));
        }

        let failed = fleet.spawn_failures();
        if !failed.is_empty() {
            log::warn!(
                "[Launcher] {} of {} pipelines failed to spawn",
                failed.len(),
                spec.size
            );
        }
        Ok(fleet)
    }
}
