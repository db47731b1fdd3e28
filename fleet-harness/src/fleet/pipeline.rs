use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::{Child, Command};

use crate::config::{node_id, HarnessConfig};

/// A spawn attempt that never produced a working pipeline. The generator is
/// cleaned up if it came up before the node failed.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to create output file {path}: {source}")]
    OutputFile { path: PathBuf, source: io::Error },
    #[error("failed to spawn generator `{program}`: {source}")]
    Generator { program: String, source: io::Error },
    #[error("generator stdout for node {index} could not be piped: {detail}")]
    GeneratorStdout { index: usize, detail: String },
    #[error("failed to spawn node `{program}`: {source}")]
    Node { program: String, source: io::Error },
    #[error("{role} command is empty")]
    EmptyCommand { role: &'static str },
}

/// One generator->node pipeline.
///
/// The generator's stdout is piped straight into the node's stdin, and the
/// node's stdout is redirected to the per-index output file. Both children
/// carry `kill_on_drop` so an aborted harness does not leave them running.
#[derive(Debug)]
pub struct GeneratorPipe {
    generator: Child,
    node: Child,
}

impl GeneratorPipe {
    /// Spawns the generator first, wires its stdout into the node, and
    /// redirects the node's stdout into `output_path`.
    pub fn spawn(
        config: &HarnessConfig,
        rate: f64,
        index: usize,
        port: u16,
        config_path: &Path,
        output_path: &Path,
    ) -> Result<Self, SpawnError> {
        let output_file = File::create(output_path).map_err(|source| SpawnError::OutputFile {
            path: output_path.to_path_buf(),
            source,
        })?;

        let (gen_program, gen_args) = config
            .generator_command
            .split_first()
            .ok_or(SpawnError::EmptyCommand { role: "generator" })?;
        let mut gen_cmd = Command::new(gen_program);
        gen_cmd
            .args(gen_args)
            .arg(rate.to_string()) // transactions per second
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true);
        let mut generator = gen_cmd.spawn().map_err(|source| SpawnError::Generator {
            program: gen_program.clone(),
            source,
        })?;

        let gen_stdout = generator.stdout.take().ok_or(SpawnError::GeneratorStdout {
            index,
            detail: "stdout was not captured".to_string(),
        })?;
        let gen_stdout: Stdio =
            gen_stdout
                .try_into()
                .map_err(|e: io::Error| SpawnError::GeneratorStdout {
                    index,
                    detail: e.to_string(),
                })?;

        let (node_program, node_args) = config
            .node_command
            .split_first()
            .ok_or(SpawnError::EmptyCommand { role: "node" })?;
        let mut node_cmd = Command::new(node_program);
        node_cmd
            .args(node_args)
            .arg(node_id(index)) // node identifier, e.g. node3
            .arg(port.to_string())
            .arg(config_path)
            .stdin(gen_stdout)
            .stdout(Stdio::from(output_file))
            .kill_on_drop(true);
        let node = node_cmd.spawn().map_err(|source| SpawnError::Node {
            program: node_program.clone(),
            source,
        })?;

        log::debug!(
            "[Pipeline] node {} spawned (generator pid {:?}, node pid {:?})",
            index,
            generator.id(),
            node.id()
        );

        Ok(GeneratorPipe { generator, node })
    }

    /// Force-kills both processes and reaps them. A process that already
    /// exited makes its kill a no-op, so terminating twice is safe.
    /// Returns the node's exit status when the reap succeeds.
    pub async fn terminate(&mut self) -> Option<ExitStatus> {
        if let Err(e) = self.generator.start_kill() {
            log::debug!("[Pipeline] generator kill skipped: {}", e);
        }
        if let Err(e) = self.node.start_kill() {
            log::debug!("[Pipeline] node kill skipped: {}", e);
        }
        let (gen_status, node_status) = tokio::join!(self.generator.wait(), self.node.wait());
        if let Err(e) = gen_status {
            log::warn!("[Pipeline] could not reap generator: {}", e);
        }
        node_status.ok()
    }
}
