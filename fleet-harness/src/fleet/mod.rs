// Fleet lifecycle: per-node handles, the launcher that builds them, and the
// generator->node pipeline each handle supervises.

pub mod launcher;
pub mod pipeline;

pub use launcher::FleetLauncher;
pub use pipeline::{GeneratorPipe, SpawnError};

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitStatus;

use futures::future::join_all;

/// Where a pipeline is in its lifecycle. `Running` means the harness has not
/// killed it; the node may still crash on its own behind our back, which is
/// fine, the kill path treats an already-dead process as already killed.
#[derive(Debug)]
pub enum NodeStatus {
    Running(GeneratorPipe),
    /// The spawn itself failed; the error text says why. A failed handle
    /// stays in the fleet so verification still covers its index.
    SpawnFailed(String),
    Killed {
        node_exit: Option<ExitStatus>,
    },
}

/// One node's slot in the fleet: its identity, where its files live, and the
/// pipeline (if any) running under it.
#[derive(Debug)]
pub struct NodeHandle {
    pub index: usize,
    pub port: u16,
    pub config_path: PathBuf,
    pub output_path: PathBuf,
    status: NodeStatus,
}

impl NodeHandle {
    pub fn new(
        index: usize,
        port: u16,
        config_path: PathBuf,
        output_path: PathBuf,
        status: NodeStatus,
    ) -> Self {
        NodeHandle {
            index,
            port,
            config_path,
            output_path,
            status,
        }
    }

    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, NodeStatus::Running(_))
    }

    pub fn spawn_failure(&self) -> Option<&str> {
        match &self.status {
            NodeStatus::SpawnFailed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Kills and reaps the pipeline if it is running. Terminating a handle
    /// that already failed to spawn or was already killed changes nothing.
    pub async fn terminate(&mut self) {
        let status = std::mem::replace(&mut self.status, NodeStatus::Killed { node_exit: None });
        match status {
            NodeStatus::Running(mut pipe) => {
                let node_exit = pipe.terminate().await;
                log::debug!("[Fleet] node {} terminated, exit {:?}", self.index, node_exit);
                self.status = NodeStatus::Killed { node_exit };
            }
            other => self.status = other,
        }
    }
}

/// All launched handles, one per index, in launch order.
#[derive(Debug, Default)]
pub struct Fleet {
    handles: Vec<NodeHandle>,
}

impl Fleet {
    pub(crate) fn push(&mut self, handle: NodeHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[NodeHandle] {
        &self.handles
    }

    /// Looks a handle up by its 1-based node index.
    pub fn get(&self, index: usize) -> Option<&NodeHandle> {
        self.handles.iter().find(|h| h.index == index)
    }

    pub fn running_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_running()).count()
    }

    /// Indices that never produced a pipeline, with the spawn error text.
    pub fn spawn_failures(&self) -> Vec<(usize, String)> {
        self.handles
            .iter()
            .filter_map(|h| h.spawn_failure().map(|reason| (h.index, reason.to_string())))
            .collect()
    }

    /// Kills the handles with the given indices concurrently and waits for
    /// all of them to be reaped. Unknown indices are ignored.
    pub async fn terminate_indices(&mut self, indices: &[usize]) {
        let targets: HashSet<usize> = indices.iter().copied().collect();
        let kills = self
            .handles
            .iter_mut()
            .filter(|h| targets.contains(&h.index))
            .map(|h| h.terminate());
        join_all(kills).await;
    }

    /// Kills every handle that is still running.
    pub async fn terminate_all(&mut self) {
        join_all(self.handles.iter_mut().map(|h| h.terminate())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn failed_handle(index: usize) -> NodeHandle {
        NodeHandle::new(
            index,
            1230 + index as u16,
            PathBuf::from(format!("config/3config{}", index)),
            PathBuf::from(format!("output{}.txt", index)),
            NodeStatus::SpawnFailed("exec failed".to_string()),
        )
    }

    #[tokio::test]
    async fn test_terminate_spares_failed_handles() {
        let mut fleet = Fleet::default();
        fleet.push(failed_handle(1));
        fleet.push(failed_handle(2));

        fleet.terminate_all().await;
        // A handle that never spawned keeps its failure record
        for handle in fleet.handles() {
            assert!(matches!(handle.status(), NodeStatus::SpawnFailed(_)));
        }
        assert_eq!(fleet.spawn_failures().len(), 2);
    }

    #[tokio::test]
    async fn test_terminate_indices_ignores_unknown() {
        let mut fleet = Fleet::default();
        fleet.push(failed_handle(1));
        fleet.terminate_indices(&[1, 7, 42]).await;
        assert_eq!(fleet.len(), 1);
    }

    #[test]
    fn test_lookup_by_index() {
        let mut fleet = Fleet::default();
        fleet.push(failed_handle(1));
        fleet.push(failed_handle(2));
        assert_eq!(fleet.get(2).map(|h| h.port), Some(1232));
        assert!(fleet.get(3).is_none());
        assert_eq!(fleet.running_count(), 0);
    }
}
