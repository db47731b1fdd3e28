use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::verifier::RangeVerdict;

/// How a run ended: the scheduler walked both kill waves to the end, or
/// the interrupt cut the schedule short.
#[derive(Clone, Debug, Serialize)]
pub enum RunOutcome {
    Completed {
        total: usize,
        first: RangeVerdict,
        second: RangeVerdict,
    },
    Interrupted {
        total: usize,
        verdict: RangeVerdict,
    },
}

impl RunOutcome {
    pub fn total(&self) -> usize {
        match self {
            RunOutcome::Completed { total, .. } => *total,
            RunOutcome::Interrupted { total, .. } => *total,
        }
    }

    pub fn converged(&self) -> bool {
        match self {
            RunOutcome::Completed { first, second, .. } => first.converged && second.converged,
            RunOutcome::Interrupted { verdict, .. } => verdict.converged,
        }
    }

    fn verdicts(&self) -> Vec<&RangeVerdict> {
        match self {
            RunOutcome::Completed { first, second, .. } => vec![first, second],
            RunOutcome::Interrupted { verdict, .. } => vec![verdict],
        }
    }
}

/// Everything the caller needs to print and to pick an exit code.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Indices that never spawned, with the spawn error text.
    pub spawn_failures: Vec<(usize, String)>,
}

impl RunReport {
    /// A run succeeds only if every verdict came back SAME and every
    /// pipeline actually spawned.
    pub fn success(&self) -> bool {
        self.outcome.converged() && self.spawn_failures.is_empty()
    }

    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunReport {
    /// The run's human-readable tail: the handle count line, a verdict line
    /// per verified range, then any failures worth naming.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.outcome.total())?;
        match &self.outcome {
            RunOutcome::Completed { first, second, .. } => {
                writeln!(f, "first half ({}): {}", range_label(&first.indices), first.label())?;
                writeln!(
                    f,
                    "second half ({}): {}",
                    range_label(&second.indices),
                    second.label()
                )?;
            }
            RunOutcome::Interrupted { verdict, .. } => {
                writeln!(f, "{}", verdict.label())?;
            }
        }
        for verdict in self.outcome.verdicts() {
            for failure in &verdict.failures {
                writeln!(f, "{}", failure)?;
            }
        }
        for (index, reason) in &self.spawn_failures {
            writeln!(f, "node {} never spawned: {}", index, reason)?;
        }
        Ok(())
    }
}

fn range_label(indices: &[usize]) -> String {
    match (indices.first(), indices.last()) {
        (Some(first), Some(last)) if first != last => format!("{}-{}", first, last),
        (Some(first), _) => first.to_string(),
        _ => "empty".to_string(),
    }
}
