use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::output_path;

/// Why one output file could not take part in a comparison. Each index is
/// reported at most once per verification pass.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum VerifyFailure {
    #[error("output file for node {index} is missing: {path}")]
    MissingOutput { index: usize, path: PathBuf },
    #[error("output file for node {index} could not be read: {message}")]
    ReadFailed { index: usize, message: String },
}

impl VerifyFailure {
    pub fn index(&self) -> usize {
        match self {
            VerifyFailure::MissingOutput { index, .. } => *index,
            VerifyFailure::ReadFailed { index, .. } => *index,
        }
    }
}

/// Result of one verification pass over a range of node indices.
///
/// `converged` is true only if every adjacent pair of output files matched
/// byte for byte and every file in the range was readable. A range of
/// length 0 or 1 is trivially converged.
#[derive(Clone, Debug, Serialize)]
pub struct RangeVerdict {
    pub indices: Vec<usize>,
    pub converged: bool,
    /// Adjacent index pairs whose files were both readable but differed.
    pub mismatched_pairs: Vec<(usize, usize)>,
    pub failures: Vec<VerifyFailure>,
}

impl RangeVerdict {
    fn trivially_converged(indices: &[usize]) -> Self {
        RangeVerdict {
            indices: indices.to_vec(),
            converged: true,
            mismatched_pairs: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// The human-readable verdict line for this range.
    pub fn label(&self) -> &'static str {
        if self.converged {
            "SAME"
        } else {
            "WRONG"
        }
    }
}

/// Compares the output files of a fleet pairwise.
///
/// Convergence over a range holds through transitivity of the adjacent-pair
/// walk: if file i equals file i+1 for every i in the range, all files in
/// the range are equal. Comparison is always over full file contents, never
/// size or timestamp shortcuts.
#[derive(Clone, Debug)]
pub struct OutputVerifier {
    output_dir: PathBuf,
}

impl OutputVerifier {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        OutputVerifier {
            output_dir: output_dir.into(),
        }
    }

    /// Walks the given indices in order and compares each adjacent pair.
    /// An unreadable file is recorded once in `failures`, fails the range,
    /// and never aborts the pass.
    pub fn verify(&self, indices: &[usize]) -> RangeVerdict {
        if indices.len() < 2 {
            return RangeVerdict::trivially_converged(indices);
        }

        let mut verdict = RangeVerdict {
            indices: indices.to_vec(),
            converged: true,
            mismatched_pairs: Vec::new(),
            failures: Vec::new(),
        };

        // Each file is read once and carried into the next pair.
        let mut prev: Option<(usize, Option<Vec<u8>>)> = None;
        for &index in indices {
            let contents = match self.read_output(index) {
                Ok(bytes) => Some(bytes),
                Err(failure) => {
                    log::warn!("[Verifier] {}", failure);
                    verdict.failures.push(failure);
                    verdict.converged = false;
                    None
                }
            };
            if let Some((prev_index, prev_contents)) = prev.take() {
                if let (Some(a), Some(b)) = (&prev_contents, &contents) {
                    if a != b {
                        verdict.mismatched_pairs.push((prev_index, index));
                        verdict.converged = false;
                    }
                }
            }
            prev = Some((index, contents));
        }
        verdict
    }

    /// Single verdict over the whole 1-based range of a fleet.
    pub fn verify_all(&self, size: usize) -> RangeVerdict {
        self.verify(&crate::config::full_range(size))
    }

    fn read_output(&self, index: usize) -> Result<Vec<u8>, VerifyFailure> {
        let path = output_path(&self.output_dir, index);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                VerifyFailure::MissingOutput { index, path }
            } else {
                VerifyFailure::ReadFailed {
                    index,
                    message: e.to_string(),
                }
            }
        })
    }
}
