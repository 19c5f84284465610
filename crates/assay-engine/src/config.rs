//! Run configuration, validation, and error types.
//!
//! [`RunConfig`] controls how an [`Experiment`](crate::Experiment) executes
//! its simulations: whether loop iterations are distributed across
//! workers, which slice this process owns, and where per-run files go.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

// ── WorkerSlot ─────────────────────────────────────────────────────

/// This process's place among cooperating worker processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerSlot {
    /// Zero-based id of this worker. Default: 0.
    pub rank: usize,
    /// Total number of workers. Default: 1.
    pub count: usize,
}

impl Default for WorkerSlot {
    fn default() -> Self {
        Self { rank: 0, count: 1 }
    }
}

impl WorkerSlot {
    /// True if there is more than one worker to share the work with.
    pub fn is_distributed(&self) -> bool {
        self.count > 1
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`RunConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `worker.count` is zero.
    NoWorkers,
    /// `worker.rank` is not below `worker.count`.
    RankOutOfRange {
        /// The configured rank.
        rank: usize,
        /// The configured worker count.
        count: usize,
    },
    /// The output folder path names an existing file.
    OutputFolderIsFile {
        /// The configured path.
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers => write!(f, "worker count must be at least 1"),
            Self::RankOutOfRange { rank, count } => {
                write!(f, "worker rank {rank} is out of range for {count} workers")
            }
            Self::OutputFolderIsFile { path } => {
                write!(f, "output folder {} is an existing file", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

// ── RunConfig ──────────────────────────────────────────────────────

/// How an experiment runs its simulations.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// Distribute iterations of the deepest independent loop across
    /// workers. Default: false.
    pub parallelise_loops: bool,
    /// This worker's slice. Default: rank 0 of 1.
    pub worker: WorkerSlot,
    /// Root folder for per-run model output. Default: none.
    pub output_folder: Option<PathBuf>,
}

impl RunConfig {
    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. At least one worker.
        if self.worker.count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        // 2. Rank within the worker pool.
        if self.worker.rank >= self.worker.count {
            return Err(ConfigError::RankOutOfRange {
                rank: self.worker.rank,
                count: self.worker.count,
            });
        }
        // 3. Output folder must be creatable as a directory.
        if let Some(path) = &self.output_folder {
            if path.is_file() {
                return Err(ConfigError::OutputFolderIsFile { path: path.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.worker.is_distributed());
    }

    #[test]
    fn zero_workers_fails() {
        let config = RunConfig {
            worker: WorkerSlot { rank: 0, count: 0 },
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn rank_out_of_range_fails() {
        let config = RunConfig {
            worker: WorkerSlot { rank: 2, count: 2 },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RankOutOfRange { rank: 2, count: 2 })
        );
    }

    #[test]
    fn output_folder_must_not_be_a_file() {
        let file = std::env::temp_dir().join("assay-config-test-file");
        std::fs::write(&file, b"x").unwrap();
        let config = RunConfig {
            output_folder: Some(file.clone()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutputFolderIsFile { .. })
        ));
        std::fs::remove_file(file).unwrap();
    }
}
