use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Largest supported fleet. Ports are derived by appending the node index to
/// "123", and "123" followed by a three-digit index no longer fits in a u16.
pub const MAX_FLEET_SIZE: usize = 99;

/// What the caller asked for on the command line: how many pipelines to
/// launch and how fast each generator should emit transactions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FleetSpec {
    pub size: usize,
    /// Transactions per second, forwarded verbatim to each generator.
    pub rate: f64,
}

impl FleetSpec {
    pub fn new(size: usize, rate: f64) -> Result<Self, ConfigError> {
        let spec = FleetSpec { size, rate };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::EmptyFleet);
        }
        if self.size > MAX_FLEET_SIZE {
            return Err(ConfigError::FleetTooLarge { size: self.size });
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::InvalidRate { rate: self.rate });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    // Launch
    /// Delay inserted before each pipeline spawn to avoid port/config races.
    pub inter_launch_delay: Duration,
    /// Node executable plus any leading arguments. The harness appends the
    /// node id, the port and the config file path.
    pub node_command: Vec<String>,
    /// Generator executable plus any leading arguments. The harness appends
    /// the transaction rate.
    pub generator_command: Vec<String>,
    /// Directory holding the per-node config files ({size}config{index}).
    pub config_dir: PathBuf,
    /// Directory the per-node output files (output{index}.txt) land in.
    pub output_dir: PathBuf,

    // Fault schedule, measured from the start of the schedule
    pub half_kill_after: Duration,
    pub full_kill_after: Duration,

    // Shutdown
    /// Delay between mass termination and verification so the killed
    /// processes' final writes reach the output files.
    pub grace_period: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            // Launch
            inter_launch_delay: Duration::from_millis(200),
            node_command: vec!["./node".to_string()],
            generator_command: vec![
                "python3".to_string(),
                "-u".to_string(),
                "gentx.py".to_string(),
            ],
            config_dir: PathBuf::from("./config"),
            output_dir: PathBuf::from("."),

            // Fault schedule
            half_kill_after: Duration::from_secs(100),
            full_kill_after: Duration::from_secs(200),

            // Shutdown
            grace_period: Duration::from_millis(100),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_command.is_empty() {
            return Err(ConfigError::EmptyCommand { role: "node" });
        }
        if self.generator_command.is_empty() {
            return Err(ConfigError::EmptyCommand { role: "generator" });
        }
        if self.half_kill_after >= self.full_kill_after {
            return Err(ConfigError::DeadlinesOutOfOrder {
                half: self.half_kill_after,
                full: self.full_kill_after,
            });
        }
        Ok(())
    }
}

/// Fatal startup problems. Nothing is spawned once one of these is hit.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fleet size must be at least 1")]
    EmptyFleet,
    #[error("fleet size {size} exceeds the {}-node port range", MAX_FLEET_SIZE)]
    FleetTooLarge { size: usize },
    #[error("transaction rate must be a positive number, got {rate}")]
    InvalidRate { rate: f64 },
    #[error("derived port for node {index} does not fit in a u16")]
    PortOverflow { index: usize },
    #[error("{role} command must name an executable")]
    EmptyCommand { role: &'static str },
    #[error("half-kill deadline ({half:?}) must come before full-kill deadline ({full:?})")]
    DeadlinesOutOfOrder { half: Duration, full: Duration },
}

/// Node identifier passed as the node executable's first argument.
pub fn node_id(index: usize) -> String {
    format!("node{}", index)
}

/// Listen port for a node: the index appended to the literal prefix "123".
/// Node 1 gets 1231, node 10 gets 12310. The concatenation overflows a u16
/// from index 100 on, which is what caps [`MAX_FLEET_SIZE`].
pub fn derive_port(index: usize) -> Result<u16, ConfigError> {
    format!("123{}", index)
        .parse::<u16>()
        .map_err(|_| ConfigError::PortOverflow { index })
}

/// Config file path for one node, named after both the fleet size and the
/// node index ({size}config{index}).
pub fn config_path(config_dir: &Path, size: usize, index: usize) -> PathBuf {
    config_dir.join(format!("{}config{}", size, index))
}

/// Output file path the node's stdout is redirected to.
pub fn output_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("output{}.txt", index))
}

/// Splits the 1-based index range into two disjoint halves. The first half
/// is 1..=size/2 and takes the first kill wave; the rest is the second half.
/// For odd sizes the second half is the larger one.
pub fn half_split(size: usize) -> (Vec<usize>, Vec<usize>) {
    let mid = size / 2;
    ((1..=mid).collect(), (mid + 1..=size).collect())
}

/// The whole 1-based index range of a fleet.
pub fn full_range(size: usize) -> Vec<usize> {
    (1..=size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.inter_launch_delay, Duration::from_millis(200));
        assert_eq!(config.node_command, vec!["./node".to_string()]);
        assert_eq!(config.generator_command.first().map(String::as_str), Some("python3"));
        assert_eq!(config.config_dir, PathBuf::from("./config"));
        assert_eq!(config.half_kill_after, Duration::from_secs(100));
        assert_eq!(config.full_kill_after, Duration::from_secs(200));
        assert_eq!(config.grace_period, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_spec_validation() {
        assert!(FleetSpec::new(1, 1.0).is_ok());
        assert!(FleetSpec::new(99, 0.5).is_ok());
        assert!(matches!(FleetSpec::new(0, 1.0), Err(ConfigError::EmptyFleet)));
        assert!(matches!(
            FleetSpec::new(100, 1.0),
            Err(ConfigError::FleetTooLarge { size: 100 })
        ));
        assert!(matches!(FleetSpec::new(3, 0.0), Err(ConfigError::InvalidRate { .. })));
        assert!(matches!(FleetSpec::new(3, -2.0), Err(ConfigError::InvalidRate { .. })));
        assert!(matches!(
            FleetSpec::new(3, f64::NAN),
            Err(ConfigError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_deadline_ordering() {
        let mut config = HarnessConfig::default();
        config.half_kill_after = Duration::from_secs(10);
        config.full_kill_after = Duration::from_secs(10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DeadlinesOutOfOrder { .. })
        ));
        config.full_kill_after = Duration::from_secs(11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_derivation() {
        assert_eq!(derive_port(1).unwrap(), 1231);
        assert_eq!(derive_port(9).unwrap(), 1239);
        assert_eq!(derive_port(10).unwrap(), 12310);
        assert_eq!(derive_port(99).unwrap(), 12399);
        assert!(derive_port(100).is_err());

        // Every supported index maps to its own port
        let mut ports: Vec<u16> = (1..=MAX_FLEET_SIZE)
            .map(|i| derive_port(i).unwrap())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), MAX_FLEET_SIZE);
    }

    #[test]
    fn test_path_derivation() {
        let config_file = config_path(Path::new("./config"), 3, 1);
        assert_eq!(config_file, PathBuf::from("./config/3config1"));
        let output_file = output_path(Path::new("."), 2);
        assert_eq!(output_file, PathBuf::from("./output2.txt"));
    }

    #[test]
    fn test_half_split() {
        assert_eq!(half_split(4), (vec![1, 2], vec![3, 4]));
        assert_eq!(half_split(5), (vec![1, 2], vec![3, 4, 5]));
        assert_eq!(half_split(1), (vec![], vec![1]));

        // The halves partition the full range
        for size in 1..=10 {
            let (first, second) = half_split(size);
            let mut joined = first.clone();
            joined.extend(&second);
            assert_eq!(joined, full_range(size));
            assert!(first.iter().all(|i| !second.contains(i)));
        }
    }
}
