use crate::helpe::*;

/// Everything needed to set up a [`Simulator`]. Binaries flatten it
/// into their command line.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Size of the address space, in units
    #[arg(short, long, default_value_t = 100)]
    pub capacity:       Units,

    /// Placement policy
    #[arg(short, long, value_enum, default_value_t = Policy::FirstFit)]
    pub policy:         Policy,

    /// Fixed partition lengths (e.g. `100,200,300`). They must add up to
    /// the capacity. Leave empty for dynamic partitioning.
    #[arg(long, value_delimiter = ',')]
    pub partitions:     Vec<Units>,

    /// Address at which the space starts (only affects labels)
    #[arg(short, long, default_value_t = 0)]
    pub base_address:   Units,

    /// Units held at address 0 for the whole run (e.g. by the operating
    /// system). With fixed partitions, the first partition is reserved
    /// and must have exactly this length.
    #[arg(long, default_value_t = 0)]
    pub reserved:       Units,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::dynamic(100)
    }
}

impl SimConfig {
    pub fn dynamic(capacity: Units) -> Self {
        Self {
            capacity,
            policy:         Policy::FirstFit,
            partitions:     vec![],
            base_address:   0,
            reserved:       0,
        }
    }

    pub fn fixed(partitions: Vec<Units>) -> Self {
        let capacity = partitions.iter().fold(0, |s: Units, p| s.saturating_add(*p));
        Self {
            capacity,
            partitions,
            ..Self::dynamic(capacity)
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reserved(mut self, reserved: Units) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !self.partitions.is_empty() {
            if let Some(idx) = self.partitions.iter().position(|p| *p == 0) {
                return Err(ConfigError::ZeroPartition(idx));
            }
            let sum = self.partitions.iter().map(|p| *p as u64).sum::<u64>();
            if sum != self.capacity as u64 {
                return Err(ConfigError::PartitionMismatch { sum, capacity: self.capacity });
            }
        }
        if self.reserved > 0 {
            let room = match self.partitions.first() {
                None            => self.capacity - self.reserved.min(self.capacity),
                Some(first)     => {
                    if *first != self.reserved {
                        return Err(ConfigError::ReservedMismatch { reserved: self.reserved, partition: *first });
                    }
                    self.capacity - first
                }
            };
            if room == 0 {
                return Err(ConfigError::ReservedTooLarge { reserved: self.reserved, capacity: self.capacity });
            }
        }

        Ok(())
    }

    /// Builds the table this configuration describes. Assumes
    /// [`SimConfig::validate`] passed.
    pub fn build_table(&self) -> PartitionTable {
        if self.partitions.is_empty() {
            PartitionTable::new(self.capacity)
        } else {
            PartitionTable::fixed(&self.partitions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        config: SimConfig,
    }

    #[test]
    fn defaults_match_command_line() {
        let cli = Cli::parse_from(["memsim"]);
        assert_eq!(cli.config, SimConfig::default());
        assert_eq!(cli.config.validate(), Ok(()));
    }

    #[test]
    fn partitions_parse_from_list() {
        let cli = Cli::parse_from([
            "memsim", "--capacity", "600", "--partitions", "100,200,300", "--policy", "best-fit",
        ]);
        assert_eq!(cli.config, SimConfig::fixed(vec![100, 200, 300]).with_policy(Policy::BestFit));
        assert!(cli.config.build_table().is_fixed());
    }

    #[test]
    fn bad_configs_are_rejected() {
        assert_eq!(SimConfig::dynamic(0).validate(), Err(ConfigError::ZeroCapacity));
        assert_eq!(
            SimConfig::fixed(vec![10, 0]).validate(),
            Err(ConfigError::ZeroPartition(1))
        );
        let mut cfg = SimConfig::fixed(vec![10, 20]);
        cfg.capacity = 40;
        assert_eq!(cfg.validate(), Err(ConfigError::PartitionMismatch { sum: 30, capacity: 40 }));
    }

    #[test]
    fn reserved_space_must_leave_room() {
        assert_eq!(SimConfig::dynamic(100).with_reserved(40).validate(), Ok(()));
        assert_eq!(
            SimConfig::dynamic(100).with_reserved(100).validate(),
            Err(ConfigError::ReservedTooLarge { reserved: 100, capacity: 100 })
        );
        assert_eq!(SimConfig::fixed(vec![100, 200]).with_reserved(100).validate(), Ok(()));
        assert_eq!(
            SimConfig::fixed(vec![100, 200]).with_reserved(50).validate(),
            Err(ConfigError::ReservedMismatch { reserved: 50, partition: 100 })
        );
        assert_eq!(
            SimConfig::fixed(vec![100]).with_reserved(100).validate(),
            Err(ConfigError::ReservedTooLarge { reserved: 100, capacity: 100 })
        );
        let cli = Cli::parse_from(["memsim", "--reserved", "10"]);
        assert_eq!(cli.config, SimConfig::default().with_reserved(10));
    }
}
