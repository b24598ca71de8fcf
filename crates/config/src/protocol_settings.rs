use crate::error::ConfigError;
use crate::hardfork::Hardfork;
use neo_core::ECPoint;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Protocol settings of the network.
///
/// Construct through [`ProtocolSettings::load`] or [`ProtocolSettings::new`]
/// so the hardfork table is always validated. Settings are immutable once
/// built and are shared by reference throughout the node.
#[derive(Clone, Debug)]
pub struct ProtocolSettings {
    /// The magic number identifying the network.
    pub network: u32,
    /// Version byte used in address encoding.
    pub address_version: u8,
    /// Public keys of the standby committee members.
    pub standby_committee: Vec<ECPoint>,
    /// Number of consensus validators, drawn from the front of the
    /// committee.
    pub validators_count: usize,
    /// Target time between two blocks.
    pub milliseconds_per_block: u32,
    /// How far back contracts may read block and transaction state.
    pub max_traceable_blocks: u32,
    /// Amount of GAS minted to the committee address at genesis, in GAS
    /// fractions.
    pub initial_gas_distribution: i64,
    /// Activation height per hardfork. Forks absent from the map never
    /// activate.
    pub hardforks: HashMap<Hardfork, u32>,
}

#[derive(Deserialize)]
struct RawSettings {
    network: Option<u32>,
    address_version: Option<u8>,
    standby_committee: Vec<ECPoint>,
    validators_count: usize,
    milliseconds_per_block: Option<u32>,
    max_traceable_blocks: Option<u32>,
    initial_gas_distribution: Option<i64>,
    #[serde(default)]
    hardforks: HashMap<String, u32>,
}

impl ProtocolSettings {
    pub const DEFAULT_MS_PER_BLOCK: u32 = 15_000;
    pub const DEFAULT_MAX_TRACEABLE_BLOCKS: u32 = 2_102_400;
    pub const DEFAULT_INITIAL_GAS: i64 = 52_000_000_0000_0000;

    /// Builds validated settings from explicit values. Hardforks omitted
    /// before the first configured one are pinned to height 0.
    pub fn new(
        standby_committee: Vec<ECPoint>,
        validators_count: usize,
        hardforks: HashMap<Hardfork, u32>,
    ) -> Result<Self, ConfigError> {
        let settings = Self {
            network: 0,
            address_version: 0x35,
            standby_committee,
            validators_count,
            milliseconds_per_block: Self::DEFAULT_MS_PER_BLOCK,
            max_traceable_blocks: Self::DEFAULT_MAX_TRACEABLE_BLOCKS,
            initial_gas_distribution: Self::DEFAULT_INITIAL_GAS,
            hardforks: ensure_omitted_hardforks(hardforks),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = toml::from_str(text)?;
        let mut hardforks = HashMap::new();
        for (name, height) in raw.hardforks {
            hardforks.insert(Hardfork::from_str(&name)?, height);
        }
        let settings = Self {
            network: raw.network.unwrap_or(0),
            address_version: raw.address_version.unwrap_or(0x35),
            standby_committee: raw.standby_committee,
            validators_count: raw.validators_count,
            milliseconds_per_block: raw
                .milliseconds_per_block
                .unwrap_or(Self::DEFAULT_MS_PER_BLOCK),
            max_traceable_blocks: raw
                .max_traceable_blocks
                .unwrap_or(Self::DEFAULT_MAX_TRACEABLE_BLOCKS),
            initial_gas_distribution: raw
                .initial_gas_distribution
                .unwrap_or(Self::DEFAULT_INITIAL_GAS),
            hardforks: ensure_omitted_hardforks(hardforks),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Number of committee members.
    pub fn committee_members_count(&self) -> usize {
        self.standby_committee.len()
    }

    /// The standby validators, the first `validators_count` committee
    /// members.
    pub fn standby_validators(&self) -> Vec<ECPoint> {
        self.standby_committee
            .iter()
            .take(self.validators_count)
            .copied()
            .collect()
    }

    pub fn time_per_block(&self) -> Duration {
        Duration::from_millis(self.milliseconds_per_block as u64)
    }

    /// Whether `hardfork` is active at block `index`.
    pub fn is_hardfork_enabled(&self, hardfork: Hardfork, index: u32) -> bool {
        self.hardforks
            .get(&hardfork)
            .is_some_and(|&height| index >= height)
    }

    /// Like [`is_hardfork_enabled`], but `None` means "no gate" and is
    /// always active.
    pub fn is_hardfork_enabled_opt(&self, hardfork: Option<Hardfork>, index: u32) -> bool {
        match hardfork {
            Some(hf) => self.is_hardfork_enabled(hf, index),
            None => true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.standby_committee.is_empty() {
            return Err(ConfigError::Invalid("standby committee is empty".into()));
        }
        if self.validators_count == 0 || self.validators_count > self.standby_committee.len() {
            return Err(ConfigError::Invalid(format!(
                "validators_count {} out of range for committee of {}",
                self.validators_count,
                self.standby_committee.len()
            )));
        }
        if self.milliseconds_per_block == 0 {
            return Err(ConfigError::Invalid("milliseconds_per_block is zero".into()));
        }

        // Configured hardforks must be a prefix of the declaration order
        // and must activate in non-decreasing height order.
        let configured: Vec<Hardfork> = Hardfork::ALL
            .iter()
            .copied()
            .filter(|hf| self.hardforks.contains_key(hf))
            .collect();
        for (position, hf) in configured.iter().enumerate() {
            if hf.index() != position {
                return Err(ConfigError::NonContinuousHardforks(*hf));
            }
        }
        for pair in configured.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let earlier_height = self.hardforks[&earlier];
            let later_height = self.hardforks[&later];
            if later_height < earlier_height {
                return Err(ConfigError::UnorderedHardforks {
                    earlier,
                    earlier_height,
                    later,
                    later_height,
                });
            }
        }
        Ok(())
    }
}

/// Pins every hardfork older than the first configured one to height 0,
/// so an explicit later entry implies its predecessors.
fn ensure_omitted_hardforks(mut hardforks: HashMap<Hardfork, u32>) -> HashMap<Hardfork, u32> {
    for hf in Hardfork::ALL {
        if hardforks.contains_key(&hf) {
            break;
        }
        hardforks.insert(hf, 0);
    }
    hardforks
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";

    fn committee() -> Vec<ECPoint> {
        vec![ECPoint::from_str(KEY).unwrap()]
    }

    #[test]
    fn new_pins_omitted_early_forks() {
        let mut forks = HashMap::new();
        forks.insert(Hardfork::Cockatrice, 100);
        let settings = ProtocolSettings::new(committee(), 1, forks).unwrap();
        assert!(settings.is_hardfork_enabled(Hardfork::Aspidochelone, 0));
        assert!(settings.is_hardfork_enabled(Hardfork::Basilisk, 0));
        assert!(!settings.is_hardfork_enabled(Hardfork::Cockatrice, 99));
        assert!(settings.is_hardfork_enabled(Hardfork::Cockatrice, 100));
        assert!(!settings.is_hardfork_enabled(Hardfork::Domovoi, u32::MAX));
    }

    #[test]
    fn rejects_non_continuous_forks() {
        let mut forks = HashMap::new();
        forks.insert(Hardfork::Aspidochelone, 0);
        forks.insert(Hardfork::Cockatrice, 100);
        assert!(ProtocolSettings::new(committee(), 1, forks).is_err());
    }

    #[test]
    fn rejects_unordered_heights() {
        let mut forks = HashMap::new();
        forks.insert(Hardfork::Aspidochelone, 200);
        forks.insert(Hardfork::Basilisk, 100);
        assert!(ProtocolSettings::new(committee(), 1, forks).is_err());
    }

    #[test]
    fn parses_toml() {
        let text = format!(
            r#"
network = 860833102
validators_count = 1
standby_committee = ["{KEY}"]

[hardforks]
Aspidochelone = 10
Basilisk = 20
"#
        );
        let settings = ProtocolSettings::from_toml(&text).unwrap();
        assert_eq!(settings.network, 860833102);
        assert_eq!(settings.committee_members_count(), 1);
        assert!(settings.is_hardfork_enabled(Hardfork::Basilisk, 20));
        assert!(!settings.is_hardfork_enabled(Hardfork::Basilisk, 19));
    }

    #[test]
    fn rejects_empty_committee() {
        assert!(ProtocolSettings::new(Vec::new(), 1, HashMap::new()).is_err());
    }
}
