use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named protocol upgrades, in activation order.
///
/// A hardfork gates native-contract methods and behavior changes. Each
/// network configures the block height at which a fork activates; forks
/// omitted from the configuration never activate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hardfork {
    Aspidochelone,
    Basilisk,
    Cockatrice,
    Domovoi,
    Echidna,
    Faun,
    Gorgon,
}

impl Hardfork {
    /// Every known hardfork in declaration order.
    pub const ALL: [Hardfork; 7] = [
        Hardfork::Aspidochelone,
        Hardfork::Basilisk,
        Hardfork::Cockatrice,
        Hardfork::Domovoi,
        Hardfork::Echidna,
        Hardfork::Faun,
        Hardfork::Gorgon,
    ];

    /// Position in the declaration order.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&hf| hf == self).unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            Hardfork::Aspidochelone => "Aspidochelone",
            Hardfork::Basilisk => "Basilisk",
            Hardfork::Cockatrice => "Cockatrice",
            Hardfork::Domovoi => "Domovoi",
            Hardfork::Echidna => "Echidna",
            Hardfork::Faun => "Faun",
            Hardfork::Gorgon => "Gorgon",
        }
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hardfork {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the bare name and the prefixed form used by some
        // configuration files.
        let name = s.strip_prefix("HF_").unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|hf| hf.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownHardfork(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_name_forms() {
        assert_eq!(Hardfork::from_str("Basilisk").unwrap(), Hardfork::Basilisk);
        assert_eq!(
            Hardfork::from_str("HF_Echidna").unwrap(),
            Hardfork::Echidna
        );
        assert!(Hardfork::from_str("Kraken").is_err());
    }

    #[test]
    fn declaration_order_is_total() {
        for pair in Hardfork::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
