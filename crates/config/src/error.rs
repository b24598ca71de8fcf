use thiserror::Error;

/// Errors raised while loading or validating protocol settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown hardfork: {0}")]
    UnknownHardfork(String),

    #[error("Hardfork configuration is not continuous: {0:?} is configured without its predecessor")]
    NonContinuousHardforks(crate::hardfork::Hardfork),

    #[error("Hardfork {later:?} activates at {later_height}, before {earlier:?} at {earlier_height}")]
    UnorderedHardforks {
        earlier: crate::hardfork::Hardfork,
        earlier_height: u32,
        later: crate::hardfork::Hardfork,
        later_height: u32,
    },

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
