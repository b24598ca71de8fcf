//! Protocol configuration: network constants, the standby committee, and
//! hardfork activation heights.

pub mod error;
pub mod hardfork;
pub mod protocol_settings;

pub use error::ConfigError;
pub use hardfork::Hardfork;
pub use protocol_settings::ProtocolSettings;
