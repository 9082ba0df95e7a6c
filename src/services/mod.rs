// Passdrop services
// Share lifecycle, stats, token generation, time and settings.

pub mod clock;
pub mod settings_engine;
pub mod share_lifecycle;
pub mod stats_aggregator;
pub mod token_service;
