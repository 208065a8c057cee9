pub mod backtest;
pub mod config;
pub mod error;
pub mod hedge_ratio;
pub mod price_table;
pub mod signal;
pub mod spread;
pub mod statistics;
pub mod types;

#[cfg(feature = "prescreen")]
pub mod prescreen;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use config::EngineConfig;
pub use error::PairsError;
pub use types::*;

/// Standard result type for all pairs-engine operations
pub type PairsResult<T> = Result<T, PairsError>;
