pub mod analysis;
pub mod backtest;
pub mod hedge;
pub mod prescreen;
pub mod signal;
