//! Trailing-window technical indicators over daily price and volume series.
//!
//! Every function returns one value per input row. Rows without enough history
//! for the window are `NaN`, never zero.

pub mod trend {
    pub mod ma;
}
pub mod oscillator {
    pub mod rsi;
}
pub mod volatility {
    pub mod volatility;
}
pub mod volume {
    pub mod volume;
}

pub use oscillator::rsi::compute_rsi;
pub use trend::ma::{moving_average, price_trend};
pub use volatility::volatility::{daily_returns, rolling_std};
pub use volume::volume::volume_ratio;
