use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Price;
use crate::{PairsError, PairsResult};

/// One aligned daily close for both legs of the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub price_a: Price,
    pub price_b: Price,
}

/// Aligned, gap-free close prices of two securities, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Ticker of the dependent leg (A)
    pub asset_a: String,
    /// Ticker of the independent leg (B)
    pub asset_b: String,
    pub observations: Vec<PriceObservation>,
}

impl PriceTable {
    pub fn new(
        asset_a: impl Into<String>,
        asset_b: impl Into<String>,
        observations: Vec<PriceObservation>,
    ) -> Self {
        Self {
            asset_a: asset_a.into(),
            asset_b: asset_b.into(),
            observations,
        }
    }

    /// Build a table from parallel date/price columns.
    pub fn from_columns(
        asset_a: impl Into<String>,
        asset_b: impl Into<String>,
        dates: &[NaiveDate],
        prices_a: &[Price],
        prices_b: &[Price],
    ) -> PairsResult<Self> {
        if dates.len() != prices_a.len() || dates.len() != prices_b.len() {
            return Err(PairsError::InvalidInput {
                field: "columns".into(),
                reason: format!(
                    "Column lengths differ: {} dates, {} A prices, {} B prices",
                    dates.len(),
                    prices_a.len(),
                    prices_b.len()
                ),
            });
        }
        let observations = dates
            .iter()
            .zip(prices_a.iter().zip(prices_b))
            .map(|(date, (a, b))| PriceObservation {
                date: *date,
                price_a: *a,
                price_b: *b,
            })
            .collect();
        Ok(Self::new(asset_a, asset_b, observations))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn prices_a(&self) -> Vec<Price> {
        self.observations.iter().map(|o| o.price_a).collect()
    }

    pub fn prices_b(&self) -> Vec<Price> {
        self.observations.iter().map(|o| o.price_b).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Boundary check: ticker names, strictly ascending dates, positive
    /// prices and at least `min_rows` observations.
    pub fn validate(&self, min_rows: usize) -> PairsResult<()> {
        if self.asset_a.trim().is_empty() || self.asset_b.trim().is_empty() {
            return Err(PairsError::InvalidInput {
                field: "asset_a / asset_b".into(),
                reason: "Both tickers must be named".into(),
            });
        }
        if self.asset_a == self.asset_b {
            return Err(PairsError::InvalidInput {
                field: "asset_b".into(),
                reason: format!("A pair needs two different tickers, got {} twice", self.asset_a),
            });
        }
        if self.observations.len() < min_rows.max(1) {
            return Err(PairsError::InsufficientData(format!(
                "At least {} price observations required, got {}",
                min_rows.max(1),
                self.observations.len()
            )));
        }
        for pair in self.observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(PairsError::DateError(format!(
                    "Dates must be strictly ascending: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }
        if let Some(bad) = self
            .observations
            .iter()
            .find(|o| o.price_a <= Decimal::ZERO || o.price_b <= Decimal::ZERO)
        {
            return Err(PairsError::InvalidInput {
                field: "observations".into(),
                reason: format!("Non-positive close price on {}", bad.date),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
