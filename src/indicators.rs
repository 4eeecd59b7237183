use crate::models::EmaSet;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use ta::indicators::{BollingerBands, ExponentialMovingAverage};
use ta::Next;

/// Upper/middle/lower band values at one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBandsValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Computes the moving-average and volatility inputs the scorers consume from
/// a close-price history. The live market-data collaborator may supply these
/// directly instead; this is the reference computation.
pub struct IndicatorCalculator;

impl IndicatorCalculator {
    // Calculate the latest EMA value for a single period
    pub fn calculate_ema(closes: &[f64], period: usize) -> Result<f64> {
        if closes.len() < period {
            return Err(anyhow::anyhow!("Not enough data points for EMA calculation"));
        }

        let mut ema = ExponentialMovingAverage::new(period)?;
        let mut value = 0.0;
        for close in closes {
            value = ema.next(*close);
        }

        Ok(value)
    }

    /// Builds the full EMA stack for trend scoring. Fails when the history is
    /// shorter than the longest period, so a populated set is always complete.
    pub fn calculate_ema_set(closes: &[f64], periods: &[u32]) -> Result<EmaSet> {
        let mut set = EmaSet::new();
        for period in periods {
            let value = Self::calculate_ema(closes, *period as usize)?;
            set.insert(*period, value);
        }

        Ok(set)
    }

    // Calculate the latest Bollinger band values
    pub fn calculate_bollinger_bands(
        closes: &[f64],
        period: usize,
        deviation_multiplier: f64,
    ) -> Result<BollingerBandsValue> {
        if closes.len() < period {
            return Err(anyhow::anyhow!(
                "Not enough data points for Bollinger Bands calculation"
            ));
        }

        let mut bb = BollingerBands::new(period, deviation_multiplier)?;
        let mut latest = None;
        for close in closes {
            let output = bb.next(*close);
            latest = Some(BollingerBandsValue {
                upper: output.upper,
                middle: output.average,
                lower: output.lower,
            });
        }

        latest.ok_or_else(|| anyhow::anyhow!("Bollinger Bands produced no output"))
    }
}
