use serde::{Deserialize, Serialize};

use crate::config::{ClosePrice, HighPrice, LowPrice, OpenPrice, PriceLike};
use crate::domain::{Candle, SymbolInterval};
use crate::utils::TimeUtils;

/// Column-oriented OHLCV series. Timestamps are epoch-ms UTC.
///
/// The series is treated as immutable input everywhere in the crate: windowing
/// returns a fresh copy and no analysis step writes back into it.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BarSeries {
    pub symbol_interval: SymbolInterval,
    pub timestamps: Vec<i64>,
    pub open_prices: Vec<OpenPrice>,
    pub high_prices: Vec<HighPrice>,
    pub low_prices: Vec<LowPrice>,
    pub close_prices: Vec<ClosePrice>,
    pub volumes: Vec<f64>,
}

impl BarSeries {
    pub fn from_candles(symbol_interval: SymbolInterval, candles: &[Candle]) -> Self {
        let len = candles.len();

        let mut ts_vec = Vec::with_capacity(len);
        let mut open_vec = Vec::with_capacity(len);
        let mut high_vec = Vec::with_capacity(len);
        let mut low_vec = Vec::with_capacity(len);
        let mut close_vec = Vec::with_capacity(len);
        let mut vol_vec = Vec::with_capacity(len);

        for c in candles {
            ts_vec.push(c.timestamp_ms);
            open_vec.push(c.open_price);
            high_vec.push(c.high_price);
            low_vec.push(c.low_price);
            close_vec.push(c.close_price);
            vol_vec.push(c.volume);
        }

        Self {
            symbol_interval,
            timestamps: ts_vec,
            open_prices: open_vec,
            high_prices: high_vec,
            low_prices: low_vec,
            close_prices: close_vec,
            volumes: vol_vec,
        }
    }

    pub fn get_candle(&self, idx: usize) -> Candle {
        Candle {
            timestamp_ms: self.timestamps[idx],
            open_price: self.open_prices[idx],
            high_price: self.high_prices[idx],
            low_price: self.low_prices[idx],
            close_price: self.close_prices[idx],
            volume: self.volumes[idx],
        }
    }

    pub fn klines(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    /// Copy of the series restricted to the last `days` calendar days before
    /// `reference_ms` (inclusive cutoff). The receiver is left untouched.
    pub fn window_last_days(&self, days: i64, reference_ms: i64) -> Self {
        let cutoff = reference_ms - days * TimeUtils::MS_IN_D;
        let start = self.timestamps.partition_point(|&ts| ts < cutoff);

        Self {
            symbol_interval: self.symbol_interval.clone(),
            timestamps: self.timestamps[start..].to_vec(),
            open_prices: self.open_prices[start..].to_vec(),
            high_prices: self.high_prices[start..].to_vec(),
            low_prices: self.low_prices[start..].to_vec(),
            close_prices: self.close_prices[start..].to_vec(),
            volumes: self.volumes[start..].to_vec(),
        }
    }

    /// Average True Range over the trailing `period` bars.
    /// Returns 0.0 when the series is too short for a full window.
    pub fn calculate_atr(&self, period: usize) -> f64 {
        let len = self.klines();
        if period == 0 || len < period + 1 {
            return 0.0;
        }

        let mut tr_sum = 0.0;
        for i in (len - period)..len {
            let high = self.high_prices[i].value();
            let low = self.low_prices[i].value();
            let prev_close = self.close_prices[i - 1].value();

            let tr = (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs());
            tr_sum += tr;
        }

        tr_sum / period as f64
    }
}
