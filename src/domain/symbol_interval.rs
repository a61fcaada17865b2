use serde::{Deserialize, Serialize};

/// Identity of one bar series: ticker symbol plus candle interval.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq, Default)]
pub struct SymbolInterval {
    pub symbol: String,
    pub interval_ms: i64,
}

impl SymbolInterval {
    pub fn new(symbol: impl Into<String>, interval_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            interval_ms,
        }
    }
}

impl std::fmt::Display for SymbolInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} @ {}ms", self.symbol, self.interval_ms)
    }
}
