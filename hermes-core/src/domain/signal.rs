//! Signals and equity points: derived outputs of a simulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a signal or fill. Long-only: buy opens, sell closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "buy",
            SignalType::Sell => "sell",
        }
    }
}

/// A buy or sell event on a specific bar. Never mutated after generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub bar_index: usize,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub price: f64,
}

/// Account value at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Extract the raw values of an equity curve.
pub fn equity_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"buy\"");
        let back: SignalType = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(back, SignalType::Sell);
    }

    #[test]
    fn signal_field_is_named_type() {
        let sig = Signal {
            timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            bar_index: 3,
            signal_type: SignalType::Buy,
            price: 10.0,
        };
        let json = serde_json::to_value(sig).unwrap();
        assert_eq!(json["type"], "buy");
    }
}
