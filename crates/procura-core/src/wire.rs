//! JSON message shapes pushed to dashboard clients over the WebSocket.
//!
//! Two families share the socket:
//! - feed messages, tagged by a `type` field (`marketPrice`, `suppliers`,
//!   `demandForecast`)
//! - relay messages carrying one line of agent output, tagged by `agent`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::AgentTag;

/// A coffee supplier shown on the dashboard map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Cupping score on a 0-10 scale.
    pub quality: f64,
}

/// One month of forecast demand, in thousands of pounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub month: String,
    pub demand: u32,
}

/// Messages produced by the synthetic market feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedMessage {
    /// Current simulated price per pound.
    MarketPrice {
        price: f64,
        #[serde(with = "iso_millis")]
        timestamp: DateTime<Utc>,
    },
    /// Static supplier reference list.
    Suppliers { data: Vec<Supplier> },
    /// Static demand forecast.
    DemandForecast { data: Vec<DemandPoint> },
}

impl FeedMessage {
    /// Price update stamped with the current time.
    pub fn market_price(price: f64) -> Self {
        Self::MarketPrice {
            price,
            timestamp: Utc::now(),
        }
    }
}

/// One line of agent output, tagged by the agent it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub agent: AgentTag,
    pub message: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl RelayMessage {
    /// Build a relay message stamped with the current time.
    pub fn new(agent: AgentTag, message: impl Into<String>) -> Self {
        Self {
            agent,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Build a `Final Outcome` message.
    pub fn final_outcome(message: impl Into<String>) -> Self {
        Self::new(AgentTag::FinalOutcome, message)
    }

    /// Whether this message carries the terminal tag.
    pub fn is_final(&self) -> bool {
        self.agent.is_terminal()
    }
}

/// ISO 8601 timestamps with millisecond precision, matching what browsers
/// produce with `Date.prototype.toISOString`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn market_price_wire_shape() {
        let msg = FeedMessage::market_price(4.5);
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "marketPrice");
        assert_eq!(json["price"], 4.5);
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'), "timestamp should be UTC: {ts}");
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn suppliers_wire_shape() {
        let msg = FeedMessage::Suppliers {
            data: vec![Supplier {
                name: "Yirgacheffe Cooperative".into(),
                lat: 6.16,
                lon: 38.2,
                quality: 9.1,
            }],
        };
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "suppliers");
        assert_eq!(json["data"][0]["name"], "Yirgacheffe Cooperative");
        assert_eq!(json["data"][0]["quality"], 9.1);
    }

    #[test]
    fn demand_forecast_wire_shape() {
        let msg = FeedMessage::DemandForecast {
            data: vec![DemandPoint {
                month: "Jan".into(),
                demand: 120,
            }],
        };
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "demandForecast");
        assert_eq!(json["data"][0]["month"], "Jan");
        assert_eq!(json["data"][0]["demand"], 120);
    }

    #[test]
    fn relay_wire_shape() {
        let msg = RelayMessage::new(AgentTag::Sourcing, "found 3 suppliers");
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["agent"], "Sourcing Agent");
        assert_eq!(json["message"], "found 3 suppliers");
        assert!(json.get("type").is_none());
    }

    #[test]
    fn relay_parses_browser_timestamp() {
        let raw = r#"{"agent":"Final Outcome","message":"done","timestamp":"2025-03-01T10:00:00.000Z"}"#;
        let msg: RelayMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.is_final());
        assert_eq!(msg.timestamp.to_rfc3339(), "2025-03-01T10:00:00+00:00");
    }
}
