use alloy::primitives::U256;
use serde::Deserialize;

use super::error::GatewayError;

/// Height and timestamp of the latest block, used as the baseline for
/// release time estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    pub height: u64,
    /// Unix seconds, sub-second precision truncated.
    pub time: i64,
}

impl ChainHead {
    /// Parses the body of `/cosmos/base/tendermint/v1beta1/blocks/latest`.
    pub fn new_from_value(value: &serde_json::Value) -> Result<Self, GatewayError> {
        let header = value
            .get("block")
            .and_then(|block| block.get("header"))
            .ok_or_else(|| GatewayError::parse("missing block.header"))?;

        let height = header
            .get("height")
            .and_then(|height| height.as_str())
            .ok_or_else(|| GatewayError::parse("missing block.header.height"))?
            .parse::<u64>()
            .map_err(|e| GatewayError::parse(format!("invalid block.header.height: {e}")))?;

        let time = header
            .get("time")
            .and_then(|time| time.as_str())
            .ok_or_else(|| GatewayError::parse("missing block.header.time"))?;
        let time = chrono::DateTime::parse_from_rfc3339(time)
            .map_err(|e| GatewayError::parse(format!("invalid block.header.time '{time}': {e}")))?
            .timestamp();

        Ok(Self { height, time })
    }
}

/// A delayed bridge completion waiting for its release block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    pub event_id: u32,
    pub authority: String,
    pub coin_denom: String,
    /// Amount in base units.
    pub coin_amount: U256,
    pub target_address: String,
    pub eth_block_height: String,
    pub release_block_height: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DelayedMessagesResponse {
    pub messages: Vec<DelayedMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DelayedMessage {
    pub message: CompleteBridgeMessage,
    pub block_height: NumberOrString,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteBridgeMessage {
    pub authority: String,
    pub event: BridgeEventMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BridgeEventMessage {
    pub id: NumberOrString,
    pub coin: Coin,
    pub address: String,
    pub eth_block_height: NumberOrString,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Cosmos REST gateways encode 64-bit integers as strings, smaller ones as
/// numbers. Both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    fn as_u64(&self, field: &str) -> Result<u64, GatewayError> {
        match self {
            NumberOrString::Number(n) => Ok(*n),
            NumberOrString::String(s) => s
                .parse::<u64>()
                .map_err(|e| GatewayError::parse(format!("invalid {field} '{s}': {e}"))),
        }
    }

    fn into_string(self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::String(s) => s,
        }
    }
}

impl TryFrom<DelayedMessage> for BridgeEvent {
    type Error = GatewayError;

    fn try_from(delayed: DelayedMessage) -> Result<Self, Self::Error> {
        let release_block_height = delayed.block_height.as_u64("block_height")?;
        let CompleteBridgeMessage { authority, event } = delayed.message;

        let event_id = u32::try_from(event.id.as_u64("event.id")?)
            .map_err(|e| GatewayError::parse(format!("event.id out of range: {e}")))?;

        Ok(Self {
            event_id,
            authority,
            coin_amount: parse_amount(&event.coin.amount)?,
            coin_denom: event.coin.denom,
            target_address: event.address,
            eth_block_height: event.eth_block_height.into_string(),
            release_block_height,
        })
    }
}

/// Parses a base-unit amount given as a decimal string.
pub fn parse_amount(amount: &str) -> Result<U256, GatewayError> {
    if amount.is_empty() {
        return Err(GatewayError::parse("empty coin amount"));
    }
    U256::from_str_radix(amount, 10)
        .map_err(|e| GatewayError::parse(format!("invalid coin amount '{amount}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_head_from_value() {
        let value = json!({
            "block": {
                "header": {
                    "height": "1000",
                    "time": "2023-11-14T22:13:20.987654321Z"
                }
            }
        });
        let head = ChainHead::new_from_value(&value).unwrap();
        assert_eq!(
            head,
            ChainHead {
                height: 1000,
                time: 1700000000
            }
        );
    }

    #[test]
    fn test_chain_head_rejects_bad_shapes() {
        let missing_header = json!({ "block": {} });
        assert!(matches!(
            ChainHead::new_from_value(&missing_header),
            Err(GatewayError::Parse(_))
        ));

        let numeric_height = json!({
            "block": { "header": { "height": 1000, "time": "2023-11-14T22:13:20Z" } }
        });
        assert!(matches!(
            ChainHead::new_from_value(&numeric_height),
            Err(GatewayError::Parse(_))
        ));

        let bad_height = json!({
            "block": { "header": { "height": "abc", "time": "2023-11-14T22:13:20Z" } }
        });
        assert!(matches!(
            ChainHead::new_from_value(&bad_height),
            Err(GatewayError::Parse(_))
        ));

        let bad_time = json!({
            "block": { "header": { "height": "1", "time": "yesterday" } }
        });
        assert!(matches!(
            ChainHead::new_from_value(&bad_time),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn test_bridge_event_from_message() {
        let message: DelayedMessage = serde_json::from_value(json!({
            "message": {
                "authority": "dydx1authority",
                "event": {
                    "id": 42,
                    "coin": { "denom": "adv4tnt", "amount": "2000000000000000000" },
                    "address": "dydx1abc",
                    "eth_block_height": "19000000"
                }
            },
            "block_height": 1010
        }))
        .unwrap();

        let event = BridgeEvent::try_from(message).unwrap();
        assert_eq!(event.event_id, 42);
        assert_eq!(event.authority, "dydx1authority");
        assert_eq!(event.coin_denom, "adv4tnt");
        assert_eq!(
            event.coin_amount,
            U256::from(2_000_000_000_000_000_000u128)
        );
        assert_eq!(event.target_address, "dydx1abc");
        assert_eq!(event.eth_block_height, "19000000");
        assert_eq!(event.release_block_height, 1010);
    }

    #[test]
    fn test_bridge_event_accepts_string_integers() {
        let message: DelayedMessage = serde_json::from_value(json!({
            "message": {
                "authority": "dydx1authority",
                "event": {
                    "id": "7",
                    "coin": { "denom": "adv4tnt", "amount": "1" },
                    "address": "dydx1abc",
                    "eth_block_height": 123
                }
            },
            "block_height": "2000"
        }))
        .unwrap();

        let event = BridgeEvent::try_from(message).unwrap();
        assert_eq!(event.event_id, 7);
        assert_eq!(event.eth_block_height, "123");
        assert_eq!(event.release_block_height, 2000);
    }

    #[test]
    fn test_parse_amount_keeps_full_precision() {
        // Beyond f64 and u128 precision.
        let amount = parse_amount("123456789012345678901234567890123456789012").unwrap();
        assert_eq!(
            amount.to_string(),
            "123456789012345678901234567890123456789012"
        );

        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("0x10").is_err());
    }
}
