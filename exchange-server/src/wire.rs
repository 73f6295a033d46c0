//! Newline-terminated JSON wire protocol.
//!
//! `ORDER_NEW` carries two JSON keys named `type`: the message-type
//! discriminator and the order-type (`MARKET`/`LIMIT`). A derived
//! `Deserialize` would reject that as a duplicate field, so inbound
//! parsing goes through `serde_json::Value` instead — its map simply
//! keeps the last-written value for a repeated key, which happens to be
//! exactly the "second `type` in document order" behavior the spec
//! calls for.

use crate::error::ServerError;
use matching_core::{ExecutionReport, OrderStatus, OrderType, Side};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNewRequest {
    pub ticker: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OrderCancelRequest {
    pub ticker: String,
    pub order_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    OrderNew(OrderNewRequest),
    OrderCancel(OrderCancelRequest),
    Unknown,
}

fn parse_side(raw: &str) -> Result<Side, ServerError> {
    match raw {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        _ => Err(ServerError::UnrecognizedMessage),
    }
}

fn parse_order_type(raw: &str) -> Result<OrderType, ServerError> {
    match raw {
        "MARKET" => Ok(OrderType::Market),
        "LIMIT" => Ok(OrderType::Limit),
        _ => Err(ServerError::UnrecognizedMessage),
    }
}

/// Decodes one line of the wire protocol. The message-kind discriminator
/// is read by scanning the raw text for its first occurrence, since a
/// generic `Value` parse has already collapsed `ORDER_NEW`'s duplicate
/// `type` key down to the order-type before we ever get to inspect it.
pub fn decode_line(line: &str) -> Result<InboundMessage, ServerError> {
    let value: Value = serde_json::from_str(line).map_err(ServerError::Decode)?;

    if first_type_occurrence(line) == Some("ORDER_CANCEL") {
        let req: OrderCancelRequest =
            serde_json::from_value(value).map_err(ServerError::Decode)?;
        return Ok(InboundMessage::OrderCancel(req));
    }

    if first_type_occurrence(line) == Some("ORDER_NEW") {
        let obj = value.as_object().ok_or(ServerError::UnrecognizedMessage)?;
        let ticker = obj
            .get("ticker")
            .and_then(Value::as_str)
            .ok_or(ServerError::UnrecognizedMessage)?
            .to_string();
        let side = obj
            .get("side")
            .and_then(Value::as_str)
            .ok_or(ServerError::UnrecognizedMessage)?;
        // After the generic parse, "type" holds whichever value was
        // written last in the document — the order-type, per the wire
        // format's field collision.
        let order_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ServerError::UnrecognizedMessage)?;
        let price = obj.get("price").and_then(Value::as_f64).unwrap_or(0.0);
        let quantity = obj
            .get("quantity")
            .and_then(Value::as_u64)
            .ok_or(ServerError::UnrecognizedMessage)? as u32;

        return Ok(InboundMessage::OrderNew(OrderNewRequest {
            ticker,
            side: parse_side(side)?,
            order_type: parse_order_type(order_type)?,
            price,
            quantity,
        }));
    }

    Ok(InboundMessage::Unknown)
}

/// Finds the value of the first `"type": "..."` pair in raw text, ahead
/// of any JSON parsing. Deliberately textual rather than structural —
/// by the time a `Value` exists, the duplicate key is already gone.
fn first_type_occurrence(line: &str) -> Option<&str> {
    let key_pos = line.find("\"type\"")?;
    let after_key = &line[key_pos + "\"type\"".len()..];
    let colon_pos = after_key.find(':')?;
    let after_colon = after_key[colon_pos + 1..].trim_start();
    let value = after_colon.strip_prefix('"')?;
    let end = value.find('"')?;
    Some(&value[..end])
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "MARKET_DATA")]
    MarketData {
        ticker: String,
        bid: f64,
        ask: f64,
        last: f64,
        bid_size: u32,
        ask_size: u32,
        last_size: u32,
        open: f64,
        high: f64,
        low: f64,
        volume: u64,
        timestamp: u64,
    },
    #[serde(rename = "EXECUTION_REPORT")]
    ExecutionReport {
        order_id: u64,
        match_id: u64,
        price: f64,
        quantity: u32,
        status: WireStatus,
        timestamp: u64,
    },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum WireStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "PARTIAL")]
    Partial,
    #[serde(rename = "FILLED")]
    Filled,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl From<OrderStatus> for WireStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::New => WireStatus::New,
            OrderStatus::PartiallyFilled => WireStatus::Partial,
            OrderStatus::Filled => WireStatus::Filled,
            OrderStatus::Cancelled => WireStatus::Cancelled,
        }
    }
}

impl OutboundMessage {
    pub fn from_execution_report(report: &ExecutionReport) -> Self {
        OutboundMessage::ExecutionReport {
            order_id: report.order_id.0,
            match_id: report.counterparty_id.0,
            price: report.price,
            quantity: report.quantity,
            status: report.status.into(),
            timestamp: report.timestamp_us,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }

    /// Serializes with the trailing newline the wire framing requires.
    pub fn to_line(&self) -> String {
        let mut s = serde_json::to_string(self).expect("outbound message is always encodable");
        s.push('\n');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_order_new_taking_second_type_as_order_type() {
        let line = r#"{"type":"ORDER_NEW","ticker":"AAPL","side":"BUY","type":"LIMIT","price":150.0,"quantity":10}"#;
        let msg = decode_line(line).unwrap();
        assert_eq!(
            msg,
            InboundMessage::OrderNew(OrderNewRequest {
                ticker: "AAPL".into(),
                side: Side::Buy,
                order_type: OrderType::Limit,
                price: 150.0,
                quantity: 10,
            })
        );
    }

    #[test]
    fn decodes_market_order_new() {
        let line = r#"{"type":"ORDER_NEW","ticker":"AAPL","side":"SELL","type":"MARKET","price":0,"quantity":5}"#;
        let msg = decode_line(line).unwrap();
        assert_eq!(
            msg,
            InboundMessage::OrderNew(OrderNewRequest {
                ticker: "AAPL".into(),
                side: Side::Sell,
                order_type: OrderType::Market,
                price: 0.0,
                quantity: 5,
            })
        );
    }

    #[test]
    fn decodes_order_cancel() {
        let line = r#"{"type":"ORDER_CANCEL","ticker":"AAPL","order_id":7}"#;
        let msg = decode_line(line).unwrap();
        assert_eq!(
            msg,
            InboundMessage::OrderCancel(OrderCancelRequest {
                ticker: "AAPL".into(),
                order_id: 7,
            })
        );
    }

    #[test]
    fn unknown_message_type_is_unknown_not_an_error() {
        let line = r#"{"type":"PING"}"#;
        assert_eq!(decode_line(line).unwrap(), InboundMessage::Unknown);
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let line = "{not json}";
        assert!(matches!(decode_line(line), Err(ServerError::Decode(_))));
    }

    #[test]
    fn outbound_execution_report_round_trips_through_json() {
        let msg = OutboundMessage::ExecutionReport {
            order_id: 1,
            match_id: 2,
            price: 100.0,
            quantity: 10,
            status: WireStatus::Filled,
            timestamp: 123,
        };
        let line = msg.to_line();
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"type\":\"EXECUTION_REPORT\""));
        assert!(line.contains("\"status\":\"FILLED\""));
    }
}
