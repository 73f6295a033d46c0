//! Per-connection dispatch: decode inbound lines, drive the matching
//! engine, and push outbound lines back through the session's own
//! broadcast-hub queue so client responses and market data interleave
//! in a single well-ordered write stream.

use crate::broadcast::BroadcastHub;
use crate::wire::{decode_line, InboundMessage, OutboundMessage};
use matching_core::MatchingEngine;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Owns one client connection end to end: registers with the hub, spawns
/// the writer pump, then runs the read loop until EOF or a transport
/// error, at which point it deregisters. Transport errors here end only
/// this session — per spec §7, every other connection is unaffected.
pub async fn handle_connection(stream: TcpStream, engine: Arc<MatchingEngine>, hub: Arc<BroadcastHub>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (read_half, mut write_half) = stream.into_split();
    let (session_id, mut outbox) = hub.register();

    let writer = tokio::spawn(async move {
        while let Some(line) = outbox.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%peer, %err, "session read error");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        for response in dispatch(&engine, &line) {
            hub.send_to(session_id, response.to_line());
        }
    }

    debug!(%peer, "session closed");
    hub.deregister(session_id);
    writer.abort();
}

/// Decodes and applies one inbound line, returning every outbound
/// message it produces — zero for a resting order or a successful
/// cancel, one for an `ERROR`, or a pair of `EXECUTION_REPORT`s per
/// fill a crossing `ORDER_NEW` triggers.
fn dispatch(engine: &MatchingEngine, line: &str) -> Vec<OutboundMessage> {
    let message = match decode_line(line) {
        Ok(message) => message,
        Err(err) => return vec![OutboundMessage::error(err.to_string())],
    };

    match message {
        InboundMessage::OrderNew(req) => {
            match engine.submit(&req.ticker, req.side, req.order_type, req.price, req.quantity) {
                Ok((_, reports)) => reports
                    .iter()
                    .map(OutboundMessage::from_execution_report)
                    .collect(),
                Err(err) => vec![OutboundMessage::error(err.to_string())],
            }
        }
        InboundMessage::OrderCancel(req) => {
            match engine.cancel(&req.ticker, matching_core::OrderId(req.order_id)) {
                Ok(true) => Vec::new(),
                Ok(false) => vec![OutboundMessage::error("Order not found")],
                Err(err) => vec![OutboundMessage::error(err.to_string())],
            }
        }
        // Message types other than ORDER_NEW/ORDER_CANCEL are ignored at
        // this layer rather than surfaced as errors.
        InboundMessage::Unknown => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching_core::{OrderType, Side};

    #[test]
    fn order_new_dispatch_yields_one_report_per_fill() {
        let engine = MatchingEngine::new();
        engine.add_symbol("AAPL");
        engine
            .submit("AAPL", Side::Sell, OrderType::Limit, 100.0, 100)
            .unwrap();

        let line = r#"{"type":"ORDER_NEW","ticker":"AAPL","side":"BUY","type":"LIMIT","price":100.0,"quantity":100}"#;
        let outbound = dispatch(&engine, line);
        assert_eq!(outbound.len(), 2);
    }

    #[test]
    fn order_new_resting_with_no_fills_yields_nothing() {
        let engine = MatchingEngine::new();
        engine.add_symbol("AAPL");
        let line = r#"{"type":"ORDER_NEW","ticker":"AAPL","side":"BUY","type":"LIMIT","price":100.0,"quantity":10}"#;
        assert!(dispatch(&engine, line).is_empty());
    }

    #[test]
    fn unknown_ticker_surfaces_as_error_message() {
        let engine = MatchingEngine::new();
        let line = r#"{"type":"ORDER_NEW","ticker":"ZZZZ","side":"BUY","type":"LIMIT","price":100.0,"quantity":10}"#;
        let outbound = dispatch(&engine, line);
        assert_eq!(outbound.len(), 1);
        assert!(matches!(outbound[0], OutboundMessage::Error { .. }));
    }

    #[test]
    fn malformed_line_surfaces_as_error_message() {
        let engine = MatchingEngine::new();
        let outbound = dispatch(&engine, "{not json}");
        assert_eq!(outbound.len(), 1);
        assert!(matches!(outbound[0], OutboundMessage::Error { .. }));
    }

    #[test]
    fn cancel_of_unknown_order_reports_not_found() {
        let engine = MatchingEngine::new();
        engine.add_symbol("AAPL");
        let line = r#"{"type":"ORDER_CANCEL","ticker":"AAPL","order_id":999}"#;
        let outbound = dispatch(&engine, line);
        assert_eq!(outbound.len(), 1);
        assert!(matches!(outbound[0], OutboundMessage::Error { .. }));
    }

    #[test]
    fn unrecognized_message_type_is_silently_ignored() {
        let engine = MatchingEngine::new();
        let outbound = dispatch(&engine, r#"{"type":"PING"}"#);
        assert!(outbound.is_empty());
    }

    #[test]
    fn cancel_of_resting_order_produces_no_error() {
        let engine = MatchingEngine::new();
        engine.add_symbol("AAPL");
        let (id, _) = engine
            .submit("AAPL", Side::Buy, OrderType::Limit, 100.0, 10)
            .unwrap();
        let line = format!(r#"{{"type":"ORDER_CANCEL","ticker":"AAPL","order_id":{}}}"#, id.0);
        assert!(dispatch(&engine, &line).is_empty());
    }
}
