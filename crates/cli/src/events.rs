//! Inbound listener for the Slack Events API.
//!
//! One POST endpoint: answers the `url_verification` challenge and hands
//! message events to the dispatcher over the channel. Request signature
//! verification is left to the deployment front (reverse proxy or platform).

use {
    axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post},
    serde_json::{Value, json},
    tokio::sync::mpsc,
    tracing::{debug, warn},
    watchword_common::types::{EventEnvelope, MessageEvent},
};

#[derive(Clone)]
struct AppState {
    events: mpsc::Sender<EventEnvelope>,
}

/// Build the events router mounted at `endpoint`.
pub fn router(endpoint: &str, events: mpsc::Sender<EventEnvelope>) -> Router {
    Router::new()
        .route(endpoint, post(receive))
        .with_state(AppState { events })
}

async fn receive(State(state): State<AppState>, Json(payload): Json<Value>) -> impl IntoResponse {
    match payload.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = payload
                .get("challenge")
                .and_then(Value::as_str)
                .unwrap_or_default();
            (StatusCode::OK, Json(json!({ "challenge": challenge })))
        }
        Some("event_callback") => {
            if let Some(envelope) = parse_envelope(&payload) {
                if state.events.send(envelope).await.is_err() {
                    warn!("dispatcher is gone, dropping event");
                }
            }
            (StatusCode::OK, Json(json!({})))
        }
        other => {
            debug!(kind = ?other, "ignoring unknown payload type");
            (StatusCode::OK, Json(json!({})))
        }
    }
}

/// Extract a message event from an `event_callback` payload. Non-message
/// events return `None`.
fn parse_envelope(payload: &Value) -> Option<EventEnvelope> {
    let event = payload.get("event")?;
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }
    let event: MessageEvent = serde_json::from_value(event.clone()).ok()?;
    let event_time = payload
        .get("event_time")
        .and_then(Value::as_f64)
        .unwrap_or_default();
    Some(EventEnvelope { event_time, event })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, watchword_common::types::ChannelKind};

    #[test]
    fn message_callbacks_parse_into_envelopes() {
        let payload = json!({
            "type": "event_callback",
            "event_time": 1700000000,
            "event": {
                "type": "message",
                "channel": "D1",
                "channel_type": "im",
                "user": "U1",
                "text": "keyword list",
                "ts": "1700000000.000100"
            }
        });
        let envelope = parse_envelope(&payload).unwrap();
        assert_eq!(envelope.event.channel_type, ChannelKind::Im);
        assert_eq!(envelope.event.text, "keyword list");
        assert!((envelope.event_time - 1_700_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_message_events_are_ignored() {
        let payload = json!({
            "type": "event_callback",
            "event": { "type": "reaction_added" }
        });
        assert!(parse_envelope(&payload).is_none());
    }
}
