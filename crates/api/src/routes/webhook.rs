use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use common::TriggerEvent;

use crate::AppState;

pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}

/// Moralis Streams delivery. Only the fields used for classification are
/// decoded.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub txs: Vec<StreamTx>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamTx {
    #[serde(default)]
    pub hash: String,
    pub from_address: String,
    /// Null for contract creation.
    #[serde(default)]
    pub to_address: Option<String>,
}

/// Sell when the whale sends, buy when it receives. Sender wins if both.
pub fn classify(tx: &StreamTx, whale: &str) -> TriggerEvent {
    if tx.from_address.eq_ignore_ascii_case(whale) {
        TriggerEvent::Sell
    } else if tx
        .to_address
        .as_deref()
        .is_some_and(|to| to.eq_ignore_ascii_case(whale))
    {
        TriggerEvent::Buy
    } else {
        TriggerEvent::Ignore
    }
}

/// Always answers 200 once the body decodes: Moralis retries anything else,
/// and a retry would repeat the trades. Failures are logged and reported per
/// transaction.
async fn webhook(State(state): State<AppState>, Json(payload): Json<StreamPayload>) -> Json<Value> {
    info!(
        txs = payload.txs.len(),
        confirmed = payload.confirmed,
        "Stream delivery received"
    );

    let mut results = Vec::with_capacity(payload.txs.len());
    for tx in &payload.txs {
        let trigger = classify(tx, &state.whale_address);
        if trigger == TriggerEvent::Ignore {
            info!(hash = %tx.hash, "No whale");
            results.push(json!({"hash": tx.hash, "trigger": trigger}));
            continue;
        }

        let pipeline = state.pipeline.lock().await;
        let entry = match pipeline.execute(trigger).await {
            Ok(outcome) => json!({"hash": tx.hash, "trigger": trigger, "result": outcome}),
            Err(e) => {
                error!(hash = %tx.hash, %trigger, error = %e, "Trade cycle failed");
                json!({"hash": tx.hash, "trigger": trigger, "error": e.to_string()})
            }
        };
        results.push(entry);
    }

    Json(json!({"status": "ok", "results": results}))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHALE: &str = "0xcA3B6f18Ebc4E7C66885eaAde4C2FF3Edcf48d02";

    fn tx(from: &str, to: Option<&str>) -> StreamTx {
        StreamTx {
            hash: "0x1".into(),
            from_address: from.into(),
            to_address: to.map(Into::into),
        }
    }

    #[test]
    fn whale_sender_is_sell() {
        let t = tx(&WHALE.to_lowercase(), Some("0xabc"));
        assert_eq!(classify(&t, WHALE), TriggerEvent::Sell);
    }

    #[test]
    fn whale_receiver_is_buy() {
        let t = tx("0xabc", Some(&WHALE.to_lowercase()));
        assert_eq!(classify(&t, WHALE), TriggerEvent::Buy);
    }

    #[test]
    fn unrelated_tx_is_ignored() {
        assert_eq!(classify(&tx("0xabc", Some("0xdef")), WHALE), TriggerEvent::Ignore);
        assert_eq!(classify(&tx("0xabc", None), WHALE), TriggerEvent::Ignore);
    }

    #[test]
    fn self_transfer_counts_as_sell() {
        let t = tx(WHALE, Some(WHALE));
        assert_eq!(classify(&t, WHALE), TriggerEvent::Sell);
    }

    #[test]
    fn payload_decodes_moralis_fields() {
        let body = r#"{
            "confirmed": false, "chainId": "0x38", "streamId": "s1", "tag": "whale",
            "txs": [{"hash": "0xh", "fromAddress": "0xa", "toAddress": null, "value": "0"}],
            "logs": []
        }"#;
        let p: StreamPayload = serde_json::from_str(body).unwrap();
        assert_eq!(p.txs.len(), 1);
        assert_eq!(p.txs[0].to_address, None);
    }
}
