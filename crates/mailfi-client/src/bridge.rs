//! `window.postMessage` contract between the Gmail content script and the
//! transfer page.
//!
//! Every reply is built from the request it answers so the correlation id
//! survives the round trip.

use chain_sol::{address_to_bytes, bytes_to_address, Pubkey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::OperationOutcome;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "MAILFI_OPEN_TRANSFER")]
    OpenTransfer(TransferRequest),

    #[serde(rename = "MAILFI_TRANSFER_QUEUED")]
    TransferQueued {
        #[serde(rename = "correlationId")]
        correlation_id: Option<String>,
    },

    #[serde(rename = "MAILFI_TRANSFER_STARTED")]
    TransferStarted {
        recipient: Option<String>,
        #[serde(rename = "correlationId")]
        correlation_id: Option<String>,
    },

    #[serde(rename = "MAILFI_TRANSFER_COMPLETE")]
    TransferComplete {
        #[serde(rename = "correlationId")]
        correlation_id: Option<String>,
        #[serde(default)]
        data: Value,
    },

    #[serde(rename = "MAILFI_TRANSFER_ERROR")]
    TransferError {
        #[serde(rename = "correlationId")]
        correlation_id: Option<String>,
        error: String,
    },
}

impl BridgeMessage {
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            BridgeMessage::OpenTransfer(req) => req.correlation_id.as_deref(),
            BridgeMessage::TransferQueued { correlation_id }
            | BridgeMessage::TransferStarted { correlation_id, .. }
            | BridgeMessage::TransferComplete { correlation_id, .. }
            | BridgeMessage::TransferError { correlation_id, .. } => correlation_id.as_deref(),
        }
    }
}

/// Fields are optional and stringly typed on the wire; the accessors parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub recipient: Option<String>,
    pub amount: Option<String>,
    pub token: Option<String>,
    pub correlation_id: Option<String>,
}

impl TransferRequest {
    pub fn recipient_key(&self) -> Result<Pubkey, ClientError> {
        let recipient = self
            .recipient
            .as_deref()
            .ok_or_else(|| ClientError::invalid("openTransfer", "missing recipient"))?;
        address_to_bytes(recipient).map_err(|e| ClientError::invalid("openTransfer", e))
    }

    pub fn amount_value(&self) -> Result<f64, ClientError> {
        let amount = self
            .amount
            .as_deref()
            .ok_or_else(|| ClientError::invalid("openTransfer", "missing amount"))?;
        amount
            .trim()
            .parse::<f64>()
            .map_err(|e| ClientError::invalid("openTransfer", format!("amount {amount:?}: {e}")))
    }

    pub fn queued(&self) -> BridgeMessage {
        BridgeMessage::TransferQueued { correlation_id: self.correlation_id.clone() }
    }

    pub fn started(&self) -> BridgeMessage {
        BridgeMessage::TransferStarted {
            recipient: self.recipient.clone(),
            correlation_id: self.correlation_id.clone(),
        }
    }

    pub fn complete(&self, outcome: &OperationOutcome) -> BridgeMessage {
        BridgeMessage::TransferComplete {
            correlation_id: self.correlation_id.clone(),
            data: json!({
                "signature": outcome.signature,
                "address": bytes_to_address(&outcome.address),
                "recipient": self.recipient,
                "amount": self.amount,
                "token": self.token,
            }),
        }
    }

    pub fn failed(&self, err: &ClientError) -> BridgeMessage {
        BridgeMessage::TransferError {
            correlation_id: self.correlation_id.clone(),
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransferRequest {
        serde_json::from_value::<BridgeMessage>(json!({
            "type": "MAILFI_OPEN_TRANSFER",
            "recipient": "11111111111111111111111111111111",
            "amount": "12.5",
            "token": "PYUSD",
            "correlationId": "corr-42",
        }))
        .map(|msg| match msg {
            BridgeMessage::OpenTransfer(req) => req,
            other => panic!("unexpected {other:?}"),
        })
        .unwrap()
    }

    #[test]
    fn open_transfer_parses() {
        let req = request();
        assert_eq!(req.recipient_key().unwrap(), [0u8; 32]);
        assert_eq!(req.amount_value().unwrap(), 12.5);
        assert_eq!(req.token.as_deref(), Some("PYUSD"));
    }

    #[test]
    fn replies_keep_correlation_id() {
        let req = request();
        let outcome = OperationOutcome {
            signature: "5sig".into(),
            address: [1u8; 32],
            logs: vec![],
        };

        let complete = serde_json::to_value(req.complete(&outcome)).unwrap();
        assert_eq!(complete["type"], "MAILFI_TRANSFER_COMPLETE");
        assert_eq!(complete["correlationId"], "corr-42");
        assert_eq!(complete["data"]["signature"], "5sig");

        let failed = req.failed(&ClientError::invalid("stake", "amount"));
        assert_eq!(failed.correlation_id(), Some("corr-42"));
        let failed = serde_json::to_value(failed).unwrap();
        assert_eq!(failed["type"], "MAILFI_TRANSFER_ERROR");
        assert_eq!(failed["error"], "stake: invalid input: amount");
    }

    #[test]
    fn missing_fields_are_invalid_input() {
        let req = TransferRequest::default();
        assert!(matches!(req.recipient_key(), Err(ClientError::InvalidInput { .. })));
        assert!(matches!(req.amount_value(), Err(ClientError::InvalidInput { .. })));
    }

    #[test]
    fn error_without_correlation_id_still_parses() {
        let msg: BridgeMessage =
            serde_json::from_value(json!({ "type": "MAILFI_TRANSFER_ERROR", "error": "no_open_api" })).unwrap();
        assert_eq!(msg.correlation_id(), None);
    }
}
