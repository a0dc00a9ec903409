//! Signed consolidation requests
//!
//! The authorization message template is the wire contract with the
//! settlement service and must not change.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{BackendReply, ClaimBackend, DonateRequest};
use crate::error::ClaimError;
use crate::notice::{Notice, NoticeSink};
use crate::session::{SessionStore, WalletSession};

/// Prefix of the message the account holder signs
pub const AUTHORIZATION_PREFIX: &str = "Assign accumulated Scavenger rights to: ";

/// Settlement status codes that carry a user-facing rejection message
pub const REJECTION_STATUS_CODES: [u16; 3] = [400, 404, 409];

pub const SUBMITTED_NOTICE: &str =
    "Consolidation request submitted. Check transactions/receipts for details.";

const GENERIC_REJECTION: &str = "Donation request failed.";

/// Message authorizing consolidation to `destination`
pub fn authorization_message(destination: &str) -> String {
    format!("{}{}", AUTHORIZATION_PREFIX, destination)
}

/// Lowercase hex of the message's UTF-8 bytes
pub fn encode_message(message: &str) -> String {
    hex::encode(message.as_bytes())
}

/// Whether the submit control is enabled
pub fn can_submit(session: Option<&WalletSession>, destination: &str) -> bool {
    session.is_some() && !destination.trim().is_empty()
}

/// A signed consolidation request, built per submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationRequest {
    pub source_address: String,
    pub destination_address: String,
    pub authorization_message: String,
    pub message_hex: String,
    pub signature: String,
}

impl ConsolidationRequest {
    pub fn to_wire(&self) -> DonateRequest {
        DonateRequest {
            donate_address: self.destination_address.clone(),
            user_address: self.source_address.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum ConsolidationResult {
    Accepted { details: Value },
    Rejected { status_code: u16, message: String },
    TransportError { cause: String },
}

impl ConsolidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConsolidationResult::Accepted { .. })
    }

    /// The failure as a [`ClaimError`], if this is not an acceptance
    pub fn error(&self) -> Option<ClaimError> {
        match self {
            ConsolidationResult::Accepted { .. } => None,
            ConsolidationResult::Rejected {
                status_code,
                message,
            } => Some(ClaimError::SettlementRejected {
                status_code: *status_code,
                message: message.clone(),
            }),
            ConsolidationResult::TransportError { cause } => {
                Some(ClaimError::TransportFailure {
                    cause: cause.clone(),
                })
            }
        }
    }

    /// Classify a proxy reply
    ///
    /// An embedded rejection code wins over the HTTP status; every
    /// non-success status is a rejection.
    pub fn classify(reply: &BackendReply) -> Self {
        let embedded = reply
            .embedded_status()
            .filter(|code| REJECTION_STATUS_CODES.contains(code));

        if reply.is_success() && embedded.is_none() {
            let details = reply
                .body
                .get("data")
                .cloned()
                .unwrap_or_else(|| reply.body.clone());
            return ConsolidationResult::Accepted { details };
        }

        ConsolidationResult::Rejected {
            status_code: embedded.unwrap_or(reply.status),
            message: reply
                .error_message()
                .unwrap_or_else(|| GENERIC_REJECTION.to_string()),
        }
    }
}

/// Builds, signs and submits consolidation requests
#[derive(Clone)]
pub struct ConsolidationBuilder {
    backend: Arc<dyn ClaimBackend>,
    notices: Arc<dyn NoticeSink>,
}

impl ConsolidationBuilder {
    pub fn new(backend: Arc<dyn ClaimBackend>, notices: Arc<dyn NoticeSink>) -> Self {
        Self { backend, notices }
    }

    /// Submit using the store's current session
    ///
    /// Returns `None` without signing or sending anything when the submit
    /// control would be disabled.
    pub async fn submit_with(
        &self,
        store: &SessionStore,
        destination: &str,
    ) -> Option<ConsolidationResult> {
        let session = store.session();
        if !can_submit(session.as_ref(), destination) {
            return None;
        }
        let session = session?;
        Some(self.submit_consolidation(&session, destination).await)
    }

    /// Sign the authorization message with `session` and submit it
    pub async fn submit_consolidation(
        &self,
        session: &WalletSession,
        destination: &str,
    ) -> ConsolidationResult {
        let attempt = Uuid::new_v4();

        if destination.trim().is_empty() {
            warn!(%attempt, "Consolidation attempted without a destination address");
            return ConsolidationResult::Rejected {
                status_code: 400,
                message: "Destination address is required".to_string(),
            };
        }

        let authorization_message = authorization_message(destination);
        let message_hex = encode_message(&authorization_message);

        let signature = match session.handle().sign_data(&message_hex).await {
            Ok(signed) => signed.signature,
            Err(e) => {
                warn!(%attempt, "Signing rejected: {}", e);
                self.notices
                    .notify(Notice::error("Signing request was declined"));
                return ConsolidationResult::TransportError {
                    cause: ClaimError::SigningRejected(e.to_string()).to_string(),
                };
            }
        };

        let request = ConsolidationRequest {
            source_address: session.account_address().to_string(),
            destination_address: destination.to_string(),
            authorization_message,
            message_hex,
            signature,
        };

        info!(
            %attempt,
            "Submitting consolidation from {} to {}",
            request.source_address, request.destination_address
        );

        let result = match self.backend.donate(&request.to_wire()).await {
            Ok(reply) => ConsolidationResult::classify(&reply),
            Err(e) => ConsolidationResult::TransportError {
                cause: e.to_string(),
            },
        };

        match &result {
            ConsolidationResult::Accepted { .. } => {
                info!(%attempt, "Consolidation accepted");
                self.notices.notify(Notice::success(SUBMITTED_NOTICE));
            }
            ConsolidationResult::Rejected {
                status_code,
                message,
            } => {
                warn!(%attempt, "Consolidation rejected ({}): {}", status_code, message);
                self.notices.notify(Notice::error(message.clone()));
            }
            ConsolidationResult::TransportError { cause } => {
                warn!(%attempt, "Consolidation transport failure: {}", cause);
                self.notices
                    .notify(Notice::error(format!("Consolidation request failed: {}", cause)));
            }
        }

        result
    }
}
