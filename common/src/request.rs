//! Quote request records and their lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::CurrencyPair;

/// Unique identifier for a quote request.
/// Uses UUID v7 for time-ordered identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new request ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quote request status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Created by a client, waiting to be picked up by a processing cycle.
    Pending,
    /// Picked up by the current processing cycle.
    Processing,
    /// Rate resolved and the quote written.
    Completed,
    /// Resolution failed; a new request must be created to retry.
    Failed,
}

impl RequestStatus {
    /// Check if this is a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Check if the request is waiting to be processed.
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    /// Status string as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A client request to refresh the quote for a currency pair.
///
/// At most one `pending` request exists per pair at any time; the store's
/// create-or-get operation enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The pair to refresh.
    pub pair: CurrencyPair,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last touched.
    pub updated_at: DateTime<Utc>,
}

impl QuoteRequest {
    /// Create a new pending request for a pair.
    pub fn new(pair: CurrencyPair) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            pair,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
