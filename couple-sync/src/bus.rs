//! Request bus - correlated request/response messages with the host.
//!
//! Each request carries a fresh UUID. The host answers through
//! [`RequestBus::respond`]; the waiting caller is resolved by id, or gets
//! [`BusError::Timeout`] if no answer arrives in time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::BusError;

/// Outbound request buffer.
const BUS_BUFFER: usize = 32;

/// A request sent to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRequest {
    /// Correlation id.
    pub id: Uuid,
    /// What is being asked for.
    pub method: String,
    /// Method arguments.
    #[serde(default)]
    pub payload: Value,
}

/// The host's answer to a [`BusRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusResponse {
    /// Correlation id of the request being answered.
    pub id: Uuid,
    /// Result value on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BusResponse {
    /// Successful response.
    #[must_use]
    pub fn ok(id: Uuid, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn err(id: Uuid, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}

type Waiters = HashMap<Uuid, oneshot::Sender<Result<Value, String>>>;

/// Sends requests to the host and resolves them by correlation id.
///
/// Cheap to clone; clones share pending requests.
#[derive(Debug, Clone)]
pub struct RequestBus {
    outbound: mpsc::Sender<BusRequest>,
    pending: Arc<Mutex<Waiters>>,
    timeout: Duration,
}

impl RequestBus {
    /// Create a bus. The receiver yields requests for the host to answer.
    #[must_use]
    pub fn new(timeout: Duration) -> (Self, mpsc::Receiver<BusRequest>) {
        let (outbound, rx) = mpsc::channel(BUS_BUFFER);
        let bus = Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        };
        (bus, rx)
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`BusError::Timeout`] if no response arrives in time
    /// - [`BusError::Failed`] if the host reports an error
    /// - [`BusError::Closed`] if the host side is gone
    pub async fn request(&self, method: &str, payload: Value) -> Result<Value, BusError> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(id, tx);
        // Removes the waiter however this future ends, including cancellation.
        let _waiter = WaiterGuard { bus: self, id };

        let request = BusRequest {
            id,
            method: method.to_string(),
            payload,
        };
        tracing::trace!(%id, method, "Bus request");
        if self.outbound.send(request).await.is_err() {
            return Err(BusError::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(BusError::Failed(message)),
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => {
                tracing::debug!(%id, method, "Bus request timed out");
                Err(BusError::Timeout(self.timeout))
            }
        }
    }

    /// Deliver a response from the host.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownRequest`] if nobody is waiting on the id
    /// (already answered, timed out, or never sent).
    pub fn respond(&self, response: BusResponse) -> Result<(), BusError> {
        let waiter = self
            .waiters()
            .remove(&response.id)
            .ok_or(BusError::UnknownRequest(response.id))?;
        let result = match (response.result, response.error) {
            (_, Some(error)) => Err(error),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(Value::Null),
        };
        // The caller may have given up between lookup and send.
        let _ = waiter.send(result);
        Ok(())
    }

    /// Number of requests waiting for a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.waiters().len()
    }

    fn waiters(&self) -> std::sync::MutexGuard<'_, Waiters> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct WaiterGuard<'a> {
    bus: &'a RequestBus,
    id: Uuid,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        // Already gone once a response was delivered.
        self.bus.waiters().remove(&self.id);
    }
}
