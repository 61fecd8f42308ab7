//! Canned search responses for testing.

use crate::client::Search;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Answers searches with queued responses, in order, and remembers every
/// request body it was sent. Once the queue is empty every search fails
/// with [`Unavailable`](ErrorKind::Unavailable).
#[derive(Debug, Default)]
pub struct MockSearch {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<Value>>,
}

impl MockSearch {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Search for MockSearch {
    async fn search(&self, body: &Value) -> Result<Value> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(body.clone());
        let next = self.responses.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match next {
            Some(response) => Ok(response),
            None => exn::bail!(ErrorKind::Unavailable),
        }
    }
}
