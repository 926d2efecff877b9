//! Offline mutation queue.
//!
//! Requests made while offline are persisted under one storage key and
//! replayed in order once a connection is back. A mutation that still fails
//! stays queued for the next pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    Result,
    store::Store,
    sync::{RetryPolicy, Transport},
    utils,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

/// A request recorded while offline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub id: String,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// enqueue time in milliseconds
    pub timestamp: i64,
    /// replay passes that failed for this mutation
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingMutation {
    pub fn new(
        url: impl Into<String>,
        method: HttpMethod,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(),
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body,
            timestamp: utils::time::time_millis(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// mutations delivered and removed from the queue
    pub synced: usize,
    /// mutations still queued after the pass
    pub pending: usize,
    /// (mutation id, error message) for every mutation that failed in this pass
    pub failures: Vec<(String, String)>,
}

pub struct OfflineQueue {
    store: Store,
    key: String,
}

impl OfflineQueue {
    pub fn new(
        store: Store,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Queued mutations in replay order.
    pub fn pending(&self) -> Result<Vec<PendingMutation>> {
        Ok(self.store.get_json::<Vec<PendingMutation>>(&self.key)?.unwrap_or_default())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.pending()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends a mutation and returns its id.
    pub fn enqueue(
        &self,
        mutation: PendingMutation,
    ) -> Result<String> {
        let id = mutation.id.clone();
        self.update(|items| items.push(mutation))?;
        Ok(id)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }

    /// Replays every queued mutation once, in order, one at a time.
    ///
    /// Each mutation gets the full retry budget of `policy`. Failures are
    /// recorded on the mutation and reported, never returned; only storage
    /// errors abort the pass.
    pub async fn replay(
        &self,
        transport: &dyn Transport,
        policy: &RetryPolicy,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for mutation in self.pending()? {
            let label = format!("replay {} {}", mutation.method.as_ref(), mutation.url);
            match policy.run(&label, |_| transport.send(&mutation)).await {
                Ok(()) => {
                    self.update(|items| items.retain(|m| m.id != mutation.id))?;
                    report.synced += 1;
                }
                Err(e) => {
                    warn!("offline mutation {} still pending: {}", mutation.id, e);
                    let message = e.to_string();
                    self.update(|items| {
                        if let Some(m) = items.iter_mut().find(|m| m.id == mutation.id) {
                            m.attempts += 1;
                            m.last_error = Some(message.clone());
                        }
                    })?;
                    report.failures.push((mutation.id.clone(), message));
                }
            }
        }

        report.pending = self.len()?;
        info!("offline replay: {} synced, {} pending", report.synced, report.pending);
        Ok(report)
    }

    // re-reads the stored list so mutations enqueued during a replay are kept
    fn update<F>(
        &self,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Vec<PendingMutation>),
    {
        let mut items = self.pending()?;
        f(&mut items);
        if items.is_empty() { self.store.remove(&self.key) } else { self.store.set_json(&self.key, &items) }
    }
}
