//! Heal session aggregation.
//!
//! # Responsibilities
//! - Start a heal sequence and remember its client token
//! - Poll the sequence status and fold each batch into a cumulative snapshot
//! - Decide when the session is over (finished, stopped, failed)
//!
//! # State Machine
//! ```text
//! Idle → Started(token) → Polling(token) → Finished
//!                                        → Stopped(detail)
//!                                        → Cancelled
//!   (any call failure)                   → Errored
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::cluster::ClusterAdmin;
use crate::heal::color::{classify_object, classify_replicated, ClassifyError, Color};
use crate::heal::types::{
    DriveHealth, HealRequest, HealResultItem, HealStatus, HealTaskStatus, ItemHealthStatus, HEAL_ITEM_BUCKET,
    HEAL_ITEM_BUCKET_METADATA, HEAL_ITEM_METADATA, HEAL_ITEM_OBJECT, HEAL_SUMMARY_FINISHED, HEAL_SUMMARY_STOPPED,
};
use crate::resilience::with_timeout;
use crate::stream::{Poller, SourceError, Tick};

/// Lifecycle of a heal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealState {
    Idle,
    Started { token: String },
    Polling { token: String },
    Finished,
    Stopped { detail: String },
    Cancelled,
    Errored,
}

/// What the caller should do after a successful start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Poll the sequence until it ends.
    Poll,
    /// The request was a force-stop; nothing to poll.
    ForceStopped,
}

/// Drives one heal sequence and accumulates its results.
pub struct HealSession<'a> {
    cluster: &'a dyn ClusterAdmin,
    request: HealRequest,
    call_timeout: Duration,
    state: HealState,
    started_at: Instant,
    status: HealStatus,
}

impl<'a> HealSession<'a> {
    pub fn new(cluster: &'a dyn ClusterAdmin, request: HealRequest, call_timeout: Duration) -> Self {
        Self {
            cluster,
            request,
            call_timeout,
            state: HealState::Idle,
            started_at: Instant::now(),
            status: HealStatus::default(),
        }
    }

    pub fn state(&self) -> &HealState {
        &self.state
    }

    pub fn status(&self) -> &HealStatus {
        &self.status
    }

    /// Issue the heal start call.
    pub async fn start(&mut self) -> Result<StartOutcome, SourceError> {
        let started = with_timeout("heal start", self.call_timeout, self.cluster.heal_start(&self.request)).await;
        let success = match started {
            Ok(success) => success,
            Err(e) => {
                self.state = HealState::Errored;
                return Err(e);
            }
        };

        self.started_at = Instant::now();
        if self.request.force_stop {
            tracing::info!(bucket = %self.request.bucket, prefix = %self.request.prefix, "Heal sequence force-stopped");
            self.state = HealState::Finished;
            return Ok(StartOutcome::ForceStopped);
        }

        tracing::info!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            client_address = %success.client_address,
            "Heal sequence started"
        );
        self.state = HealState::Started {
            token: success.client_token,
        };
        Ok(StartOutcome::Poll)
    }

    /// Record that the session ended because the client went away.
    pub fn mark_cancelled(&mut self) {
        if matches!(self.state, HealState::Started { .. } | HealState::Polling { .. }) {
            self.state = HealState::Cancelled;
        }
    }

    /// Fold one status batch into the snapshot.
    ///
    /// Every item is classified before anything is counted, so a batch that
    /// fails classification leaves the snapshot untouched.
    pub fn absorb(&mut self, batch: &HealTaskStatus) -> Result<(), ClassifyError> {
        let entries = batch
            .items
            .iter()
            .map(|item| item_health(item, &batch.summary).map(|entry| (item, entry)))
            .collect::<Result<Vec<_>, _>>()?;

        self.status.heal_duration = Duration::from_secs(self.started_at.elapsed().as_secs_f64().round() as u64);
        for (item, entry) in entries {
            let is_object = item.heal_item_type == HEAL_ITEM_OBJECT;

            self.status.items_scanned += 1;
            if is_object {
                self.status.objects_scanned += 1;
                if item.object_size >= 0 {
                    self.status.bytes_scanned += item.object_size;
                }
            }
            if entry.after.online > entry.before.online {
                self.status.items_healed += 1;
                if is_object {
                    self.status.objects_healed += 1;
                }
            }
            *self.status.health_before_cols.entry(entry.before.color).or_insert(0) += 1;
            *self.status.health_after_cols.entry(entry.after.color).or_insert(0) += 1;
            self.status.items.push(entry);
        }
        Ok(())
    }

    fn active_token(&self) -> Option<String> {
        match &self.state {
            HealState::Started { token } | HealState::Polling { token } => Some(token.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl<'a> Poller for HealSession<'a> {
    type Output = HealStatus;

    async fn poll(&mut self) -> Result<Tick<HealStatus>, SourceError> {
        let Some(token) = self.active_token() else {
            return Err(SourceError::Malformed("heal sequence is not running".to_string()));
        };
        self.state = HealState::Polling { token: token.clone() };

        let fetched = with_timeout(
            "heal status",
            self.call_timeout,
            self.cluster.heal_status(&self.request.bucket, &self.request.prefix, &token),
        )
        .await;
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                self.state = HealState::Errored;
                return Err(e);
            }
        };

        if let Err(e) = self.absorb(&batch) {
            self.state = HealState::Errored;
            return Err(SourceError::Malformed(e.to_string()));
        }

        let snapshot = self.status.clone();
        match batch.summary.as_str() {
            HEAL_SUMMARY_FINISHED => {
                tracing::info!(items = self.status.items_scanned, "Heal sequence finished");
                self.state = HealState::Finished;
                Ok(Tick::Finish(snapshot))
            }
            HEAL_SUMMARY_STOPPED => {
                tracing::warn!(detail = %batch.failure_detail, "Heal sequence stopped by cluster");
                self.state = HealState::Stopped {
                    detail: batch.failure_detail.clone(),
                };
                Ok(Tick::Abort(snapshot, SourceError::HealStopped(batch.failure_detail)))
            }
            _ => Ok(Tick::Continue(snapshot)),
        }
    }
}

/// Build the client-facing record for one item.
fn item_health(item: &HealResultItem, summary: &str) -> Result<ItemHealthStatus, ClassifyError> {
    let (before_color, after_color) = item_colors(item)?;
    let (item_type, name) = display_name(item);
    Ok(ItemHealthStatus {
        status: summary.to_string(),
        error: String::new(),
        item_type,
        name,
        size: item.object_size,
        before: DriveHealth::from_infos(before_color, &item.before),
        after: DriveHealth::from_infos(after_color, &item.after),
    })
}

/// Before/after colors, dispatched on item type.
fn item_colors(item: &HealResultItem) -> Result<(Color, Color), ClassifyError> {
    let (before, after) = item.online_counts();
    match item.heal_item_type.as_str() {
        HEAL_ITEM_OBJECT => Ok((
            classify_object(item.parity_blocks, item.data_blocks, before)?,
            classify_object(item.parity_blocks, item.data_blocks, after)?,
        )),
        HEAL_ITEM_METADATA | HEAL_ITEM_BUCKET_METADATA | HEAL_ITEM_BUCKET => Ok((
            classify_replicated(item.disk_count, item.set_count, before)?,
            classify_replicated(item.disk_count, item.set_count, after)?,
        )),
        _ => Ok((Color::Grey, Color::Grey)),
    }
}

/// Display (type, name) for an item.
fn display_name(item: &HealResultItem) -> (String, String) {
    match item.heal_item_type.as_str() {
        HEAL_ITEM_METADATA => ("system".to_string(), item.detail.clone()),
        HEAL_ITEM_BUCKET_METADATA => (
            "system".to_string(),
            format!("bucket-metadata:{}/{}", item.bucket, item.object),
        ),
        HEAL_ITEM_BUCKET => ("bucket".to_string(), format!("{}/{}", item.bucket, item.object)),
        HEAL_ITEM_OBJECT => ("object".to_string(), format!("{}/{}", item.bucket, item.object)),
        _ => {
            // Unknown types surface the raw record in both fields.
            let diagnostic = format!("!! Unknown heal result record {item:?} !!");
            (diagnostic.clone(), diagnostic)
        }
    }
}
