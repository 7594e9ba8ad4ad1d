//! Bucket notification watch.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cluster::{ClusterAdmin, WatchEvent, WatchOptions};
use crate::operations::open;
use crate::operations::params::{QueryParams, RequestError};
use crate::stream::{relay, RelayError, Sink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub options: WatchOptions,
}

impl WatchRequest {
    pub fn parse(bucket: &str, params: &QueryParams) -> Result<Self, RequestError> {
        let requested = params.list("events");
        let events = if requested.is_empty() {
            WatchEvent::DEFAULT.to_vec()
        } else {
            let mut events = Vec::new();
            for raw in requested {
                let event = WatchEvent::parse(raw)
                    .ok_or_else(|| RequestError::invalid("events", raw, "expected put, get or delete"))?;
                if !events.contains(&event) {
                    events.push(event);
                }
            }
            events
        };

        Ok(Self {
            options: WatchOptions {
                bucket: bucket.to_string(),
                events,
                prefix: params.string("prefix"),
                suffix: params.string("suffix"),
            },
        })
    }

    pub async fn run(
        &self,
        cluster: &dyn ClusterAdmin,
        cancel: &CancellationToken,
        sink: &mut dyn Sink,
    ) -> Result<(), RelayError> {
        let Some(mut source) = open(cancel, cluster.watch_bucket(cancel.clone(), &self.options)).await? else {
            return Ok(());
        };
        relay::run(cancel, &mut source, sink, Some::<Value>).await
    }
}
