//! Cluster health diagnostics.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cluster::ClusterAdmin;
use crate::operations::open;
use crate::operations::params::{QueryParams, RequestError};
use crate::stream::{relay, RelayError, Sink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthInfoRequest {
    /// How long the cluster may spend collecting diagnostics.
    pub deadline: Duration,
}

impl HealthInfoRequest {
    pub fn parse(params: &QueryParams) -> Result<Self, RequestError> {
        let deadline = params.duration("deadline")?.ok_or(RequestError::Missing("deadline"))?;
        if deadline.is_zero() {
            let raw = params.get("deadline").unwrap_or_default();
            return Err(RequestError::invalid("deadline", raw, "must be positive"));
        }
        Ok(Self { deadline })
    }

    pub async fn run(
        &self,
        cluster: &dyn ClusterAdmin,
        cancel: &CancellationToken,
        sink: &mut dyn Sink,
    ) -> Result<(), RelayError> {
        let Some(mut source) = open(cancel, cluster.health_info(cancel.clone(), self.deadline)).await? else {
            return Ok(());
        };
        relay::run(cancel, &mut source, sink, Some::<Value>).await
    }
}
