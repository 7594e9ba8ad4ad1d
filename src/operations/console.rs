//! Server log tail.

use tokio_util::sync::CancellationToken;

use crate::cluster::{ClusterAdmin, LogInfo, LogKind, LogOptions};
use crate::operations::open;
use crate::operations::params::{QueryParams, RequestError};
use crate::stream::{relay, RelayError, Sink};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleRequest {
    pub options: LogOptions,
}

impl ConsoleRequest {
    pub fn parse(params: &QueryParams) -> Result<Self, RequestError> {
        let kind = match params.get("logType") {
            None => LogKind::All,
            Some(raw) => LogKind::parse(raw)
                .ok_or_else(|| RequestError::invalid("logType", raw, "expected all, minio or application"))?,
        };
        Ok(Self {
            options: LogOptions {
                node: params.get("node").map(str::to_string),
                line_count: params.number("lines")?,
                kind,
            },
        })
    }

    pub fn transform(&self, record: LogInfo) -> Option<LogInfo> {
        Some(record.for_console())
    }

    pub async fn run(
        &self,
        cluster: &dyn ClusterAdmin,
        cancel: &CancellationToken,
        sink: &mut dyn Sink,
    ) -> Result<(), RelayError> {
        let Some(mut source) = open(cancel, cluster.console_log(cancel.clone(), &self.options)).await? else {
            return Ok(());
        };
        relay::run(cancel, &mut source, sink, |record| self.transform(record)).await
    }
}
