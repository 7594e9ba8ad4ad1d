//! Live call trace.

use tokio_util::sync::CancellationToken;

use crate::cluster::ClusterAdmin;
use crate::operations::open;
use crate::operations::params::{QueryParams, RequestError};
use crate::stream::{relay, RelayError, Sink};
use crate::trace::{matches, ShortTraceMsg, TraceFilters, TraceInfo, TraceKinds, TraceOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceRequest {
    pub options: TraceOptions,
    pub filters: TraceFilters,
}

impl TraceRequest {
    pub fn parse(params: &QueryParams) -> Result<Self, RequestError> {
        let calls = params.list("calls");
        let kinds = if calls.is_empty() {
            TraceKinds::S3
        } else {
            let mut kinds = TraceKinds::default();
            for call in calls {
                kinds.merge(parse_kind(call)?);
            }
            kinds
        };

        let options = TraceOptions {
            kinds,
            threshold: params.duration("threshold")?,
            only_errors: params.flag("onlyErrors")?,
        };
        let filters = TraceFilters {
            path: params.get("path").map(str::to_string),
            // 0 means "no status filter"
            status_code: params.number::<u16>("statusCode")?.filter(|code| *code != 0),
            method: params.get("method").map(str::to_string),
            func_name: params.get("funcname").map(str::to_string),
        };
        Ok(Self { options, filters })
    }

    pub fn transform(&self, record: TraceInfo) -> Option<ShortTraceMsg> {
        matches(&self.filters, &record).then(|| ShortTraceMsg::from(&record))
    }

    pub async fn run(
        &self,
        cluster: &dyn ClusterAdmin,
        cancel: &CancellationToken,
        sink: &mut dyn Sink,
    ) -> Result<(), RelayError> {
        let Some(mut source) = open(cancel, cluster.trace(cancel.clone(), &self.options)).await? else {
            return Ok(());
        };
        relay::run(cancel, &mut source, sink, |record| self.transform(record)).await
    }
}

fn parse_kind(call: &str) -> Result<TraceKinds, RequestError> {
    match call {
        "s3" => Ok(TraceKinds::S3),
        "internal" => Ok(TraceKinds::INTERNAL),
        "storage" => Ok(TraceKinds::STORAGE),
        "os" => Ok(TraceKinds::OS),
        "all" => Ok(TraceKinds::ALL),
        other => Err(RequestError::invalid("calls", other, "expected s3, internal, storage, os or all")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::ScriptedCluster;
    use crate::trace::types::{TraceHttpStats, TraceRequestInfo, TraceResponseInfo};
    use std::time::Duration;

    fn parse(query: &str) -> Result<TraceRequest, RequestError> {
        TraceRequest::parse(&QueryParams::parse(Some(query)))
    }

    fn call(path: &str, status: u16) -> TraceInfo {
        TraceInfo {
            node_name: "n1".into(),
            func_name: "s3.GetObject".into(),
            path: path.into(),
            http: Some(TraceHttpStats {
                req_info: TraceRequestInfo {
                    method: "GET".into(),
                    ..Default::default()
                },
                resp_info: TraceResponseInfo {
                    status_code: Some(status),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let request = parse("").unwrap();
        assert_eq!(request.options.kinds, TraceKinds::S3);
        assert!(!request.options.only_errors);
        assert!(request.filters.is_empty());
    }

    #[test]
    fn test_full_query() {
        let request = parse("calls=s3,internal&threshold=100ms&onlyErrors=true&statusCode=503&method=PUT").unwrap();
        assert!(request.options.kinds.contains(TraceKinds::S3));
        assert!(request.options.kinds.contains(TraceKinds::INTERNAL));
        assert!(!request.options.kinds.contains(TraceKinds::OS));
        assert_eq!(request.options.threshold, Some(Duration::from_millis(100)));
        assert!(request.options.only_errors);
        assert_eq!(request.filters.status_code, Some(503));
        assert_eq!(request.filters.method.as_deref(), Some("PUT"));
    }

    #[test]
    fn test_zero_status_is_unset() {
        assert_eq!(parse("statusCode=0").unwrap().filters.status_code, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(parse("calls=s3,disk"), Err(RequestError::Invalid { name: "calls", .. })));
        assert!(matches!(parse("onlyErrors=yes"), Err(RequestError::Invalid { name: "onlyErrors", .. })));
        assert!(matches!(parse("statusCode=abc"), Err(RequestError::Invalid { name: "statusCode", .. })));
        assert!(matches!(parse("threshold=soon"), Err(RequestError::Invalid { name: "threshold", .. })));
    }

    #[tokio::test]
    async fn test_run_filters_and_shortens() {
        let cluster = ScriptedCluster::default();
        *cluster.trace_records.lock().unwrap() = vec![
            Ok(call("/photos/a.png", 200)),
            Ok(call("/docs/b.txt", 404)),
            Ok(call("/PHOTOS/c.png", 500)),
        ];
        let request = parse("path=photos&calls=all").unwrap();

        let cancel = CancellationToken::new();
        let mut sink = Vec::new();
        request.run(&cluster, &cancel, &mut sink).await.unwrap();

        assert_eq!(sink.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&sink[0]).unwrap();
        assert_eq!(first["path"], "/photos/a.png");
        assert_eq!(first["statusMsg"], "OK");
        assert_eq!(cluster.last_trace.lock().unwrap().as_ref().unwrap().kinds, TraceKinds::ALL);
    }
}
