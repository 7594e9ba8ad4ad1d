//! Bucket heal with periodic status snapshots.

use tokio_util::sync::CancellationToken;

use crate::cluster::ClusterAdmin;
use crate::heal::{HealOpts, HealRequest, HealScanMode, HealSession, StartOutcome};
use crate::operations::params::{QueryParams, RequestError};
use crate::operations::RunSettings;
use crate::stream::{relay, RelayError, Sink};

pub fn parse(bucket: &str, params: &QueryParams) -> Result<HealRequest, RequestError> {
    let force_start = params.flag("force-start")?;
    let force_stop = params.flag("force-stop")?;
    if force_start && force_stop {
        return Err(RequestError::ConflictingForce);
    }

    let scan_mode = match params.get("scan") {
        None | Some("normal") => HealScanMode::Normal,
        Some("deep") => HealScanMode::Deep,
        Some(other) => return Err(RequestError::invalid("scan", other, "expected normal or deep")),
    };

    Ok(HealRequest {
        bucket: bucket.to_string(),
        prefix: params.string("prefix"),
        opts: HealOpts {
            recursive: params.flag("recursive")?,
            dry_run: params.flag("dry-run")?,
            remove: params.flag("remove")?,
            scan_mode,
        },
        force_start,
        force_stop,
    })
}

pub async fn run(
    request: &HealRequest,
    cluster: &dyn ClusterAdmin,
    cancel: &CancellationToken,
    sink: &mut dyn Sink,
    settings: &RunSettings,
) -> Result<(), RelayError> {
    let mut session = HealSession::new(cluster, request.clone(), settings.call_timeout);

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(()),
        outcome = session.start() => outcome?,
    };
    if outcome == StartOutcome::ForceStopped {
        return Ok(());
    }

    let result = relay::run_polling(cancel, settings.heal_poll_interval, &mut session, sink).await;
    if cancel.is_cancelled() {
        session.mark_cancelled();
    }
    tracing::debug!(
        state = ?session.state(),
        items = session.status().items_scanned,
        "Heal session ended"
    );
    result
}
