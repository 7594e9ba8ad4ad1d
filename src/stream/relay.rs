//! The relay pump: operation source → transform → sink.
//!
//! # Responsibilities
//! - Forward records from a channel-backed source until it ends
//! - Drive periodic pollers (heal) on a fixed cadence
//! - Stop on cancellation, source exhaustion, embedded error, or write failure
//!
//! # Design Decisions
//! - Single task, no fan-out: every sink write is issued from here, in order
//! - Cancellation is never an error at this layer
//! - No retry and no buffering beyond the source channel

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::stream::error::{RelayError, SourceError};
use crate::stream::sink::Sink;

/// Records produced by an operation source. `Err` items carry an embedded
/// failure; channel closure marks the end of the stream.
pub type EventStream<T> = mpsc::Receiver<Result<T, SourceError>>;

/// Shortest period accepted by [`run_polling`].
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Pump records from `source` into `sink` until the session ends.
///
/// `transform` may drop a record by returning `None`. The source is borrowed so
/// that unread records remain observable after an early return.
pub async fn run<T, O, F, S>(
    cancel: &CancellationToken,
    source: &mut EventStream<T>,
    sink: &mut S,
    mut transform: F,
) -> Result<(), RelayError>
where
    T: Send,
    O: Serialize,
    F: FnMut(T) -> Option<O> + Send,
    S: Sink + ?Sized,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = source.recv() => next,
        };

        let record = match next {
            None => return Ok(()),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(record)) => record,
        };

        let Some(text) = transform(record)
            .map(|out| serde_json::to_string(&out))
            .transpose()?
        else {
            continue;
        };
        sink.send_text(text).await?;
    }
}

/// Result of one poll.
#[derive(Debug)]
pub enum Tick<O> {
    /// Emit the message and keep polling.
    Continue(O),
    /// Emit the message, then end the session cleanly.
    Finish(O),
    /// Emit the message, then end the session with the error.
    Abort(O, SourceError),
}

/// A source that is polled on a timer instead of pushing records.
#[async_trait]
pub trait Poller: Send {
    type Output: Serialize + Send;

    async fn poll(&mut self) -> Result<Tick<Self::Output>, SourceError>;
}

/// Drive `poller` every `period` and write each result to `sink`.
///
/// The first poll happens immediately. Cancellation takes precedence over a
/// due tick, and a poll in flight is abandoned when the session is cancelled.
pub async fn run_polling<P, S>(
    cancel: &CancellationToken,
    period: Duration,
    poller: &mut P,
    sink: &mut S,
) -> Result<(), RelayError>
where
    P: Poller + ?Sized,
    S: Sink + ?Sized,
{
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let tick = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            tick = poller.poll() => tick?,
        };

        match tick {
            Tick::Continue(message) => write(sink, &message).await?,
            Tick::Finish(message) => {
                write(sink, &message).await?;
                return Ok(());
            }
            Tick::Abort(message, err) => {
                write(sink, &message).await?;
                return Err(err.into());
            }
        }
    }
}

async fn write<O, S>(sink: &mut S, message: &O) -> Result<(), RelayError>
where
    O: Serialize + ?Sized,
    S: Sink + ?Sized,
{
    let text = serde_json::to_string(message)?;
    sink.send_text(text).await?;
    Ok(())
}
