//! The cooperative tick loop.
//!
//! One tick gives the publisher a chance to restore a lost link, drains every
//! pending raw event in arrival order, runs idle decay, and hands a snapshot
//! to the status sink.  The loop then waits for the next
//! tick of a fixed-rate interval.  The translator is owned by the loop, so no
//! state is shared with the capture threads beyond the event channel.

use std::future::Future;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use mirror_core::{CaptureMode, InputSnapshot};

use super::translate_input::{EventTranslator, LinkStatus, Publisher, TranslateError};
use crate::infrastructure::input_capture::RawInputEvent;

/// Receives a read-only snapshot once per tick.
///
/// Implementations must not fail the tick; rendering problems are theirs to
/// swallow.
pub trait StatusSink {
    fn render(&mut self, snapshot: &InputSnapshot, mode: CaptureMode);
}

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Events taken off the channel.
    pub events: usize,
    /// Events or decay passes whose publishing failed.
    pub failures: usize,
    /// The input source has hung up; no more events will arrive.
    pub source_closed: bool,
    /// The publisher reconnected at the start of this tick and the full
    /// state was sent again.
    pub restored: bool,
}

/// Why [`run_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    SourceClosed,
}

/// Runs a single tick at time `now`.
///
/// Publish failures are counted and never stop the tick.  While the link is
/// down they are logged at debug level only; the publisher reports the loss
/// and each reconnect attempt itself.
pub async fn run_tick(
    translator: &mut EventTranslator,
    events: &Receiver<RawInputEvent>,
    publisher: &dyn Publisher,
    status: &mut dyn StatusSink,
    now: Instant,
) -> TickReport {
    let mut report = TickReport::default();

    if publisher.restore(now).await == LinkStatus::Restored {
        report.restored = true;
        match translator.publish_all(publisher).await {
            Ok(()) => info!(
                "republished {} channels after reconnecting",
                translator.channels().len()
            ),
            Err(e) => {
                note_failure(&e, "republish state");
                report.failures += 1;
            }
        }
    }

    loop {
        let event = match events.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                report.source_closed = true;
                break;
            }
        };
        report.events += 1;
        if let Err(e) = translator.handle_event(&event, publisher).await {
            note_failure(&e, &format!("publish {event:?}"));
            report.failures += 1;
        }
    }

    if let Err(e) = translator.run_idle_decay(now, publisher).await {
        note_failure(&e, "publish idle decay");
        report.failures += 1;
    }

    status.render(&translator.snapshot(), translator.mode());
    report
}

fn note_failure(e: &TranslateError, what: &str) {
    if e.is_link_down() {
        debug!("failed to {what}: {e}");
    } else {
        warn!("failed to {what}: {e}");
    }
}

/// Ticks every `period` until `shutdown` resolves or the source hangs up.
///
/// Shutdown is only observed between ticks, so the tick in progress always
/// finishes its publishes.
pub async fn run_loop<F>(
    translator: &mut EventTranslator,
    events: &Receiver<RawInputEvent>,
    publisher: &dyn Publisher,
    status: &mut dyn StatusSink,
    period: Duration,
    shutdown: F,
) -> LoopExit
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                return LoopExit::Shutdown;
            }
            _ = ticker.tick() => {
                let report = run_tick(translator, events, publisher, status, Instant::now()).await;
                if report.source_closed {
                    warn!("input source closed; stopping");
                    return LoopExit::SourceClosed;
                }
            }
        }
    }
}
