//! Progress reporting for a run.
//!
//! Sinks are only ever called from the collecting thread, never from workers, and must not
//! block: a sink that cannot deliver an event drops it.

use std::sync::mpsc::Sender;

/// A pair whose evaluation failed. The pair counts as "no intersection".
#[derive(Clone, Debug, PartialEq)]
pub struct PairFailure {
    pub a: String,
    pub b: String,
    pub reason: String,
}

/// Observer for run progress.
pub trait ProgressSink {
    /// Called with a percentage in `0..=100` and a label for the current phase.
    fn progress(&mut self, percent: u8, phase: &str);

    /// Called once for every pair whose evaluation failed.
    fn pair_failed(&mut self, _failure: &PairFailure) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str),
{
    fn progress(&mut self, percent: u8, phase: &str) {
        self(percent, phase)
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _percent: u8, _phase: &str) {}
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, percent: u8, phase: &str) {
        log::info!("{:>3}% {}", percent, phase);
    }

    fn pair_failed(&mut self, failure: &PairFailure) {
        log::warn!("{} x {}: {}", failure.a, failure.b, failure.reason);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub phase: String,
}

/// Sends events down a channel, e.g. to a UI thread. A hung-up receiver is ignored.
#[derive(Clone, Debug)]
pub struct ChannelProgress(pub Sender<ProgressEvent>);

impl ProgressSink for ChannelProgress {
    fn progress(&mut self, percent: u8, phase: &str) {
        let _ = self.0.send(ProgressEvent {
            percent,
            phase: phase.to_string(),
        });
    }
}

/// Wraps a sink so that reported percentages never decrease, never exceed `cap`, and
/// repeated identical events are suppressed.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    cap: u8,
    last: Option<(u8, String)>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink, cap: u8) -> Self {
        Self {
            sink,
            cap: cap.min(100),
            last: None,
        }
    }

    pub(crate) fn report(&mut self, percent: u8, phase: &str) {
        let floor = self.last.as_ref().map(|(p, _)| *p).unwrap_or(0);
        let percent = percent.min(self.cap).max(floor);
        if let Some((p, label)) = &self.last {
            if *p == percent && label == phase {
                return;
            }
        }
        self.sink.progress(percent, phase);
        self.last = Some((percent, phase.to_string()));
    }

    /// Reports `done / total` scaled onto `0..=cap`, so the cap is only reached when done.
    pub(crate) fn report_fraction(&mut self, done: usize, total: usize, phase: &str) {
        let percent = if total == 0 {
            self.cap
        } else {
            ((self.cap as usize * done.min(total)) / total) as u8
        };
        self.report(percent, phase);
    }

    pub(crate) fn report_cap(&mut self, phase: &str) {
        self.report(self.cap, phase);
    }

    pub(crate) fn pair_failed(&mut self, failure: &PairFailure) {
        self.sink.pair_failed(failure);
    }

    pub(crate) fn current(&self) -> u8 {
        self.last.as_ref().map(|(p, _)| *p).unwrap_or(0)
    }
}
