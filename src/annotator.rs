use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::index::{generate_pairs, CandidatePair, SpatialIndex};
use crate::noding::{evaluate_wire, CrossingPoints, IntersectionResult};
use crate::progress::{NullProgress, PairFailure, ProgressSink, ProgressTracker};
use crate::shape::Shape;
use crate::store::GeometryStore;
use crate::utils::parallel::{worker_count, WorkerPool};
use crate::wire;

pub const DEFAULT_CHUNK_SIZE: usize = 5000;
pub const DEFAULT_PROGRESS_CAP: u8 = 92;

/// How candidate pairs are pulled out of the spatial index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairQuery {
    /// One traversal of the tree against itself.
    Bulk,
    /// One envelope query per geometry. Same coverage, more work.
    PerGeometry,
}

#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    /// Pairs dispatched per batch. Bounds in-flight tasks; has no effect on the result.
    pub chunk_size: usize,
    /// Worker threads. `None` uses the host's available parallelism.
    pub workers: Option<usize>,
    pub pair_query: PairQuery,
    /// Highest percentage this stage reports, leaving the rest to graph construction.
    pub progress_cap: u8,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            pair_query: PairQuery::Bulk,
            progress_cap: DEFAULT_PROGRESS_CAP,
        }
    }
}

impl AnnotatorConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_pair_query(mut self, pair_query: PairQuery) -> Self {
        self.pair_query = pair_query;
        self
    }

    pub fn with_progress_cap(mut self, progress_cap: u8) -> Self {
        self.progress_cap = progress_cap;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    BuildingIndex,
    GeneratingPairs,
    Dispatching,
    Collecting,
    Merged,
    Done,
    Failed,
}

impl RunPhase {
    pub fn label(self) -> &'static str {
        match self {
            RunPhase::Idle => "Idle",
            RunPhase::BuildingIndex => "Building spatial index",
            RunPhase::GeneratingPairs => "Generating candidate pairs",
            RunPhase::Dispatching => "Dispatching pairs",
            RunPhase::Collecting => "Checking intersections",
            RunPhase::Merged => "Merged",
            RunPhase::Done => "Done",
            RunPhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared flag that aborts a run in progress.
///
/// Workers stop evaluating once it is set; the collector finishes the in-flight batch and the
/// run returns [`EngineError::Cancelled`]. Points merged so far stay in the store.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// Geometries that went into the spatial index.
    pub indexed: usize,
    /// Keys left out for a null, empty or non-finite shape.
    pub skipped: Vec<String>,
    pub candidate_pairs: usize,
    /// Pairs that met at one or more discrete points.
    pub crossing_pairs: usize,
    /// Points recorded per pair, summed. Each is stored on both geometries.
    pub crossing_points: usize,
    pub failures: Vec<PairFailure>,
    pub workers: usize,
}

pub(crate) enum PairOutcome {
    Crossing(CandidatePair, CrossingPoints),
    Clear,
    Failed(CandidatePair, String),
    Skipped,
}

pub(crate) fn evaluate_pair(pair: &CandidatePair, wire: &[Vec<u8>], cancel: &CancelToken) -> PairOutcome {
    if cancel.is_cancelled() {
        return PairOutcome::Skipped;
    }
    let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
        evaluate_wire(&wire[pair.a()], &wire[pair.b()])
    }));
    match evaluated {
        Ok(Ok(points)) if points.is_empty() => PairOutcome::Clear,
        Ok(Ok(points)) => PairOutcome::Crossing(*pair, points),
        Ok(Err(e)) => PairOutcome::Failed(*pair, e.to_string()),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            PairOutcome::Failed(*pair, format!("evaluator panicked: {}", reason))
        }
    }
}

/// Single writer for a run: the only place crossing points are added to the store.
pub(crate) struct Collector {
    /// Store record index for each indexed position.
    records: Vec<usize>,
    total: usize,
    pub(crate) checked: usize,
    pub(crate) crossing_pairs: usize,
    pub(crate) crossing_points: usize,
    pub(crate) failures: Vec<PairFailure>,
    pub(crate) error: Option<EngineError>,
}

impl Collector {
    pub(crate) fn new(records: Vec<usize>, total: usize) -> Self {
        Self {
            records,
            total,
            checked: 0,
            crossing_pairs: 0,
            crossing_points: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn accept(
        &mut self,
        outcome: PairOutcome,
        store: &mut GeometryStore,
        progress: &mut ProgressTracker<'_>,
    ) {
        self.checked += 1;
        match outcome {
            PairOutcome::Crossing(pair, points) => {
                let result = IntersectionResult {
                    a: self.records[pair.a()],
                    b: self.records[pair.b()],
                    points,
                };
                match store.merge_result(&result) {
                    Ok(()) => {
                        self.crossing_pairs += 1;
                        self.crossing_points += result.points.len();
                    }
                    Err(e) => {
                        self.error.get_or_insert(e);
                    }
                }
            }
            PairOutcome::Failed(pair, reason) => {
                let key = |pos: usize| {
                    store
                        .record(self.records[pos])
                        .map(|r| r.key().to_string())
                        .unwrap_or_default()
                };
                let failure = PairFailure {
                    a: key(pair.a()),
                    b: key(pair.b()),
                    reason,
                };
                log::warn!("Skipping pair {} x {}: {}", failure.a, failure.b, failure.reason);
                progress.pair_failed(&failure);
                self.failures.push(failure);
            }
            PairOutcome::Clear | PairOutcome::Skipped => {}
        }
        progress.report_fraction(self.checked, self.total, RunPhase::Collecting.label());
    }
}

/// Finds every discrete crossing between the geometries of a store and records it on both.
#[derive(Clone, Debug, Default)]
pub struct CrossingAnnotator {
    config: AnnotatorConfig,
    cancel: CancelToken,
}

impl CrossingAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnnotatorConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::default(),
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Token that aborts a run of this annotator, usable from any thread.
    ///
    /// A cancellation applies to the run in progress, or to the next one if none is. The flag is
    /// cleared when that run returns, so the annotator can be run again.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Annotates `store` in place.
    ///
    /// Fails on worker pool startup or cancellation; the store then keeps whatever was merged.
    /// Single failed pairs do not fail the run, they are listed in the report.
    pub fn run(&self, store: &mut GeometryStore, sink: &mut dyn ProgressSink) -> Result<RunReport> {
        let mut progress = ProgressTracker::new(sink, self.config.progress_cap);
        let mut phase = RunPhase::Idle;

        let outcome = self.execute(store, &mut progress, &mut phase);
        self.cancel.reset();
        match outcome {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("Crossing detection failed during {}: {}", phase, e);
                let current = progress.current();
                progress.report(current, &format!("{}: {}: {}", RunPhase::Failed, phase, e));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        store: &mut GeometryStore,
        progress: &mut ProgressTracker<'_>,
        phase: &mut RunPhase,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();

        enter(phase, RunPhase::BuildingIndex, progress);
        let (valid, skipped) = store.indexable();
        if !skipped.is_empty() {
            log::warn!("{} geometries are null, empty or non-finite and were left out", skipped.len());
        }
        report.skipped = skipped.into_iter().map(String::from).collect();
        let records: Vec<usize> = valid.iter().map(|(idx, _)| *idx).collect();
        let shapes: Vec<&Shape> = valid.iter().map(|(_, shape)| *shape).collect();
        report.indexed = shapes.len();
        let index = SpatialIndex::build(&shapes);
        self.check_cancel(*phase)?;

        enter(phase, RunPhase::GeneratingPairs, progress);
        let raw: Vec<(usize, usize)> = match self.config.pair_query {
            PairQuery::Bulk => index.query_self_intersecting_pairs().collect(),
            PairQuery::PerGeometry => index.query_each(&shapes),
        };
        let pairs: Vec<CandidatePair> = generate_pairs(raw).into_iter().collect();
        report.candidate_pairs = pairs.len();
        log::debug!(
            "{} candidate pairs among {} geometries",
            pairs.len(),
            shapes.len()
        );
        self.check_cancel(*phase)?;

        enter(phase, RunPhase::Dispatching, progress);
        let wire = shapes
            .iter()
            .map(|shape| wire::encode(shape))
            .collect::<Result<Vec<Vec<u8>>>>()?;
        let pool = WorkerPool::new(worker_count(self.config.workers))?;
        report.workers = pool.workers();

        enter(phase, RunPhase::Collecting, progress);
        let mut collector = Collector::new(records, pairs.len());
        let cancel = &self.cancel;
        for chunk in pairs.chunks(self.config.chunk_size.max(1)) {
            // Returns only after every task of the chunk has been collected
            pool.fan_out(
                chunk,
                |pair| evaluate_pair(pair, &wire, cancel),
                |outcome| collector.accept(outcome, store, progress),
            );
            if let Some(e) = collector.error.take() {
                return Err(e);
            }
            self.check_cancel(*phase)?;
        }

        enter(phase, RunPhase::Merged, progress);
        progress.report_cap(RunPhase::Merged.label());
        report.crossing_pairs = collector.crossing_pairs;
        report.crossing_points = collector.crossing_points;
        report.failures = collector.failures;

        *phase = RunPhase::Done;
        log::info!(
            "Checked {} candidate pairs with {} workers: {} crossing pairs, {} failed",
            report.candidate_pairs,
            report.workers,
            report.crossing_pairs,
            report.failures.len()
        );
        Ok(report)
    }

    fn check_cancel(&self, phase: RunPhase) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled(phase))
        } else {
            Ok(())
        }
    }
}

fn enter(phase: &mut RunPhase, next: RunPhase, progress: &mut ProgressTracker<'_>) {
    log::debug!("{} -> {}", phase, next);
    *phase = next;
    let current = progress.current();
    progress.report(current, next.label());
}

/// Runs a default-configured annotator without progress reporting.
pub fn annotate_crossings(store: &mut GeometryStore) -> Result<RunReport> {
    CrossingAnnotator::new().run(store, &mut NullProgress)
}

#[cfg(test)]
#[path = "annotator_tests.rs"]
mod tests;
