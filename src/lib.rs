pub mod annotator;
pub mod error;
pub mod index;
pub mod input;
pub mod noding;
pub mod progress;
pub mod shape;
pub mod store;
pub mod utils;
pub mod wire;

pub use annotator::{
    annotate_crossings, AnnotatorConfig, CancelToken, CrossingAnnotator, PairQuery, RunPhase, RunReport,
};
pub use error::{EngineError, Result};
pub use noding::{evaluate, IntersectionResult};
pub use progress::{ChannelProgress, LogProgress, NullProgress, PairFailure, ProgressEvent, ProgressSink};
pub use shape::Shape;
pub use store::{GeometryRecord, GeometryStore};
