use thiserror::Error;

pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("malformed timestamp `{input}`: {reason}")]
    MalformedTimestamp { input: String, reason: String },

    #[error("timeline is not sorted: record {index} at {current}s follows {previous}s")]
    UnsortedTimeline {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("step order violated at record {index}: step {current} follows step {previous}")]
    StepOrder {
        index: usize,
        previous: u32,
        current: u32,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid scripted flow: {0}")]
    InvalidFlow(String),

    #[error("store is full (max={capacity}); cannot add more records")]
    StoreFull { capacity: usize },

    #[error("run `{0}` not found")]
    RunNotFound(String),
}
