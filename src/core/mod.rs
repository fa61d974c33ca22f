/// Reader, processor and writer abstractions.
pub mod item;

/// Jobs: ordered lists of steps.
pub mod job;

/// Chunk-oriented and tasklet steps.
pub mod step;
