//! EmbPulse - embedding-bag lookup benchmark
//!
//! EmbPulse generates synthetic sparse-embedding lookup requests (the
//! indices, offsets and per-sample weights a batched embedding-bag operator
//! consumes) and drives an operator through timed forward/backward rounds.
//!
//! # Architecture
//!
//! - **Input iteration**: declared axes expand into `(batch_size, pooling_factor)` configs
//! - **Index distributions**: linear, uniform and Zipf-skewed row selection
//! - **Override tensors**: replay precomputed batches from disk
//! - **Operator wrapper**: build/forward/backward/cleanup lifecycle around a kernel
//! - **Latency stats**: HdrHistogram percentiles, text and JSON reports

pub mod bench;
pub mod config;
pub mod distribution;
pub mod error;
pub mod iterator;
pub mod operator;
pub mod output;
pub mod registry;
pub mod request;
pub mod stats;
pub mod tensor;

pub use config::BenchConfig;
pub use operator::EmbeddingBagOperator;

/// Result type used throughout EmbPulse
pub type Result<T> = anyhow::Result<T>;
