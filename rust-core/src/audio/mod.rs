//! Sample delivery into the analyzer

pub mod buffer;

pub use buffer::{SampleFeed, SampleReader, SampleWriter};
