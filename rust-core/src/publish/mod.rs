//! Publication of spectrum results to other threads

pub mod hub;
pub mod publisher;

pub use hub::{SpectrumEvent, SpectrumFrame, SpectrumHub, Subscription, DEFAULT_SUBSCRIBER_CAPACITY};
pub use publisher::{SpectrumControl, SpectrumPublisher};
