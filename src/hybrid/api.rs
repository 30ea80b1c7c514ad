//! Public API for hybrid publishing

pub use crate::hybrid::broker::{HybridBroker, HybridStatus};
pub use crate::hybrid::error::SinkError;
pub use crate::hybrid::jsonl::JsonLinesSink;
pub use crate::hybrid::settings::{QueueMode, SecondarySinkSettings};
pub use crate::hybrid::sink::SecondarySink;
