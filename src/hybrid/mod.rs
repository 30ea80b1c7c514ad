//! Hybrid publishing
//!
//! Wraps the in-memory broker so that one publish call can also be copied to
//! a secondary sink, chosen at startup by the queue mode. The broker core
//! never refers to a concrete sink type.
//!
//! ```text
//!                         ┌──► MessageBroker::publish_message   (use-in-memory)
//! HybridBroker::publish ──┤
//!                         └──► dyn SecondarySink::publish        (use-secondary)
//! ```

mod broker;
mod error;
mod jsonl;
mod settings;
mod sink;

pub mod api;
