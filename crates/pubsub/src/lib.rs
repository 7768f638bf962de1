//! Kafka-compatible trigger bus for castwatch.
//!
//! Two topics, both consumed with plain polling subscribers:
//! - the uploads topic carries JSON notifications for newly stored images;
//! - the trigger topic carries opaque scheduler signals for the weekly
//!   metrics job (the record itself is the signal, payloads are ignored).

pub mod config;
pub mod consumer;
pub mod health;
pub mod messages;

pub use config::*;
pub use consumer::*;
pub use messages::*;
