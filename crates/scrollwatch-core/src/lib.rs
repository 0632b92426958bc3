//! Scan engine for unacknowledged marked messages in a chat guild.
//!
//! Enumerates channels and threads through a [`ChatSource`], classifies recent
//! messages against the marker and acknowledgement rules, and collects the
//! survivors into a capped, ordered [`ScanReport`].
//!
//! ```rust
//! use scrollwatch_core::build_preview;
//!
//! assert_eq!(build_preview("📜 pickup\nneeded"), "📜 pickup needed");
//! assert_eq!(build_preview("   "), "(no text)");
//! ```

pub mod chat_source;
pub mod container_enumerator;
pub mod container_filter;
pub mod delivery_phrase;
pub mod memory_chat_source;
pub mod message_classifier;
pub mod result_formatter;
pub mod scan_config;
pub mod scan_model;
pub mod scan_orchestrator;

pub use chat_source::*;
pub use container_enumerator::ContainerEnumerator;
pub use container_filter::container_passes;
pub use delivery_phrase::{DeliveryPhraseMatcher, DeliverySlot, REFERENCE_TIME_ZONE};
pub use memory_chat_source::InMemoryChatSource;
pub use message_classifier::{MatchDecision, MessageClassifier};
pub use result_formatter::*;
pub use scan_config::*;
pub use scan_model::*;
pub use scan_orchestrator::*;
