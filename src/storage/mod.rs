//! Persistence boundaries for matches, messages, and the queue audit journal
//!
//! The stores behind these traits are external collaborators; this crate
//! ships in-memory implementations used as the process-local write-through
//! targets and as test doubles.

pub mod journal;
pub mod matches;
pub mod messages;

// Re-export commonly used types
pub use journal::{InMemoryQueueJournal, QueueAuditEvent, QueueJournal};
pub use matches::{InMemoryMatchLedger, MatchLedger, MockMatchLedger};
pub use messages::{InMemoryMessageStore, MessageStore, MockMessageStore};
