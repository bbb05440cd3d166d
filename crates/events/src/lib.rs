//! Inventory change notifications (mechanics only).
//!
//! The engine publishes one event per committed mutation so that read-only
//! collaborators (pricing, reporting, compliance) can follow stock changes
//! without holding write access to lots.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
