//! Domain events and the publish/subscribe channel they travel on.
//!
//! The ledger never knows who listens. Store operations emit a [`LedgerEvent`]
//! after their unit of work commits; UI refreshers, loggers or a future
//! replicator attach through [`EventBus::subscribe`].

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod ledger_event;
pub mod publisher;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use ledger_event::{LedgerEvent, ReferenceKind};
pub use publisher::{EventPublisher, NoopPublisher};
