pub mod provider;
pub mod routing;
pub mod slot;

pub use provider::Provider;
pub use routing::{AttemptRecord, FailoverTrace, RoutingDecision};
pub use slot::{ModelSlot, SlotType};
