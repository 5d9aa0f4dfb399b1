pub mod providers;
pub mod slots;

pub use providers::ProviderRegistry;
pub use slots::SlotRegistry;
