//! Shared application state threaded through every handler via `State<Arc<AppState>>`,
//! grounded on the teacher's `OpenAIApiState` shape (`src/api/handlers.rs`) —
//! one `Clone`-free struct built once at startup and wrapped in an `Arc`
//! rather than passed as ambient global state (§9 redesign flag).

use crate::prober::ConnectivityProber;
use crate::registry::{ProviderRegistry, SlotRegistry};
use crate::router::SlotRouter;

pub struct AppState {
    pub providers: ProviderRegistry,
    pub slots: SlotRegistry,
    pub router: SlotRouter,
    pub prober: ConnectivityProber,
}

impl AppState {
    pub fn new(providers: ProviderRegistry, slots: SlotRegistry) -> Self {
        let router = SlotRouter::new(slots.clone(), providers.clone());
        Self {
            providers,
            slots,
            router,
            prober: ConnectivityProber::new(),
        }
    }
}
