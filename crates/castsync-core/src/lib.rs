// castsync-core: Owner-context presentation state for cast device synchronization.
//
// Discovery, the network layer, and the user all push changes through a
// `Synchronizer`, which funnels them onto one owner thread via the affinity
// gate. Consumers observe the result through snapshots and `EventStream`.

pub mod collab;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod event;
mod gate;
pub mod log_router;
pub mod model;
pub mod network;
mod state;
pub mod store;
pub mod stream;
pub mod surface;
pub mod synchronizer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collab::{ActionSink, NetworkLayer, NoopActions};
pub use config::{LAG_MAX, Preferences, SynchronizerConfig};
pub use eligibility::is_sync_eligible;
pub use error::CoreError;
pub use event::{PresentationEvent, SyncEvent};
pub use network::SystemNetwork;
pub use state::PresentationSnapshot;
pub use store::{RefreshOutcome, Upserted};
pub use stream::{EventStream, PresentationEventStream};
pub use synchronizer::{Lifecycle, Synchronizer};

pub use model::{
    AdapterId, AddressEntry, DeviceEntry, DeviceId, DeviceState, DeviceView, PresentationHandle,
    RecordingDevice,
};
