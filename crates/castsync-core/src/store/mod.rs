// ── Owned presentation stores ──
//
// Plain single-owner collections. None of them synchronize internally:
// they are only ever touched from the owner context behind the gate.

mod addresses;
mod recording;
mod registry;

pub use addresses::{AddressTracker, RefreshOutcome};
pub use recording::RecordingDevices;
pub use registry::{DeviceRegistry, Upserted};
