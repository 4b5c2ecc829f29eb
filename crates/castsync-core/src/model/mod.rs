// ── Presentation domain model ──
//
// Plain data carried between collaborators and the owner context. Nothing
// here knows about threads; ownership rules live in the gate.

pub mod address;
pub mod device;
pub mod device_id;
pub mod recording;

pub use address::{AdapterId, AddressEntry};
pub use device::{DeviceEntry, DeviceState, DeviceView, PresentationHandle};
pub use device_id::DeviceId;
pub use recording::RecordingDevice;
