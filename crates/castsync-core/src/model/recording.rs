// ── Capture device descriptors ──

use serde::{Deserialize, Serialize};

/// An audio capture endpoint offered for selection.
///
/// Capture itself happens elsewhere; the presentation only lists endpoints
/// and remembers which one the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingDevice {
    pub id: String,
    pub name: String,
}

impl RecordingDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
