// ── Sync eligibility ──

/// Synchronized multi-device playback only makes sense with more than one device.
pub const fn is_sync_eligible(device_count: usize) -> bool {
    device_count > 1
}
