// ── Local address tracker ──
//
// Snapshot of the usable local addresses plus the one currently selected
// for serving streams. Each refresh reconciles against the latest
// enumeration: new addresses are appended, vanished ones are pruned, and
// a selection that no longer exists is replaced by the default address.

use std::net::IpAddr;

use tracing::debug;

use crate::error::CoreError;
use crate::model::AddressEntry;

/// What a [`AddressTracker::refresh`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub snapshot: Vec<AddressEntry>,
    pub selection: Option<IpAddr>,
    pub added: Vec<IpAddr>,
    pub removed: Vec<IpAddr>,
    /// Still tracked, but now reported on a different adapter.
    pub moved: Vec<IpAddr>,
    /// The selection differs from the one held before the refresh.
    pub reselected: bool,
}

impl RefreshOutcome {
    pub fn changed(&self) -> bool {
        self.reselected || !self.added.is_empty() || !self.removed.is_empty() || !self.moved.is_empty()
    }
}

/// Tracked local addresses and the active selection.
#[derive(Debug, Default)]
pub struct AddressTracker {
    tracked: Vec<AddressEntry>,
    selection: Option<IpAddr>,
}

impl AddressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against `enumerated`.
    ///
    /// `resolve_default` is only consulted when `previously_selected` is
    /// absent from the new snapshot and the snapshot is not empty. If it
    /// names an address that is not tracked, the first tracked address is
    /// selected instead so the selection never points at a stale value.
    pub fn refresh(
        &mut self,
        enumerated: &[AddressEntry],
        previously_selected: Option<IpAddr>,
        resolve_default: impl FnOnce() -> Option<IpAddr>,
    ) -> RefreshOutcome {
        let mut added = Vec::new();
        let mut moved = Vec::new();
        let mut seen: Vec<IpAddr> = Vec::with_capacity(enumerated.len());
        for entry in enumerated {
            // An address listed twice keeps its first adapter.
            if seen.contains(&entry.address) {
                continue;
            }
            seen.push(entry.address);

            match self.tracked.iter_mut().find(|t| t.address == entry.address) {
                Some(tracked) => {
                    if tracked.adapter != entry.adapter {
                        tracked.adapter = entry.adapter.clone();
                        moved.push(entry.address);
                    }
                }
                None => {
                    added.push(entry.address);
                    self.tracked.push(entry.clone());
                }
            }
        }

        let mut removed = Vec::new();
        self.tracked.retain(|entry| {
            let keep = seen.contains(&entry.address);
            if !keep {
                removed.push(entry.address);
            }
            keep
        });

        let selection = match previously_selected {
            Some(previous) if self.contains(previous) => Some(previous),
            _ if self.tracked.is_empty() => None,
            _ => {
                let resolved = resolve_default();
                match resolved {
                    Some(address) if self.contains(address) => Some(address),
                    other => {
                        debug!(resolved = ?other, "default address not tracked, using first entry");
                        self.tracked.first().map(|entry| entry.address)
                    }
                }
            }
        };

        let reselected = selection != self.selection;
        self.selection = selection;

        if !added.is_empty() || !removed.is_empty() || !moved.is_empty() {
            debug!(?added, ?removed, ?moved, ?selection, "address snapshot reconciled");
        }

        RefreshOutcome {
            snapshot: self.tracked.clone(),
            selection,
            added,
            removed,
            moved,
            reselected,
        }
    }

    /// Select a tracked address on the user's behalf.
    pub fn select(&mut self, address: IpAddr) -> Result<bool, CoreError> {
        if !self.contains(address) {
            return Err(CoreError::AddressNotTracked { address });
        }
        let changed = self.selection != Some(address);
        self.selection = Some(address);
        Ok(changed)
    }

    pub fn selection(&self) -> Option<IpAddr> {
        self.selection
    }

    pub fn snapshot(&self) -> &[AddressEntry] {
        &self.tracked
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        self.tracked.iter().any(|entry| entry.address == address)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn entries(addrs: &[&str]) -> Vec<AddressEntry> {
        addrs.iter().map(|a| AddressEntry::new(ip(a), "eth0")).collect()
    }

    fn addresses(outcome: &RefreshOutcome) -> Vec<IpAddr> {
        outcome.snapshot.iter().map(|e| e.address).collect()
    }

    #[test]
    fn stale_selection_is_replaced_by_default() {
        let mut tracker = AddressTracker::new();
        tracker.refresh(&entries(&["10.0.0.2"]), None, || Some(ip("10.0.0.2")));
        assert_eq!(tracker.selection(), Some(ip("10.0.0.2")));

        let outcome = tracker.refresh(&entries(&["10.0.0.5"]), Some(ip("10.0.0.2")), || {
            Some(ip("10.0.0.5"))
        });

        assert_eq!(addresses(&outcome), vec![ip("10.0.0.5")]);
        assert_eq!(outcome.selection, Some(ip("10.0.0.5")));
        assert_eq!(outcome.removed, vec![ip("10.0.0.2")]);
        assert_eq!(outcome.added, vec![ip("10.0.0.5")]);
        assert!(outcome.reselected);
    }

    #[test]
    fn valid_selection_is_kept_without_consulting_resolver() {
        let mut tracker = AddressTracker::new();
        tracker.refresh(&entries(&["10.0.0.2", "192.168.1.4"]), None, || {
            Some(ip("10.0.0.2"))
        });

        let outcome = tracker.refresh(
            &entries(&["192.168.1.4", "10.0.0.2", "172.16.0.9"]),
            Some(ip("192.168.1.4")),
            || panic!("resolver must not be called"),
        );

        assert_eq!(outcome.selection, Some(ip("192.168.1.4")));
        assert_eq!(outcome.added, vec![ip("172.16.0.9")]);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut tracker = AddressTracker::new();
        let snapshot = entries(&["10.0.0.2", "10.0.0.3"]);
        let first = tracker.refresh(&snapshot, None, || Some(ip("10.0.0.3")));
        let second = tracker.refresh(&snapshot, first.selection, || Some(ip("10.0.0.2")));

        assert_eq!(first.snapshot, second.snapshot);
        assert_eq!(first.selection, second.selection);
        assert!(!second.changed());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn adapter_follows_latest_enumeration() {
        let mut tracker = AddressTracker::new();
        tracker.refresh(&entries(&["10.0.0.2"]), None, || Some(ip("10.0.0.2")));

        let outcome = tracker.refresh(
            &[AddressEntry::new(ip("10.0.0.2"), "wlan0")],
            Some(ip("10.0.0.2")),
            || None,
        );

        assert_eq!(outcome.snapshot[0].adapter.as_str(), "wlan0");
        assert_eq!(outcome.moved, vec![ip("10.0.0.2")]);
        assert!(outcome.changed());
        assert_eq!(outcome.selection, Some(ip("10.0.0.2")));
    }

    #[test]
    fn duplicate_enumeration_entries_are_tracked_once() {
        let mut tracker = AddressTracker::new();
        let outcome = tracker.refresh(&entries(&["10.0.0.2", "10.0.0.2"]), None, || {
            Some(ip("10.0.0.2"))
        });
        assert_eq!(addresses(&outcome), vec![ip("10.0.0.2")]);
    }

    #[test]
    fn empty_enumeration_clears_snapshot_and_selection() {
        let mut tracker = AddressTracker::new();
        tracker.refresh(&entries(&["10.0.0.2"]), None, || Some(ip("10.0.0.2")));

        let outcome = tracker.refresh(&[], Some(ip("10.0.0.2")), || Some(ip("10.0.0.2")));

        assert!(outcome.snapshot.is_empty());
        assert_eq!(outcome.selection, None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn untracked_default_falls_back_to_first_entry() {
        let mut tracker = AddressTracker::new();
        let outcome = tracker.refresh(&entries(&["10.0.0.7", "10.0.0.8"]), None, || {
            Some(ip("8.8.8.8"))
        });
        assert_eq!(outcome.selection, Some(ip("10.0.0.7")));
    }

    #[test]
    fn user_selection_must_be_tracked() {
        let mut tracker = AddressTracker::new();
        tracker.refresh(&entries(&["10.0.0.2", "10.0.0.3"]), None, || {
            Some(ip("10.0.0.2"))
        });

        assert!(tracker.select(ip("10.0.0.3")).unwrap());
        assert!(!tracker.select(ip("10.0.0.3")).unwrap());
        let err = tracker.select(ip("10.9.9.9")).unwrap_err();
        assert!(matches!(err, CoreError::AddressNotTracked { .. }));
        assert_eq!(tracker.selection(), Some(ip("10.0.0.3")));
    }
}
