// ── Log routing ──
//
// Messages from the streaming side end up in one of two places: keep-alive
// chatter (Cast PING/PONG frames) only refreshes a timestamp, everything
// else is appended to the transcript the user can read and copy.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Substrings that mark a keep-alive frame. Matched literally.
pub const KEEPALIVE_MARKERS: [&str; 2] = [r#""type":"PONG""#, r#""type":"PING""#];

/// Prefix of the keep-alive indicator text.
pub const KEEPALIVE_LABEL: &str = "Latest keep-alive message:";

/// Appended after every transcript entry.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Where a message was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRoute {
    KeepAlive,
    Transcript,
}

/// Decide where a message goes without touching any state.
pub fn classify(message: &str) -> LogRoute {
    if KEEPALIVE_MARKERS.iter().any(|marker| message.contains(marker)) {
        LogRoute::KeepAlive
    } else {
        LogRoute::Transcript
    }
}

/// Transcript plus keep-alive indicator.
#[derive(Debug)]
pub struct LogRouter {
    transcript: String,
    /// Byte length of each entry in `transcript`, separator included.
    entries: VecDeque<usize>,
    limit: usize,
    last_keep_alive: Option<DateTime<Local>>,
}

impl LogRouter {
    pub fn new(limit: usize) -> Self {
        Self {
            transcript: String::new(),
            entries: VecDeque::new(),
            limit,
            last_keep_alive: None,
        }
    }

    /// Route one message, stamping keep-alives with `now`.
    pub fn route(&mut self, message: &str, now: DateTime<Local>) -> LogRoute {
        let route = classify(message);
        match route {
            LogRoute::KeepAlive => self.last_keep_alive = Some(now),
            LogRoute::Transcript => {
                self.transcript.push_str(message);
                self.transcript.push_str(ENTRY_SEPARATOR);
                self.entries.push_back(message.len() + ENTRY_SEPARATOR.len());
                self.trim_to_limit();
            }
        }
        route
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn last_keep_alive(&self) -> Option<DateTime<Local>> {
        self.last_keep_alive
    }

    /// Indicator text, e.g. `Latest keep-alive message:21:04:17`.
    pub fn keep_alive_label(&self) -> Option<String> {
        self.last_keep_alive
            .map(|at| format!("{KEEPALIVE_LABEL}{}", at.format("%H:%M:%S")))
    }

    // Drop whole entries from the front; the newest entry always survives.
    fn trim_to_limit(&mut self) {
        while self.transcript.len() > self.limit && self.entries.len() > 1 {
            let Some(oldest) = self.entries.pop_front() else {
                break;
            };
            self.transcript.drain(..oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, h, m, s)
            .single()
            .unwrap_or_else(Local::now)
    }

    #[test]
    fn ping_goes_to_keep_alive_path() {
        let mut router = LogRouter::new(1024);
        let route = router.route(r#"{"type":"PING"}"#, at(9, 30, 5));

        assert_eq!(route, LogRoute::KeepAlive);
        assert_eq!(router.transcript(), "");
        assert!(router.keep_alive_label().is_some_and(|l| l.starts_with(KEEPALIVE_LABEL)));
    }

    #[test]
    fn pong_embedded_in_larger_frame_is_keep_alive() {
        assert_eq!(
            classify(r#"Received: {"requestId":0,"type":"PONG"}"#),
            LogRoute::KeepAlive
        );
    }

    #[test]
    fn spaced_marker_is_not_keep_alive() {
        assert_eq!(classify(r#"{"type": "PING"}"#), LogRoute::Transcript);
        assert_eq!(classify(r#"{"type":"ping"}"#), LogRoute::Transcript);
    }

    #[test]
    fn plain_message_is_appended_with_blank_line() {
        let mut router = LogRouter::new(1024);
        router.route("hello", at(10, 0, 0));
        router.route("world", at(10, 0, 1));

        assert_eq!(router.transcript(), "hello\n\nworld\n\n");
        assert!(router.last_keep_alive().is_none());
    }

    #[test]
    fn transcript_drops_oldest_entries_past_limit() {
        let mut router = LogRouter::new(10);
        router.route("first", at(10, 0, 0));
        router.route("second", at(10, 0, 0));
        router.route("third", at(10, 0, 0));

        assert_eq!(router.transcript(), "third\n\n");
    }

    #[test]
    fn trimming_keeps_multi_paragraph_entries_whole() {
        let mut router = LogRouter::new(24);
        router.route("head\n\ntail", at(10, 0, 0));
        router.route("next", at(10, 0, 0));
        assert_eq!(router.transcript(), "head\n\ntail\n\nnext\n\n");

        router.route("last one", at(10, 0, 0));
        assert_eq!(router.transcript(), "next\n\nlast one\n\n");
    }

    #[test]
    fn oversized_single_entry_is_kept() {
        let mut router = LogRouter::new(4);
        router.route("a long message", at(10, 0, 0));
        assert_eq!(router.transcript(), "a long message\n\n");
    }
}
