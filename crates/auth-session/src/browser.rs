//! Browser collaborator seams
//!
//! The coordinator never touches the page context directly; it goes through
//! [`Navigator`] for URL and history manipulation and [`LogoutBroadcast`]
//! for cross-tab logout signalling. Both come with in-process
//! implementations used by tests and native hosts.

use std::sync::Mutex;

use tokio::sync::broadcast;

/// Cross-tab logout notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutSignal;

/// Navigation and history operations on the current page context.
///
/// All methods are synchronous: navigation either takes effect immediately
/// (in-memory implementations) or schedules a page transition that ends the
/// current context anyway.
pub trait Navigator: Send + Sync {
    /// Current client-side navigation fragment, without the leading `#`.
    fn fragment(&self) -> Option<String>;

    /// Replace the fragment, e.g. when restoring the pre-login location.
    fn set_fragment(&self, fragment: &str);

    /// Current query string, without the leading `?`.
    fn query(&self) -> Option<String>;

    /// Full-page navigation to an external URL.
    fn redirect(&self, url: &str);

    /// Replace the current history entry with one without the query
    /// string, scrubbing OAuth response parameters from the visible URL
    /// and from back-navigation.
    fn strip_query(&self);
}

/// Publish/subscribe seam for logout events across tabs.
///
/// Advisory only: each subscriber independently clears its own state; there
/// is no acknowledgement or consensus.
pub trait LogoutBroadcast: Send + Sync {
    fn publish(&self);
    fn subscribe(&self) -> broadcast::Receiver<LogoutSignal>;
}

/// In-process broadcast over a tokio channel. Stands in for the browser's
/// cross-tab messaging; every context in this process sees the signal,
/// including the publisher (clearing twice is harmless).
pub struct ChannelBroadcast {
    sender: broadcast::Sender<LogoutSignal>,
}

impl ChannelBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }
}

impl Default for ChannelBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutBroadcast for ChannelBroadcast {
    fn publish(&self) {
        // No receivers is fine: the only open tab is the one logging out
        let _ = self.sender.send(LogoutSignal);
    }

    fn subscribe(&self) -> broadcast::Receiver<LogoutSignal> {
        self.sender.subscribe()
    }
}

/// In-memory [`Navigator`] for tests and headless hosts. Records redirects
/// and query scrubbing so callers can assert on navigation behavior.
#[derive(Default)]
pub struct StubNavigator {
    fragment: Mutex<Option<String>>,
    query: Mutex<Option<String>>,
    redirects: Mutex<Vec<String>>,
    strip_count: Mutex<u32>,
}

impl StubNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the browser landing on a URL with this query string, the
    /// way an OAuth callback arrives.
    pub fn deliver_query(&self, query: &str) {
        *self.query.lock().expect("navigator lock") = Some(query.to_owned());
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.redirects.lock().expect("navigator lock").last().cloned()
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.lock().expect("navigator lock").len()
    }

    pub fn strip_count(&self) -> u32 {
        *self.strip_count.lock().expect("navigator lock")
    }
}

impl Navigator for StubNavigator {
    fn fragment(&self) -> Option<String> {
        self.fragment.lock().expect("navigator lock").clone()
    }

    fn set_fragment(&self, fragment: &str) {
        *self.fragment.lock().expect("navigator lock") = Some(fragment.to_owned());
    }

    fn query(&self) -> Option<String> {
        self.query.lock().expect("navigator lock").clone()
    }

    fn redirect(&self, url: &str) {
        self.redirects.lock().expect("navigator lock").push(url.to_owned());
    }

    fn strip_query(&self) {
        *self.query.lock().expect("navigator lock") = None;
        *self.strip_count.lock().expect("navigator lock") += 1;
    }
}
