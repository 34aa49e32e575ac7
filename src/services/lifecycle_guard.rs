//! Session validity gate.
//!
//! The host runtime owns the validity flag: when the extension is reloaded or
//! updated while scripts are still attached to a page, the flag flips to
//! invalid and every privileged call (storage, messaging, resource URLs) must
//! short-circuit instead of reaching the runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Side-effect-free probe of whether privileged operations are still allowed.
pub trait LifecycleGuard: Send + Sync {
    fn is_valid(&self) -> bool;
}

/// Cloneable capability handed to every component needing privileged access.
///
/// Clones share one flag, so invalidating through any clone is observed by all.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    valid: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Creates a handle for a live session.
    pub fn new() -> Self {
        Self {
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Marks the session as gone. Called by the host runtime, never by core code.
    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::SeqCst) {
            debug!("session invalidated");
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGuard for SessionHandle {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

/// Resolves bundled resource paths to URLs the page can load.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    base_url: String,
    session: SessionHandle,
}

impl ResourceResolver {
    /// `base_url` is the extension origin, e.g. `chrome-extension://<id>/`.
    pub fn new(base_url: &str, session: SessionHandle) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Self { base_url, session }
    }

    /// Returns the URL for `path`, or `None` once the session is invalid.
    pub fn resolve(&self, path: &str) -> Option<String> {
        if !self.session.is_valid() {
            debug!(path, "resource lookup skipped: session invalid");
            return None;
        }
        Some(format!("{}{}", self.base_url, path.trim_start_matches('/')))
    }
}
