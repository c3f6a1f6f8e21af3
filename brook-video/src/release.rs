//! Release guard shared by wrapped (non-owning) buffers.

use std::sync::Arc;

/// Fires the stored callback exactly once, when the last clone of the
/// owning buffer drops this guard's final `Arc` reference.
pub(crate) struct ReleaseGuard {
    on_release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ReleaseGuard {
    pub(crate) fn new(on_release: impl FnOnce() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            on_release: Some(Box::new(on_release)),
        })
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(f) = self.on_release.take() {
            f();
        }
    }
}

impl std::fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReleaseGuard")
    }
}
