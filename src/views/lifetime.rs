use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Binds in-flight requests to the visible lifetime of a view. Once the view
/// is unmounted, pending calls are dropped and their results never reach the
/// view's state.
#[derive(Clone)]
pub struct ViewLifetime {
    mounted: Arc<watch::Sender<bool>>,
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewLifetime {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self {
            mounted: Arc::new(tx),
        }
    }

    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }

    pub fn unmount(&self) {
        self.mounted.send_replace(false);
    }

    pub fn remount(&self) {
        self.mounted.send_replace(true);
    }

    /// Runs `fut` unless the view goes away first, in which case `fut` is
    /// dropped and `None` is returned.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.mounted.subscribe();
        if !*rx.borrow_and_update() {
            return None;
        }
        tokio::select! {
            biased;
            _ = rx.wait_for(|mounted| !*mounted) => None,
            out = fut => Some(out),
        }
    }
}
