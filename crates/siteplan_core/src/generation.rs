use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing tag for recompute requests.
///
/// Every edit claims a fresh generation; a computation's result may only be
/// applied while its generation is still the latest one handed out. An old
/// computation that happens to finish after a newer one started is dropped
/// no matter when its network call returns.
#[derive(Debug, Default)]
pub struct GenerationGate {
    current: AtomicU64,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next generation, superseding all earlier ones.
    pub fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Whether a result tagged with `generation` is still the latest.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}
