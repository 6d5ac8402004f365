use std::sync::atomic::{AtomicBool, Ordering};

/// A single "busy" flag that can be claimed by at most one task at a time.
///
/// Unlike [`SingleFlight`](crate::SingleFlight), late arrivals don't wait for
/// the running task: [`try_begin()`](Self::try_begin) simply returns `None`
/// and the caller is expected to skip its work.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}
impl InFlight {
    pub const fn new() -> Self {
        Self { busy: AtomicBool::new(false) }
    }

    /// Claim the flag. The returned guard releases it when dropped.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the owning [`InFlight`] flag on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    busy: &'a AtomicBool,
}
impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
