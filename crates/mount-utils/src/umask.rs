use crate::Mounter;
use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// The file-creation mask belongs to the process, so every change to it
/// goes through this lock.
static UMASK_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Holds a file-creation mask set through a [Mounter] until dropped, then
/// restores the previous mask.
///
/// Guards are serialized process-wide. Keep them scoped to the calls that
/// create files, and do not nest them on one thread.
pub struct UmaskGuard<'a, M: Mounter + ?Sized> {
  mounter: &'a M,
  old_mask: u32,
  _lock: MutexGuard<'static, ()>,
}

impl<'a, M: Mounter + ?Sized> UmaskGuard<'a, M> {
  pub fn acquire(mounter: &'a M, mask: u32) -> Self {
    // A panic while holding the lock still restored the mask on unwind.
    let lock = UMASK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let old_mask = mounter.umask(mask);
    trace!("umask {:03o} -> {:03o}", old_mask, mask);

    UmaskGuard {
      mounter,
      old_mask,
      _lock: lock,
    }
  }

  /// The mask that will be restored on drop.
  #[inline]
  pub fn old_mask(&self) -> u32 {
    self.old_mask
  }
}

impl<'a, M: Mounter + ?Sized> Drop for UmaskGuard<'a, M> {
  fn drop(&mut self) {
    self.mounter.umask(self.old_mask);
    trace!("umask restored to {:03o}", self.old_mask);
  }
}

/// Runs `f` with `mask` as the file-creation mask.
pub fn with_umask<M, F, T>(mounter: &M, mask: u32, f: F) -> T
where
  M: Mounter + ?Sized,
  F: FnOnce() -> T,
{
  let _guard = UmaskGuard::acquire(mounter, mask);
  f()
}
