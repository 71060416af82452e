cfg_if::cfg_if! {
  if #[cfg(unix)] {
    mod symlink;
    mod unix;

    pub use symlink::SymlinkMounter;
    pub use unix::{is_root, BindMounter};
  } else {
    compile_error!("Only cfg(unix) is supported at this time")
  }
}

mod fake;
mod umask;
mod utils;

pub use fake::{FakeAction, FakeMounter, MountPoint};
pub use umask::{with_umask, UmaskGuard};

use static_assertions::assert_impl_all;
use std::{
  io,
  path::{Path, PathBuf},
  result,
};
use thiserror::Error;
use tracing::{info, warn};

pub type Result<T> = result::Result<T, MountError>;

/// The set of operations needed to attach a volume directory at a target
/// path on this node.
pub trait Mounter: Send + Sync {
  /// Attach `source` at `target`. The parent of `target` must exist.
  fn mount(&self, source: &Path, target: &Path) -> Result<()>;

  /// Detach whatever [mount](Mounter::mount) attached at `target`.
  fn unmount(&self, target: &Path) -> Result<()>;

  /// Whether `target` is currently an active mount point. A missing
  /// `target` is not mounted.
  fn is_mounted(&self, target: &Path) -> Result<bool>;

  /// Sets the file-creation mask and returns the previous one. This is
  /// process-wide state, callers should go through [UmaskGuard].
  fn umask(&self, mask: u32) -> u32;
}

#[derive(Debug, Error)]
pub enum MountError {
  #[error("Command failed: {0}")]
  CommandFailed(String, #[source] io::Error),
  #[error("Mount target is in the way: {}", .0.display())]
  TargetExists(PathBuf, #[source] io::Error),
  #[error("Not a symlink: {}", .0.display())]
  NotSymlink(PathBuf),
  #[error("Unknown mount error: {0}")]
  UnknownMountError(
    #[from]
    #[source]
    io::Error,
  ),
}

impl MountError {
  pub(crate) fn new(msg: impl Into<String>) -> Self {
    MountError::UnknownMountError(io::Error::new(io::ErrorKind::Other, msg.into()))
  }
}

/// The mounter picked for this host: real bind mounts when possible,
/// directory symlinks otherwise.
#[derive(Debug)]
pub enum DefaultMounter {
  Bind(BindMounter),
  Symlink(SymlinkMounter),
}

impl DefaultMounter {
  /// Bind mounts need root and the `mount`/`umount` binaries. Anything
  /// else falls back to symlinks into `volumes_root`.
  pub fn detect(volumes_root: impl Into<PathBuf>) -> Self {
    if !unix::is_root() {
      warn!("Not running as root, falling back to symlink mounter");
      return DefaultMounter::Symlink(SymlinkMounter::new(volumes_root));
    }

    match BindMounter::new() {
      Ok(mounter) => {
        info!("Using bind mounter");
        DefaultMounter::Bind(mounter)
      }
      Err(e) => {
        warn!(error = %e, "Bind mounts unavailable, falling back to symlink mounter");
        DefaultMounter::Symlink(SymlinkMounter::new(volumes_root))
      }
    }
  }
}

impl Mounter for DefaultMounter {
  fn mount(&self, source: &Path, target: &Path) -> Result<()> {
    match self {
      DefaultMounter::Bind(m) => m.mount(source, target),
      DefaultMounter::Symlink(m) => m.mount(source, target),
    }
  }

  fn unmount(&self, target: &Path) -> Result<()> {
    match self {
      DefaultMounter::Bind(m) => m.unmount(target),
      DefaultMounter::Symlink(m) => m.unmount(target),
    }
  }

  fn is_mounted(&self, target: &Path) -> Result<bool> {
    match self {
      DefaultMounter::Bind(m) => m.is_mounted(target),
      DefaultMounter::Symlink(m) => m.is_mounted(target),
    }
  }

  fn umask(&self, mask: u32) -> u32 {
    match self {
      DefaultMounter::Bind(m) => m.umask(mask),
      DefaultMounter::Symlink(m) => m.umask(mask),
    }
  }
}

assert_impl_all!(BindMounter: Mounter);
assert_impl_all!(SymlinkMounter: Mounter);
assert_impl_all!(DefaultMounter: Mounter);
assert_impl_all!(FakeMounter: Mounter);
