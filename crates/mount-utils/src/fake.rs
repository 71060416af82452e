use crate::{MountError, Mounter, Result};
use std::{
  collections::HashMap,
  fs, io,
  path::{Path, PathBuf},
  sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::info;

const DEFAULT_UMASK: u32 = 0o022;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeAction {
  Mount { source: PathBuf, target: PathBuf },
  Unmount { target: PathBuf },
}

/// An entry in the fake mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
  source: PathBuf,
  target: PathBuf,
}

impl MountPoint {
  pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
    MountPoint {
      source: source.into(),
      target: target.into(),
    }
  }

  #[inline]
  pub fn source(&self) -> &Path {
    &self.source
  }

  #[inline]
  pub fn target(&self) -> &Path {
    &self.target
  }
}

type ErrorFactory = Box<dyn Fn() -> MountError + Send>;

struct FakeMounterInner {
  mount_points: Vec<MountPoint>,
  log: Vec<FakeAction>,
  mount_check_errors: HashMap<PathBuf, ErrorFactory>,
  mount_errors: HashMap<PathBuf, ErrorFactory>,
  unmount_errors: HashMap<PathBuf, ErrorFactory>,
  umask: u32,
}

/// An in-memory [Mounter] for tests. Every mount or unmount call is
/// recorded in the log, including calls that fail with an injected error.
///
/// Like the bind mounter, `mount` creates the mount point directory.
pub struct FakeMounter(Mutex<FakeMounterInner>);

impl FakeMounter {
  pub fn new(mps: impl IntoIterator<Item = MountPoint>) -> Self {
    let mount_points = mps.into_iter().collect();
    let inner = FakeMounterInner {
      mount_points,
      log: Vec::new(),
      mount_check_errors: HashMap::new(),
      mount_errors: HashMap::new(),
      unmount_errors: HashMap::new(),
      umask: DEFAULT_UMASK,
    };

    Self(Mutex::new(inner))
  }

  fn inner(&self) -> MutexGuard<'_, FakeMounterInner> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn reset_log(&self) {
    self.inner().log.clear();
  }

  pub fn get_log(&self) -> Vec<FakeAction> {
    self.inner().log.clone()
  }

  pub fn mount_points(&self) -> Vec<MountPoint> {
    self.inner().mount_points.clone()
  }

  pub fn current_umask(&self) -> u32 {
    self.inner().umask
  }

  /// Makes `is_mounted(target)` fail.
  pub fn set_mount_check_error(
    &self,
    target: impl Into<PathBuf>,
    err: impl Fn() -> MountError + Send + 'static,
  ) {
    self
      .inner()
      .mount_check_errors
      .insert(target.into(), Box::new(err));
  }

  /// Makes `mount(_, target)` fail.
  pub fn set_mount_error(
    &self,
    target: impl Into<PathBuf>,
    err: impl Fn() -> MountError + Send + 'static,
  ) {
    self
      .inner()
      .mount_errors
      .insert(target.into(), Box::new(err));
  }

  /// Makes `unmount(target)` fail.
  pub fn set_unmount_error(
    &self,
    target: impl Into<PathBuf>,
    err: impl Fn() -> MountError + Send + 'static,
  ) {
    self
      .inner()
      .unmount_errors
      .insert(target.into(), Box::new(err));
  }
}

impl Mounter for FakeMounter {
  fn mount(&self, source: &Path, target: &Path) -> Result<()> {
    let mut inner = self.inner();
    inner.log.push(FakeAction::Mount {
      source: source.to_owned(),
      target: target.to_owned(),
    });

    if let Some(err_factory) = inner.mount_errors.get(target) {
      return Err(err_factory());
    }

    match fs::create_dir(target) {
      Ok(()) => (),
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => (),
      Err(e) => return Err(e.into()),
    }

    info!(
      "Fake mounter: mounted {} to {}",
      source.display(),
      target.display()
    );
    inner.mount_points.push(MountPoint::new(source, target));
    Ok(())
  }

  fn unmount(&self, target: &Path) -> Result<()> {
    let mut inner = self.inner();
    inner.log.push(FakeAction::Unmount {
      target: target.to_owned(),
    });

    if let Some(err_factory) = inner.unmount_errors.get(target) {
      return Err(err_factory());
    }

    if let Some(i) = inner.mount_points.iter().rposition(|mp| mp.target == target) {
      let mp = inner.mount_points.remove(i);
      info!(
        "Fake mounter: unmounted {} from {}",
        mp.source.display(),
        target.display()
      );
    }

    Ok(())
  }

  fn is_mounted(&self, target: &Path) -> Result<bool> {
    let inner = self.inner();

    if let Some(err_factory) = inner.mount_check_errors.get(target) {
      return Err(err_factory());
    }

    let mounted = inner.mount_points.iter().any(|mp| mp.target == target);
    info!("is_mounted for {}: {}", target.display(), mounted);
    Ok(mounted)
  }

  fn umask(&self, mask: u32) -> u32 {
    std::mem::replace(&mut self.inner().umask, mask)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn mount_and_unmount() {
    let dir = tempdir().expect("failed to get tempdir");
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    let mounter = FakeMounter::new(None);

    mounter.mount(&source, &target).unwrap();
    assert!(target.is_dir());
    assert!(mounter.is_mounted(&target).unwrap());
    assert_eq!(mounter.mount_points(), vec![MountPoint::new(&source, &target)]);

    mounter.unmount(&target).unwrap();
    assert!(!mounter.is_mounted(&target).unwrap());
    assert_eq!(
      mounter.get_log(),
      vec![
        FakeAction::Mount {
          source: source.clone(),
          target: target.clone()
        },
        FakeAction::Unmount { target }
      ]
    );
  }

  #[test]
  fn injected_errors() {
    let mounter = FakeMounter::new(Some(MountPoint::new("/src", "/mnt/a")));
    mounter.set_mount_check_error("/mnt/a", || MountError::new("check"));
    mounter.set_unmount_error("/mnt/a", || MountError::new("unmount"));
    mounter.set_mount_error("/mnt/b", || MountError::new("mount"));

    assert!(mounter.is_mounted(Path::new("/mnt/a")).is_err());
    assert!(mounter.unmount(Path::new("/mnt/a")).is_err());
    assert!(mounter
      .mount(Path::new("/src"), Path::new("/mnt/b"))
      .is_err());

    // failed calls are logged, the table is untouched
    assert_eq!(mounter.get_log().len(), 2);
    assert_eq!(mounter.mount_points().len(), 1);
  }

  #[test]
  fn reset_log() {
    let mounter = FakeMounter::new(None);
    mounter.unmount(Path::new("/not/mounted")).unwrap();
    assert_eq!(mounter.get_log().len(), 1);

    mounter.reset_log();
    assert!(mounter.get_log().is_empty());
  }

  #[test]
  fn umask() {
    let mounter = FakeMounter::new(None);

    assert_eq!(mounter.umask(0), DEFAULT_UMASK);
    assert_eq!(mounter.current_umask(), 0);
    assert_eq!(mounter.umask(DEFAULT_UMASK), 0);
  }
}
