use crate::{unix::process_umask, utils::PathExt, MountError, Mounter, Result};
use std::{
  fs, io,
  os::unix::fs::symlink,
  path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Publishes volumes as directory symlinks. Used where bind mounts are not
/// available, e.g. when not running as root.
///
/// A target counts as mounted when it is a symlink pointing somewhere below
/// `volumes_root`.
#[derive(Debug, Clone)]
pub struct SymlinkMounter {
  volumes_root: PathBuf,
}

impl SymlinkMounter {
  pub fn new(volumes_root: impl Into<PathBuf>) -> Self {
    SymlinkMounter {
      volumes_root: volumes_root.into(),
    }
  }

  #[inline]
  pub fn volumes_root(&self) -> &Path {
    &self.volumes_root
  }
}

impl Mounter for SymlinkMounter {
  fn mount(&self, source: &Path, target: &Path) -> Result<()> {
    match fs::symlink_metadata(target) {
      Ok(meta) if meta.is_dir() => {
        // An empty directory is a plain mount point, it can make room for the link.
        fs::remove_dir(target).map_err(|e| MountError::TargetExists(target.to_owned(), e))?;
        debug!("Removed empty mount point {}", target.display());
      }
      Ok(_) => {
        return Err(MountError::TargetExists(
          target.to_owned(),
          io::Error::from(io::ErrorKind::AlreadyExists),
        ))
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => (),
      Err(e) => return Err(e.into()),
    }

    info!("Linking {} to {}", target.display(), source.display());
    symlink(source, target)?;
    Ok(())
  }

  fn unmount(&self, target: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(target)?;
    if !meta.file_type().is_symlink() {
      return Err(MountError::NotSymlink(target.to_owned()));
    }

    info!("Removing link {}", target.display());
    fs::remove_file(target)?;
    Ok(())
  }

  fn is_mounted(&self, target: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(target) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
      Err(e) => return Err(e.into()),
    };

    if !meta.file_type().is_symlink() {
      return Ok(false);
    }

    let dest = fs::read_link(target)?;
    let dest = match target.parent() {
      Some(parent) if dest.is_relative() => parent.join(dest),
      _ => dest,
    };

    Ok(
      dest
        .strip_resolved_prefix(&self.volumes_root)
        .map(|rest| !rest.as_os_str().is_empty())
        .unwrap_or(false),
    )
  }

  fn umask(&self, mask: u32) -> u32 {
    process_umask(mask)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::{tempdir, TempDir};

  struct Fixture {
    dir: TempDir,
    mounter: SymlinkMounter,
  }

  impl Fixture {
    fn new() -> Self {
      let dir = tempdir().expect("failed to get tempdir");
      let volumes = dir.path().join("volumes");
      fs::create_dir_all(volumes.join("vol-a")).unwrap();
      let mounter = SymlinkMounter::new(volumes);

      Fixture { dir, mounter }
    }

    fn source(&self) -> PathBuf {
      self.mounter.volumes_root().join("vol-a")
    }

    fn target(&self) -> PathBuf {
      self.dir.path().join("target")
    }
  }

  #[test]
  fn mount_creates_link() {
    let f = Fixture::new();

    f.mounter.mount(&f.source(), &f.target()).unwrap();

    assert_eq!(fs::read_link(f.target()).unwrap(), f.source());
    assert!(f.mounter.is_mounted(&f.target()).unwrap());
  }

  #[test]
  fn mount_replaces_empty_dir() {
    let f = Fixture::new();
    fs::create_dir(f.target()).unwrap();

    f.mounter.mount(&f.source(), &f.target()).unwrap();

    assert!(f.mounter.is_mounted(&f.target()).unwrap());
  }

  #[test]
  fn mount_refuses_non_empty_dir() {
    let f = Fixture::new();
    fs::create_dir(f.target()).unwrap();
    fs::write(f.target().join("data"), b"keep").unwrap();

    let err = f.mounter.mount(&f.source(), &f.target()).unwrap_err();

    assert!(matches!(err, MountError::TargetExists(_, _)));
    assert!(f.target().join("data").exists());
  }

  #[test]
  fn mount_refuses_file() {
    let f = Fixture::new();
    fs::write(f.target(), b"keep").unwrap();

    let err = f.mounter.mount(&f.source(), &f.target()).unwrap_err();

    assert!(matches!(err, MountError::TargetExists(_, _)));
  }

  #[test]
  fn unmount_removes_link_only() {
    let f = Fixture::new();
    fs::write(f.source().join("data"), b"keep").unwrap();
    f.mounter.mount(&f.source(), &f.target()).unwrap();

    f.mounter.unmount(&f.target()).unwrap();

    assert!(fs::symlink_metadata(f.target()).is_err());
    assert!(f.source().join("data").exists());
  }

  #[test]
  fn unmount_refuses_dir() {
    let f = Fixture::new();
    fs::create_dir(f.target()).unwrap();

    let err = f.mounter.unmount(&f.target()).unwrap_err();

    assert!(matches!(err, MountError::NotSymlink(_)));
    assert!(f.target().is_dir());
  }

  #[test]
  fn link_outside_volumes_root_is_not_mounted() {
    let f = Fixture::new();
    let elsewhere = f.dir.path().join("elsewhere");
    fs::create_dir(&elsewhere).unwrap();
    symlink(&elsewhere, f.target()).unwrap();

    assert!(!f.mounter.is_mounted(&f.target()).unwrap());
  }

  #[test]
  fn link_to_volumes_root_itself_is_not_mounted() {
    let f = Fixture::new();
    symlink(f.mounter.volumes_root(), f.target()).unwrap();

    assert!(!f.mounter.is_mounted(&f.target()).unwrap());
  }

  #[test]
  fn plain_dir_is_not_mounted() {
    let f = Fixture::new();
    fs::create_dir(f.target()).unwrap();

    assert!(!f.mounter.is_mounted(&f.target()).unwrap());
  }

  #[test]
  fn missing_target_is_not_mounted() {
    let f = Fixture::new();

    assert!(!f.mounter.is_mounted(&f.target()).unwrap());
  }
}
