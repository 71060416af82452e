use crate::NodeError;
use csi_mount_utils::{with_umask, Mounter};
use csi_proto::node::VolumeCapability;
use std::{
  fs::{self, DirBuilder},
  io,
  os::unix::fs::DirBuilderExt,
  path::{Component, Path, PathBuf},
};
use tracing::{debug, error, info, instrument};

type Result<T> = std::result::Result<T, NodeError>;

/// Mask held while creating volume directories and mount points.
const RELAXED_UMASK: u32 = 0o000;
const VOLUME_DIR_MODE: u32 = 0o777;

/// Attaches `<volumes_root>/<volume_id>` at the target paths the CO asks
/// for, and detaches it again.
///
/// Nothing is remembered between calls. Whether a target is published is
/// asked from the [Mounter] every time, so a restarted plugin picks up
/// where the previous one left off.
#[derive(Debug)]
pub struct NodePublisher<M> {
  volumes_root: PathBuf,
  mounter: M,
}

impl<M: Mounter> NodePublisher<M> {
  pub fn new(volumes_root: impl Into<PathBuf>, mounter: M) -> Self {
    NodePublisher {
      volumes_root: volumes_root.into(),
      mounter,
    }
  }

  #[inline]
  pub fn volumes_root(&self) -> &Path {
    &self.volumes_root
  }

  #[inline]
  pub fn mounter(&self) -> &M {
    &self.mounter
  }

  /// Makes the volume directory available at `target_path`.
  ///
  /// An existing mount at `target_path` is always unmounted first, so a
  /// target left pointing at some other source is corrected.
  #[instrument(skip(self, target_path, capability), fields(target_path = %target_path.display()))]
  pub fn publish(
    &self,
    volume_id: &str,
    target_path: &Path,
    capability: Option<&VolumeCapability>,
  ) -> Result<()> {
    if volume_id.is_empty() {
      return Err(NodeError::MissingVolumeId);
    }

    let capability = capability.ok_or(NodeError::MissingCapability)?;
    if capability.mount_volume().is_none() {
      return Err(NodeError::NotMountCapability);
    }

    if target_path.as_os_str().is_empty() {
      return Err(NodeError::MissingTargetPath);
    }

    let source = self.volume_path(volume_id)?;
    self.create_volume_dir(&source)?;

    if self.is_mounted(target_path)? {
      info!("Target is already mounted, remounting");
      self.unmount(target_path)?;
    }

    if let Some(parent) = target_path.parent() {
      with_umask(&self.mounter, RELAXED_UMASK, || fs::create_dir_all(parent)).map_err(|e| {
        error!(error = %e, "Error creating volume mount directory {}", parent.display());
        NodeError::CreateMountDir
      })?;
    }

    with_umask(&self.mounter, RELAXED_UMASK, || {
      self.mounter.mount(&source, target_path)
    })
    .map_err(|e| {
      error!(error = %e, "Error mounting volume");
      NodeError::Mount
    })?;

    info!("Volume {} mounted from {}", volume_id, source.display());
    Ok(())
  }

  /// Detaches whatever is mounted at `target_path` and removes the mount
  /// point. A target that is not mounted is left alone.
  #[instrument(skip(self, target_path), fields(target_path = %target_path.display()))]
  pub fn unpublish(&self, volume_id: &str, target_path: &Path) -> Result<()> {
    if volume_id.is_empty() {
      return Err(NodeError::MissingVolumeId);
    }

    if target_path.as_os_str().is_empty() {
      return Err(NodeError::MissingTargetPath);
    }

    if !self.is_mounted(target_path)? {
      info!("Target is not mounted, nothing to do");
      return Ok(());
    }

    self.unmount(target_path)?;

    remove_mount_point(target_path).map_err(|e| {
      error!(error = %e, "Error removing volume mount directory");
      NodeError::RemoveMountDir
    })?;

    info!("Volume {} unmounted", volume_id);
    Ok(())
  }

  /// The volume ID ends up as a directory name, so it must be exactly one
  /// plain path segment.
  fn volume_path(&self, volume_id: &str) -> Result<PathBuf> {
    if volume_id.contains('/') {
      return Err(NodeError::InvalidVolumeId);
    }

    let mut components = Path::new(volume_id).components();
    match (components.next(), components.next()) {
      (Some(Component::Normal(segment)), None) => Ok(self.volumes_root.join(segment)),
      _ => Err(NodeError::InvalidVolumeId),
    }
  }

  fn create_volume_dir(&self, path: &Path) -> Result<()> {
    with_umask(&self.mounter, RELAXED_UMASK, || {
      DirBuilder::new()
        .recursive(true)
        .mode(VOLUME_DIR_MODE)
        .create(path)
    })
    .map_err(|e| {
      error!(error = %e, "Error creating volume directory {}", path.display());
      NodeError::CreateVolumeDir
    })
  }

  fn is_mounted(&self, target_path: &Path) -> Result<bool> {
    self.mounter.is_mounted(target_path).map_err(|e| {
      error!(error = %e, "Error checking if volume is mounted");
      NodeError::MountCheck
    })
  }

  fn unmount(&self, target_path: &Path) -> Result<()> {
    self.mounter.unmount(target_path).map_err(|e| {
      error!(error = %e, "Error unmounting volume");
      NodeError::Unmount
    })
  }
}

/// Directories are removed like `rmdir`, anything else is unlinked. Some
/// mounters already removed the entry when unmounting.
fn remove_mount_point(path: &Path) -> io::Result<()> {
  let result = match fs::symlink_metadata(path) {
    Ok(meta) if meta.is_dir() => fs::remove_dir(path),
    Ok(_) => fs::remove_file(path),
    Err(e) => Err(e),
  };

  match result {
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!("Mount point {} already gone", path.display());
      Ok(())
    }
    result => result,
  }
}
