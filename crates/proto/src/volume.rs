use std::{collections::HashMap, fmt};

use crate::proto;

pub type Topology = HashMap<String, String>;

#[derive(Debug)]
pub struct VolumeCapability {
  access_mode: AccessMode,
  access_type: Option<AccessType>,
}

impl VolumeCapability {
  #[inline]
  pub fn new(access_mode: AccessMode, access_type: Option<AccessType>) -> Self {
    VolumeCapability {
      access_mode,
      access_type,
    }
  }

  /// A capability asking for a mounted filesystem with default options.
  pub fn mount(access_mode: AccessMode) -> Self {
    Self::new(access_mode, Some(AccessType::Mount(MountVolume::default())))
  }

  /// A capability asking for a raw block device.
  pub fn block(access_mode: AccessMode) -> Self {
    Self::new(access_mode, Some(AccessType::Block))
  }

  #[inline]
  pub fn access_mode(&self) -> AccessMode {
    self.access_mode
  }

  /// How the volume will be accessed. `None` when the CO left the
  /// `access_type` oneof unset.
  #[inline]
  pub fn access_type(&self) -> Option<&AccessType> {
    self.access_type.as_ref()
  }

  /// The mount parameters, if this is a mount capability.
  pub fn mount_volume(&self) -> Option<&MountVolume> {
    match &self.access_type {
      Some(AccessType::Mount(v)) => Some(v),
      _ => None,
    }
  }
}

impl From<proto::VolumeCapability> for VolumeCapability {
  fn from(value: proto::VolumeCapability) -> Self {
    let access_mode = value
      .access_mode
      .map(AccessMode::from)
      .unwrap_or(AccessMode::Unknown);
    let access_type = value.access_type.map(AccessType::from);

    VolumeCapability {
      access_mode,
      access_type,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessMode {
  Unknown,
  /// Can only be published once as read/write on a single node, at
  /// any given time.
  SingleNodeWriter,
  /// Can only be published once as readonly on a single node, at
  /// any given time.
  SingleNodeReaderOnly,
  /// Can be published as readonly at multiple nodes simultaneously.
  MultiNodeReaderOnly,
  /// Can be published at multiple nodes simultaneously. Only one of
  /// the node can be used as read/write. The rest will be readonly.
  MultiNodeSingleWriter,
  /// Can be published as read/write at multiple nodes
  /// simultaneously.
  MultiNodeMultiWriter,
  /// Can only be published once as read/write at a single workload
  /// on a single node, at any given time.
  SingleNodeSingleWriter,
  /// Can be published as read/write at multiple workloads on a
  /// single node simultaneously.
  SingleNodeMultiWriter,
}

impl From<proto::volume_capability::AccessMode> for AccessMode {
  fn from(value: proto::volume_capability::AccessMode) -> Self {
    use proto::volume_capability::access_mode::Mode;

    match Mode::from_i32(value.mode) {
      Some(Mode::SingleNodeWriter) => AccessMode::SingleNodeWriter,
      Some(Mode::SingleNodeReaderOnly) => AccessMode::SingleNodeReaderOnly,
      Some(Mode::MultiNodeReaderOnly) => AccessMode::MultiNodeReaderOnly,
      Some(Mode::MultiNodeSingleWriter) => AccessMode::MultiNodeSingleWriter,
      Some(Mode::MultiNodeMultiWriter) => AccessMode::MultiNodeMultiWriter,
      Some(Mode::SingleNodeSingleWriter) => AccessMode::SingleNodeSingleWriter,
      Some(Mode::SingleNodeMultiWriter) => AccessMode::SingleNodeMultiWriter,
      Some(Mode::Unknown) | None => AccessMode::Unknown,
    }
  }
}

#[derive(Debug)]
pub enum AccessType {
  /// Indicate that the volume will be accessed via the block device API.
  Block,

  /// Indicate that the volume will be accessed via the filesystem API.
  Mount(MountVolume),
}

impl From<proto::volume_capability::AccessType> for AccessType {
  fn from(value: proto::volume_capability::AccessType) -> Self {
    match value {
      proto::volume_capability::AccessType::Block(_) => AccessType::Block,
      proto::volume_capability::AccessType::Mount(v) => AccessType::Mount(v.into()),
    }
  }
}

#[derive(Default)]
pub struct MountVolume {
  fs_type: Option<String>,
  mount_flags: Vec<String>,
  volume_mount_group: Option<String>,
}

impl MountVolume {
  /// The filesystem type.
  #[inline]
  pub fn fs_type(&self) -> Option<&str> {
    self.fs_type.as_deref()
  }

  /// The mount options that can be used for the volume. `mount_flags`
  /// MAY contain sensitive information and are never logged.
  pub fn mount_flags(&self) -> impl Iterator<Item = &str> + ExactSizeIterator {
    self.mount_flags.iter().map(|v| &**v)
  }

  /// The group the CO wants to be able to access the volume as.
  #[inline]
  pub fn volume_mount_group(&self) -> Option<&str> {
    self.volume_mount_group.as_deref()
  }
}

impl From<proto::volume_capability::MountVolume> for MountVolume {
  fn from(value: proto::volume_capability::MountVolume) -> Self {
    #[inline]
    fn non_empty(v: String) -> Option<String> {
      if v.is_empty() {
        None
      } else {
        Some(v)
      }
    }

    MountVolume {
      fs_type: non_empty(value.fs_type),
      mount_flags: value.mount_flags,
      volume_mount_group: non_empty(value.volume_mount_group),
    }
  }
}

impl fmt::Debug for MountVolume {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MountVolume")
      .field("fs_type", &self.fs_type)
      .field(
        "mount_flags",
        &format!("REDACTED ({} items)", self.mount_flags.len()),
      )
      .field("volume_mount_group", &self.volume_mount_group)
      .finish()
  }
}
