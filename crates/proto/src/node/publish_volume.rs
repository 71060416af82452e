use super::VolumeCapability;
use crate::{proto, secrets::Secrets};
use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};
use thiserror::Error;
use tonic::{Code, Status};

/// A `NodePublishVolume` request. Fields are taken over as sent; deciding
/// whether a missing field is an error is up to the [NodeService](super::NodeService).
#[derive(Debug)]
pub struct NodePublishVolumeRequest {
  volume_id: String,
  staging_target_path: Option<PathBuf>,
  target_path: PathBuf,
  volume_capability: Option<VolumeCapability>,
  readonly: bool,
  secrets: Secrets,
}

impl NodePublishVolumeRequest {
  /// The ID of the volume to publish. This field is REQUIRED.
  #[inline]
  pub fn volume_id(&self) -> &str {
    &self.volume_id
  }

  /// The path to which the volume was staged by `NodeStageVolume`.
  #[inline]
  pub fn staging_target_path(&self) -> Option<&Path> {
    self.staging_target_path.as_deref()
  }

  /// The path to which the volume will be published. It MUST be an
  /// absolute path in the root filesystem of the process serving this
  /// request. Creation of target_path is the responsibility of the SP.
  /// This is a REQUIRED field.
  #[inline]
  pub fn target_path(&self) -> &Path {
    &self.target_path
  }

  /// Volume capability describing how the CO intends to use this volume.
  /// This is a REQUIRED field.
  #[inline]
  pub fn volume_capability(&self) -> Option<&VolumeCapability> {
    self.volume_capability.as_ref()
  }

  /// Indicates SP MUST publish the volume in readonly mode.
  #[inline]
  pub fn readonly(&self) -> bool {
    self.readonly
  }

  /// Secrets required by plugin to complete node publish volume request.
  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }
}

impl From<proto::NodePublishVolumeRequest> for NodePublishVolumeRequest {
  fn from(value: proto::NodePublishVolumeRequest) -> Self {
    let staging_target_path = match value.staging_target_path {
      v if v.is_empty() => None,
      v => Some(PathBuf::from(v)),
    };

    NodePublishVolumeRequest {
      volume_id: value.volume_id,
      staging_target_path,
      target_path: PathBuf::from(value.target_path),
      volume_capability: value.volume_capability.map(Into::into),
      readonly: value.readonly,
      secrets: value.secrets.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum NodePublishVolumeError {
  /// The request is malformed. Nothing was changed on the node.
  #[error("{0}")]
  InvalidArgument(String),

  /// An operation on the node failed.
  #[error("{0}")]
  Internal(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] Status),
}

impl From<NodePublishVolumeError> for Status {
  fn from(value: NodePublishVolumeError) -> Self {
    match value {
      NodePublishVolumeError::InvalidArgument(msg) => Status::new(Code::InvalidArgument, msg),
      NodePublishVolumeError::Internal(msg) => Status::new(Code::Internal, msg),
      NodePublishVolumeError::Other(v) => v,
    }
  }
}
