use csi_proto::node::{NodePublishVolumeError, NodeUnpublishVolumeError};
use thiserror::Error;
use tonic::Code;

/// Why a publish or unpublish failed. The message of each variant is what
/// the CO sees, the underlying cause is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NodeError {
  #[error("Volume ID is missing in request")]
  MissingVolumeId,
  #[error("Volume capability is missing in request")]
  MissingCapability,
  #[error("Volume mount capability is not specified")]
  NotMountCapability,
  #[error("Mount path is missing in request")]
  MissingTargetPath,
  #[error("Volume ID is not a valid path segment")]
  InvalidVolumeId,

  #[error("Error creating volume directory")]
  CreateVolumeDir,
  #[error("Error checking if volume is mounted")]
  MountCheck,
  #[error("Error unmounting volume")]
  Unmount,
  #[error("Error creating volume mount directory")]
  CreateMountDir,
  #[error("Error mounting volume")]
  Mount,
  #[error("Error removing volume mount directory")]
  RemoveMountDir,
  #[error("Request was cancelled")]
  Cancelled,
}

impl NodeError {
  pub fn code(&self) -> Code {
    match self {
      NodeError::MissingVolumeId
      | NodeError::MissingCapability
      | NodeError::NotMountCapability
      | NodeError::MissingTargetPath
      | NodeError::InvalidVolumeId => Code::InvalidArgument,
      _ => Code::Internal,
    }
  }
}

impl From<NodeError> for NodePublishVolumeError {
  fn from(value: NodeError) -> Self {
    match value.code() {
      Code::InvalidArgument => NodePublishVolumeError::InvalidArgument(value.to_string()),
      _ => NodePublishVolumeError::Internal(value.to_string()),
    }
  }
}

impl From<NodeError> for NodeUnpublishVolumeError {
  fn from(value: NodeError) -> Self {
    match value.code() {
      Code::InvalidArgument => NodeUnpublishVolumeError::InvalidArgument(value.to_string()),
      _ => NodeUnpublishVolumeError::Internal(value.to_string()),
    }
  }
}
