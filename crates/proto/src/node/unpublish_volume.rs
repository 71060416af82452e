use crate::proto;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug)]
pub struct NodeUnpublishVolumeRequest {
  volume_id: String,
  target_path: PathBuf,
}

impl NodeUnpublishVolumeRequest {
  pub fn new(volume_id: impl Into<String>, target_path: impl Into<PathBuf>) -> Self {
    NodeUnpublishVolumeRequest {
      volume_id: volume_id.into(),
      target_path: target_path.into(),
    }
  }

  /// The ID of the volume. This field is REQUIRED.
  #[inline]
  pub fn volume_id(&self) -> &str {
    &self.volume_id
  }

  /// The path at which the volume was published. The SP MUST delete the
  /// file or directory it created at this path. This is a REQUIRED field.
  #[inline]
  pub fn target_path(&self) -> &Path {
    &self.target_path
  }
}

impl From<proto::NodeUnpublishVolumeRequest> for NodeUnpublishVolumeRequest {
  fn from(value: proto::NodeUnpublishVolumeRequest) -> Self {
    Self::new(value.volume_id, value.target_path)
  }
}

#[derive(Debug, Error)]
pub enum NodeUnpublishVolumeError {
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

impl From<NodeUnpublishVolumeError> for Status {
  fn from(value: NodeUnpublishVolumeError) -> Self {
    match value {
      NodeUnpublishVolumeError::InvalidArgument(msg) => Status::new(Code::InvalidArgument, msg),
      NodeUnpublishVolumeError::Internal(msg) => Status::new(Code::Internal, msg),
      NodeUnpublishVolumeError::Other(v) => v,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_proto() {
    let request = NodeUnpublishVolumeRequest::from(proto::NodeUnpublishVolumeRequest {
      volume_id: String::from("vol-a"),
      target_path: String::from("/mnt/a"),
    });

    assert_eq!(request.volume_id(), "vol-a");
    assert_eq!(request.target_path(), Path::new("/mnt/a"));
  }

  #[test]
  fn status_codes() {
    let status = Status::from(NodeUnpublishVolumeError::InvalidArgument(String::from("bad")));
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "bad");

    let status = Status::from(NodeUnpublishVolumeError::Internal(String::from("broken")));
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "broken");

    let status = Status::from(NodeUnpublishVolumeError::from(Status::aborted("busy")));
    assert_eq!(status.code(), Code::Aborted);
  }
}
