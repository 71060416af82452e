use super::Topology;
use crate::proto;
use std::{
  convert::{TryFrom, TryInto},
  num::NonZeroU64,
};

#[derive(Debug, Clone)]
pub struct NodeInfo {
  /// The identifier of the node as understood by the SP. It MUST contain
  /// enough information to uniquely identify this specific node vs all
  /// other nodes supported by this plugin. The size of this field SHALL
  /// NOT exceed 192 bytes.
  node_id: String,

  /// Maximum number of volumes that controller can publish to the node.
  /// If unset the CO decides.
  max_volumes_per_node: Option<NonZeroU64>,

  /// Specifies where (regions, zones, racks, etc.) the node is
  /// accessible from. A plugin that returns this field MUST also set the
  /// VOLUME_ACCESSIBILITY_CONSTRAINTS plugin capability.
  accessible_topology: Option<Topology>,
}

impl NodeInfo {
  pub fn new(node_id: impl Into<String>) -> Self {
    NodeInfo {
      node_id: node_id.into(),
      max_volumes_per_node: None,
      accessible_topology: None,
    }
  }

  pub fn with_max_volumes_per_node(mut self, max: NonZeroU64) -> Self {
    self.max_volumes_per_node = Some(max);
    self
  }

  pub fn with_accessible_topology(mut self, topology: Topology) -> Self {
    self.accessible_topology = Some(topology);
    self
  }

  #[inline]
  pub fn node_id(&self) -> &str {
    &self.node_id
  }
}

impl TryFrom<NodeInfo> for proto::NodeGetInfoResponse {
  type Error = tonic::Status;

  fn try_from(value: NodeInfo) -> Result<Self, Self::Error> {
    let max_volumes_per_node = match value.max_volumes_per_node {
      None => 0,
      Some(v) => v.get().try_into().map_err(|_| {
        tonic::Status::internal("NodeGetInfoResponse.max_volumes_per_node out of range")
      })?,
    };
    let accessible_topology = value
      .accessible_topology
      .map(|segments| proto::Topology { segments });

    Ok(proto::NodeGetInfoResponse {
      node_id: value.node_id,
      max_volumes_per_node,
      accessible_topology,
    })
  }
}
