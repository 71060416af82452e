use bitflags::bitflags;

use crate::proto;

#[rustfmt::skip]
bitflags! {
  pub struct NodeCapabilities: u32 {
    const STAGE_UNSTAGE_VOLUME         = 0b_0000_0000_0000_0001;
    const GET_VOLUME_STATS             = 0b_0000_0000_0000_0010;
    const EXPAND_VOLUME                = 0b_0000_0000_0000_0100;
    const VOLUME_CONDITION             = 0b_0000_0000_0000_1000;
    const SINGLE_NODE_MULTI_WRITER     = 0b_0000_0000_0001_0000;
    const VOLUME_MOUNT_GROUP           = 0b_0000_0000_0010_0000;
  }
}

use proto::node_service_capability::rpc::Type;

const RPC_TYPES: &[(NodeCapabilities, Type)] = &[
  (NodeCapabilities::STAGE_UNSTAGE_VOLUME, Type::StageUnstageVolume),
  (NodeCapabilities::GET_VOLUME_STATS, Type::GetVolumeStats),
  (NodeCapabilities::EXPAND_VOLUME, Type::ExpandVolume),
  (NodeCapabilities::VOLUME_CONDITION, Type::VolumeCondition),
  (NodeCapabilities::SINGLE_NODE_MULTI_WRITER, Type::SingleNodeMultiWriter),
  (NodeCapabilities::VOLUME_MOUNT_GROUP, Type::VolumeMountGroup),
];

impl From<NodeCapabilities> for proto::NodeGetCapabilitiesResponse {
  fn from(value: NodeCapabilities) -> Self {
    let capabilities = RPC_TYPES
      .iter()
      .filter(|(flag, _)| value.contains(*flag))
      .map(|(_, ty)| proto::NodeServiceCapability {
        r#type: Some(proto::node_service_capability::Type::Rpc(
          proto::node_service_capability::Rpc { r#type: *ty as i32 },
        )),
      })
      .collect();

    proto::NodeGetCapabilitiesResponse { capabilities }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rpc_types(response: proto::NodeGetCapabilitiesResponse) -> Vec<i32> {
    response
      .capabilities
      .into_iter()
      .filter_map(|c| match c.r#type {
        Some(proto::node_service_capability::Type::Rpc(rpc)) => Some(rpc.r#type),
        None => None,
      })
      .collect()
  }

  #[test]
  fn empty() {
    assert!(rpc_types(NodeCapabilities::empty().into()).is_empty());
  }

  #[test]
  fn selected_flags_in_order() {
    let caps = NodeCapabilities::VOLUME_CONDITION | NodeCapabilities::STAGE_UNSTAGE_VOLUME;

    assert_eq!(
      rpc_types(caps.into()),
      vec![
        Type::StageUnstageVolume as i32,
        Type::VolumeCondition as i32
      ]
    );
  }
}
