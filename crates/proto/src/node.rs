mod capabilities;
mod get_info;
mod publish_volume;
mod unpublish_volume;

use crate::{
  plugin, proto,
  utils::Record,
  IdentityService,
};
use async_trait::async_trait;
use std::{convert::TryFrom, sync::Arc};
use tracing::instrument;

pub use crate::volume::*;
pub use capabilities::*;
pub use get_info::*;
pub use publish_volume::*;
pub use unpublish_volume::*;

#[async_trait]
pub trait NodeService: IdentityService {
  /// Get the set of optional node RPCs provided by this plugin.
  #[inline]
  fn capabilities(&self) -> NodeCapabilities {
    NodeCapabilities::empty()
  }

  /// Information about the node this plugin runs on. `node_id` is used by
  /// the CO in subsequent calls to refer to this node.
  fn info(&self) -> NodeInfo;

  /// Makes the volume available at `target_path`.
  ///
  /// This operation MUST be idempotent. If the volume corresponding to the
  /// `volume_id` has already been published at the specified `target_path`,
  /// and is compatible with the specified `volume_capability` and `readonly`
  /// flag, the Plugin MUST reply `0 OK`.
  async fn publish_volume(
    &self,
    request: NodePublishVolumeRequest,
  ) -> Result<(), NodePublishVolumeError>;

  /// Undoes the work done by `publish_volume`.
  ///
  /// This operation MUST be idempotent. If this RPC failed, or the CO does
  /// not know if it failed or not, it can choose to call it again.
  async fn unpublish_volume(
    &self,
    request: NodeUnpublishVolumeRequest,
  ) -> Result<(), NodeUnpublishVolumeError>;
}

/// Adapter exposing a [NodeService] as the CSI `Identity` and `Node` gRPC
/// services.
pub struct Node<T: NodeService>(Arc<T>);

impl<T: NodeService> Node<T> {
  pub fn new(service: T) -> Self {
    Node(Arc::new(service))
  }

  #[inline]
  pub fn service(&self) -> &T {
    &self.0
  }

  /// Build the two tonic services sharing this node.
  pub fn into_servers(
    self,
  ) -> (
    proto::identity_server::IdentityServer<Self>,
    proto::node_server::NodeServer<Self>,
  ) {
    let identity = proto::identity_server::IdentityServer::new(self.clone());
    let node = proto::node_server::NodeServer::new(self);
    (identity, node)
  }
}

impl<T: NodeService> Clone for Node<T> {
  fn clone(&self) -> Self {
    Node(self.0.clone())
  }
}

#[async_trait]
impl<T: NodeService> proto::identity_server::Identity for Node<T> {
  #[instrument(
    name = "Identity.get_plugin_info",
    skip(self, _request),
    fields(response)
  )]
  async fn get_plugin_info(
    &self,
    _request: tonic::Request<proto::GetPluginInfoRequest>,
  ) -> Result<tonic::Response<proto::GetPluginInfoResponse>, tonic::Status> {
    let response = proto::GetPluginInfoResponse {
      name: self.0.name().into(),
      vendor_version: self.0.version().into(),
      manifest: self.0.manifest().clone(),
    }
    .record_response();

    Ok(tonic::Response::new(response))
  }

  #[instrument(name = "Identity.get_plugin_capabilities", skip(self, _request))]
  async fn get_plugin_capabilities(
    &self,
    _request: tonic::Request<proto::GetPluginCapabilitiesRequest>,
  ) -> Result<tonic::Response<proto::GetPluginCapabilitiesResponse>, tonic::Status> {
    let response = plugin::get_capabilities(&*self.0);

    Ok(tonic::Response::new(response))
  }

  #[instrument(name = "Identity.probe", skip(self, _request), fields(ready))]
  async fn probe(
    &self,
    _request: tonic::Request<proto::ProbeRequest>,
  ) -> Result<tonic::Response<proto::ProbeResponse>, tonic::Status> {
    let ready = self.0.ready().record_field("ready");
    let response = proto::ProbeResponse { ready: Some(ready) };

    Ok(tonic::Response::new(response))
  }
}

#[async_trait]
impl<T: NodeService> proto::node_server::Node for Node<T> {
  async fn node_stage_volume(
    &self,
    _request: tonic::Request<proto::NodeStageVolumeRequest>,
  ) -> Result<tonic::Response<proto::NodeStageVolumeResponse>, tonic::Status> {
    unsupported!("NodeStageVolume")
  }

  async fn node_unstage_volume(
    &self,
    _request: tonic::Request<proto::NodeUnstageVolumeRequest>,
  ) -> Result<tonic::Response<proto::NodeUnstageVolumeResponse>, tonic::Status> {
    unsupported!("NodeUnstageVolume")
  }

  #[instrument(name = "Node.publish_volume", skip(self, request), fields(request))]
  async fn node_publish_volume(
    &self,
    request: tonic::Request<proto::NodePublishVolumeRequest>,
  ) -> Result<tonic::Response<proto::NodePublishVolumeResponse>, tonic::Status> {
    let request = NodePublishVolumeRequest::from(request.into_inner()).record_request();
    self.0.publish_volume(request).await?;

    Ok(tonic::Response::new(proto::NodePublishVolumeResponse {}))
  }

  #[instrument(name = "Node.unpublish_volume", skip(self, request), fields(request))]
  async fn node_unpublish_volume(
    &self,
    request: tonic::Request<proto::NodeUnpublishVolumeRequest>,
  ) -> Result<tonic::Response<proto::NodeUnpublishVolumeResponse>, tonic::Status> {
    let request = NodeUnpublishVolumeRequest::from(request.into_inner()).record_request();
    self.0.unpublish_volume(request).await?;

    Ok(tonic::Response::new(proto::NodeUnpublishVolumeResponse {}))
  }

  async fn node_get_volume_stats(
    &self,
    _request: tonic::Request<proto::NodeGetVolumeStatsRequest>,
  ) -> Result<tonic::Response<proto::NodeGetVolumeStatsResponse>, tonic::Status> {
    unsupported!("NodeGetVolumeStats")
  }

  async fn node_expand_volume(
    &self,
    _request: tonic::Request<proto::NodeExpandVolumeRequest>,
  ) -> Result<tonic::Response<proto::NodeExpandVolumeResponse>, tonic::Status> {
    unsupported!("NodeExpandVolume")
  }

  #[instrument(
    name = "Node.get_capabilities",
    skip(self, _request),
    fields(capabilities)
  )]
  async fn node_get_capabilities(
    &self,
    _request: tonic::Request<proto::NodeGetCapabilitiesRequest>,
  ) -> Result<tonic::Response<proto::NodeGetCapabilitiesResponse>, tonic::Status> {
    let capabilities = self.0.capabilities().record_field("capabilities");

    Ok(tonic::Response::new(capabilities.into()))
  }

  #[instrument(name = "Node.get_info", skip(self, _request), fields(response))]
  async fn node_get_info(
    &self,
    _request: tonic::Request<proto::NodeGetInfoRequest>,
  ) -> Result<tonic::Response<proto::NodeGetInfoResponse>, tonic::Status> {
    let response = proto::NodeGetInfoResponse::try_from(self.0.info())?.record_response();

    Ok(tonic::Response::new(response))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::proto::{identity_server::Identity, node_server::Node as _};
  use std::sync::Mutex;
  use tonic::{Code, Request};

  #[derive(Default)]
  struct Recorder {
    published: Mutex<Vec<String>>,
    unpublished: Mutex<Vec<String>>,
  }

  impl IdentityService for Recorder {
    fn name(&self) -> &str {
      "recorder.test"
    }

    fn version(&self) -> &str {
      "1.2.3"
    }
  }

  #[async_trait]
  impl NodeService for Recorder {
    fn info(&self) -> NodeInfo {
      NodeInfo::new("node-1")
    }

    async fn publish_volume(
      &self,
      request: NodePublishVolumeRequest,
    ) -> Result<(), NodePublishVolumeError> {
      if request.volume_id().is_empty() {
        return Err(NodePublishVolumeError::InvalidArgument(String::from(
          "no volume",
        )));
      }

      self
        .published
        .lock()
        .unwrap()
        .push(request.volume_id().to_owned());
      Ok(())
    }

    async fn unpublish_volume(
      &self,
      request: NodeUnpublishVolumeRequest,
    ) -> Result<(), NodeUnpublishVolumeError> {
      if request.target_path().as_os_str().is_empty() {
        return Err(NodeUnpublishVolumeError::Internal(String::from(
          "no target",
        )));
      }

      self
        .unpublished
        .lock()
        .unwrap()
        .push(request.volume_id().to_owned());
      Ok(())
    }
  }

  fn node() -> Node<Recorder> {
    Node::new(Recorder::default())
  }

  #[tokio::test]
  async fn plugin_info() {
    let response = node()
      .get_plugin_info(Request::new(proto::GetPluginInfoRequest {}))
      .await
      .expect("get_plugin_info")
      .into_inner();

    assert_eq!(response.name, "recorder.test");
    assert_eq!(response.vendor_version, "1.2.3");
    assert!(response.manifest.is_empty());
  }

  #[tokio::test]
  async fn probe_is_ready() {
    let response = node()
      .probe(Request::new(proto::ProbeRequest {}))
      .await
      .expect("probe")
      .into_inner();

    assert_eq!(response.ready, Some(true));
  }

  #[tokio::test]
  async fn node_info_and_capabilities() {
    let node = node();
    let info = node
      .node_get_info(Request::new(proto::NodeGetInfoRequest {}))
      .await
      .expect("node_get_info")
      .into_inner();
    assert_eq!(info.node_id, "node-1");
    assert_eq!(info.max_volumes_per_node, 0);
    assert!(info.accessible_topology.is_none());

    let capabilities = node
      .node_get_capabilities(Request::new(proto::NodeGetCapabilitiesRequest {}))
      .await
      .expect("node_get_capabilities")
      .into_inner();
    assert!(capabilities.capabilities.is_empty());
  }

  #[tokio::test]
  async fn publish_and_unpublish_are_forwarded() {
    let node = node();
    node
      .node_publish_volume(Request::new(proto::NodePublishVolumeRequest {
        volume_id: String::from("vol-a"),
        target_path: String::from("/mnt/a"),
        ..Default::default()
      }))
      .await
      .expect("node_publish_volume");
    node
      .node_unpublish_volume(Request::new(proto::NodeUnpublishVolumeRequest {
        volume_id: String::from("vol-a"),
        target_path: String::from("/mnt/a"),
      }))
      .await
      .expect("node_unpublish_volume");

    assert_eq!(*node.service().published.lock().unwrap(), vec!["vol-a"]);
    assert_eq!(*node.service().unpublished.lock().unwrap(), vec!["vol-a"]);
  }

  #[tokio::test]
  async fn errors_map_to_status_codes() {
    let node = node();
    let status = node
      .node_publish_volume(Request::new(proto::NodePublishVolumeRequest::default()))
      .await
      .expect_err("empty volume id");
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "no volume");

    let status = node
      .node_unpublish_volume(Request::new(proto::NodeUnpublishVolumeRequest {
        volume_id: String::from("vol-a"),
        target_path: String::new(),
      }))
      .await
      .expect_err("empty target path");
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "no target");
  }

  #[tokio::test]
  async fn staging_is_unsupported() {
    let status = node()
      .node_stage_volume(Request::new(proto::NodeStageVolumeRequest::default()))
      .await
      .expect_err("stage is unsupported");

    assert_eq!(status.code(), Code::Unimplemented);
    assert_eq!(status.message(), "Unsupported method NodeStageVolume called");
  }
}
