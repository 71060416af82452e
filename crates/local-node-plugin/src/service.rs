use crate::{NodeError, NodePublisher, DEFAULT_PLUGIN_NAME};
use async_trait::async_trait;
use csi_mount_utils::Mounter;
use csi_proto::{
  node::{
    NodeInfo, NodePublishVolumeError, NodePublishVolumeRequest, NodeUnpublishVolumeError,
    NodeUnpublishVolumeRequest,
  },
  IdentityService, NodeService,
};
use std::sync::Arc;
use tracing::{error, info, Span};

/// A CSI node plugin publishing directories below a volumes root.
pub struct LocalNode<M> {
  name: String,
  version: String,
  node_id: String,
  publisher: Arc<NodePublisher<M>>,
}

impl<M: Mounter + 'static> LocalNode<M> {
  pub fn new(node_id: impl Into<String>, publisher: NodePublisher<M>) -> Self {
    LocalNode {
      name: DEFAULT_PLUGIN_NAME.into(),
      version: env!("CARGO_PKG_VERSION").into(),
      node_id: node_id.into(),
      publisher: Arc::new(publisher),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  #[inline]
  pub fn publisher(&self) -> &NodePublisher<M> {
    &self.publisher
  }

  /// The publisher does blocking filesystem calls, run them off the
  /// async workers in the current span.
  async fn run<F>(&self, f: F) -> Result<(), NodeError>
  where
    F: FnOnce(&NodePublisher<M>) -> Result<(), NodeError> + Send + 'static,
  {
    let publisher = self.publisher.clone();
    let span = Span::current();

    tokio::task::spawn_blocking(move || span.in_scope(|| f(&publisher)))
      .await
      .unwrap_or_else(|e| {
        error!(error = %e, "Blocking worker failed");
        Err(NodeError::Cancelled)
      })
  }
}

impl<M: Mounter + 'static> IdentityService for LocalNode<M> {
  fn name(&self) -> &str {
    &self.name
  }

  fn version(&self) -> &str {
    &self.version
  }
}

#[async_trait]
impl<M: Mounter + 'static> NodeService for LocalNode<M> {
  fn info(&self) -> NodeInfo {
    NodeInfo::new(self.node_id.clone())
  }

  async fn publish_volume(
    &self,
    request: NodePublishVolumeRequest,
  ) -> Result<(), NodePublishVolumeError> {
    if request.readonly() {
      info!("Readonly publish requested, the volume stays writable");
    }

    self
      .run(move |publisher| {
        publisher.publish(
          request.volume_id(),
          request.target_path(),
          request.volume_capability(),
        )
      })
      .await
      .map_err(Into::into)
  }

  async fn unpublish_volume(
    &self,
    request: NodeUnpublishVolumeRequest,
  ) -> Result<(), NodeUnpublishVolumeError> {
    self
      .run(move |publisher| publisher.unpublish(request.volume_id(), request.target_path()))
      .await
      .map_err(Into::into)
  }
}
