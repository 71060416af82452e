use anyhow::Context;
use clap::Parser;
use csi_mount_utils::{BindMounter, DefaultMounter, SymlinkMounter};
use csi_proto::Node;
use local_node_plugin::{Config, LocalNode, MounterKind, NodePublisher, PluginSpec};
use std::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = Config::parse();
  init_tracing(&config.log_level);

  fs::create_dir_all(&config.volumes_root).with_context(|| {
    format!(
      "Failed to create volumes root {}",
      config.volumes_root.display()
    )
  })?;
  let volumes_root = config.volumes_root.canonicalize()?;

  let mounter = match config.mounter {
    MounterKind::Auto => DefaultMounter::detect(&volumes_root),
    MounterKind::Bind => DefaultMounter::Bind(BindMounter::new().context("Bind mounts unavailable")?),
    MounterKind::Symlink => DefaultMounter::Symlink(SymlinkMounter::new(&volumes_root)),
  };

  if let Some(plugins_path) = &config.plugins_path {
    PluginSpec::new(&config.plugin_name, config.listen_addr.to_string())
      .write_to(plugins_path)
      .context("Failed to register plugin")?;
  }

  let node_id = config.node_id().context("Failed to determine node ID")?;
  info!(
    node_id = %node_id,
    volumes_root = %volumes_root.display(),
    "Starting {}",
    config.plugin_name
  );

  let publisher = NodePublisher::new(volumes_root, mounter);
  let node = Node::new(LocalNode::new(node_id, publisher).with_name(&config.plugin_name));
  let (identity, node) = node.into_servers();

  info!("Listening on {}", config.listen_addr);
  tonic::transport::Server::builder()
    .add_service(identity)
    .add_service(node)
    .serve_with_shutdown(config.listen_addr, shutdown_signal())
    .await
    .context("gRPC server failed")?;

  info!("Stopped");
  Ok(())
}

fn init_tracing(default_level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .init();
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }

  info!("Shutting down");
}
