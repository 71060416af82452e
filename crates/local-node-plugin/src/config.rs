use crate::DEFAULT_PLUGIN_NAME;
use clap::{Parser, ValueEnum};
use std::{io, net::SocketAddr, path::PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "local-node-plugin", version, about = "CSI node plugin publishing local directories")]
pub struct Config {
  /// host:port to serve on
  #[arg(long, alias = "listenAddr", default_value = "0.0.0.0:9760")]
  pub listen_addr: SocketAddr,

  /// Directory where the plugin spec is installed
  #[arg(long, alias = "pluginsPath")]
  pub plugins_path: Option<PathBuf>,

  /// Directory holding one directory per volume
  #[arg(long, alias = "volumesRoot", default_value = "/tmp/_volumes")]
  pub volumes_root: PathBuf,

  /// ID of the current node [default: host name]
  #[arg(long, alias = "nodeId")]
  pub node_id: Option<String>,

  /// Name reported to the CO
  #[arg(long, default_value = DEFAULT_PLUGIN_NAME)]
  pub plugin_name: String,

  /// How volumes are attached to target paths
  #[arg(long, value_enum, default_value = "auto")]
  pub mounter: MounterKind,

  /// Log filter used when RUST_LOG is not set
  #[arg(long, default_value = "info")]
  pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MounterKind {
  /// Bind mounts when running as root, symlinks otherwise
  Auto,
  Bind,
  Symlink,
}

impl Config {
  /// The configured node ID, or the host name when none was given.
  pub fn node_id(&self) -> io::Result<String> {
    match &self.node_id {
      Some(id) if !id.is_empty() => Ok(id.clone()),
      _ => Ok(hostname::get()?.to_string_lossy().into_owned()),
    }
  }
}
