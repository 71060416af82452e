//! A CSI node plugin that publishes plain directories from a volumes root
//! at the target paths the CO asks for.

mod config;
mod error;
mod plugin_spec;
mod publisher;
mod service;

pub use config::{Config, MounterKind};
pub use error::NodeError;
pub use plugin_spec::{PluginSpec, PluginSpecError};
pub use publisher::NodePublisher;
pub use service::LocalNode;

pub const DEFAULT_PLUGIN_NAME: &str = "local-node-plugin";
