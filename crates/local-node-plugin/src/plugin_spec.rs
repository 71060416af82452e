use serde::{Deserialize, Serialize};
use std::{
  fs, io,
  path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

/// Tells the CO's node agent where to reach this plugin. Written as
/// `<plugins_path>/<name>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginSpec {
  pub name: String,
  pub address: String,
}

#[derive(Debug, Error)]
pub enum PluginSpecError {
  #[error("Failed to write plugin spec {}", .0.display())]
  Io(PathBuf, #[source] io::Error),
  #[error("Failed to encode plugin spec: {0}")]
  Encode(#[from] serde_json::Error),
}

impl PluginSpec {
  pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
    PluginSpec {
      name: name.into(),
      address: address.into(),
    }
  }

  pub fn path_in(&self, plugins_path: &Path) -> PathBuf {
    plugins_path.join(format!("{}.json", self.name))
  }

  /// Writes the spec file, creating `plugins_path` if needed. An existing
  /// spec for the same plugin is replaced.
  pub fn write_to(&self, plugins_path: &Path) -> Result<PathBuf, PluginSpecError> {
    fs::create_dir_all(plugins_path)
      .map_err(|e| PluginSpecError::Io(plugins_path.to_owned(), e))?;

    let path = self.path_in(plugins_path);
    let contents = serde_json::to_vec(self)?;
    fs::write(&path, contents).map_err(|e| PluginSpecError::Io(path.clone(), e))?;

    info!("Wrote plugin spec {}", path.display());
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn writes_spec_file() {
    let dir = tempdir().expect("failed to get tempdir");
    let plugins = dir.path().join("plugins");
    let spec = PluginSpec::new("local-node-plugin", "0.0.0.0:9760");

    let path = spec.write_to(&plugins).unwrap();

    assert_eq!(path, plugins.join("local-node-plugin.json"));
    assert_eq!(
      fs::read_to_string(&path).unwrap(),
      r#"{"Name":"local-node-plugin","Address":"0.0.0.0:9760"}"#
    );
  }

  #[test]
  fn replaces_spec_file() {
    let dir = tempdir().expect("failed to get tempdir");
    PluginSpec::new("p", "127.0.0.1:1")
      .write_to(dir.path())
      .unwrap();

    let path = PluginSpec::new("p", "127.0.0.1:2")
      .write_to(dir.path())
      .unwrap();

    let spec: PluginSpec = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(spec, PluginSpec::new("p", "127.0.0.1:2"));
  }

  #[test]
  fn plugins_path_is_a_file() {
    let dir = tempdir().expect("failed to get tempdir");
    let plugins = dir.path().join("plugins");
    fs::write(&plugins, b"").unwrap();

    let err = PluginSpec::new("p", "127.0.0.1:1")
      .write_to(&plugins)
      .unwrap_err();

    assert!(matches!(err, PluginSpecError::Io(p, _) if p == plugins));
  }
}
