use crate::{proto, IdentityService};
use tracing::debug;

/// A node-only plugin never advertises `CONTROLLER_SERVICE`, so the only
/// capability that can show up here is topology support.
pub(crate) fn get_capabilities(s: &impl IdentityService) -> proto::GetPluginCapabilitiesResponse {
  let volume_accessibility_constraints_support = s.volume_accessibility_constraints_support();

  let capabilities = if volume_accessibility_constraints_support {
    vec![service_capability(
      proto::plugin_capability::service::Type::VolumeAccessibilityConstraints,
    )]
  } else {
    Vec::new()
  };

  debug!(?volume_accessibility_constraints_support);
  proto::GetPluginCapabilitiesResponse { capabilities }
}

fn service_capability(ty: proto::plugin_capability::service::Type) -> proto::PluginCapability {
  proto::PluginCapability {
    r#type: Some(proto::plugin_capability::Type::Service(
      proto::plugin_capability::Service { r#type: ty as i32 },
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Plugin(bool);

  impl IdentityService for Plugin {
    fn name(&self) -> &str {
      "test.plugin"
    }

    fn version(&self) -> &str {
      "0.0.0"
    }

    fn volume_accessibility_constraints_support(&self) -> bool {
      self.0
    }
  }

  #[test]
  fn no_capabilities_by_default() {
    assert!(get_capabilities(&Plugin(false)).capabilities.is_empty());
  }

  #[test]
  fn accessibility_constraints() {
    let response = get_capabilities(&Plugin(true));
    assert_eq!(
      response.capabilities,
      vec![service_capability(
        proto::plugin_capability::service::Type::VolumeAccessibilityConstraints
      )]
    );
  }
}
