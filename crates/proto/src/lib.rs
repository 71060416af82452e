macro_rules! unsupported {
  ($name:expr) => {{
    ::tracing::error!("Unsupported method {} called", $name);
    return Err(::tonic::Status::new(
      ::tonic::Code::Unimplemented,
      format!("Unsupported method {} called", $name),
    ));
  }};
}

pub mod node;
pub mod volume;

mod plugin;
mod secrets;
mod utils;

/// Wire types and gRPC services generated from `proto/csi.proto`.
#[allow(clippy::all)]
pub mod proto {
  tonic::include_proto!("csi.v1");
}

use std::collections::HashMap;

use lazy_static::lazy_static;

pub use node::{Node, NodeService};

pub trait IdentityService: Send + Sync + 'static {
  /// The name MUST follow domain name notation format
  /// (<https://tools.ietf.org/html/rfc1035#section-2.3.1>). It MUST be 63
  /// characters or less, beginning and ending with an alphanumeric
  /// character ([a-z0-9A-Z]) with dashes (-), dots (.), and
  /// alphanumerics between.
  fn name(&self) -> &str;

  /// Plugin version. Value of this field is opaque to the CO.
  fn version(&self) -> &str;

  /// Whether or not this plugin supports volume accessibility constraints.
  #[inline]
  fn volume_accessibility_constraints_support(&self) -> bool {
    false
  }

  #[inline]
  fn ready(&self) -> bool {
    true
  }

  #[inline]
  fn manifest(&self) -> &HashMap<String, String> {
    lazy_static! {
      static ref EMPTY_MANIFEST: HashMap<String, String> = HashMap::new();
    }

    &EMPTY_MANIFEST
  }
}
