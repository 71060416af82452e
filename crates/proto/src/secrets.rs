use std::{collections::HashMap, fmt};

/// Secret key/value pairs of a request. Values never show up in `Debug`
/// output, so requests carrying them can be recorded on tracing spans.
#[derive(Default)]
pub(crate) struct Secrets(HashMap<String, String>);

impl AsRef<HashMap<String, String>> for Secrets {
  #[inline]
  fn as_ref(&self) -> &HashMap<String, String> {
    &self.0
  }
}

impl From<HashMap<String, String>> for Secrets {
  #[inline]
  fn from(v: HashMap<String, String>) -> Self {
    Secrets(v)
  }
}

impl fmt::Debug for Secrets {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map()
      .entries(self.0.keys().map(|k| (k, "SECRET")))
      .finish()
  }
}
