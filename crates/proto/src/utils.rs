use std::fmt;
use tracing::{field, Span};

/// Records a value on a field of the current span, returning it unchanged so
/// it can be chained into a conversion.
pub(crate) trait Record: Sized {
  fn record_field(self, field: &'static str) -> Self;

  #[inline]
  fn record_request(self) -> Self {
    self.record_field("request")
  }

  #[inline]
  fn record_response(self) -> Self {
    self.record_field("response")
  }
}

impl<T: fmt::Debug> Record for T {
  #[inline]
  fn record_field(self, field: &'static str) -> Self {
    Span::current().record(field, &field::debug(&self));
    self
  }
}
