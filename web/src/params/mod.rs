//! This module holds typed parameters for the endpoint inputs.
//!
//! By using typed parameters, inputs are validated (by type) and correctly formatted
//! before they are processed by the handlers. User keys are kept optional at this
//! level so a missing key surfaces as the endpoint's own client error rather than
//! as an extractor rejection.

pub(crate) mod dispatch;
pub(crate) mod stream;
