//! Response head type.

use http::Response;

/// The header half of a response: status, version and headers, with the body
/// written separately by the encoder.
pub type ResponseHead = Response<()>;
