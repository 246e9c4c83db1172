//! Request body decoders.
//!
//! - [`PayloadDecoder`] dispatches to the strategy the request head asked for
//! - Content-Length framing via `LengthDecoder`
//! - chunked framing via `ChunkedDecoder`

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
