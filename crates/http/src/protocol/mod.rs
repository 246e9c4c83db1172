//! Protocol level types shared by the codec and the connection.
//!
//! - [`Message`] / [`PayloadItem`] / [`PayloadSize`]: what the request decoder yields
//! - [`RequestHeader`]: a parsed request line plus headers
//! - [`ResponseHead`]: the header half of a response, before the body is attached
//! - [`HttpError`], [`ParseError`], [`SendError`]: failures on either direction

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
