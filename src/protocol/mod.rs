//! Protocol-level types shared by the codecs and the connection driver.

pub mod body;
mod error;
mod message;
mod request;
mod response;

pub use body::{BodyReader, LoadedBody, SpooledBody};
pub use error::{HttpError, ParseError, ParseErrorKind, SendError, UsageError};
pub use message::{BodySize, Message, PayloadItem};
pub use request::RequestHead;
pub use response::ResponseHead;
