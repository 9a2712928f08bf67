//! Request body access: lazy reading and temp-file spooling.

mod reader;
mod spool;

pub use reader::{BodyReader, LoadedBody};
pub use spool::SpooledBody;
