mod error;
mod relay;
mod types;

pub use error::RelayError;
pub use relay::{MessagePublisher, MessageSink, MessageSource};
pub use types::{Delivery, Message, OverflowPolicy};
