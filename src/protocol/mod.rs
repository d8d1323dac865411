//! Protocol Module
//!
//! Defines the P7 wire protocol spoken by Wired servers.
//!
//! ## Message Format
//!
//! Every transaction is a single-line XML document followed by a carriage
//! return:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <p7:message name="wired.user.set_nick" xmlns:p7="http://www.zankasoftware.com/P7/Message">
//!   <p7:field name="wired.user.nick">Triforce</p7:field>
//! </p7:message>\r
//! ```
//!
//! (shown wrapped; on the wire there are no newlines inside a document)
//!
//! ### Layers
//! - `framer`: splits the byte stream on `\r`
//! - `codec`: XML envelope <-> [`Message`]
//! - `transaction`: names of every transaction and field we use, plus the
//!   fixed-schema outbound [`Transaction`] enum

mod framer;
mod message;
mod codec;
pub mod transaction;

pub use framer::{FrameReader, DELIMITER, MAX_FRAME_SIZE};
pub use message::Message;
pub use codec::{decode_message, encode_transaction, escape_value, write_transaction, P7_NAMESPACE};
pub use transaction::Transaction;
