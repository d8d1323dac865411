//! Protocol codec
//!
//! Encoding and decoding functions for the P7 XML envelope.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────┬──────────────────────────────────────────┬────────┐
//! │ <?xml ...?> │ <p7:message name=..> <p7:field ..>* </..> │ \r \n  │
//! └─────────────┴──────────────────────────────────────────┴────────┘
//! ```
//!
//! Field values are written verbatim. Anything that is not already valid
//! XML text must go through [`escape_value`] first.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, WiredError};
use super::{Message, Transaction, DELIMITER};

/// XML namespace of P7 messages
pub const P7_NAMESPACE: &str = "http://www.zankasoftware.com/P7/Message";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Wired servers expect CRLF after each document; only the CR delimits
const TERMINATOR: &[u8] = b"\r\n";

// =============================================================================
// Encoding
// =============================================================================

/// Encode a transaction into a complete frame
///
/// Never fails. Values are inserted as given.
pub fn encode_transaction(name: &str, fields: &[(&str, &str)]) -> Bytes {
    let fields_len: usize = fields.iter().map(|(k, v)| k.len() + v.len() + 40).sum();
    let mut buf = BytesMut::with_capacity(XML_DECLARATION.len() + name.len() + fields_len + 128);

    buf.put_slice(XML_DECLARATION.as_bytes());
    buf.put_slice(b"<p7:message name=\"");
    buf.put_slice(name.as_bytes());
    buf.put_slice(b"\" xmlns:p7=\"");
    buf.put_slice(P7_NAMESPACE.as_bytes());
    buf.put_slice(b"\">");

    for (key, value) in fields {
        buf.put_slice(b"<p7:field name=\"");
        buf.put_slice(key.as_bytes());
        buf.put_slice(b"\">");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"</p7:field>");
    }

    buf.put_slice(b"</p7:message>");
    buf.put_slice(TERMINATOR);
    buf.freeze()
}

/// Escape a value for use as field text
///
/// Carriage returns are escaped too, since a raw one would end the frame.
pub fn escape_value(value: &str) -> String {
    quick_xml::escape::escape(value).replace('\r', "&#13;")
}

/// Write a transaction to a stream
pub fn write_transaction<W: Write>(writer: &mut W, transaction: &Transaction) -> Result<()> {
    let bytes = transaction.encode();
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a frame into a message
///
/// The trailing delimiter and surrounding whitespace are stripped first.
pub fn decode_message(frame: &[u8]) -> Result<Message> {
    let text = std::str::from_utf8(trim_frame(frame))
        .map_err(|e| WiredError::Decode(format!("Frame is not UTF-8: {}", e)))?;

    if text.is_empty() {
        return Err(WiredError::Decode("Empty frame".to_string()));
    }

    let mut reader = Reader::from_str(text);
    let mut message: Option<Message> = None;
    let mut current_field: Option<(String, String)> = None;
    let mut finished = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| WiredError::Decode(format!("Malformed XML at {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"message" if message.is_none() => {
                    message = Some(Message::new(name_attribute(&e)?));
                }
                b"field" if message.is_some() && current_field.is_none() => {
                    current_field = Some((name_attribute(&e)?, String::new()));
                }
                // Markup nested inside a value is not part of the field text
                _ if current_field.is_some() => {}
                other => return Err(unexpected_element(other)),
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"message" if message.is_none() => {
                    message = Some(Message::new(name_attribute(&e)?));
                    finished = true;
                }
                b"field" if current_field.is_none() => match message.as_mut() {
                    Some(msg) => msg.fields.push((name_attribute(&e)?, String::new())),
                    None => return Err(unexpected_element(b"field")),
                },
                _ if current_field.is_some() => {}
                other => return Err(unexpected_element(other)),
            },
            Event::Text(t) => {
                if let Some((_, value)) = current_field.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| WiredError::Decode(format!("Bad field text: {}", e)))?;
                    value.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = current_field.as_mut() {
                    let raw = c.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| WiredError::Decode(format!("CDATA is not UTF-8: {}", e)))?;
                    value.push_str(text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"field" => {
                    if let (Some(field), Some(msg)) = (current_field.take(), message.as_mut()) {
                        msg.fields.push(field);
                    }
                }
                b"message" if current_field.is_none() => finished = true,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    match message {
        Some(msg) if finished => Ok(msg),
        Some(msg) => Err(WiredError::Decode(format!(
            "Unterminated message {:?}",
            msg.name
        ))),
        None => Err(WiredError::Decode("Missing p7:message root".to_string())),
    }
}

fn trim_frame(frame: &[u8]) -> &[u8] {
    let frame = frame.strip_suffix(&[DELIMITER]).unwrap_or(frame);
    frame.trim_ascii()
}

fn name_attribute(element: &BytesStart<'_>) -> Result<String> {
    let attr = element
        .try_get_attribute("name")
        .map_err(|e| WiredError::Decode(format!("Bad attribute: {}", e)))?
        .ok_or_else(|| {
            WiredError::Decode(format!(
                "<{}> is missing its name attribute",
                String::from_utf8_lossy(element.name().as_ref())
            ))
        })?;

    let value = attr
        .unescape_value()
        .map_err(|e| WiredError::Decode(format!("Bad attribute value: {}", e)))?;
    Ok(value.into_owned())
}

fn unexpected_element(local_name: &[u8]) -> WiredError {
    WiredError::Decode(format!(
        "Unexpected element <{}>",
        String::from_utf8_lossy(local_name)
    ))
}
