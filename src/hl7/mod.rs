//! HL7 v2 segment model.
//!
//! - [`parser`] - byte decoding, message splitting and field/component addressing
//! - [`segments`] - typed accessors for the MSH, PID, PV1 and ZBE fields used by the engine
//!
//! # Example
//!
//! ```rust
//! use wardsync::hl7::{split_file, AdtMessage};
//!
//! let body = b"MSH|^~\\&|HIS|KH|RCV|KH|20230101120000||ADT^A01|1|P|2.5\nPID|1|1441645\n";
//! let (messages, _) = split_file(body);
//! let message = AdtMessage::parse(&messages[0]).unwrap();
//! assert_eq!(message.trigger_event(), "A01");
//! ```

pub mod parser;
pub mod segments;

pub use parser::{decode_latin1, normalize_line_endings, split_messages, RawMessage, Segment};
pub use segments::{AdtMessage, PatientLocation};

/// Decodes a feed file body and splits it into message texts
///
/// Returns the messages and the number of segments found before the first
/// `MSH`, which are discarded.
pub fn split_file(bytes: &[u8]) -> (Vec<String>, usize) {
    let text = normalize_line_endings(&decode_latin1(bytes));
    split_messages(&text)
}
