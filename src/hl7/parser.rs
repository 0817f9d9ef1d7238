//! HL7 v2 wire parsing
//!
//! Turns the raw bytes of a feed file into messages, and a message into
//! segments with field/component addressing. Nothing here knows about ADT
//! semantics; see [`crate::hl7::segments`] for the typed accessors.

use crate::domain::errors::Hl7Error;

/// Segment terminator after normalisation
pub const SEGMENT_TERMINATOR: char = '\r';

/// Decodes an ISO-8859-1 byte buffer
///
/// Every byte maps to the Unicode code point of the same value, so decoding
/// never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Normalises `\r\n` and bare `\n` line endings to the HL7 segment terminator
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\r").replace('\n', "\r")
}

/// Splits a normalised file body into message texts
///
/// A message starts at every segment whose id is `MSH`. Blank segments are
/// dropped. Segments before the first `MSH` cannot belong to any message and
/// are discarded; the number of discarded segments is returned alongside.
pub fn split_messages(text: &str) -> (Vec<String>, usize) {
    let mut messages: Vec<Vec<&str>> = Vec::new();
    let mut orphaned = 0;

    for segment in text.split(SEGMENT_TERMINATOR) {
        let segment = segment.trim_matches(|c: char| c == '\u{0b}' || c == '\u{1c}');
        if segment.trim().is_empty() {
            continue;
        }

        if segment.starts_with("MSH") {
            messages.push(vec![segment]);
        } else if let Some(current) = messages.last_mut() {
            current.push(segment);
        } else {
            orphaned += 1;
        }
    }

    let messages = messages
        .into_iter()
        .map(|segments| segments.join("\r"))
        .collect();

    (messages, orphaned)
}

/// Delimiters declared by MSH-1 and MSH-2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Reads the delimiters from the leading `MSH` segment text
    fn from_header(header: &str) -> Result<Self, Hl7Error> {
        let mut chars = header.chars().skip(3);
        let field = chars
            .next()
            .ok_or_else(|| Hl7Error::message("MSH segment has no field separator"))?;

        let defaults = Self::default();
        let encoding: Vec<char> = chars.take_while(|&c| c != field).collect();
        if encoding.is_empty() {
            return Err(Hl7Error::message("MSH-2 encoding characters are empty"));
        }

        Ok(Self {
            field,
            component: encoding.first().copied().unwrap_or(defaults.component),
            repetition: encoding.get(1).copied().unwrap_or(defaults.repetition),
            escape: encoding.get(2).copied().unwrap_or(defaults.escape),
            subcomponent: encoding.get(3).copied().unwrap_or(defaults.subcomponent),
        })
    }
}

/// One segment of a message
///
/// Fields are stored 1-based as in the HL7 standard: for `MSH` the field
/// separator itself is field 1 and the encoding characters are field 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    id: String,
    fields: Vec<String>,
    delimiters: Delimiters,
}

impl Segment {
    fn parse(text: &str, delimiters: Delimiters) -> Self {
        let mut tokens = text.split(delimiters.field);
        let id = tokens.next().unwrap_or_default().to_string();

        let mut fields = Vec::new();
        if id == "MSH" {
            fields.push(delimiters.field.to_string());
        }
        fields.extend(tokens.map(str::to_string));

        Self {
            id,
            fields,
            delimiters,
        }
    }

    /// Segment id, e.g. `PV1`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// First repetition of field `n` (1-based); empty when absent
    pub fn field(&self, n: usize) -> &str {
        if n == 0 {
            return "";
        }
        let raw = self.fields.get(n - 1).map(String::as_str).unwrap_or("");
        if self.id == "MSH" && n <= 2 {
            return raw;
        }
        raw.split(self.delimiters.repetition).next().unwrap_or("")
    }

    /// Component `c` (1-based) of field `n`; empty when absent
    ///
    /// Subcomponents are not split; a component is returned with any `&`
    /// content intact.
    pub fn component(&self, n: usize, c: usize) -> &str {
        if c == 0 {
            return "";
        }
        self.field(n)
            .split(self.delimiters.component)
            .nth(c - 1)
            .unwrap_or("")
    }
}

/// A parsed message: its delimiters and segments in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    delimiters: Delimiters,
    segments: Vec<Segment>,
}

impl RawMessage {
    /// Parses one message text whose segments are separated by `\r`
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` when the text does not start with an `MSH`
    /// segment or MSH does not declare its delimiters.
    pub fn parse(text: &str) -> Result<Self, Hl7Error> {
        let text = text.trim_start();
        if !text.starts_with("MSH") {
            return Err(Hl7Error::message("message does not start with MSH"));
        }

        let header = text.split(SEGMENT_TERMINATOR).next().unwrap_or_default();
        let delimiters = Delimiters::from_header(header)?;

        let segments = text
            .split(SEGMENT_TERMINATOR)
            .filter(|s| !s.trim().is_empty())
            .map(|s| Segment::parse(s, delimiters))
            .collect();

        Ok(Self {
            delimiters,
            segments,
        })
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// First segment with the given id
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// First segment with the given id, or `MissingSegment`
    pub fn require(&self, id: &'static str) -> Result<&Segment, Hl7Error> {
        self.segment(id).ok_or(Hl7Error::MissingSegment(id))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
