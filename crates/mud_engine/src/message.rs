//! Structured styled text sent to players.
//!
//! The engine never emits terminal escape sequences. Outgoing text is a
//! sequence of [`Segment`] tokens which the connection multiplexer renders
//! for its transport (ANSI for telnet, stripped when the player has color
//! disabled). This keeps presentation out of game logic and lets tests
//! assert on message content without parsing escape codes.

use serde::{Deserialize, Serialize};

/// A text attribute a renderer may honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Style {
    Bold,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    Reset,
}

/// One token of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    Style(Style),
}

/// Terminator appended after the segments.
///
/// Prompts use [`LineEnding::None`] so the cursor stays on the prompt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Crlf,
    None,
}

/// A complete styled message destined for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundText {
    pub segments: Vec<Segment>,
    pub ending: LineEnding,
}

impl OutboundText {
    /// Creates an empty message terminated by CRLF.
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            ending: LineEnding::Crlf,
        }
    }

    /// Creates a plain one-segment message terminated by CRLF.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().text(text)
    }

    /// Appends a text segment.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Text(text.into()));
        self
    }

    /// Appends a style token.
    pub fn style(mut self, style: Style) -> Self {
        self.segments.push(Segment::Style(style));
        self
    }

    /// Suppresses the trailing CRLF. Used for prompts.
    pub fn without_newline(mut self) -> Self {
        self.ending = LineEnding::None;
        self
    }

    /// Concatenated text content with style tokens ignored.
    pub fn as_plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if let Segment::Text(text) = segment {
                out.push_str(text);
            }
        }
        out
    }
}

impl Default for OutboundText {
    fn default() -> Self {
        Self::new()
    }
}
