//! Rendering structured styled text to ANSI escape sequences.

use mud_engine::message::{LineEnding, OutboundText, Segment, Style};

fn ansi_code(style: Style) -> &'static [u8] {
    match style {
        Style::Bold => b"\x1b[1m",
        Style::Red => b"\x1b[31m",
        Style::Green => b"\x1b[32m",
        Style::Yellow => b"\x1b[33m",
        Style::Blue => b"\x1b[34m",
        Style::Magenta => b"\x1b[35m",
        Style::Cyan => b"\x1b[36m",
        Style::Reset => b"\x1b[0m",
    }
}

/// Renders a message for the wire. With `color` off, style tokens vanish and
/// only the text remains. With it on, any styled message gets a trailing
/// reset so attributes never leak into the next line.
pub fn render(text: &OutboundText, color: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut styled = false;
    for segment in &text.segments {
        match segment {
            Segment::Text(part) => out.extend_from_slice(part.as_bytes()),
            Segment::Style(style) => {
                if color {
                    styled = *style != Style::Reset;
                    out.extend_from_slice(ansi_code(*style));
                }
            }
        }
    }
    if styled {
        out.extend_from_slice(ansi_code(Style::Reset));
    }
    if text.ending == LineEnding::Crlf {
        out.extend_from_slice(b"\r\n");
    }
    out
}
