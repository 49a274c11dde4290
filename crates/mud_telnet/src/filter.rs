//! Telnet input filtering and line assembly.
//!
//! [`TelnetFilter`] consumes raw socket bytes and produces complete input
//! lines with all telnet protocol noise removed. Negotiation is refused
//! outright: `IAC DO x` is answered with `IAC WONT x` and `IAC WILL x` with
//! `IAC DONT x`. Subnegotiation blocks (`IAC SB ... IAC SE`) are discarded.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Longest accepted input line; bytes beyond this are dropped.
const MAX_LINE_LEN: usize = 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subneg,
    SubnegIac,
}

/// Streaming filter: bytes in, clean lines and negotiation refusals out.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: ParseState,
    line: Vec<u8>,
}

/// Output of one [`TelnetFilter::push`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Complete input lines, decoded lossily as UTF-8, CR/LF stripped.
    pub lines: Vec<String>,
    /// Refusal bytes to write back to the peer.
    pub replies: Vec<u8>,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of raw bytes through the filter. State carries across
    /// calls, so sequences split over reads are handled.
    pub fn push(&mut self, chunk: &[u8]) -> Filtered {
        let mut out = Filtered::default();
        for &byte in chunk {
            match self.state {
                ParseState::Data => match byte {
                    IAC => self.state = ParseState::Iac,
                    b'\n' => self.finish_line(&mut out),
                    b'\r' | 0 => {}
                    _ => {
                        if self.line.len() < MAX_LINE_LEN {
                            self.line.push(byte);
                        }
                    }
                },
                ParseState::Iac => match byte {
                    // IAC IAC escapes a literal 0xff data byte.
                    IAC => {
                        if self.line.len() < MAX_LINE_LEN {
                            self.line.push(IAC);
                        }
                        self.state = ParseState::Data;
                    }
                    DO | DONT | WILL | WONT => self.state = ParseState::Negotiate(byte),
                    SB => self.state = ParseState::Subneg,
                    // Two-byte commands (NOP, GA, ...) carry nothing.
                    _ => self.state = ParseState::Data,
                },
                ParseState::Negotiate(cmd) => {
                    match cmd {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    self.state = ParseState::Data;
                }
                ParseState::Subneg => {
                    if byte == IAC {
                        self.state = ParseState::SubnegIac;
                    }
                }
                ParseState::SubnegIac => {
                    self.state = if byte == SE {
                        ParseState::Data
                    } else {
                        ParseState::Subneg
                    };
                }
            }
        }
        out
    }

    fn finish_line(&mut self, out: &mut Filtered) {
        let raw = std::mem::take(&mut self.line);
        out.lines.push(String::from_utf8_lossy(&raw).into_owned());
    }
}
