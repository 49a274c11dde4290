//! TCP/telnet transport for the world server.
//!
//! Implements the engine's connection-multiplexer trait over tokio TCP:
//! an accept loop, per-connection reader/writer tasks, telnet IAC filtering
//! with negotiation refusal, and styled-text to ANSI rendering with a
//! per-connection color toggle.

pub mod filter;
pub mod mux;
pub mod render;

pub use filter::TelnetFilter;
pub use mux::TelnetMux;
pub use render::render;
