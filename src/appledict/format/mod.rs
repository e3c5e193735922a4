//! Container format parsing layer.
//!
//! # Module Organization
//!
//! - [`block`]: Reads and validates block framing and payloads
//! - [`titles`]: Locates headword titles in inflated markup
//!
//! # Architecture
//!
//! ```text
//! Container Structure:
//! ┌─────────────────┐
//! │  Preamble       │ ← not interpreted (first block at 0x60)
//! ├─────────────────┤
//! │  Block header   │ ← block::BlockReader::read_header()
//! │  zlib payload   │ ← block::BlockReader::read_payload()
//! ├─────────────────┤
//! │  Block header   │
//! │  zlib payload   │
//! ├─────────────────┤
//! │  ...            │
//! └─────────────────┘
//! ```

pub mod block;
pub mod titles;
