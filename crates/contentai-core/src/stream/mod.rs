//! NDJSON stream decoding for the chat endpoint.
//!
//! The chat endpoint answers with a chunked body in which every line is one
//! JSON object tagged by `type`. This module:
//! 1. Buffers raw bytes (chunks do not respect line boundaries)
//! 2. Splits complete lines off the buffer
//! 3. Parses each line independently, skipping blank or malformed ones
//! 4. Maps the parsed JSON onto [`StreamEvent`]

mod cancel;
mod decoder;
mod event;

pub use cancel::CancelToken;
pub use decoder::{decode_reader, parse_line, ReadEnd, StreamDecoder, READ_CHUNK_SIZE};
pub use event::StreamEvent;
