//! External media toolchain wrapper.
//!
//! This crate provides:
//! - Container probing via `ffprobe` JSON output
//! - Streaming PCM decode through an external decoder process
//! - Cancellation that kills and reaps the child, never orphaning it
//!
//! The decoder is specified by its interface, not its identity: any binary
//! that reads a media file, writes raw PCM on stdout and `key=value`
//! progress lines on stderr satisfies the contract (`DECODER_BINARY`).

pub mod decode;
pub mod error;
pub mod probe;

pub use decode::{extract_wav, DecoderConfig, PcmDecoder};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
