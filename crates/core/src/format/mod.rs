//! Output format table.
//!
//! Every format the pipeline can produce is a static [`FormatSpec`]. Configuration
//! refers to them through [`FormatKey`], and the allowed-transcode rule decides
//! which of them a given source may legally produce.

mod rules;
mod types;

pub use rules::{allowed_transcodes, is_lossless_encoding, is_pre_emphasised};
pub use types::{EncoderKind, FormatKey, FormatSpec, ALL_FORMATS, FLAC, MP3_320, MP3_V0, MP3_V2};
