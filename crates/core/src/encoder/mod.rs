//! Encoder module for transcoding FLAC releases.
//!
//! This module provides the `Encoder` trait and `PipelineEncoder`, which runs
//! the external decode and encode tools (`flac`, `sox`, `lame`) as a process
//! pipeline per track.
//!
//! # Example
//!
//! ```ignore
//! use morebetter_core::encoder::{Encoder, PipelineEncoder, TranscodeRequest};
//! use morebetter_core::format::MP3_V0;
//!
//! let encoder = PipelineEncoder::new(ToolsConfig::default());
//!
//! let info = encoder.inspect(Path::new("/music/Artist - Album [FLAC]")).await?;
//! println!("{} tracks, {} bit", info.tracks, info.max_bit_depth);
//!
//! let dir = encoder
//!     .transcode_release(&TranscodeRequest {
//!         source_dir: PathBuf::from("/music/Artist - Album [FLAC]"),
//!         output_dir: PathBuf::from("/music/transcodes"),
//!         spec: &MP3_V0,
//!         dir_name: "Artist - 2001 - Album {CD} [MP3 V0]".to_string(),
//!         max_workers: 4,
//!     })
//!     .await?;
//! ```

mod commands;
mod error;
mod files;
mod pipeline;
mod probe;
mod traits;
mod types;

pub use commands::{describe_pipeline, pipeline_commands, resample_target, shell_join};
pub use error::EncoderError;
pub use files::{find_files, AUXILIARY_EXTENSIONS};
pub use pipeline::PipelineEncoder;
pub use probe::{parse_probe_output, probe_track};
pub use traits::Encoder;
pub use types::{SourceInfo, TrackInfo, TranscodeRequest};
