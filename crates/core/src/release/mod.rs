//! Tracker release model.
//!
//! A [`ReleaseGroup`] is one album on the tracker and owns every [`Torrent`]
//! encoding of it. Torrents sharing an [`EditionKey`] are the same edition, which
//! is the scope format gaps are computed in.

mod naming;
mod types;

pub use naming::{
    flat_source_dir_name, formatted_artists, media_info, sanitize_component, transcode_dir_name,
    unescape_html,
};
pub use types::{Artist, ArtistCredits, Candidate, EditionKey, MediaType, ReleaseGroup, Torrent};
