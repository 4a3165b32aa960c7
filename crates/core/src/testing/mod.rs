//! Testing utilities and mock implementations of the pipeline's collaborators.
//!
//! The mocks keep their state behind `Arc<RwLock<..>>` so tests can script
//! responses and inspect recorded calls while the orchestrator holds them.
//!
//! # Example
//!
//! ```rust,ignore
//! use morebetter_core::testing::{fixtures, MockTracker};
//!
//! let tracker = MockTracker::new();
//! tracker
//!     .add_group(fixtures::release_group(1, vec![fixtures::torrent(10, "CD", "FLAC", "Lossless")]))
//!     .await;
//! ```

mod mock_confirmer;
mod mock_encoder;
mod mock_packager;
mod mock_tag_checker;
mod mock_tracker;

pub use mock_confirmer::MockConfirmer;
pub use mock_encoder::MockEncoder;
pub use mock_packager::MockPackager;
pub use mock_tag_checker::MockTagChecker;
pub use mock_tracker::{MockTracker, RecordedUpload};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::release::{Artist, ArtistCredits, ReleaseGroup, Torrent};

    /// A torrent with an empty edition and no file information.
    pub fn torrent(id: u64, media: &str, format: &str, encoding: &str) -> Torrent {
        Torrent {
            id,
            group_id: None,
            media: media.to_string(),
            format: format.to_string(),
            encoding: encoding.to_string(),
            remastered: false,
            remaster_year: None,
            remaster_title: String::new(),
            remaster_record_label: String::new(),
            remaster_catalogue_number: String::new(),
            description: String::new(),
            file_path: String::new(),
            file_list: String::new(),
            seeders: 1,
            snatched: 0,
        }
    }

    /// A group credited to a single artist. Torrents are attached to it.
    pub fn release_group(id: u64, torrents: Vec<Torrent>) -> ReleaseGroup {
        ReleaseGroup {
            id,
            name: format!("Album {}", id),
            year: 2001,
            credits: ArtistCredits {
                artists: vec![Artist {
                    id: 1,
                    name: "Test Artist".to_string(),
                }],
                ..Default::default()
            },
            torrents: torrents
                .into_iter()
                .map(|mut t| {
                    t.group_id = Some(id);
                    t
                })
                .collect(),
        }
    }
}
