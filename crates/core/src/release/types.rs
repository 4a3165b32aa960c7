//! Release groups, torrents and candidates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lossless source media accepted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Cd,
    Dvd,
    Vinyl,
    Soundboard,
    Sacd,
    Dat,
    Web,
    BluRay,
}

impl MediaType {
    pub const ALL: [MediaType; 8] = [
        MediaType::Cd,
        MediaType::Dvd,
        MediaType::Vinyl,
        MediaType::Soundboard,
        MediaType::Sacd,
        MediaType::Dat,
        MediaType::Web,
        MediaType::BluRay,
    ];

    /// Configuration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Cd => "cd",
            MediaType::Dvd => "dvd",
            MediaType::Vinyl => "vinyl",
            MediaType::Soundboard => "soundboard",
            MediaType::Sacd => "sacd",
            MediaType::Dat => "dat",
            MediaType::Web => "web",
            MediaType::BluRay => "blu-ray",
        }
    }

    /// The label the tracker uses in search parameters and torrent metadata.
    pub fn tracker_label(&self) -> &'static str {
        match self {
            MediaType::Cd => "CD",
            MediaType::Dvd => "DVD",
            MediaType::Vinyl => "Vinyl",
            MediaType::Soundboard => "Soundboard",
            MediaType::Sacd => "SACD",
            MediaType::Dat => "DAT",
            MediaType::Web => "WEB",
            MediaType::BluRay => "Blu-ray",
        }
    }

    /// Every lossless media type.
    pub fn all() -> BTreeSet<MediaType> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    /// Accepts both configuration keys and tracker labels, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MediaType::ALL
            .into_iter()
            .find(|m| {
                m.as_str().eq_ignore_ascii_case(wanted) || m.tracker_label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unsupported media type '{}'", wanted))
    }
}

/// An artist credit on a release group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

/// Artist credits by role, as the tracker groups them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistCredits {
    pub composers: Vec<Artist>,
    pub dj: Vec<Artist>,
    pub artists: Vec<Artist>,
    pub with: Vec<Artist>,
    pub conductor: Vec<Artist>,
    pub remixed_by: Vec<Artist>,
    pub producer: Vec<Artist>,
}

/// One concrete encoding of a release within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Torrent {
    pub id: u64,
    #[serde(default)]
    pub group_id: Option<u64>,
    pub media: String,
    pub format: String,
    pub encoding: String,
    #[serde(default)]
    pub remastered: bool,
    #[serde(default)]
    pub remaster_year: Option<u32>,
    #[serde(default)]
    pub remaster_title: String,
    #[serde(default)]
    pub remaster_record_label: String,
    #[serde(default)]
    pub remaster_catalogue_number: String,
    #[serde(default)]
    pub description: String,
    /// Directory path of a multi-file torrent, empty for a single flat file.
    #[serde(default)]
    pub file_path: String,
    /// Gazelle file list descriptor: `name{{{size}}}|||name{{{size}}}`.
    #[serde(default)]
    pub file_list: String,
    #[serde(default)]
    pub seeders: u32,
    #[serde(default)]
    pub snatched: u32,
}

impl Torrent {
    /// The edition this torrent belongs to within its group.
    pub fn edition_key(&self) -> EditionKey {
        EditionKey {
            media: self.media.to_ascii_lowercase(),
            remaster_year: self.remaster_year,
            remaster_title: self.remaster_title.trim().to_string(),
            remaster_record_label: self.remaster_record_label.trim().to_string(),
            remaster_catalogue_number: self.remaster_catalogue_number.trim().to_string(),
        }
    }

    pub fn explicit_path(&self) -> Option<&str> {
        let path = self.file_path.trim();
        (!path.is_empty()).then_some(path)
    }

    /// File names from the file list descriptor, in order.
    pub fn listed_files(&self) -> Vec<String> {
        self.file_list
            .split("|||")
            .filter_map(|entry| {
                let name = entry.split("{{{").next().unwrap_or_default().trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }
}

/// Torrents sharing this key are the same release edition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditionKey {
    pub media: String,
    pub remaster_year: Option<u32>,
    pub remaster_title: String,
    pub remaster_record_label: String,
    pub remaster_catalogue_number: String,
}

/// A logical album entry on the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseGroup {
    pub id: u64,
    pub name: String,
    pub year: u32,
    #[serde(default)]
    pub credits: ArtistCredits,
    pub torrents: Vec<Torrent>,
}

impl ReleaseGroup {
    pub fn torrent(&self, torrent_id: u64) -> Option<&Torrent> {
        self.torrents.iter().find(|t| t.id == torrent_id)
    }

    /// Torrents in the same edition as `torrent`, including itself.
    pub fn edition_of<'a>(&'a self, torrent: &Torrent) -> impl Iterator<Item = &'a Torrent> {
        let key = torrent.edition_key();
        self.torrents.iter().filter(move |t| t.edition_key() == key)
    }
}

/// A release awaiting evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub group_id: u64,
    pub torrent_id: u64,
}

impl Candidate {
    pub fn new(group_id: u64, torrent_id: u64) -> Self {
        Self {
            group_id,
            torrent_id,
        }
    }

    /// Identifier stored in the ledger.
    pub fn ledger_id(&self) -> String {
        self.torrent_id.to_string()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {} / torrent {}", self.group_id, self.torrent_id)
    }
}
