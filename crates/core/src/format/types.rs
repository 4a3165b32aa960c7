//! Format specifications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which external encoder produces a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Flac,
    Lame,
}

/// Identifier for a configured output format.
///
/// Parsed case-insensitively from configuration (`flac`, `v0`, `v2`, `320`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatKey {
    #[serde(rename = "FLAC", alias = "flac")]
    Flac,
    #[serde(rename = "V0", alias = "v0")]
    V0,
    #[serde(rename = "V2", alias = "v2")]
    V2,
    #[serde(rename = "320")]
    Mp3_320,
}

impl FormatKey {
    /// Returns the static spec for this key.
    pub fn spec(self) -> &'static FormatSpec {
        match self {
            FormatKey::Flac => &FLAC,
            FormatKey::V0 => &MP3_V0,
            FormatKey::V2 => &MP3_V2,
            FormatKey::Mp3_320 => &MP3_320,
        }
    }

    /// Short configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKey::Flac => "FLAC",
            FormatKey::V0 => "V0",
            FormatKey::V2 => "V2",
            FormatKey::Mp3_320 => "320",
        }
    }
}

impl fmt::Display for FormatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for FormatKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for FormatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flac" => Ok(FormatKey::Flac),
            "v0" => Ok(FormatKey::V0),
            "v2" => Ok(FormatKey::V2),
            "320" => Ok(FormatKey::Mp3_320),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

/// A (format, encoding) target with everything needed to produce it.
#[derive(Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub key: FormatKey,
    /// Tracker format tag, e.g. "MP3".
    pub format: &'static str,
    /// Tracker encoding tag, e.g. "V0 (VBR)".
    pub encoding: &'static str,
    /// Human readable name used in directory names, e.g. "MP3 V0".
    pub name: &'static str,
    /// Output file extension including the dot.
    pub extension: &'static str,
    pub encoder: EncoderKind,
    /// Options passed to the encoder binary.
    pub encoder_options: &'static str,
}

impl FormatSpec {
    /// Whether a torrent with the given tags is this format.
    pub fn matches(&self, format: &str, encoding: &str) -> bool {
        self.format.eq_ignore_ascii_case(format) && self.encoding.eq_ignore_ascii_case(encoding)
    }

    pub fn is_lossless(&self) -> bool {
        self.encoder == EncoderKind::Flac
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub static FLAC: FormatSpec = FormatSpec {
    key: FormatKey::Flac,
    format: "FLAC",
    encoding: "Lossless",
    name: "FLAC",
    extension: ".flac",
    encoder: EncoderKind::Flac,
    encoder_options: "--best",
};

pub static MP3_V0: FormatSpec = FormatSpec {
    key: FormatKey::V0,
    format: "MP3",
    encoding: "V0 (VBR)",
    name: "MP3 V0",
    extension: ".mp3",
    encoder: EncoderKind::Lame,
    encoder_options: "-V 0 --vbr-new --ignore-tag-errors",
};

pub static MP3_V2: FormatSpec = FormatSpec {
    key: FormatKey::V2,
    format: "MP3",
    encoding: "V2 (VBR)",
    name: "MP3 V2",
    extension: ".mp3",
    encoder: EncoderKind::Lame,
    encoder_options: "-V 2 --vbr-new --ignore-tag-errors",
};

pub static MP3_320: FormatSpec = FormatSpec {
    key: FormatKey::Mp3_320,
    format: "MP3",
    encoding: "320",
    name: "MP3 320",
    extension: ".mp3",
    encoder: EncoderKind::Lame,
    encoder_options: "-h -b 320 --ignore-tag-errors",
};

pub static ALL_FORMATS: [&FormatSpec; 4] = [&FLAC, &MP3_V0, &MP3_V2, &MP3_320];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing_is_case_insensitive() {
        assert_eq!("flac".parse::<FormatKey>().unwrap(), FormatKey::Flac);
        assert_eq!("FLAC".parse::<FormatKey>().unwrap(), FormatKey::Flac);
        assert_eq!(" v0 ".parse::<FormatKey>().unwrap(), FormatKey::V0);
        assert_eq!("320".parse::<FormatKey>().unwrap(), FormatKey::Mp3_320);
        assert!("aac".parse::<FormatKey>().is_err());
    }

    #[test]
    fn test_spec_lookup_round_trips_key() {
        for spec in ALL_FORMATS {
            assert_eq!(spec.key.spec(), spec);
        }
    }

    #[test]
    fn test_matches_ignores_case() {
        assert!(MP3_V0.matches("mp3", "v0 (vbr)"));
        assert!(!MP3_V0.matches("MP3", "320"));
        assert!(FLAC.matches("FLAC", "Lossless"));
        assert!(!FLAC.matches("FLAC", "24bit Lossless"));
    }

    #[test]
    fn test_deserialize_keys() {
        #[derive(Deserialize)]
        struct Wrapper {
            formats: Vec<FormatKey>,
        }
        let parsed: Wrapper = toml::from_str(r#"formats = ["FLAC", "v0", "320"]"#).unwrap();
        assert_eq!(
            parsed.formats,
            vec![FormatKey::Flac, FormatKey::V0, FormatKey::Mp3_320]
        );
    }
}
