//! Process pipelines for a single track.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ToolsConfig;
use crate::format::{EncoderKind, FormatSpec};

/// ID3 frames lame writes, keyed by the Vorbis comment they come from.
const LAME_TAG_OPTIONS: [(&str, &str); 5] = [
    ("title", "--tt"),
    ("artist", "--ta"),
    ("album", "--tl"),
    ("genre", "--tg"),
    ("comment", "--tc"),
];

/// Vorbis comments carried into a FLAC re-encode.
const FLAC_CARRIED_TAGS: [&str; 10] = [
    "title",
    "artist",
    "album",
    "albumartist",
    "date",
    "genre",
    "tracknumber",
    "tracktotal",
    "discnumber",
    "comment",
];

/// Target rate for resampling `rate`: the 44.1 kHz or 48 kHz family base.
pub fn resample_target(rate: u32) -> Option<u32> {
    if rate > 0 && rate % 44_100 == 0 {
        Some(44_100)
    } else if rate > 0 && rate % 48_000 == 0 {
        Some(48_000)
    } else {
        None
    }
}

fn tool(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn split_options(options: &str) -> impl Iterator<Item = String> + '_ {
    options.split_whitespace().map(str::to_string)
}

/// Builds the argv of every process in the pipeline for one track.
///
/// `resample_rate` is set when the track must be dithered down to 16 bit at
/// that rate. Tags are copied into the output through encoder options.
pub fn pipeline_commands(
    tools: &ToolsConfig,
    spec: &FormatSpec,
    resample_rate: Option<u32>,
    input: &Path,
    output: &Path,
    tags: &BTreeMap<String, String>,
) -> Vec<Vec<String>> {
    let input = input.to_string_lossy().to_string();
    let output = output.to_string_lossy().to_string();

    // sox writes FLAC itself, so a resampled FLAC target is a single process.
    if let (EncoderKind::Flac, Some(rate)) = (spec.encoder, resample_rate) {
        return vec![vec![
            tool(&tools.sox),
            input,
            "-G".to_string(),
            "-b".to_string(),
            "16".to_string(),
            output,
            "rate".to_string(),
            "-v".to_string(),
            "-L".to_string(),
            rate.to_string(),
            "dither".to_string(),
        ]];
    }

    let decoder = match resample_rate {
        Some(rate) => vec![
            tool(&tools.sox),
            input,
            "-G".to_string(),
            "-b".to_string(),
            "16".to_string(),
            "-t".to_string(),
            "wav".to_string(),
            "-".to_string(),
            "rate".to_string(),
            "-v".to_string(),
            "-L".to_string(),
            rate.to_string(),
            "dither".to_string(),
        ],
        None => vec![
            tool(&tools.flac),
            "-dcs".to_string(),
            "--".to_string(),
            input,
        ],
    };

    let encoder = match spec.encoder {
        EncoderKind::Lame => {
            let mut args = vec![tool(&tools.lame), "-S".to_string()];
            args.extend(split_options(spec.encoder_options));
            args.extend(lame_tag_args(tags));
            args.push("-".to_string());
            args.push(output);
            args
        }
        EncoderKind::Flac => {
            let mut args = vec![tool(&tools.flac)];
            args.extend(split_options(spec.encoder_options));
            for name in FLAC_CARRIED_TAGS {
                if let Some(value) = tags.get(name).filter(|v| !v.trim().is_empty()) {
                    args.push("-T".to_string());
                    args.push(format!("{}={}", name.to_ascii_uppercase(), value));
                }
            }
            args.push("-o".to_string());
            args.push(output);
            args.push("-".to_string());
            args
        }
    };

    vec![decoder, encoder]
}

fn lame_tag_args(tags: &BTreeMap<String, String>) -> Vec<String> {
    let get = |name: &str| tags.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());
    let mut args = vec!["--add-id3v2".to_string()];

    for (name, option) in LAME_TAG_OPTIONS {
        if let Some(value) = get(name) {
            args.push(option.to_string());
            args.push(value.to_string());
        }
    }

    if let Some(date) = get("date").or_else(|| get("year")) {
        let year: String = date.chars().take(4).collect();
        args.push("--ty".to_string());
        args.push(year);
    }

    if let Some(number) = get("tracknumber") {
        let track = match get("tracktotal").or_else(|| get("totaltracks")) {
            Some(total) if !number.contains('/') => format!("{}/{}", number, total),
            _ => number.to_string(),
        };
        args.push("--tn".to_string());
        args.push(track);
    }

    if let Some(album_artist) = get("albumartist") {
        args.push("--tv".to_string());
        args.push(format!("TPE2={}", album_artist));
    }
    if let Some(disc) = get("discnumber") {
        args.push("--tv".to_string());
        args.push(format!("TPOS={}", disc));
    }

    args
}

/// Quotes an argument for display in a POSIX shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Joins an argv into one shell-quoted command line.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tool-name command lines for a pipeline, without tags.
pub fn describe_pipeline(
    spec: &FormatSpec,
    resample_rate: Option<u32>,
    input: &str,
    output: &str,
) -> Vec<String> {
    pipeline_commands(
        &ToolsConfig::default(),
        spec,
        resample_rate,
        Path::new(input),
        Path::new(output),
        &BTreeMap::new(),
    )
    .iter()
    .map(|args| shell_join(args))
    .collect()
}
