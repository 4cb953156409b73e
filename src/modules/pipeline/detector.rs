use crate::config::settings::PipelineSettings;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Containers that are never served as-is.
pub const ALWAYS_CONVERT: &[&str] = &[
    "ts", "avi", "mov", "mkv", "wmv", "flv", "webm", "m2ts", "mts", "ogv", "3gp", "m4v", "vob",
    "asf", "rm", "rmvb",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConvertReason {
    Container { extension: String },
    LargeMp4 { size_bytes: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyConverted,
    OutsideVideos,
    CanonicalMp4,
    NotVideo,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::AlreadyConverted => "already_converted",
            SkipReason::OutsideVideos => "outside_videos",
            SkipReason::CanonicalMp4 => "canonical_mp4",
            SkipReason::NotVideo => "not_video",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Convert(ConvertReason),
    Skip(SkipReason),
}

/// Decides whether a newly created object should be transcoded. Pure.
#[derive(Debug, Clone)]
pub struct IngestionDetector {
    videos_prefix: String,
    excluded_prefixes: Vec<String>,
    large_mp4_threshold_bytes: u64,
}

impl IngestionDetector {
    pub fn new(settings: &PipelineSettings) -> Self {
        let mut excluded_prefixes = settings.converted_prefixes.clone();
        if settings.staging_bucket == settings.media_bucket {
            excluded_prefixes.push(settings.staging_prefix.clone());
        }
        Self {
            videos_prefix: settings.videos_prefix.clone(),
            excluded_prefixes,
            large_mp4_threshold_bytes: settings.large_mp4_threshold_bytes,
        }
    }

    pub fn classify(&self, key: &str, size_bytes: u64) -> Verdict {
        if self.excluded_prefixes.iter().any(|p| key.starts_with(p.as_str()))
            || key.contains("/converted/")
        {
            return Verdict::Skip(SkipReason::AlreadyConverted);
        }
        if !key.starts_with(&self.videos_prefix) {
            return Verdict::Skip(SkipReason::OutsideVideos);
        }

        let extension = match extension_of(key) {
            Some(ext) => ext,
            None => return Verdict::Skip(SkipReason::NotVideo),
        };

        if ALWAYS_CONVERT.contains(&extension.as_str()) {
            return Verdict::Convert(ConvertReason::Container { extension });
        }
        if extension == "mp4" {
            if size_bytes > self.large_mp4_threshold_bytes {
                return Verdict::Convert(ConvertReason::LargeMp4 { size_bytes });
            }
            return Verdict::Skip(SkipReason::CanonicalMp4);
        }
        Verdict::Skip(SkipReason::NotVideo)
    }

    pub fn needs_conversion(&self, key: &str, size_bytes: u64) -> bool {
        matches!(self.classify(key, size_bytes), Verdict::Convert(_))
    }
}

fn extension_of(key: &str) -> Option<String> {
    let filename = key.rsplit('/').next().unwrap_or(key);
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            Some(filename[idx + 1..].to_ascii_lowercase())
        }
        _ => None,
    }
}
