use crate::config::env::{self, EnvKey};
use crate::infrastructure::transcode::CodecProfile;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Inconsistent pipeline configuration: {0}")]
    Inconsistent(String),
}

/// Everything the conversion pipeline needs: buckets, prefixes, the shared
/// output naming convention and the codec profile.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub media_bucket: String,
    pub staging_bucket: String,
    pub videos_prefix: String,
    pub staging_prefix: String,
    pub converted_prefixes: Vec<String>,
    pub name_modifier: String,
    pub large_mp4_threshold_bytes: u64,
    pub profile: CodecProfile,
    pub reconcile_grace: Duration,
}

pub const DEFAULT_LARGE_MP4_THRESHOLD: u64 = 500 * 1024 * 1024;

impl PipelineSettings {
    /// Defaults for a deployment where staging shares the media bucket.
    pub fn for_bucket(bucket: &str) -> Self {
        Self {
            media_bucket: bucket.to_string(),
            staging_bucket: bucket.to_string(),
            videos_prefix: "videos/".to_string(),
            staging_prefix: "staging/".to_string(),
            converted_prefixes: vec!["converted/".to_string()],
            name_modifier: "_converted".to_string(),
            large_mp4_threshold_bytes: DEFAULT_LARGE_MP4_THRESHOLD,
            profile: CodecProfile::default(),
            reconcile_grace: Duration::from_secs(2 * 60 * 60),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name_modifier.is_empty() {
            // An empty modifier would make the staged output name collide with
            // the input whenever staging and videos share a prefix.
            return Err(ConfigError::Inconsistent("NAME_MODIFIER must not be empty".to_string()));
        }
        if self.videos_prefix.is_empty() || self.staging_prefix.is_empty() {
            return Err(ConfigError::Inconsistent(
                "VIDEOS_PREFIX and STAGING_PREFIX must not be empty".to_string(),
            ));
        }
        if self.staging_bucket == self.media_bucket
            && (self.staging_prefix.starts_with(&self.videos_prefix)
                || self.videos_prefix.starts_with(&self.staging_prefix))
        {
            return Err(ConfigError::Inconsistent(format!(
                "staging prefix {} overlaps videos prefix {} in bucket {}",
                self.staging_prefix, self.videos_prefix, self.media_bucket
            )));
        }
        Ok(())
    }
}

/// Prefixes are compared with `starts_with`, keep them slash-terminated.
fn as_prefix(raw: String) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub max_upload_bytes: usize,
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    pub mediaconvert_role_arn: String,
    pub mediaconvert_queue: String,
    pub mediaconvert_endpoint: Option<String>,
    pub rabbitmq_url: String,
    pub object_created_queue: String,
    pub dead_letter_exchange: Option<String>,
    pub reconcile_schedule: String,
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let media_bucket = env::get_opt(EnvKey::MediaBucket)
            .ok_or(ConfigError::Missing(EnvKey::MediaBucket.as_str()))?;
        let defaults = PipelineSettings::for_bucket(&media_bucket);

        let pipeline = PipelineSettings {
            staging_bucket: env::get_or(EnvKey::StagingBucket, &media_bucket),
            videos_prefix: as_prefix(env::get_or(EnvKey::VideosPrefix, &defaults.videos_prefix)),
            staging_prefix: as_prefix(env::get_or(EnvKey::StagingPrefix, &defaults.staging_prefix)),
            converted_prefixes: env::get_list(EnvKey::ConvertedPrefixes, &["converted/"])
                .into_iter()
                .map(as_prefix)
                .filter(|p| !p.is_empty())
                .collect(),
            name_modifier: env::get_or(EnvKey::NameModifier, &defaults.name_modifier),
            large_mp4_threshold_bytes: env::get_parsed(
                EnvKey::LargeMp4ThresholdBytes,
                DEFAULT_LARGE_MP4_THRESHOLD,
            ),
            profile: CodecProfile {
                qvbr_quality_level: env::get_parsed(
                    EnvKey::VideoQvbrQuality,
                    defaults.profile.qvbr_quality_level,
                ),
                video_max_bitrate: env::get_parsed(
                    EnvKey::VideoMaxBitrate,
                    defaults.profile.video_max_bitrate,
                ),
                audio_bitrate: env::get_parsed(EnvKey::AudioBitrate, defaults.profile.audio_bitrate),
                audio_sample_rate: env::get_parsed(
                    EnvKey::AudioSampleRate,
                    defaults.profile.audio_sample_rate,
                ),
            },
            reconcile_grace: Duration::from_secs(env::get_parsed(
                EnvKey::ReconcileGraceSecs,
                defaults.reconcile_grace.as_secs(),
            )),
            media_bucket,
        };
        pipeline.validate()?;

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 5 * 1024 * 1024 * 1024),
            s3_endpoint: env::get_opt(EnvKey::S3Endpoint),
            aws_region: env::get_or(EnvKey::AwsRegion, "us-east-1"),
            aws_access_key: env::get_opt(EnvKey::AwsAccessKey),
            aws_secret_key: env::get_opt(EnvKey::AwsSecretKey),
            mediaconvert_role_arn: env::get_opt(EnvKey::MediaConvertRoleArn)
                .ok_or(ConfigError::Missing(EnvKey::MediaConvertRoleArn.as_str()))?,
            mediaconvert_queue: env::get_or(EnvKey::MediaConvertQueue, "Default"),
            mediaconvert_endpoint: env::get_opt(EnvKey::MediaConvertEndpoint),
            rabbitmq_url: env::get_opt(EnvKey::RabbitMqUrl)
                .ok_or(ConfigError::Missing(EnvKey::RabbitMqUrl.as_str()))?,
            object_created_queue: env::get_or(EnvKey::ObjectCreatedQueue, "object_created"),
            dead_letter_exchange: env::get_opt(EnvKey::DeadLetterExchange),
            reconcile_schedule: env::get_or(EnvKey::ReconcileSchedule, "0 */30 * * * *"),
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        assert!(PipelineSettings::for_bucket("media").validate().is_ok());
    }

    #[test]
    fn staging_inside_videos_is_rejected() {
        let mut settings = PipelineSettings::for_bucket("media");
        settings.staging_prefix = "videos/staging/".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Inconsistent(_))));

        // a separate staging bucket makes the same prefix harmless
        settings.staging_bucket = "scratch".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn empty_name_modifier_is_rejected() {
        let mut settings = PipelineSettings::for_bucket("media");
        settings.name_modifier.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn prefixes_are_slash_terminated() {
        assert_eq!(as_prefix("/videos".to_string()), "videos/");
        assert_eq!(as_prefix("a/b/".to_string()), "a/b/");
        assert_eq!(as_prefix("/".to_string()), "");
    }
}
