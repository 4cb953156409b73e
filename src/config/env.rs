use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    MaxUploadBytes,
    S3Endpoint,
    AwsRegion,
    AwsAccessKey,
    AwsSecretKey,
    MediaBucket,
    StagingBucket,
    VideosPrefix,
    StagingPrefix,
    ConvertedPrefixes,
    NameModifier,
    LargeMp4ThresholdBytes,
    MediaConvertRoleArn,
    MediaConvertQueue,
    MediaConvertEndpoint,
    VideoQvbrQuality,
    VideoMaxBitrate,
    AudioBitrate,
    AudioSampleRate,
    RabbitMqUrl,
    ObjectCreatedQueue,
    DeadLetterExchange,
    ReconcileSchedule,
    ReconcileGraceSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::AwsRegion => "AWS_REGION",
            EnvKey::AwsAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::MediaBucket => "MEDIA_BUCKET",
            EnvKey::StagingBucket => "STAGING_BUCKET",
            EnvKey::VideosPrefix => "VIDEOS_PREFIX",
            EnvKey::StagingPrefix => "STAGING_PREFIX",
            EnvKey::ConvertedPrefixes => "CONVERTED_PREFIXES",
            EnvKey::NameModifier => "NAME_MODIFIER",
            EnvKey::LargeMp4ThresholdBytes => "LARGE_MP4_THRESHOLD_BYTES",
            EnvKey::MediaConvertRoleArn => "MEDIACONVERT_ROLE_ARN",
            EnvKey::MediaConvertQueue => "MEDIACONVERT_QUEUE",
            EnvKey::MediaConvertEndpoint => "MEDIACONVERT_ENDPOINT",
            EnvKey::VideoQvbrQuality => "VIDEO_QVBR_QUALITY",
            EnvKey::VideoMaxBitrate => "VIDEO_MAX_BITRATE",
            EnvKey::AudioBitrate => "AUDIO_BITRATE",
            EnvKey::AudioSampleRate => "AUDIO_SAMPLE_RATE",
            EnvKey::RabbitMqUrl => "RABBITMQ_URL",
            EnvKey::ObjectCreatedQueue => "OBJECT_CREATED_QUEUE",
            EnvKey::DeadLetterExchange => "DEAD_LETTER_EXCHANGE",
            EnvKey::ReconcileSchedule => "RECONCILE_SCHEDULE",
            EnvKey::ReconcileGraceSecs => "RECONCILE_GRACE_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Unset and blank variables both read as `None`.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Comma-separated list, empty entries dropped.
pub fn get_list(key: EnvKey, default: &[&str]) -> Vec<String> {
    match get_opt(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        None => default.iter().map(|item| item.to_string()).collect(),
    }
}
