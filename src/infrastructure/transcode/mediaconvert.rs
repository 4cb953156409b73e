use super::{TranscodeEngine, TranscodeError, TranscodeJobSpec};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_mediaconvert::error::DisplayErrorContext;
use aws_sdk_mediaconvert::types::{
    AacCodingMode, AacSettings, AudioCodec, AudioCodecSettings, AudioDefaultSelection,
    AudioDescription, AudioSelector, ContainerSettings, ContainerType, FileGroupSettings,
    H264QvbrSettings, H264RateControlMode, H264SceneChangeDetect, H264Settings, Input,
    JobSettings, Mp4MoovPlacement, Mp4Settings, Output, OutputGroup, OutputGroupSettings,
    OutputGroupType, VideoCodec, VideoCodecSettings, VideoDescription, VideoSelector,
};
use aws_sdk_mediaconvert::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

const AUDIO_SELECTOR: &str = "Audio Selector 1";
const OUTPUT_GROUP_NAME: &str = "File Group";

/// MediaConvert-backed engine. The account endpoint is resolved on first use
/// and reused for the lifetime of the process.
#[derive(Clone)]
pub struct MediaConvertEngine {
    sdk_config: SdkConfig,
    endpoint_override: Option<String>,
    role_arn: String,
    queue: String,
    client: Arc<OnceCell<Client>>,
}

impl MediaConvertEngine {
    pub fn new(
        sdk_config: &SdkConfig,
        role_arn: &str,
        queue: &str,
        endpoint_override: Option<String>,
    ) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
            endpoint_override,
            role_arn: role_arn.to_string(),
            queue: queue.to_string(),
            client: Arc::new(OnceCell::new()),
        }
    }

    async fn client(&self) -> Result<&Client, TranscodeError> {
        self.client.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Client, TranscodeError> {
        let endpoint = match &self.endpoint_override {
            Some(url) => url.clone(),
            None => self.describe_endpoint().await?,
        };

        info!(endpoint = %endpoint, "✅ MediaConvert endpoint resolved");

        let config = aws_sdk_mediaconvert::config::Builder::from(&self.sdk_config)
            .endpoint_url(endpoint)
            .build();
        Ok(Client::from_conf(config))
    }

    #[allow(deprecated)]
    async fn describe_endpoint(&self) -> Result<String, TranscodeError> {
        let discovery = Client::new(&self.sdk_config);
        let resp = discovery
            .describe_endpoints()
            .max_results(1)
            .send()
            .await
            .map_err(|e| TranscodeError::EndpointResolution(DisplayErrorContext(&e).to_string()))?;

        resp.endpoints()
            .iter()
            .find_map(|endpoint| endpoint.url())
            .map(str::to_string)
            .ok_or_else(|| TranscodeError::EndpointResolution("no endpoints returned".to_string()))
    }
}

fn job_settings(spec: &TranscodeJobSpec) -> JobSettings {
    let profile = &spec.profile;

    let h264 = H264Settings::builder()
        .rate_control_mode(H264RateControlMode::Qvbr)
        .qvbr_settings(
            H264QvbrSettings::builder()
                .qvbr_quality_level(profile.qvbr_quality_level)
                .build(),
        )
        .max_bitrate(profile.video_max_bitrate)
        .scene_change_detect(H264SceneChangeDetect::Enabled)
        .build();

    let video = VideoDescription::builder()
        .codec_settings(
            VideoCodecSettings::builder()
                .codec(VideoCodec::H264)
                .h264_settings(h264)
                .build(),
        )
        .build();

    let audio = AudioDescription::builder()
        .codec_settings(
            AudioCodecSettings::builder()
                .codec(AudioCodec::Aac)
                .aac_settings(
                    AacSettings::builder()
                        .bitrate(profile.audio_bitrate)
                        .sample_rate(profile.audio_sample_rate)
                        .coding_mode(AacCodingMode::CodingMode20)
                        .build(),
                )
                .build(),
        )
        .build();

    let container = ContainerSettings::builder()
        .container(ContainerType::Mp4)
        .mp4_settings(
            Mp4Settings::builder()
                .moov_placement(Mp4MoovPlacement::ProgressiveDownload)
                .build(),
        )
        .build();

    let output = Output::builder()
        .name_modifier(&spec.name_modifier)
        .video_description(video)
        .audio_descriptions(audio)
        .container_settings(container)
        .build();

    let group = OutputGroup::builder()
        .name(OUTPUT_GROUP_NAME)
        .output_group_settings(
            OutputGroupSettings::builder()
                .r#type(OutputGroupType::FileGroupSettings)
                .file_group_settings(
                    FileGroupSettings::builder()
                        .destination(&spec.destination_uri)
                        .build(),
                )
                .build(),
        )
        .outputs(output)
        .build();

    let input = Input::builder()
        .file_input(&spec.input_uri)
        .audio_selectors(
            AUDIO_SELECTOR,
            AudioSelector::builder()
                .default_selection(AudioDefaultSelection::Default)
                .build(),
        )
        .video_selector(VideoSelector::builder().build())
        .build();

    JobSettings::builder()
        .inputs(input)
        .output_groups(group)
        .build()
}

#[async_trait]
impl TranscodeEngine for MediaConvertEngine {
    async fn create_job(&self, spec: &TranscodeJobSpec) -> Result<String, TranscodeError> {
        let client = self.client().await?;

        let mut request = client
            .create_job()
            .role(&self.role_arn)
            .queue(&self.queue)
            .settings(job_settings(spec));

        for (key, value) in &spec.metadata {
            request = request.user_metadata(key, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TranscodeError::Submission(DisplayErrorContext(&e).to_string()))?;

        resp.job()
            .and_then(|job| job.id())
            .map(str::to_string)
            .ok_or(TranscodeError::MissingJobId)
    }
}
