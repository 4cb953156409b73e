//! Inbound event payloads: S3/MinIO bucket notifications and transcode
//! job state changes (EventBridge envelope or the flat form).

use super::error::PipelineError;
use super::model::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCreatedEvent {
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct S3Notification {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: u64,
}

impl S3Notification {
    /// Object-created records only (`ObjectCreated:Put`, `s3:ObjectCreated:CompleteMultipartUpload`, ...).
    pub fn object_created_events(&self) -> Vec<ObjectCreatedEvent> {
        self.records
            .iter()
            .filter(|r| r.event_name.is_empty() || r.event_name.contains("ObjectCreated"))
            .map(|r| ObjectCreatedEvent {
                bucket: r.s3.bucket.name.clone(),
                key: decode_key(&r.s3.object.key),
                size_bytes: r.s3.object.size,
            })
            .collect()
    }
}

/// Notification keys are form-encoded: `+` is a space.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectCreatedPayload {
    Notification(S3Notification),
    Single(ObjectCreatedEvent),
}

pub fn parse_object_created(payload: &[u8]) -> Result<Vec<ObjectCreatedEvent>, PipelineError> {
    let parsed: ObjectCreatedPayload = serde_json::from_slice(payload)
        .map_err(|e| PipelineError::InvalidEvent(format!("object-created payload: {}", e)))?;

    Ok(match parsed {
        ObjectCreatedPayload::Notification(notification) => notification.object_created_events(),
        ObjectCreatedPayload::Single(event) => vec![event],
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStateChangeEvent {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, alias = "userMetadata")]
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobStatePayload {
    EventBridge { detail: JobStateChangeEvent },
    Flat(JobStateChangeEvent),
}

pub fn parse_job_state_change(payload: &[u8]) -> Result<JobStateChangeEvent, PipelineError> {
    let parsed: JobStatePayload = serde_json::from_slice(payload)
        .map_err(|e| PipelineError::InvalidEvent(format!("job-state payload: {}", e)))?;

    Ok(match parsed {
        JobStatePayload::EventBridge { detail } => detail,
        JobStatePayload::Flat(event) => event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_notification_and_decodes_keys() {
        let payload = br#"{
            "Records": [
                {
                    "eventName": "ObjectCreated:CompleteMultipartUpload",
                    "s3": {
                        "bucket": { "name": "media" },
                        "object": { "key": "videos/meu+v%C3%ADdeo.ts", "size": 37 }
                    }
                },
                {
                    "eventName": "ObjectRemoved:Delete",
                    "s3": { "bucket": { "name": "media" }, "object": { "key": "videos/old.ts" } }
                }
            ]
        }"#;

        let events = parse_object_created(payload).unwrap();
        assert_eq!(
            events,
            vec![ObjectCreatedEvent {
                bucket: "media".to_string(),
                key: "videos/meu vídeo.ts".to_string(),
                size_bytes: 37,
            }]
        );
    }

    #[test]
    fn parses_flat_object_created() {
        let events =
            parse_object_created(br#"{"bucket":"b","key":"videos/a.ts","sizeBytes":1}"#).unwrap();
        assert_eq!(events[0].key, "videos/a.ts");
        assert_eq!(events[0].size_bytes, 1);
    }

    #[test]
    fn parses_eventbridge_mediaconvert_event() {
        let payload = br#"{
            "version": "0",
            "detail-type": "MediaConvert Job State Change",
            "source": "aws.mediaconvert",
            "detail": {
                "timestamp": 1700000000000,
                "jobId": "1700000000000-abc123",
                "status": "COMPLETE",
                "userMetadata": { "OriginalKey": "videos/a.ts", "Bucket": "b" }
            }
        }"#;

        let event = parse_job_state_change(payload).unwrap();
        assert_eq!(event.job_id, "1700000000000-abc123");
        assert_eq!(event.status, JobStatus::Complete);
        assert_eq!(event.metadata["OriginalKey"], "videos/a.ts");
    }

    #[test]
    fn maps_engine_status_vocabulary() {
        let parse = |status: &str| {
            let body = format!(r#"{{"jobId":"1","status":"{}"}}"#, status);
            parse_job_state_change(body.as_bytes()).unwrap().status
        };
        assert_eq!(parse("SUBMITTED"), JobStatus::Pending);
        assert_eq!(parse("PROGRESSING"), JobStatus::Running);
        assert_eq!(parse("RUNNING"), JobStatus::Running);
        assert_eq!(parse("QUEUE_HOP"), JobStatus::Running);
        assert_eq!(parse("ERROR"), JobStatus::Error);
        assert_eq!(parse("CANCELED"), JobStatus::Canceled);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_job_state_change(b"{\"status\":\"COMPLETE\"}"),
            Err(PipelineError::InvalidEvent(_))
        ));
        assert!(parse_object_created(b"not json").is_err());
    }
}
