//! S3 object-created notification payloads.

use serde::Deserialize;

use super::SourceObject;

/// An S3 object-created notification, as delivered to event-driven
/// invocations.
#[derive(Debug, Deserialize)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl ObjectCreatedEvent {
    /// Flatten the notification into source object references.
    pub fn objects(&self) -> Vec<SourceObject> {
        self.records
            .iter()
            .map(|record| {
                SourceObject::new(record.s3.bucket.name.clone(), record.s3.object.key.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserialization() {
        let json = r#"{
            "Records": [
                {
                    "s3": {
                        "bucket": { "name": "alb-logs" },
                        "object": { "key": "2024/11/17/file1.log.gz" }
                    }
                },
                {
                    "s3": {
                        "bucket": { "name": "alb-logs" },
                        "object": { "key": "2024/11/17/file2.log.gz" }
                    }
                }
            ]
        }"#;

        let event: ObjectCreatedEvent = serde_json::from_str(json).unwrap();
        let objects = event.objects();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], SourceObject::new("alb-logs", "2024/11/17/file1.log.gz"));
        assert_eq!(objects[1], SourceObject::new("alb-logs", "2024/11/17/file2.log.gz"));
    }

    #[test]
    fn test_event_with_no_records() {
        let event: ObjectCreatedEvent = serde_json::from_str(r#"{"Records": []}"#).unwrap();
        assert!(event.objects().is_empty());
    }
}
