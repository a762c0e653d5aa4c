/// User ids are PostgreSQL BIGINTs carried in the JWT subject.
pub type DbId = i64;

/// Onboarding record ids are opaque UUIDs (v7, time-ordered).
pub type RecordId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A JSON object. Every step slice is stored and patched in this shape.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
