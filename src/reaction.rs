use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

// Key spellings vary between endpoints; `normalize` is the only way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReaction(pub Value);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMessage(pub Value);

impl From<Value> for RawReaction {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&Reaction> for RawReaction {
    fn from(reaction: &Reaction) -> Self {
        Self(serde_json::to_value(reaction).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModerationStatus {
    #[default]
    Clear,
    Rejected,
    ManualReview,
}

impl ModerationStatus {
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match key.as_str() {
            "rejected" => ModerationStatus::Rejected,
            "manual_review" | "manualreview" => ModerationStatus::ManualReview,
            _ => ModerationStatus::Clear,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            ModerationStatus::Clear => None,
            ModerationStatus::Rejected => Some("rejected"),
            ModerationStatus::ManualReview => Some("manual_review"),
        }
    }
}

impl Serialize for ModerationStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.as_str() {
            Some(value) => serializer.serialize_str(value),
            None => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub moderation_status: ModerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Reply>>,
}

impl Reaction {
    pub fn has_media(&self) -> bool {
        self.video_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentMessage {
    pub id: Option<String>,
    pub content: Option<String>,
    pub reactions: Vec<Reaction>,
}

const ID: &[&str] = &["id"];
const MESSAGE_ID: &[&str] = &["messageId", "messageid", "message_id"];
const NAME: &[&str] = &["name"];
const VIDEO_URL: &[&str] = &["videoUrl", "videourl", "video_url"];
const THUMBNAIL_URL: &[&str] = &["thumbnailUrl", "thumbnailurl", "thumbnail_url"];
const MEDIA_URL: &[&str] = &["mediaUrl", "mediaurl", "media_url"];
const MEDIA_TYPE: &[&str] = &["mediaType", "mediatype", "media_type"];
const DURATION: &[&str] = &["duration"];
const CREATED_AT: &[&str] = &["createdAt", "createdat", "created_at"];
const MODERATION_STATUS: &[&str] = &["moderationStatus", "moderationstatus", "moderation_status"];
const MODERATION_DETAILS: &[&str] = &[
    "moderationDetails",
    "moderationdetails",
    "moderation_details",
];
const REPLIES: &[&str] = &["replies"];
const TEXT: &[&str] = &["text"];
const CONTENT: &[&str] = &["content"];
const REACTIONS: &[&str] = &["reactions"];

pub fn normalize(raw: &RawReaction) -> Reaction {
    match raw.0.as_object() {
        Some(obj) => reaction_from_object(obj),
        None => Reaction::default(),
    }
}

pub fn normalize_message(raw: &RawMessage) -> ParentMessage {
    let Some(obj) = raw.0.as_object() else {
        return ParentMessage::default();
    };
    let reactions = array_field(obj, REACTIONS)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(reaction_from_object)
                .collect()
        })
        .unwrap_or_default();
    ParentMessage {
        id: string_field(obj, ID),
        content: string_field(obj, CONTENT),
        reactions,
    }
}

fn reaction_from_object(obj: &Map<String, Value>) -> Reaction {
    Reaction {
        id: string_field(obj, ID),
        message_id: string_field(obj, MESSAGE_ID),
        name: string_field(obj, NAME),
        video_url: string_field(obj, VIDEO_URL),
        thumbnail_url: string_field(obj, THUMBNAIL_URL),
        duration: number_field(obj, DURATION),
        created_at: string_field(obj, CREATED_AT),
        moderation_status: string_field(obj, MODERATION_STATUS)
            .map(|status| ModerationStatus::parse(&status))
            .unwrap_or_default(),
        moderation_details: string_field(obj, MODERATION_DETAILS),
        replies: array_field(obj, REPLIES).map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(reply_from_object)
                .collect()
        }),
    }
}

fn reply_from_object(obj: &Map<String, Value>) -> Reply {
    Reply {
        id: string_field(obj, ID).unwrap_or_default(),
        text: string_field(obj, TEXT).unwrap_or_default(),
        created_at: string_field(obj, CREATED_AT),
        media_url: string_field(obj, MEDIA_URL),
        media_type: string_field(obj, MEDIA_TYPE),
        thumbnail_url: string_field(obj, THUMBNAIL_URL),
        duration: number_field(obj, DURATION),
    }
}

fn array_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key)?.as_array())
}

// Aliases are tried in order until one yields a usable value.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_value(obj.get(*key)?))
}

fn string_value(value: &Value) -> Option<String> {
    let value = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| number_value(obj.get(*key)?))
}

fn number_value(value: &Value) -> Option<f64> {
    let value = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

// Offset-less timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
