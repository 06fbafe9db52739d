use chrono::{DateTime, Utc};
use proc_macros::define_field_names;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
pub enum PillowType {
    Regular,
    Dakimakura,
}

impl PillowType {
    pub const ALL: [PillowType; 2] = [PillowType::Regular, PillowType::Dakimakura];
}

/// Which of the two image families a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Pillow,
    Photo,
}

impl ImageKind {
    pub fn plural(self) -> &'static str {
        match self {
            ImageKind::Pillow => "pillows",
            ImageKind::Photo => "photos",
        }
    }

    pub fn from_plural(name: &str) -> Option<Self> {
        match name {
            "pillows" => Some(ImageKind::Pillow),
            "photos" => Some(ImageKind::Photo),
            _ => None,
        }
    }
}

pub fn pillow_key(user_id: &str, pillow_type: PillowType) -> String {
    format!("{user_id}_{pillow_type}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[define_field_names]
pub struct PillowData {
    pub user_id: String,
    pub user_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pillow_type: PillowType,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[define_field_names]
pub struct PhotoData {
    pub user_id: String,
    pub user_name: String,
    pub date: String,
    pub submitted_at: DateTime<Utc>,
}
