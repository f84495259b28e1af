//! TalkBox Data Models
//!
//! 앱 화면 레이어(TypeScript)와 같은 JSON 모양을 쓰는 엔티티 정의

use serde::{Deserialize, Serialize};

/// 저장소에 보관되는 엔티티별 고정 논리 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Profile,
    Categories,
    History,
    Gallery,
    Settings,
}

impl EntityKey {
    /// 알려진 모든 논리 키
    pub const ALL: [EntityKey; 5] = [
        EntityKey::Profile,
        EntityKey::Categories,
        EntityKey::History,
        EntityKey::Gallery,
        EntityKey::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKey::Profile => "profile",
            EntityKey::Categories => "categories",
            EntityKey::History => "history",
            EntityKey::Gallery => "gallery",
            EntityKey::Settings => "settings",
        }
    }
}

/// 사용자 프로필 (이름, 연락처, 의료 메모)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub medical_notes: Option<String>,
    #[serde(default)]
    pub emergency_contacts: Vec<Contact>,
}

/// 비상 연락처
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relation: Option<String>,
}

/// 문구 카테고리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<Phrase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: String,
    pub text: String,
}

/// 말하기 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    pub spoken_at: i64,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            spoken_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// 그림 카드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub label: String,
    pub image_uri: String,
}

/// 음성/표시 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub speech_rate: f32,
    #[serde(default)]
    pub voice: Option<String>,
    pub text_size: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speech_rate: 1.0,
            voice: None,
            text_size: 18,
        }
    }
}
