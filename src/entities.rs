//! Entity 편의 함수
//!
//! 엔티티마다 고정 논리 키를 쓰는 save/load 쌍. 모두 `Storage` API를 그대로 통과합니다.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{Category, EntityKey, GalleryItem, HistoryEntry, Profile, Settings};
use crate::storage::Storage;

impl Storage {
    pub async fn save_profile(&self, profile: &Profile) -> bool {
        self.set_json(EntityKey::Profile.as_str(), profile).await
    }

    pub async fn load_profile(&self) -> Option<Profile> {
        self.get_json(EntityKey::Profile.as_str()).await
    }

    pub async fn save_categories(&self, categories: &[Category]) -> bool {
        self.set_json(EntityKey::Categories.as_str(), categories).await
    }

    pub async fn load_categories(&self) -> Option<Vec<Category>> {
        self.get_json(EntityKey::Categories.as_str()).await
    }

    pub async fn save_history(&self, history: &[HistoryEntry]) -> bool {
        self.set_json(EntityKey::History.as_str(), history).await
    }

    pub async fn load_history(&self) -> Option<Vec<HistoryEntry>> {
        self.get_json(EntityKey::History.as_str()).await
    }

    pub async fn save_gallery(&self, gallery: &[GalleryItem]) -> bool {
        self.set_json(EntityKey::Gallery.as_str(), gallery).await
    }

    pub async fn load_gallery(&self) -> Option<Vec<GalleryItem>> {
        self.get_json(EntityKey::Gallery.as_str()).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> bool {
        self.set_json(EntityKey::Settings.as_str(), settings).await
    }

    pub async fn load_settings(&self) -> Option<Settings> {
        self.get_json(EntityKey::Settings.as_str()).await
    }
}

/// 앱 시작 시 한 번에 읽어 오는 전체 엔티티
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppData {
    pub profile: Profile,
    pub categories: Vec<Category>,
    pub history: Vec<HistoryEntry>,
    pub gallery: Vec<GalleryItem>,
    pub settings: Settings,
}

impl AppData {
    /// 저장된 엔티티를 읽고, 없거나 모양이 맞지 않는 엔티티는 `defaults`로 채움
    pub async fn load(storage: &Storage, defaults: AppData) -> AppData {
        let default_values: Vec<(String, Value)> = EntityKey::ALL
            .iter()
            .filter_map(|key| {
                let value = match key {
                    EntityKey::Profile => serde_json::to_value(&defaults.profile),
                    EntityKey::Categories => serde_json::to_value(&defaults.categories),
                    EntityKey::History => serde_json::to_value(&defaults.history),
                    EntityKey::Gallery => serde_json::to_value(&defaults.gallery),
                    EntityKey::Settings => serde_json::to_value(&defaults.settings),
                };
                value.ok().map(|v| (key.as_str().to_string(), v))
            })
            .collect();

        let mut values = storage.load_all_with_defaults(&default_values).await;

        AppData {
            profile: decode(&mut values, EntityKey::Profile, defaults.profile),
            categories: decode(&mut values, EntityKey::Categories, defaults.categories),
            history: decode(&mut values, EntityKey::History, defaults.history),
            gallery: decode(&mut values, EntityKey::Gallery, defaults.gallery),
            settings: decode(&mut values, EntityKey::Settings, defaults.settings),
        }
    }

    /// 전체 엔티티를 한 번의 `multi_set`으로 저장
    pub async fn save(&self, storage: &Storage) -> bool {
        let entries = [
            (EntityKey::Profile, serde_json::to_value(&self.profile)),
            (EntityKey::Categories, serde_json::to_value(&self.categories)),
            (EntityKey::History, serde_json::to_value(&self.history)),
            (EntityKey::Gallery, serde_json::to_value(&self.gallery)),
            (EntityKey::Settings, serde_json::to_value(&self.settings)),
        ];

        let mut values = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match value {
                Ok(value) => values.push((key.as_str().to_string(), value)),
                Err(e) => {
                    tracing::error!(key = key.as_str(), error = %e, "entity could not be serialized");
                    return false;
                }
            }
        }
        storage.multi_set(&values).await
    }
}

fn decode<T: DeserializeOwned>(
    values: &mut HashMap<String, Value>,
    key: EntityKey,
    fallback: T,
) -> T {
    let Some(value) = values.remove(key.as_str()) else {
        return fallback;
    };
    match serde_json::from_value(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "stored entity has unexpected shape, using default");
            fallback
        }
    }
}
