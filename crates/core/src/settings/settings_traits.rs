//! Repository traits for settings.

use async_trait::async_trait;

use crate::errors::Result;

/// Repository trait for the key/value settings table.
#[async_trait]
pub trait SettingsRepositoryTrait: Send + Sync {
    /// Get a single setting value by key. Fails with `NotFound` when unset.
    fn get_setting(&self, setting_key: &str) -> Result<String>;

    /// All stored key/value pairs.
    fn get_settings(&self) -> Result<Vec<(String, String)>>;

    /// Insert or replace a single setting.
    async fn update_setting(&self, setting_key: &str, setting_value: &str) -> Result<()>;
}
