use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::AppSettingDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::app_settings::dsl::*;
use brokerage_core::errors::Result;
use brokerage_core::settings::SettingsRepositoryTrait;

pub struct SettingsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SettingsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SettingsRepository { pool, writer }
    }
}

/// Insert-or-update of one key, usable inside any write job.
fn upsert_setting(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
    diesel::insert_into(app_settings)
        .values(AppSettingDB {
            setting_key: key.to_string(),
            setting_value: value.to_string(),
        })
        .on_conflict(setting_key)
        .do_update()
        .set(setting_value.eq(value))
        .execute(conn)
        .into_core()?;
    Ok(())
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
    fn get_setting(&self, setting_key_param: &str) -> Result<String> {
        let mut conn = get_connection(&self.pool)?;
        app_settings
            .filter(setting_key.eq(setting_key_param))
            .select(setting_value)
            .first::<String>(&mut conn)
            .into_core()
    }

    fn get_settings(&self) -> Result<Vec<(String, String)>> {
        let mut conn = get_connection(&self.pool)?;
        app_settings
            .select((setting_key, setting_value))
            .order(setting_key.asc())
            .load::<(String, String)>(&mut conn)
            .into_core()
    }

    async fn update_setting(
        &self,
        setting_key_param: &str,
        setting_value_param: &str,
    ) -> Result<()> {
        let key = setting_key_param.to_string();
        let value = setting_value_param.to_string();
        self.writer
            .exec(move |conn| upsert_setting(conn, &key, &value))
            .await
    }
}
