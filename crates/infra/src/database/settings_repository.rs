//! SQLite-backed implementation of the SettingsRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use teamline_core::SettingsRepository;
use teamline_domain::{
    CategoryToggles, Result, SyncDirection, SyncSettings, TeamlineError, WebhookChannel,
};
use tracing::{debug, instrument};

use super::manager::DbPool;
use crate::errors::InfraError;

/// SQLite implementation of SettingsRepository
pub struct SqliteSettingsRepository {
    pool: Arc<DbPool>,
}

impl SqliteSettingsRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::manager::DbConnection> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }
}

const SELECT_COLUMNS: &str = "user_id, enabled, calendar_id, direction,
    sync_task_deadlines, sync_team_events, sync_personal_events,
    last_synced_at, access_token, refresh_token, token_expiry,
    channel_id, resource_id, channel_expiration, created_at, updated_at";

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> Result<Option<SyncSettings>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM sync_settings WHERE user_id = ?1"),
                params![user_id],
                row_to_settings,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(row)
    }

    #[instrument(skip(self, settings), fields(user_id = %settings.user_id))]
    async fn upsert(&self, settings: &SyncSettings) -> Result<()> {
        let conn = self.conn()?;
        let (channel_id, resource_id, channel_expiration) = match &settings.channel {
            Some(c) => (Some(c.channel_id.as_str()), Some(c.resource_id.as_str()), Some(c.expiration.timestamp())),
            None => (None, None, None),
        };

        conn.execute(
            "INSERT INTO sync_settings (
                user_id, enabled, calendar_id, direction,
                sync_task_deadlines, sync_team_events, sync_personal_events,
                last_synced_at, access_token, refresh_token, token_expiry,
                channel_id, resource_id, channel_expiration, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(user_id) DO UPDATE SET
                enabled = excluded.enabled,
                calendar_id = excluded.calendar_id,
                direction = excluded.direction,
                sync_task_deadlines = excluded.sync_task_deadlines,
                sync_team_events = excluded.sync_team_events,
                sync_personal_events = excluded.sync_personal_events,
                last_synced_at = excluded.last_synced_at,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expiry = excluded.token_expiry,
                channel_id = excluded.channel_id,
                resource_id = excluded.resource_id,
                channel_expiration = excluded.channel_expiration,
                updated_at = excluded.updated_at",
            params![
                settings.user_id,
                settings.enabled,
                settings.calendar_id,
                direction_to_str(settings.direction),
                settings.categories.task_deadlines,
                settings.categories.team_events,
                settings.categories.personal_events,
                settings.last_synced_at.map(|t| t.timestamp()),
                settings.access_token,
                settings.refresh_token,
                settings.token_expiry.map(|t| t.timestamp()),
                channel_id,
                resource_id,
                channel_expiration,
                settings.created_at.timestamp(),
                settings.updated_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(user_id = %settings.user_id, "settings upserted");
        Ok(())
    }

    async fn list_enabled_user_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT user_id FROM sync_settings WHERE enabled = 1")
            .map_err(InfraError::from)?;
        let ids = stmt
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(InfraError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(InfraError::from)?;
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn find_user_by_channel(&self, channel_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let user_id = conn
            .query_row(
                "SELECT user_id FROM sync_settings WHERE channel_id = ?1",
                params![channel_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(user_id)
    }

    #[instrument(skip(self, access_token))]
    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings
             SET access_token = ?2, token_expiry = ?3, updated_at = ?4
             WHERE user_id = ?1",
            params![user_id, access_token, expiry.timestamp(), Utc::now().timestamp()],
        )
    }

    #[instrument(skip(self))]
    async fn update_calendar_id(&self, user_id: &str, calendar_id: &str) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings SET calendar_id = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, calendar_id, Utc::now().timestamp()],
        )
    }

    async fn update_last_synced(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings SET last_synced_at = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![user_id, at.timestamp(), Utc::now().timestamp()],
        )
    }

    #[instrument(skip(self, channel), fields(channel_id = %channel.channel_id))]
    async fn update_channel(&self, user_id: &str, channel: &WebhookChannel) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings
             SET channel_id = ?2, resource_id = ?3, channel_expiration = ?4, updated_at = ?5
             WHERE user_id = ?1",
            params![
                user_id,
                channel.channel_id,
                channel.resource_id,
                channel.expiration.timestamp(),
                Utc::now().timestamp()
            ],
        )
    }

    async fn clear_channel(&self, user_id: &str) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings
             SET channel_id = NULL, resource_id = NULL, channel_expiration = NULL, updated_at = ?2
             WHERE user_id = ?1",
            params![user_id, Utc::now().timestamp()],
        )
    }

    #[instrument(skip(self))]
    async fn disconnect(&self, user_id: &str) -> Result<()> {
        self.update_row(
            user_id,
            "UPDATE sync_settings
             SET enabled = 0, access_token = NULL, refresh_token = NULL, token_expiry = NULL,
                 channel_id = NULL, resource_id = NULL, channel_expiration = NULL,
                 updated_at = ?2
             WHERE user_id = ?1",
            params![user_id, Utc::now().timestamp()],
        )
    }
}

impl SqliteSettingsRepository {
    fn update_row(
        &self,
        user_id: &str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(sql, params).map_err(InfraError::from)?;
        if changed == 0 {
            return Err(TeamlineError::NotFound(format!("no sync settings for user {user_id}")));
        }
        Ok(())
    }
}

fn row_to_settings(row: &Row<'_>) -> rusqlite::Result<SyncSettings> {
    let direction_raw: String = row.get(3)?;
    let direction = direction_from_str(&direction_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let channel = match (
        row.get::<_, Option<String>>(11)?,
        row.get::<_, Option<String>>(12)?,
        row.get::<_, Option<i64>>(13)?,
    ) {
        (Some(channel_id), Some(resource_id), Some(expiration)) => Some(WebhookChannel {
            channel_id,
            resource_id,
            expiration: ts_to_datetime(expiration, 13)?,
        }),
        _ => None,
    };

    Ok(SyncSettings {
        user_id: row.get(0)?,
        enabled: row.get(1)?,
        calendar_id: row.get(2)?,
        direction,
        categories: CategoryToggles {
            task_deadlines: row.get(4)?,
            team_events: row.get(5)?,
            personal_events: row.get(6)?,
        },
        last_synced_at: row.get::<_, Option<i64>>(7)?.map(|ts| ts_to_datetime(ts, 7)).transpose()?,
        access_token: row.get(8)?,
        refresh_token: row.get(9)?,
        token_expiry: row.get::<_, Option<i64>>(10)?.map(|ts| ts_to_datetime(ts, 10)).transpose()?,
        channel,
        created_at: ts_to_datetime(row.get(14)?, 14)?,
        updated_at: ts_to_datetime(row.get(15)?, 15)?,
    })
}

pub(super) fn ts_to_datetime(ts: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            Box::new(TeamlineError::Database(format!("timestamp {ts} out of range"))),
        )
    })
}

fn direction_to_str(direction: SyncDirection) -> &'static str {
    match direction {
        SyncDirection::PushOnly => "push_only",
        SyncDirection::PullOnly => "pull_only",
        SyncDirection::Both => "both",
    }
}

fn direction_from_str(value: &str) -> Result<SyncDirection> {
    match value {
        "push_only" => Ok(SyncDirection::PushOnly),
        "pull_only" => Ok(SyncDirection::PullOnly),
        "both" => Ok(SyncDirection::Both),
        other => Err(TeamlineError::Database(format!("unknown sync direction: {other}"))),
    }
}
