//! SQLite-backed implementation of the ItemRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use teamline_core::ItemRepository;
use teamline_domain::{
    ExternalRef, ItemCategory, ItemKind, Participants, Result, SyncItem, TeamlineError,
    TimeWindow,
};
use tracing::{debug, instrument};

use super::manager::DbPool;
use super::settings_repository::ts_to_datetime;
use crate::errors::InfraError;

/// SQLite implementation of ItemRepository
pub struct SqliteItemRepository {
    pool: Arc<DbPool>,
}

impl SqliteItemRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::manager::DbConnection> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }
}

const SELECT_COLUMNS: &str = "id, user_id, kind, category, title, description,
    start_ts, end_ts, is_all_day, assignee, creator, collaborators,
    recurrence, external_calendar_id, external_event_id, updated_at, synced_at";

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    #[instrument(skip(self))]
    async fn list_dirty(&self, user_id: &str) -> Result<Vec<SyncItem>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM sync_items
                 WHERE user_id = ?1
                   AND (synced_at IS NULL OR updated_at > synced_at)
                 ORDER BY updated_at ASC"
            ))
            .map_err(InfraError::from)?;
        let items = stmt
            .query_map(params![user_id], row_to_item)
            .map_err(InfraError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(InfraError::from)?;

        debug!(user_id, count = items.len(), "listed dirty items");
        Ok(items)
    }

    #[instrument(skip(self, external_ref), fields(event_id = %external_ref.event_id))]
    async fn find_by_external_ref(
        &self,
        user_id: &str,
        external_ref: &ExternalRef,
    ) -> Result<Option<SyncItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM sync_items
                     WHERE user_id = ?1
                       AND external_calendar_id = ?2
                       AND external_event_id = ?3"
                ),
                params![user_id, external_ref.calendar_id, external_ref.event_id],
                row_to_item,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(item)
    }

    async fn list_mapped_event_ids(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT external_event_id FROM sync_items
                 WHERE user_id = ?1
                   AND external_calendar_id = ?2
                   AND external_event_id IS NOT NULL",
            )
            .map_err(InfraError::from)?;
        let ids = stmt
            .query_map(params![user_id, calendar_id], |row| row.get::<_, String>(0))
            .map_err(InfraError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(InfraError::from)?;
        Ok(ids)
    }

    #[instrument(skip(self, external_ref), fields(event_id = %external_ref.event_id))]
    async fn set_mapping(
        &self,
        item_id: &str,
        external_ref: &ExternalRef,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE sync_items
                 SET external_calendar_id = ?2, external_event_id = ?3, synced_at = ?4
                 WHERE id = ?1",
                params![
                    item_id,
                    external_ref.calendar_id,
                    external_ref.event_id,
                    synced_at.timestamp()
                ],
            )
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(TeamlineError::NotFound(format!("no sync item {item_id}")));
        }
        Ok(())
    }

    async fn mark_synced(&self, item_id: &str, synced_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE sync_items SET synced_at = ?2 WHERE id = ?1",
                params![item_id, synced_at.timestamp()],
            )
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(TeamlineError::NotFound(format!("no sync item {item_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn insert(&self, item: &SyncItem) -> Result<()> {
        let conn = self.conn()?;
        let collaborators = serde_json::to_string(&item.participants.collaborators)
            .map_err(|e| TeamlineError::Database(format!("failed to encode collaborators: {e}")))?;
        let (external_calendar_id, external_event_id) = match &item.external_ref {
            Some(ext) => (Some(ext.calendar_id.as_str()), Some(ext.event_id.as_str())),
            None => (None, None),
        };

        conn.execute(
            "INSERT INTO sync_items (
                id, user_id, kind, category, title, description,
                start_ts, end_ts, is_all_day, assignee, creator, collaborators,
                recurrence, external_calendar_id, external_event_id, updated_at, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                item.id,
                item.user_id,
                kind_to_str(item.kind),
                category_to_str(item.category),
                item.title,
                item.description,
                item.window.start.timestamp(),
                item.window.end.timestamp(),
                item.window.all_day,
                item.participants.assignee,
                item.participants.creator,
                collaborators,
                item.recurrence,
                external_calendar_id,
                external_event_id,
                item.updated_at.timestamp(),
                item.synced_at.map(|t| t.timestamp()),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(item_id = %item.id, "inserted sync item");
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn update_content(&self, item: &SyncItem) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE sync_items
                 SET title = ?2, description = ?3, start_ts = ?4, end_ts = ?5,
                     is_all_day = ?6, recurrence = ?7, updated_at = ?8, synced_at = ?9
                 WHERE id = ?1",
                params![
                    item.id,
                    item.title,
                    item.description,
                    item.window.start.timestamp(),
                    item.window.end.timestamp(),
                    item.window.all_day,
                    item.recurrence,
                    item.updated_at.timestamp(),
                    item.synced_at.map(|t| t.timestamp()),
                ],
            )
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(TeamlineError::NotFound(format!("no sync item {}", item.id)));
        }
        Ok(())
    }
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<SyncItem> {
    let kind_raw: String = row.get(2)?;
    let kind = kind_from_str(&kind_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let category_raw: String = row.get(3)?;
    let category = category_from_str(&category_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let collaborators_raw: String = row.get(11)?;
    let collaborators: Vec<String> = serde_json::from_str(&collaborators_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let external_ref = match (
        row.get::<_, Option<String>>(13)?,
        row.get::<_, Option<String>>(14)?,
    ) {
        (Some(calendar_id), Some(event_id)) => Some(ExternalRef { calendar_id, event_id }),
        _ => None,
    };

    Ok(SyncItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        category,
        title: row.get(4)?,
        description: row.get(5)?,
        window: TimeWindow {
            start: ts_to_datetime(row.get(6)?, 6)?,
            end: ts_to_datetime(row.get(7)?, 7)?,
            all_day: row.get(8)?,
        },
        participants: Participants {
            assignee: row.get(9)?,
            creator: row.get(10)?,
            collaborators,
        },
        recurrence: row.get(12)?,
        external_ref,
        updated_at: ts_to_datetime(row.get(15)?, 15)?,
        synced_at: row.get::<_, Option<i64>>(16)?.map(|ts| ts_to_datetime(ts, 16)).transpose()?,
    })
}

fn kind_to_str(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Task => "task",
        ItemKind::Event => "event",
    }
}

fn kind_from_str(value: &str) -> Result<ItemKind> {
    match value {
        "task" => Ok(ItemKind::Task),
        "event" => Ok(ItemKind::Event),
        other => Err(TeamlineError::Database(format!("unknown item kind: {other}"))),
    }
}

fn category_to_str(category: ItemCategory) -> &'static str {
    match category {
        ItemCategory::TaskDeadline => "task_deadline",
        ItemCategory::TeamEvent => "team_event",
        ItemCategory::PersonalEvent => "personal_event",
    }
}

fn category_from_str(value: &str) -> Result<ItemCategory> {
    match value {
        "task_deadline" => Ok(ItemCategory::TaskDeadline),
        "team_event" => Ok(ItemCategory::TeamEvent),
        "personal_event" => Ok(ItemCategory::PersonalEvent),
        other => Err(TeamlineError::Database(format!("unknown item category: {other}"))),
    }
}
