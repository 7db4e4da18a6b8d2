//! Item mapper: pure translation between internal items and provider events
//!
//! Internal → external prefixes the title with a provenance marker, renders
//! participants into the description as human-readable text, picks the color
//! from a fixed per-category table, and passes a validated recurrence rule
//! through. External → internal is the inverse with defaults.
//!
//! Round-trip is not byte-for-byte stable (the provider may reformat
//! descriptions); only the semantic fields — time window, title, all-day
//! flag — are round-trip stable for timed events.

use chrono::Duration;
use teamline_domain::{
    EventTime, ItemCategory, ProviderEvent, Result, SyncItem, TeamlineError, TimeWindow,
};

/// A provider event translated into internal item fields.
///
/// The orchestrator decides whether this updates an existing item or becomes
/// a new one.
#[derive(Debug, Clone)]
pub struct RemoteItem {
    pub title: String,
    pub description: Option<String>,
    pub window: TimeWindow,
    pub category: ItemCategory,
    pub recurrence: Option<String>,
}

/// Map an internal item to the provider's event shape.
///
/// Rejects `end < start` here, before any adapter call is made.
pub fn to_provider_event(item: &SyncItem) -> Result<ProviderEvent> {
    if !item.window.is_valid() {
        return Err(TeamlineError::InvalidRange(format!(
            "item {} has end {} before start {}",
            item.id, item.window.end, item.window.start
        )));
    }

    let (start, end) = if item.window.all_day {
        let start_date = item.window.start.date_naive();
        let mut end_date = item.window.end.date_naive();
        // Provider all-day ends are exclusive and must follow the start date
        if end_date <= start_date {
            end_date = start_date + Duration::days(1);
        }
        (EventTime::all_day(start_date), EventTime::all_day(end_date))
    } else {
        (EventTime::timed(item.window.start), EventTime::timed(item.window.end))
    };

    Ok(ProviderEvent {
        id: item.external_ref.as_ref().map(|ext| ext.event_id.clone()),
        summary: Some(format!("{} {}", item.category.marker(), item.title)),
        description: Some(render_description(item)),
        start,
        end,
        color_id: Some(item.category.color_id().to_string()),
        recurrence: item.recurrence.clone().into_iter().collect(),
        status: None,
    })
}

/// Map a provider event back into internal item fields.
///
/// Missing color falls back to the category implied by the provenance marker
/// (personal when neither is recognizable); missing recurrence means none.
pub fn from_provider_event(event: &ProviderEvent) -> Result<RemoteItem> {
    let raw_title = event.summary.clone().unwrap_or_default();
    let category = provenance_of(&raw_title)
        .or_else(|| event.color_id.as_deref().and_then(category_for_color))
        .unwrap_or(ItemCategory::PersonalEvent);
    let title = strip_marker(&raw_title).to_string();

    let start = event.start.as_instant().ok_or_else(|| {
        TeamlineError::Mapping(format!("event {:?} has no usable start", event.id))
    })?;
    let end = event
        .end
        .as_instant()
        .ok_or_else(|| TeamlineError::Mapping(format!("event {:?} has no usable end", event.id)))?;

    if end < start {
        return Err(TeamlineError::InvalidRange(format!(
            "event {:?} has end {end} before start {start}",
            event.id
        )));
    }

    Ok(RemoteItem {
        title,
        description: event.description.clone(),
        window: TimeWindow { start, end, all_day: event.start.is_all_day() },
        category,
        recurrence: event.recurrence.first().cloned(),
    })
}

/// Which category's provenance marker, if any, a title carries
pub fn provenance_of(title: &str) -> Option<ItemCategory> {
    [ItemCategory::TaskDeadline, ItemCategory::TeamEvent, ItemCategory::PersonalEvent]
        .into_iter()
        .find(|category| title.starts_with(category.marker()))
}

fn strip_marker(title: &str) -> &str {
    match provenance_of(title) {
        Some(category) => title[category.marker().len()..].trim_start(),
        None => title.trim(),
    }
}

fn category_for_color(color_id: &str) -> Option<ItemCategory> {
    [ItemCategory::TaskDeadline, ItemCategory::TeamEvent, ItemCategory::PersonalEvent]
        .into_iter()
        .find(|category| category.color_id() == color_id)
}

/// Render the description body plus a human-readable participants block.
///
/// Participants are deliberately text, not structured provider fields: the
/// external calendar is a mirror, not a second source of truth for people.
fn render_description(item: &SyncItem) -> String {
    let mut out = item.description.clone().unwrap_or_default();

    let people = &item.participants;
    let mut lines = Vec::new();
    if let Some(assignee) = &people.assignee {
        lines.push(format!("Assignee: {assignee}"));
    }
    if let Some(creator) = &people.creator {
        lines.push(format!("Created by: {creator}"));
    }
    if !people.collaborators.is_empty() {
        lines.push(format!("With: {}", people.collaborators.join(", ")));
    }

    if !lines.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&lines.join("\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use teamline_domain::{ExternalRef, ItemKind, Participants};

    use super::*;

    fn timed_item() -> SyncItem {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        SyncItem {
            id: "task-1".into(),
            user_id: "user-1".into(),
            kind: ItemKind::Task,
            category: ItemCategory::TaskDeadline,
            title: "Quarterly review".into(),
            description: Some("Prepare the slides".into()),
            window: TimeWindow { start, end, all_day: false },
            participants: Participants {
                assignee: Some("Dana".into()),
                creator: Some("Robin".into()),
                collaborators: vec!["Sam".into(), "Alex".into()],
            },
            recurrence: None,
            external_ref: None,
            updated_at: Utc::now(),
            synced_at: None,
        }
    }

    #[test]
    fn title_carries_provenance_marker() {
        let event = to_provider_event(&timed_item()).unwrap();
        assert_eq!(event.summary.as_deref(), Some("[Task] Quarterly review"));
    }

    #[test]
    fn participants_rendered_into_description() {
        let event = to_provider_event(&timed_item()).unwrap();
        let description = event.description.unwrap();
        assert!(description.contains("Prepare the slides"));
        assert!(description.contains("Assignee: Dana"));
        assert!(description.contains("Created by: Robin"));
        assert!(description.contains("With: Sam, Alex"));
    }

    #[test]
    fn color_comes_from_category_table() {
        let event = to_provider_event(&timed_item()).unwrap();
        assert_eq!(event.color_id.as_deref(), Some(ItemCategory::TaskDeadline.color_id()));
    }

    #[test]
    fn inverted_range_rejected_before_adapter() {
        let mut item = timed_item();
        std::mem::swap(&mut item.window.start, &mut item.window.end);
        let err = to_provider_event(&item).unwrap_err();
        assert!(matches!(err, TeamlineError::InvalidRange(_)));
    }

    #[test]
    fn timed_round_trip_preserves_semantic_fields() {
        let item = timed_item();
        let event = to_provider_event(&item).unwrap();
        let remote = from_provider_event(&event).unwrap();

        assert_eq!(remote.title, item.title);
        assert_eq!(remote.window.start, item.window.start);
        assert_eq!(remote.window.end, item.window.end);
        assert!(!remote.window.all_day);
        assert_eq!(remote.category, ItemCategory::TaskDeadline);
    }

    #[test]
    fn all_day_single_date_spans_one_day() {
        let mut item = timed_item();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        item.window = TimeWindow { start: due, end: due, all_day: true };

        let event = to_provider_event(&item).unwrap();
        assert_eq!(event.start.date.unwrap().to_string(), "2024-06-01");
        // Exclusive end: the day after
        assert_eq!(event.end.date.unwrap().to_string(), "2024-06-02");

        let remote = from_provider_event(&event).unwrap();
        assert!(remote.window.all_day);
        assert_eq!(remote.window.start, due);
    }

    #[test]
    fn update_keeps_existing_event_id() {
        let mut item = timed_item();
        item.external_ref =
            Some(ExternalRef { calendar_id: "cal-1".into(), event_id: "evt-9".into() });
        let event = to_provider_event(&item).unwrap();
        assert_eq!(event.id.as_deref(), Some("evt-9"));
    }

    #[test]
    fn recurrence_passes_through_both_ways() {
        let mut item = timed_item();
        item.recurrence = Some("RRULE:FREQ=WEEKLY;BYDAY=MO".into());
        let event = to_provider_event(&item).unwrap();
        assert_eq!(event.recurrence, vec!["RRULE:FREQ=WEEKLY;BYDAY=MO".to_string()]);

        let remote = from_provider_event(&event).unwrap();
        assert_eq!(remote.recurrence.as_deref(), Some("RRULE:FREQ=WEEKLY;BYDAY=MO"));
    }

    #[test]
    fn unmarked_event_defaults_to_personal() {
        let event = ProviderEvent {
            id: Some("evt-1".into()),
            summary: Some("Dentist".into()),
            start: EventTime::timed(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
            end: EventTime::timed(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()),
            ..Default::default()
        };
        let remote = from_provider_event(&event).unwrap();
        assert_eq!(remote.category, ItemCategory::PersonalEvent);
        assert_eq!(remote.title, "Dentist");
        assert!(remote.recurrence.is_none());
    }

    #[test]
    fn marker_detection() {
        assert_eq!(provenance_of("[Task] Ship it"), Some(ItemCategory::TaskDeadline));
        assert_eq!(provenance_of("[Team] Standup"), Some(ItemCategory::TeamEvent));
        assert_eq!(provenance_of("[Personal] Gym"), Some(ItemCategory::PersonalEvent));
        assert_eq!(provenance_of("Ship it"), None);
    }

    #[test]
    fn external_end_before_start_is_invalid_range() {
        let event = ProviderEvent {
            id: Some("evt-2".into()),
            summary: Some("[Task] Broken".into()),
            start: EventTime::timed(Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap()),
            end: EventTime::timed(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            from_provider_event(&event).unwrap_err(),
            TeamlineError::InvalidRange(_)
        ));
    }
}
