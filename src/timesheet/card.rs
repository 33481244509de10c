// src/timesheet/card.rs — Timesheet form renderer (Adaptive Card)
//
// Pure transform from an entry list to a card document. Alongside the JSON it
// returns the FieldMap of every per-entry input it emitted, so a later submit
// can be joined back to entries by typed lookup instead of string matching.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::infra::config::TimesheetConfig;
use crate::timesheet::types::{EntryId, FieldKey, FieldKind, ProjectEntry, TaskType};

pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const CARD_VERSION: &str = "1.5";

/// Top-level input ids that are not tied to an entry.
pub const DATE_FIELD: &str = "date";
pub const REMARKS_FIELD: &str = "remarks";

/// Action discriminators carried in `Action.Submit` data.
pub const ACTION_ADD: &str = "AddProject";
pub const ACTION_DELETE: &str = "DeleteProject";
pub const ACTION_SUBMIT: &str = "SubmitTimesheet";

/// Bidirectional mapping between rendered input ids and their structured keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    by_id: BTreeMap<String, FieldKey>,
    by_key: BTreeMap<FieldKey, String>,
}

impl FieldMap {
    pub(crate) fn insert(&mut self, key: FieldKey) -> String {
        let id = key.field_id();
        self.by_id.insert(id.clone(), key);
        self.by_key.insert(key, id.clone());
        id
    }

    /// The rendered input id for `key`, if the form contained it.
    pub fn field_id(&self, key: &FieldKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn key_for(&self, field_id: &str) -> Option<FieldKey> {
        self.by_id.get(field_id).copied()
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    pub fn entry_ids(&self) -> BTreeSet<EntryId> {
        self.by_key.keys().map(|k| k.entry).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// A rendered form and the input ids it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    pub document: Value,
    pub fields: FieldMap,
}

impl RenderedCard {
    /// Wrap the card as a message attachment.
    pub fn attachment(&self) -> Value {
        json!({
            "contentType": ADAPTIVE_CARD_CONTENT_TYPE,
            "content": self.document,
        })
    }
}

/// An empty list becomes the single placeholder entry; anything else is kept.
pub fn normalize(entries: Vec<ProjectEntry>) -> Vec<ProjectEntry> {
    if entries.is_empty() {
        vec![ProjectEntry::placeholder()]
    } else {
        entries
    }
}

/// Sum of entry hours, ignoring values that are not finite.
pub fn total_hours(entries: &[ProjectEntry]) -> f64 {
    entries
        .iter()
        .map(|e| e.hours)
        .filter(|h| h.is_finite())
        .sum()
}

/// Render the timesheet form for `entries`, with the date picker set to `date`.
pub fn render_card(
    entries: &[ProjectEntry],
    date: NaiveDate,
    settings: &TimesheetConfig,
) -> RenderedCard {
    let placeholder;
    let entries = if entries.is_empty() {
        placeholder = [ProjectEntry::placeholder()];
        &placeholder[..]
    } else {
        entries
    };

    let mut fields = FieldMap::default();

    let mut body = vec![
        json!({
            "type": "TextBlock",
            "size": "Medium",
            "weight": "Bolder",
            "text": "Daily Timesheet",
            "wrap": true,
        }),
        json!({
            "type": "TextBlock",
            "text": "Please submit your timesheet for today. You can add multiple projects.",
            "wrap": true,
            "spacing": "Small",
        }),
        json!({
            "type": "Input.Date",
            "id": DATE_FIELD,
            "label": "Date",
            "value": date.format("%Y-%m-%d").to_string(),
        }),
    ];

    for (index, entry) in entries.iter().enumerate() {
        body.push(entry_section(entry, index, settings, &mut fields));
    }

    body.push(json!({
        "type": "TextBlock",
        "id": "totalHoursDisplay",
        "text": format!("Total Hours: {:.1}", total_hours(entries)),
        "weight": "Bolder",
        "size": "Medium",
        "spacing": "Medium",
    }));

    body.push(json!({
        "type": "Input.Text",
        "id": REMARKS_FIELD,
        "label": "Remarks (Optional)",
        "placeholder": "Any additional notes for the day...",
        "isMultiline": true,
        "spacing": "Medium",
    }));

    let document = json!({
        "$schema": CARD_SCHEMA,
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": body,
        "actions": [
            {
                "type": "Action.Submit",
                "title": "➕ Add Project",
                "data": { "action": ACTION_ADD },
            },
            {
                "type": "Action.Submit",
                "title": "✅ Submit Timesheet",
                "data": { "action": ACTION_SUBMIT },
            },
        ],
    });

    RenderedCard { document, fields }
}

fn entry_section(
    entry: &ProjectEntry,
    index: usize,
    settings: &TimesheetConfig,
    fields: &mut FieldMap,
) -> Value {
    let project_choices: Vec<Value> = settings
        .projects
        .iter()
        .map(|p| json!({ "title": p.title, "value": p.value }))
        .collect();
    let task_choices: Vec<Value> = TaskType::ALL
        .iter()
        .map(|t| json!({ "title": t.title(), "value": t.as_str() }))
        .collect();

    let project_id = fields.insert(FieldKey::new(entry.id, FieldKind::Project));
    let hours_id = fields.insert(FieldKey::new(entry.id, FieldKind::Hours));
    let task_type_id = fields.insert(FieldKey::new(entry.id, FieldKind::TaskType));
    let tasks_id = fields.insert(FieldKey::new(entry.id, FieldKind::Tasks));

    let hours = if entry.hours.is_finite() { entry.hours } else { 0.0 };

    json!({
        "type": "Container",
        "style": "emphasis",
        "spacing": "Medium",
        "items": [
            {
                "type": "TextBlock",
                "text": format!("Project #{}", index + 1),
                "weight": "Bolder",
                "size": "Medium",
                "wrap": true,
            },
            {
                "type": "Input.ChoiceSet",
                "id": project_id,
                "label": "Project Name *",
                "placeholder": "Select a Project",
                "choices": project_choices,
                "value": entry.project,
            },
            {
                "type": "Input.Number",
                "id": hours_id,
                "label": "Hours Worked *",
                "min": 0,
                "max": settings.max_hours_per_entry,
                "value": hours,
            },
            {
                "type": "Input.ChoiceSet",
                "id": task_type_id,
                "label": "Task Type",
                "placeholder": "Select Task Type",
                "choices": task_choices,
                "value": entry.task_type.as_str(),
            },
            {
                "type": "Input.Text",
                "id": tasks_id,
                "label": "Tasks Completed *",
                "placeholder": "Describe what you worked on for this project...",
                "isMultiline": true,
                "value": entry.tasks,
            },
            {
                "type": "ActionSet",
                "actions": [
                    {
                        "type": "Action.Submit",
                        "title": "🗑 Delete Project",
                        "data": {
                            "action": ACTION_DELETE,
                            "projectId": entry.id.to_string(),
                        },
                    },
                ],
            },
        ],
    })
}
