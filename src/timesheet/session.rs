// src/timesheet/session.rs — Per-user timesheet sessions
//
// A session is the in-progress entry list of one user plus the id of the
// card message currently showing it. Every turn for a user holds that user's
// lock for its whole duration, so add/delete/submit from the same user are
// applied one at a time. Different users never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::timesheet::card::{normalize, FieldMap};
use crate::timesheet::types::{EntryId, FieldKey, FieldKind, ProjectEntry};
use crate::timesheet::values::FormValues;

/// A user's in-progress timesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub entries: Vec<ProjectEntry>,
    /// Activity id of the last card sent for this session.
    pub form_activity_id: Option<String>,
    /// Inputs of the last rendered card; consulted when values come back.
    pub fields: FieldMap,
    pub touched_at: Instant,
}

impl UserSession {
    pub fn new(entries: Vec<ProjectEntry>) -> Self {
        Self {
            entries: normalize(entries),
            form_activity_id: None,
            fields: FieldMap::default(),
            touched_at: Instant::now(),
        }
    }

    /// Copy values the user has typed into the card back onto the entries.
    ///
    /// Only inputs present in the last rendered card are read; an input that
    /// came back but does not parse keeps the entry's previous value.
    pub fn absorb(&mut self, values: &FormValues) {
        let fields = &self.fields;
        for entry in &mut self.entries {
            let entry_id = entry.id;
            let id_of = |kind| {
                fields
                    .field_id(&FieldKey::new(entry_id, kind))
                    .map(str::to_owned)
            };

            if let Some(project) = id_of(FieldKind::Project).and_then(|id| values.text(&id)) {
                entry.project = project;
            }
            if let Some(Ok(hours)) = id_of(FieldKind::Hours).and_then(|id| values.number(&id)) {
                entry.hours = hours;
            }
            if let Some(task_type) = id_of(FieldKind::TaskType)
                .and_then(|id| values.non_empty(&id))
                .and_then(|raw| raw.parse().ok())
            {
                entry.task_type = task_type;
            }
            if let Some(tasks) = id_of(FieldKind::Tasks).and_then(|id| values.text(&id)) {
                entry.tasks = tasks;
            }
        }
    }
}

impl UserSession {
    /// Rebuild a session from a card submitted after its session was lost
    /// (restart, TTL eviction, or a card pushed by another process). Entries
    /// are recovered from the ids of every entry input, so an entry with some
    /// inputs left out of the payload still comes back (and fails validation
    /// as incomplete). `None` if the card carried no entry inputs.
    pub fn recover(values: &FormValues) -> Option<Self> {
        let mut entry_ids: Vec<EntryId> = Vec::new();
        for id in values.ids() {
            let Some(entry_id) = entry_id_of(id) else {
                continue;
            };
            if !entry_ids.contains(&entry_id) {
                entry_ids.push(entry_id);
            }
        }
        if entry_ids.is_empty() {
            return None;
        }
        let entries = entry_ids
            .into_iter()
            .map(ProjectEntry::blank_with_id)
            .collect();

        let mut session = Self::new(entries);
        session.absorb_unrendered(values);
        Some(session)
    }

    /// [`absorb`](Self::absorb) for a session whose card was never recorded:
    /// input ids are derived from the entry ids.
    fn absorb_unrendered(&mut self, values: &FormValues) {
        let mut fields = FieldMap::default();
        for entry in &self.entries {
            for kind in FieldKind::ALL {
                fields.insert(FieldKey::new(entry.id, kind));
            }
        }
        self.fields = fields;
        self.absorb(values);
    }
}

/// The entry an input id like `hours-<uuid>` belongs to.
fn entry_id_of(field_id: &str) -> Option<EntryId> {
    FieldKind::ALL.iter().find_map(|kind| {
        field_id
            .strip_prefix(kind.prefix())?
            .strip_prefix('-')?
            .parse::<EntryId>()
            .ok()
    })
}

/// How the re-rendered card should reach the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Post a new card message.
    SendNew,
    /// Overwrite the card message with this activity id in place.
    Replace(String),
}

/// Result of applying one action to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub entries: Vec<ProjectEntry>,
    pub delivery: Delivery,
}

/// The contents of one user's session slot, held while the lock is owned.
pub type SessionGuard = OwnedMutexGuard<Option<UserSession>>;

/// Store of per-user sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Acquire the user's slot, waiting for any turn already holding it.
    async fn lock(&self, user_id: &str) -> SessionGuard;

    /// Drop sessions idle for longer than `ttl`. Returns how many were dropped.
    fn evict_idle(&self, ttl: Duration) -> usize;

    /// Number of users with a session in progress.
    fn active(&self) -> usize;
}

/// Process-local session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<Option<UserSession>>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn lock(&self, user_id: &str) -> SessionGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
                .clone()
        };
        slot.lock_owned().await
    }

    fn evict_idle(&self, ttl: Duration) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();
        // A slot that is locked belongs to a running turn and is never idle.
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => guard
                .as_ref()
                .is_some_and(|s| s.touched_at.elapsed() <= ttl),
            Err(_) => true,
        });
        before - slots.len()
    }

    fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |g| g.is_some()))
            .count()
    }
}

// ─── Mutators ───────────────────────────────────────────────────────────────

/// Reset to a single fresh blank entry. Always posts a new card.
pub fn start(slot: &mut Option<UserSession>) -> Mutation {
    let session = UserSession::new(vec![ProjectEntry::blank()]);
    let entries = session.entries.clone();
    *slot = Some(session);
    Mutation {
        entries,
        delivery: Delivery::SendNew,
    }
}

/// Append one blank entry, keeping what the user already typed.
pub fn add_entry(
    slot: &mut Option<UserSession>,
    values: &FormValues,
    reply_to: Option<&str>,
) -> Mutation {
    let Some(session) = slot.as_mut() else {
        return recover_missing(slot);
    };
    session.absorb(values);
    session.entries.push(ProjectEntry::blank());
    session.touched_at = Instant::now();
    mutation_for(session, reply_to)
}

/// Remove the entry with `id`. Unknown ids leave the list untouched.
pub fn delete_entry(
    slot: &mut Option<UserSession>,
    id: EntryId,
    values: &FormValues,
    reply_to: Option<&str>,
) -> Mutation {
    let Some(session) = slot.as_mut() else {
        return recover_missing(slot);
    };
    session.absorb(values);
    if session.entries.iter().any(|e| e.id == id) {
        session.entries.retain(|e| e.id != id);
        session.entries = normalize(std::mem::take(&mut session.entries));
    }
    session.touched_at = Instant::now();
    mutation_for(session, reply_to)
}

/// Remember the card that was just delivered for this session.
pub fn record_render(
    slot: &mut Option<UserSession>,
    fields: FieldMap,
    activity_id: Option<String>,
) {
    if let Some(session) = slot.as_mut() {
        session.fields = fields;
        if activity_id.is_some() {
            session.form_activity_id = activity_id;
        }
        session.touched_at = Instant::now();
    }
}

/// Discard the session after a successful submission.
pub fn clear(slot: &mut Option<UserSession>) {
    *slot = None;
}

/// Add/delete arrived with no session (e.g. after a restart): nothing to
/// mutate, so open a session on the empty-normalized form and post it fresh.
fn recover_missing(slot: &mut Option<UserSession>) -> Mutation {
    tracing::debug!("Card action without a session; rendering an empty form");
    let session = UserSession::new(Vec::new());
    let entries = session.entries.clone();
    *slot = Some(session);
    Mutation {
        entries,
        delivery: Delivery::SendNew,
    }
}

fn mutation_for(session: &UserSession, reply_to: Option<&str>) -> Mutation {
    let delivery = session
        .form_activity_id
        .clone()
        .or_else(|| reply_to.map(str::to_owned))
        .map_or(Delivery::SendNew, Delivery::Replace);
    Mutation {
        entries: session.entries.clone(),
        delivery,
    }
}
