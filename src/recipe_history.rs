use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::recipe_entry::{date_info, recipe_preview, DateInfo, SavedRecipe};
use crate::storage::{
    KeyValueStore, LAST_ACTIVE_RECIPE_KEY, SAVED_RECIPES_KEY, SIDEBAR_EXPANDED_KEY,
};

/// How long a freshly saved recipe stays flagged as new.
pub const NEW_FLAG_DURATION: Duration = Duration::from_secs(2);

pub const GENERATION_FAILED_MARKER: &str = "Failed to generate recipe";
pub const GENERATION_FAILED_PLACEHOLDER: &str = "Failed to generate recipe. Please try again.";
pub const NO_RECIPE_PLACEHOLDER: &str = "No recipe generated";

/// Persisted entries as found on disk. Older builds stored bare recipe texts.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedEntries {
    Legacy(Vec<String>),
    Structured(Vec<StoredRecipe>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecipe {
    id: String,
    content: String,
    #[serde(default)]
    preview: Option<String>,
    #[serde(default)]
    date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    date_info: Option<DateInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Committed(SavedRecipe),
    Rejected(SaveRejection),
}

impl SaveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SaveOutcome::Committed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveRejection {
    Empty,
    FailurePlaceholder,
    Duplicate,
}

#[derive(Debug)]
struct PendingClear {
    id: String,
    due: Instant,
}

/// Saved recipes (newest first), the active selection and sidebar state,
/// mirrored into a [`KeyValueStore`].
///
/// Persistence failures are logged and otherwise ignored: the in-memory state
/// is always authoritative.
pub struct RecipeHistory<S: KeyValueStore> {
    store: S,
    entries: Vec<SavedRecipe>,
    active_id: Option<String>,
    current_recipe: Option<String>,
    sidebar_expanded: bool,
    pending_clears: Vec<PendingClear>,
}

impl<S: KeyValueStore> RecipeHistory<S> {
    pub fn load(store: S) -> Self {
        let mut history = RecipeHistory {
            store,
            entries: Vec::new(),
            active_id: None,
            current_recipe: None,
            sidebar_expanded: false,
            pending_clears: Vec::new(),
        };

        let (entries, needs_persist) = history.read_entries(Utc::now());
        history.entries = entries;
        if needs_persist {
            history.persist_entries();
        }

        history.sidebar_expanded = history.read_sidebar_flag();
        history.restore_active();

        info!(
            count = history.entries.len(),
            active = ?history.active_id,
            "Loaded recipe history"
        );
        history
    }

    fn read_entries(&self, now: DateTime<Utc>) -> (Vec<SavedRecipe>, bool) {
        let serialized = match self.store.get(SAVED_RECIPES_KEY) {
            Ok(Some(serialized)) => serialized,
            Ok(None) => return (Vec::new(), false),
            Err(e) => {
                warn!(error = %e, "Error loading saved recipes");
                return (Vec::new(), false);
            }
        };

        match serde_json::from_str::<PersistedEntries>(&serialized) {
            Ok(PersistedEntries::Legacy(contents)) => {
                if contents.is_empty() {
                    return (Vec::new(), false);
                }
                info!(count = contents.len(), "Migrating legacy saved recipes");
                let migrated = contents
                    .into_iter()
                    .map(|content| SavedRecipe::new(content, now))
                    .collect();
                (migrated, true)
            }
            Ok(PersistedEntries::Structured(stored)) => {
                let mut repaired = false;
                let entries = stored
                    .into_iter()
                    .map(|stored| {
                        repaired |= stored.preview.is_none()
                            || stored.date_created.is_none()
                            || stored.date_info.is_none();
                        let date_created = stored.date_created.unwrap_or(now);
                        SavedRecipe {
                            preview: stored
                                .preview
                                .unwrap_or_else(|| recipe_preview(&stored.content)),
                            date_info: date_info(date_created, now),
                            id: stored.id,
                            content: stored.content,
                            date_created,
                            is_new: false,
                        }
                    })
                    .collect();
                (entries, repaired)
            }
            Err(e) => {
                warn!(error = %e, "Error loading saved recipes, starting empty");
                (Vec::new(), false)
            }
        }
    }

    fn read_sidebar_flag(&self) -> bool {
        match self.store.get(SIDEBAR_EXPANDED_KEY) {
            Ok(Some(flag)) => serde_json::from_str(&flag).unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring malformed sidebar state");
                false
            }),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Error loading sidebar state");
                false
            }
        }
    }

    fn restore_active(&mut self) {
        let last_active = match self.store.get(LAST_ACTIVE_RECIPE_KEY) {
            Ok(last_active) => last_active,
            Err(e) => {
                warn!(error = %e, "Error loading last active recipe");
                None
            }
        };
        let Some(id) = last_active else {
            return;
        };

        match self.find(&id).map(|entry| entry.content.clone()) {
            Some(content) => {
                self.current_recipe = Some(content);
                self.set_active_id(Some(id));
            }
            None => {
                debug!(%id, "Discarding dangling active recipe pointer");
                self.set_active_id(None);
            }
        }
    }

    pub fn entries(&self) -> &[SavedRecipe] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&SavedRecipe> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_entry(&self) -> Option<&SavedRecipe> {
        self.active_id.as_deref().and_then(|id| self.find(id))
    }

    /// The recipe text currently on screen, saved or not.
    pub fn current_recipe(&self) -> Option<&str> {
        self.current_recipe.as_deref()
    }

    pub fn is_sidebar_expanded(&self) -> bool {
        self.sidebar_expanded
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn save(&mut self, content: &str) -> SaveOutcome {
        self.save_at(content, Utc::now(), Instant::now())
    }

    /// Saves `content` as created at `now`; its new flag expires
    /// [`NEW_FLAG_DURATION`] after `clock`.
    pub fn save_at(&mut self, content: &str, now: DateTime<Utc>, clock: Instant) -> SaveOutcome {
        if content.trim().is_empty() {
            return SaveOutcome::Rejected(SaveRejection::Empty);
        }
        if content.contains(GENERATION_FAILED_MARKER) {
            return SaveOutcome::Rejected(SaveRejection::FailurePlaceholder);
        }

        let mut entry = SavedRecipe::new(content.to_string(), now);
        let exists = self
            .entries
            .iter()
            .any(|saved| saved.content == entry.content || saved.preview == entry.preview);
        if exists {
            debug!(preview = %entry.preview, "Recipe already saved");
            return SaveOutcome::Rejected(SaveRejection::Duplicate);
        }

        entry.is_new = true;
        self.entries.insert(0, entry.clone());
        self.persist_entries();

        self.current_recipe = Some(entry.content.clone());
        self.set_active_id(Some(entry.id.clone()));
        self.pending_clears.push(PendingClear {
            id: entry.id.clone(),
            due: clock + NEW_FLAG_DURATION,
        });

        info!(id = %entry.id, "Saved recipe");
        SaveOutcome::Committed(entry)
    }

    /// Removes the entry with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return false;
        }
        self.persist_entries();

        if self.active_id.as_deref() == Some(id) {
            self.set_active_id(None);
            self.current_recipe = None;
            if self.entries.is_empty() {
                self.set_sidebar_expanded(false);
            }
        }

        info!(%id, "Deleted recipe");
        true
    }

    /// Drops every saved recipe and all persisted keys. Callers confirm with
    /// the user first.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.active_id = None;
        self.current_recipe = None;
        self.sidebar_expanded = false;

        for key in [
            SAVED_RECIPES_KEY,
            LAST_ACTIVE_RECIPE_KEY,
            SIDEBAR_EXPANDED_KEY,
        ] {
            if let Err(e) = self.store.remove(key) {
                warn!(error = %e, key, "Error clearing stored recipes");
            }
        }

        info!("Cleared all saved recipes");
    }

    /// Shows the saved recipe `id` and makes it active.
    pub fn set_active(&mut self, id: &str) -> bool {
        let Some(content) = self.find(id).map(|entry| entry.content.clone()) else {
            warn!(%id, "Cannot activate unknown recipe");
            return false;
        };
        self.current_recipe = Some(content);
        self.set_active_id(Some(id.to_string()));
        true
    }

    pub fn begin_generation(&mut self) {
        self.current_recipe = None;
        self.set_active_id(None);
        self.set_sidebar_expanded(false);
    }

    pub fn show_generated(&mut self, recipe: String) {
        self.current_recipe = if recipe.is_empty() {
            Some(NO_RECIPE_PLACEHOLDER.to_string())
        } else {
            Some(recipe)
        };
    }

    pub fn show_generation_failure(&mut self) {
        self.current_recipe = Some(GENERATION_FAILED_PLACEHOLDER.to_string());
    }

    pub fn clear_recipe(&mut self) {
        self.current_recipe = None;
        self.set_active_id(None);
        self.set_sidebar_expanded(false);
    }

    pub fn toggle_sidebar(&mut self) {
        self.set_sidebar_expanded(!self.sidebar_expanded);
    }

    /// Whether the current recipe may be offered for saving.
    pub fn can_save_current(&self) -> bool {
        self.current_recipe
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty() && !r.contains(GENERATION_FAILED_MARKER))
    }

    pub fn tick(&mut self) -> usize {
        self.tick_at(Instant::now())
    }

    /// Clears the new flag of every entry whose delay has elapsed by `now`.
    /// Entries deleted in the meantime are skipped. Returns how many flags
    /// were cleared.
    pub fn tick_at(&mut self, now: Instant) -> usize {
        let (due, pending): (Vec<_>, Vec<_>) = self
            .pending_clears
            .drain(..)
            .partition(|clear| clear.due <= now);
        self.pending_clears = pending;

        let mut cleared = 0;
        for clear in due {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.id == clear.id) {
                entry.is_new = false;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn has_pending_clears(&self) -> bool {
        !self.pending_clears.is_empty()
    }

    fn set_active_id(&mut self, id: Option<String>) {
        let result = match &id {
            Some(id) => self.store.set(LAST_ACTIVE_RECIPE_KEY, id),
            None => self.store.remove(LAST_ACTIVE_RECIPE_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "Error saving active recipe");
        }

        let has_active = id.is_some();
        self.active_id = id;
        if has_active {
            self.set_sidebar_expanded(true);
        }
    }

    fn set_sidebar_expanded(&mut self, expanded: bool) {
        if self.sidebar_expanded == expanded {
            return;
        }
        self.sidebar_expanded = expanded;
        if let Err(e) = self.store.set(SIDEBAR_EXPANDED_KEY, &expanded.to_string()) {
            warn!(error = %e, "Error saving sidebar state");
        }
    }

    fn persist_entries(&mut self) {
        let result = if self.entries.is_empty() {
            self.store.remove(SAVED_RECIPES_KEY)
        } else {
            match serde_json::to_string(&self.entries) {
                Ok(serialized) => self.store.set(SAVED_RECIPES_KEY, &serialized),
                Err(e) => {
                    warn!(error = %e, "Error serializing saved recipes");
                    return;
                }
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Error saving recipes to storage");
        }
    }
}
