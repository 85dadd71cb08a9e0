use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of words kept in a recipe preview before it is cut off.
pub const PREVIEW_WORDS: usize = 6;
const EMPTY_PREVIEW: &str = "No preview available";

static HEADING_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s+").unwrap());
static EMPHASIS_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__").unwrap());
static LIST_BULLETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[*-]\s+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Display fields derived from a recipe's creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateInfo {
    pub date: String,
    pub time: String,
    pub full_date_time: String,
    pub relative_time: String,
}

/// A generated recipe the user chose to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: String,
    pub content: String,
    pub preview: String,
    pub date_created: DateTime<Utc>,
    pub date_info: DateInfo,
    #[serde(skip)]
    pub is_new: bool,
}

impl SavedRecipe {
    pub fn new(content: String, now: DateTime<Utc>) -> Self {
        SavedRecipe {
            id: new_recipe_id(),
            preview: recipe_preview(&content),
            date_created: now,
            date_info: date_info(now, now),
            content,
            is_new: false,
        }
    }
}

pub fn new_recipe_id() -> String {
    format!("recipe-{}", Uuid::new_v4())
}

/// Short plain-text summary of a markdown recipe: its first few words with
/// heading, emphasis, code and bullet markers removed.
pub fn recipe_preview(content: &str) -> String {
    if content.is_empty() {
        return EMPTY_PREVIEW.to_string();
    }

    let plain = HEADING_MARKERS.replace_all(content, "");
    let plain = EMPHASIS_MARKERS.replace_all(&plain, "");
    let plain = plain.replace('`', "");
    let plain = LIST_BULLETS.replace_all(&plain, "");
    let plain = WHITESPACE.replace_all(&plain, " ");
    let plain = plain.trim();

    let words: Vec<&str> = plain.split(' ').collect();
    if words.len() <= PREVIEW_WORDS {
        return plain.to_string();
    }
    format!("{}...", words[..PREVIEW_WORDS].join(" "))
}

/// Formats `created` for display in the local timezone, with a relative label
/// whose granularity depends on how long ago `created` was.
pub fn date_info(created: DateTime<Utc>, now: DateTime<Utc>) -> DateInfo {
    let local = created.with_timezone(&Local);
    DateInfo {
        date: local.format("%m/%d/%Y").to_string(),
        time: local.format("%I:%M %p").to_string(),
        full_date_time: local.format("%m/%d/%Y, %I:%M:%S %p").to_string(),
        relative_time: relative_label(created, now),
    }
}

fn relative_label(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let local = created.with_timezone(&Local);
    let elapsed_hours = (now - created).num_hours();

    if elapsed_hours < 24 {
        local.format("%I:%M %p").to_string()
    } else if elapsed_hours < 24 * 7 {
        local.format("%a %I:%M %p").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}
