//! Tracked rescue cases.
//!
//! A [`Case`] mirrors the API's rescue record. The [`CaseBoard`] is the
//! shared, in-memory set of cases the stream handlers correlate events
//! against; it is touched both from the stream task and from whatever
//! administrative code inspects it, so every access goes through one lock
//! that is never held across an `.await`.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A rescue case as exchanged with the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// API identifier; `None` until the case has been saved once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client commander name.
    #[serde(default = "default_client")]
    pub client: String,
    /// Star system the client is in, if known.
    #[serde(default)]
    pub system: Option<String>,
    /// Game platform.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Whether the case is active.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Whether the case is open.
    #[serde(default = "default_true")]
    pub open: bool,
    /// Epic rescue flag.
    #[serde(default)]
    pub epic: bool,
    /// Code red flag.
    #[serde(default)]
    pub code_red: bool,
    /// Outcome flag.
    #[serde(default = "default_true")]
    pub successful: bool,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
    /// Quotes recorded on the case.
    #[serde(default)]
    pub quotes: Vec<Value>,
    /// Assigned rat ids.
    #[serde(default)]
    pub rats: Vec<String>,
    /// Assigned rats without an id.
    #[serde(default)]
    pub unidentified_rats: Vec<String>,
    /// Rat that delivered fuel.
    #[serde(default)]
    pub first_limpet: Option<String>,
    /// Creation timestamp, server-assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp, server-assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Free-form extra data.
    #[serde(default)]
    pub data: Value,
}

fn default_client() -> String {
    "<unknown client>".to_string()
}

fn default_platform() -> String {
    "unknown".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Case {
    fn default() -> Self {
        Self {
            id: None,
            client: default_client(),
            system: None,
            platform: default_platform(),
            active: true,
            open: true,
            epic: false,
            code_red: false,
            successful: true,
            title: None,
            quotes: Vec::new(),
            rats: Vec::new(),
            unidentified_rats: Vec::new(),
            first_limpet: None,
            created_at: None,
            updated_at: None,
            data: Value::Null,
        }
    }
}

impl Case {
    /// Creates an unsaved case for a client.
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            ..Default::default()
        }
    }

    /// Sets the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the system.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Overlays the fields present in an API `data` object onto this case.
    ///
    /// Fields the response does not mention, or sends as `null`, keep their
    /// local value.
    pub fn merge(&mut self, data: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in data.iter().filter(|(_, v)| !v.is_null()) {
            current.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}

/// Result of [`CaseBoard::set_system`].
#[derive(Debug, Clone, PartialEq)]
pub enum SystemChange {
    /// No tracked case has that id.
    UnknownCase,
    /// The case already had that system.
    Unchanged,
    /// The system was updated; carries a snapshot of the updated case.
    Updated(Case),
}

/// The shared set of tracked cases, keyed by API id.
#[derive(Debug, Default)]
pub struct CaseBoard {
    cases: Mutex<BTreeMap<String, Case>>,
}

impl CaseBoard {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a case, replacing any case with the same id.
    ///
    /// Returns `false` (and tracks nothing) if the case has no id.
    pub fn insert(&self, case: Case) -> bool {
        let Some(id) = case.id.clone() else {
            return false;
        };
        self.cases.lock().insert(id, case);
        true
    }

    /// Returns a copy of the case with the given id.
    pub fn get(&self, id: &str) -> Option<Case> {
        self.cases.lock().get(id).cloned()
    }

    /// Returns the client name of a tracked case.
    pub fn client_name(&self, id: &str) -> Option<String> {
        self.cases.lock().get(id).map(|c| c.client.clone())
    }

    /// Replaces `current` with `saved` if the board still holds exactly
    /// `current`.
    ///
    /// Returns `false` if the case is no longer tracked or was changed in the
    /// meantime; the newer local state is kept.
    pub fn refresh(&self, current: &Case, saved: Case) -> bool {
        let Some(id) = current.id.as_deref() else {
            return false;
        };
        let mut cases = self.cases.lock();
        match cases.get_mut(id) {
            Some(tracked) if tracked == current => {
                *tracked = saved;
                true
            }
            _ => false,
        }
    }

    /// Moves a tracked case to `system` if it is somewhere else.
    pub fn set_system(&self, id: &str, system: &str) -> SystemChange {
        let mut cases = self.cases.lock();
        let Some(case) = cases.get_mut(id) else {
            return SystemChange::UnknownCase;
        };
        if case.system.as_deref() == Some(system) {
            return SystemChange::Unchanged;
        }
        case.system = Some(system.to_string());
        SystemChange::Updated(case.clone())
    }

    /// Replaces the whole board with `cases`, dropping any case not listed.
    pub fn replace_all(&self, cases: impl IntoIterator<Item = Case>) {
        let fresh: BTreeMap<String, Case> = cases
            .into_iter()
            .filter_map(|c| c.id.clone().map(|id| (id, c)))
            .collect();
        *self.cases.lock() = fresh;
    }

    /// Returns copies of all tracked cases, ordered by id.
    pub fn snapshot(&self) -> Vec<Case> {
        self.cases.lock().values().cloned().collect()
    }

    /// Returns the number of tracked cases.
    pub fn len(&self) -> usize {
        self.cases.lock().len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.cases.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_serializes_camel_case() {
        let case = Case::new("Ada").with_id("7").with_system("Sol");
        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(value["id"], "7");
        assert_eq!(value["codeRed"], false);
        assert_eq!(value["unidentifiedRats"], json!([]));
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn test_merge_keeps_unmentioned_fields() {
        let mut case = Case::new("Ada").with_system("Sol");
        case.title = Some("first".into());

        let data = json!({"id": "abc", "system": "Maia", "updatedAt": "2017-01-01"});
        case.merge(data.as_object().unwrap()).unwrap();

        assert_eq!(case.id.as_deref(), Some("abc"));
        assert_eq!(case.system.as_deref(), Some("Maia"));
        assert_eq!(case.title.as_deref(), Some("first"));
        assert_eq!(case.client, "Ada");
        assert_eq!(case.updated_at.as_deref(), Some("2017-01-01"));
    }

    #[test]
    fn test_board_ignores_unsaved_cases() {
        let board = CaseBoard::new();
        assert!(!board.insert(Case::new("nobody")));
        assert!(board.is_empty());
    }

    #[test]
    fn test_set_system() {
        let board = CaseBoard::new();
        board.insert(Case::new("Ada").with_id("7").with_system("Sol"));

        assert_eq!(board.set_system("8", "Maia"), SystemChange::UnknownCase);
        assert_eq!(board.set_system("7", "Sol"), SystemChange::Unchanged);

        let SystemChange::Updated(case) = board.set_system("7", "Maia") else {
            panic!("expected update");
        };
        assert_eq!(case.system.as_deref(), Some("Maia"));
        assert_eq!(board.get("7").unwrap().system.as_deref(), Some("Maia"));
    }

    #[test]
    fn test_refresh_only_unchanged_cases() {
        let board = CaseBoard::new();
        let sent = Case::new("Ada").with_id("7").with_system("Sol");
        board.insert(sent.clone());

        let mut saved = sent.clone();
        saved.updated_at = Some("2017-01-01".into());
        assert!(board.refresh(&sent, saved.clone()));
        assert_eq!(board.get("7").unwrap(), saved);

        board.set_system("7", "Maia");
        assert!(!board.refresh(&saved, sent.clone()));
        assert_eq!(board.get("7").unwrap().system.as_deref(), Some("Maia"));

        board.replace_all(Vec::new());
        assert!(!board.refresh(&sent, saved));
        assert!(board.is_empty());
    }

    #[test]
    fn test_replace_all_drops_missing() {
        let board = CaseBoard::new();
        board.insert(Case::new("old").with_id("1"));
        board.replace_all(vec![Case::new("new").with_id("2")]);

        assert!(board.get("1").is_none());
        assert_eq!(board.client_name("2").as_deref(), Some("new"));
        assert_eq!(board.len(), 1);
    }
}
