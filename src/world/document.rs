//! Structured documents: the in-memory form of every persisted ledger
//!
//! Ledgers (`world-state.yaml`, `active-quests.yaml`), NPC documents and
//! location state all load into the same key/value shape. Sections are
//! addressed by a list of literal keys (`npcs` then `kolyan_indirovich`), so
//! an id containing a dot stays one key.

use serde_json::{Map, Value};

/// A persisted key/value document (YAML ledger or Markdown frontmatter)
pub type Document = Map<String, Value>;

/// Shallow-merge `changes` over `base`.
///
/// Keys present in `changes` replace the ones in `base`; every other key in
/// `base` is preserved untouched.
pub fn shallow_merge(base: &mut Document, changes: &Document) {
    for (key, value) in changes {
        base.insert(key.clone(), value.clone());
    }
}

/// The mapping stored under the literal `key`, creating it if missing.
///
/// Returns `None` if the key is empty or holds a value that is not a mapping.
pub fn child_mut<'a>(parent: &'a mut Document, key: &str) -> Option<&'a mut Document> {
    if key.is_empty() {
        return None;
    }
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Walk a list of literal keys to a mutable mapping, creating missing
/// intermediate mappings on the way.
///
/// Returns `None` if there are no keys, a key is empty, or the walk runs into
/// an existing value that is not a mapping.
pub fn path_mut<'a, S: AsRef<str>>(
    document: &'a mut Document,
    keys: &[S],
) -> Option<&'a mut Document> {
    let (first, rest) = keys.split_first()?;
    let mut current = child_mut(document, first.as_ref())?;
    for key in rest {
        current = child_mut(current, key.as_ref())?;
    }
    Some(current)
}

/// Render a scalar document value the way ledgers display it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn shallow_merge_later_keys_win_and_unrelated_keys_survive() {
        let mut base = doc(json!({ "gates": "open", "mood": "tense" }));
        let changes = doc(json!({ "gates": "closed", "curfew": true }));

        shallow_merge(&mut base, &changes);

        assert_eq!(base.get("gates"), Some(&json!("closed")));
        assert_eq!(base.get("mood"), Some(&json!("tense")));
        assert_eq!(base.get("curfew"), Some(&json!(true)));
    }

    #[test]
    fn path_mut_creates_nested_mappings() {
        let mut document = Document::new();
        let entry = path_mut(&mut document, &["npcs", "ismark"]).unwrap();
        entry.insert("status".to_string(), json!("Alive"));

        assert_eq!(document["npcs"]["ismark"]["status"], "Alive");
    }

    #[test]
    fn path_mut_replaces_null_placeholders() {
        let mut document = doc(json!({ "factions": null }));
        assert!(path_mut(&mut document, &["factions", "vistani"]).is_some());
        assert!(document["factions"].is_object());
    }

    #[test]
    fn path_mut_refuses_to_descend_into_scalars() {
        let mut document = doc(json!({ "npcs": "none yet" }));
        assert!(path_mut(&mut document, &["npcs", "ireena"]).is_none());
        assert!(path_mut::<&str>(&mut document, &[]).is_none());
        assert!(path_mut(&mut document, &["a", "", "b"]).is_none());
    }

    #[test]
    fn child_mut_takes_the_key_literally() {
        let mut document = doc(json!({ "st.andral": { "status": "Active" } }));
        let quest = child_mut(&mut document, "st.andral").unwrap();
        quest.insert("updated_at".to_string(), json!("now"));

        assert!(document.get("st").is_none());
        assert_eq!(document["st.andral"]["status"], "Active");
        assert_eq!(document["st.andral"]["updated_at"], "now");
        assert!(child_mut(&mut document, "").is_none());
    }

    #[test]
    fn path_mut_nests_literal_keys() {
        let mut document = Document::new();
        path_mut(&mut document, &["factions", "keepers.of.the.feather"])
            .unwrap()
            .insert("mood".to_string(), json!("wary"));
        assert_eq!(
            document["factions"]["keepers.of.the.feather"]["mood"],
            "wary"
        );
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("Dead")), "Dead");
        assert_eq!(display_value(&json!(3)), "3");
    }
}
