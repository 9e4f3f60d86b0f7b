//! Conflict resolution for rejected conditional writes.
//!
//! A conflict is transient: it exists only inside the save operation that
//! hit the precondition failure. Resolution is a shallow merge of the
//! server's current document under the local one; the only field that ever
//! needs a human decision is the primary `text`, which can either be
//! concatenated (merge) or replaced by the local version (overwrite). If
//! both sides agree on `text` the shallow merge happens silently.

use daybook_core::Error;
use serde_json::{Map, Value};

/// How to reconcile diverged primary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep both: remote text, newline, local text.
    Merge,
    /// Local text wins; remote text is discarded.
    Overwrite,
}

/// Decides between merge and overwrite when primary text diverged.
///
/// Implementations typically ask the user; the engine only calls this
/// when the two texts actually differ.
pub trait ResolveConflict: Send + Sync {
    fn decide(&self, remote_text: &str, local_text: &str) -> Resolution;
}

/// Resolver that always keeps both versions.
pub struct AlwaysMerge;

impl ResolveConflict for AlwaysMerge {
    fn decide(&self, _remote_text: &str, _local_text: &str) -> Resolution {
        Resolution::Merge
    }
}

/// Resolver that always lets the local version win.
pub struct AlwaysOverwrite;

impl ResolveConflict for AlwaysOverwrite {
    fn decide(&self, _remote_text: &str, _local_text: &str) -> Resolution {
        Resolution::Overwrite
    }
}

fn as_object(body: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

fn text_of(doc: &Map<String, Value>) -> String {
    doc.get("text").and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Merge the local document over the server's current one.
///
/// All remote fields survive unless the local document also sets them
/// (shallow merge, local wins). When `remote` is absent the local body
/// passes through unchanged. The resolver is consulted only when the two
/// `text` fields differ; [`Resolution::Merge`] joins them with a newline.
pub fn merge_documents(
    remote: Option<&str>,
    local: &str,
    resolver: &dyn ResolveConflict,
) -> Result<String, Error> {
    let Some(remote) = remote else {
        return Ok(local.to_string());
    };

    let remote_doc = as_object(remote);
    let local_doc = as_object(local);
    let remote_text = text_of(&remote_doc);
    let local_text = text_of(&local_doc);

    let mut merged = remote_doc;
    merged.extend(local_doc);

    if remote_text != local_text && resolver.decide(&remote_text, &local_text) == Resolution::Merge {
        merged.insert("text".to_string(), Value::String(format!("{remote_text}\n{local_text}")));
    }

    Ok(serde_json::to_string(&Value::Object(merged))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_concatenates_text() {
        let remote = r#"{"text":"remote words","mood":"calm"}"#;
        let local = r#"{"text":"local words","inkUsed":11}"#;

        let merged = merge_documents(Some(remote), local, &AlwaysMerge).unwrap();
        let doc: Value = serde_json::from_str(&merged).unwrap();

        assert_eq!(doc["text"], "remote words\nlocal words");
        assert_eq!(doc["mood"], "calm");
        assert_eq!(doc["inkUsed"], 11);
    }

    #[test]
    fn test_overwrite_keeps_local_text_but_layers_remote_fields() {
        let remote = r#"{"text":"remote words","mood":"calm"}"#;
        let local = r#"{"text":"local words"}"#;

        let merged = merge_documents(Some(remote), local, &AlwaysOverwrite).unwrap();
        let doc: Value = serde_json::from_str(&merged).unwrap();

        assert_eq!(doc["text"], "local words");
        assert_eq!(doc["mood"], "calm");
    }

    #[test]
    fn test_identical_text_never_consults_resolver() {
        struct Panics;
        impl ResolveConflict for Panics {
            fn decide(&self, _r: &str, _l: &str) -> Resolution {
                panic!("resolver must not be consulted");
            }
        }

        let remote = r#"{"text":"same","mood":"calm"}"#;
        let local = r#"{"text":"same","inkUsed":4}"#;

        let merged = merge_documents(Some(remote), local, &Panics).unwrap();
        let doc: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(doc["text"], "same");
        assert_eq!(doc["mood"], "calm");
        assert_eq!(doc["inkUsed"], 4);
    }

    #[test]
    fn test_absent_remote_passes_local_through() {
        let local = r#"{"text":"only me"}"#;
        let merged = merge_documents(None, local, &AlwaysMerge).unwrap();
        assert_eq!(merged, local);
    }

    #[test]
    fn test_documents_without_text_shallow_merge_silently() {
        let remote = r#"{"theme":"dark","timezone":"UTC"}"#;
        let local = r#"{"theme":"paper"}"#;

        let merged = merge_documents(Some(remote), local, &AlwaysOverwrite).unwrap();
        let doc: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(doc["theme"], "paper");
        assert_eq!(doc["timezone"], "UTC");
    }
}
