use uuid::Uuid;

use super::model::ContentDocument;

/// Documents picked by id, plus the ids that did not resolve.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub found: Vec<ContentDocument>,
    pub missing: Vec<String>,
}

/// Pick `ids` out of `docs` in the order they were requested.
///
/// Ids that are malformed or match nothing land in `missing`. Duplicate ids
/// are returned once.
pub fn select_by_ids<S: AsRef<str>>(docs: &[ContentDocument], ids: &[S]) -> Selection {
    let mut selection = Selection::default();
    let mut seen: Vec<Uuid> = Vec::with_capacity(ids.len());

    for raw in ids {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let doc = Uuid::parse_str(raw)
            .ok()
            .and_then(|id| docs.iter().find(|d| d.id == id));
        match doc {
            Some(doc) if seen.contains(&doc.id) => {}
            Some(doc) => {
                seen.push(doc.id);
                selection.found.push(doc.clone());
            }
            None => {
                tracing::warn!(id = raw, "referenced document not found");
                selection.missing.push(raw.to_string());
            }
        }
    }
    selection
}
