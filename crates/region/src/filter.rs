// Region filtering over `targetRegions`-tagged items.

use serde_json::Value;

use crate::region::Region;

/// Field carrying the region tags on a content item.
pub const TARGET_REGIONS_FIELD: &str = "targetRegions";

/// Whether an item is visible in `region`.
///
/// Untagged items, and items whose tag list is empty, are visible everywhere.
pub fn is_visible(item: &Value, region: Region) -> bool {
    match item.get(TARGET_REGIONS_FIELD) {
        None | Some(Value::Null) => true,
        Some(Value::Array(tags)) if tags.is_empty() => true,
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .any(|tag| region.matches_tag(tag)),
        Some(Value::String(tag)) => region.matches_tag(tag),
        Some(_) => false,
    }
}

/// Keep the items visible in `region`.
///
/// When nothing matches, the unfiltered list is returned so a page section
/// never renders empty.
pub fn filter_items(items: Vec<Value>, region: Region) -> Vec<Value> {
    filter_items_by(items, region, |item| item)
}

/// [`filter_items`] for wrapped items; `tagged` points at the JSON object
/// carrying `targetRegions` (for a stored document, its `content`).
pub fn filter_items_by<T, F>(items: Vec<T>, region: Region, tagged: F) -> Vec<T>
where
    F: Fn(&T) -> &Value,
{
    if !items.iter().any(|item| is_visible(tagged(item), region)) {
        return items;
    }
    items
        .into_iter()
        .filter(|item| is_visible(tagged(item), region))
        .collect()
}

/// Apply [`filter_items`] to every array of tagged objects inside a content tree.
///
/// An array is filtered when at least one of its elements is an object that
/// carries a `targetRegions` field. Nested arrays are walked after filtering.
pub fn filter_document(value: &mut Value, region: Region) {
    match value {
        Value::Array(items) => {
            if is_tagged_array(items) {
                let taken = std::mem::take(items);
                *items = filter_items(taken, region);
            }
            for item in items.iter_mut() {
                filter_document(item, region);
            }
        }
        Value::Object(map) => {
            for child in map.values_mut() {
                filter_document(child, region);
            }
        }
        _ => {}
    }
}

fn is_tagged_array(items: &[Value]) -> bool {
    items
        .iter()
        .any(|item| item.as_object().is_some_and(|o| o.contains_key(TARGET_REGIONS_FIELD)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(items: &[Value]) -> Vec<&str> {
        items.iter().filter_map(|i| i["name"].as_str()).collect()
    }

    #[test]
    fn keeps_matching_and_all_tagged_items() {
        let items = vec![
            json!({"name": "fr", "targetRegions": ["france"]}),
            json!({"name": "ma", "targetRegions": ["morocco"]}),
            json!({"name": "everyone", "targetRegions": ["all"]}),
            json!({"name": "untagged"}),
        ];
        let filtered = filter_items(items, Region::France);
        assert_eq!(names(&filtered), vec!["fr", "everyone", "untagged"]);
    }

    #[test]
    fn falls_back_to_unfiltered_when_nothing_matches() {
        let items = vec![
            json!({"name": "fr", "targetRegions": ["france"]}),
            json!({"name": "ma", "targetRegions": ["morocco"]}),
        ];
        let filtered = filter_items(items, Region::International);
        assert_eq!(names(&filtered), vec!["fr", "ma"]);
    }

    #[test]
    fn single_string_tag_is_accepted() {
        assert!(is_visible(&json!({"targetRegions": "morocco"}), Region::Morocco));
        assert!(!is_visible(&json!({"targetRegions": 3}), Region::Morocco));
    }

    #[test]
    fn filters_nested_sections_of_a_document() {
        let mut doc = json!({
            "hero": {"title": "Hello"},
            "pricing": {
                "plans": [
                    {"name": "fr", "targetRegions": ["france"]},
                    {"name": "intl", "targetRegions": ["international"]},
                ]
            },
            "videos": [
                {"name": "v-all", "targetRegions": ["all"]},
                {"name": "v-ma", "targetRegions": ["morocco"]},
            ],
            "faq": {"items": [{"q": "Why?"}, {"q": "How?"}]}
        });

        filter_document(&mut doc, Region::International);

        assert_eq!(names(doc["pricing"]["plans"].as_array().unwrap()), vec!["intl"]);
        assert_eq!(names(doc["videos"].as_array().unwrap()), vec!["v-all"]);
        assert_eq!(doc["faq"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(doc["hero"]["title"], "Hello");
    }
}
