//! Deduplication of extractions produced by overlapping chunks.
//!
//! Three passes run in order:
//!
//! 1. `(class, normalized attributes)` for items with meaningful attributes.
//!    Those items are resolved here and never reach the later passes.
//! 2. `(class, exact text)` over the items pass 1 did not resolve.
//! 3. `(class, page, whitespace-normalized text)` over the survivors of 2.
//!
//! Within a group the highest confidence wins and ties keep the first item
//! seen. Survivors are returned verbatim in their original relative order.

use crate::raw::RawExtraction;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute key carrying supporting quotes; never part of identity.
pub const EVIDENCE_KEY: &str = "_evidence";

// An extraction tagged with the input position of its group's first member.
type Slotted = (usize, RawExtraction);

/// Deduplicates extractions. Items without a class are dropped.
#[must_use]
pub fn reconcile(items: Vec<RawExtraction>) -> Vec<RawExtraction> {
    let before = items.len();
    let (keyed, unkeyed): (Vec<(usize, RawExtraction, Option<String>)>, Vec<_>) = items
        .into_iter()
        .filter(|item| item.class_label().is_some())
        .enumerate()
        .map(|(position, item)| {
            let key = canonical_attributes(&item.attributes)
                .map(|attributes| format!("{}\u{1f}{attributes}", class_of(&item)));
            (position, item, key)
        })
        .partition(|(_, _, key)| key.is_some());

    let by_attributes = dedupe_pass(
        keyed.into_iter().map(|(position, item, key)| (position, item, key.unwrap_or_default())),
    );

    let by_text = dedupe_pass(unkeyed.into_iter().map(|(position, item, _)| {
        let key = format!("{}\u{1f}{}", class_of(&item), item.text);
        (position, item, key)
    }));
    let by_layout = dedupe_pass(by_text.into_iter().map(|(position, item)| {
        let page = item.page().map_or_else(String::new, |p| p.to_string());
        let key = format!(
            "{}\u{1f}{page}\u{1f}{}",
            class_of(&item),
            normalize_whitespace(&item.text)
        );
        (position, item, key)
    }));

    let mut kept: Vec<Slotted> = by_attributes.into_iter().chain(by_layout).collect();
    kept.sort_by_key(|(position, _)| *position);
    let kept: Vec<RawExtraction> = kept.into_iter().map(|(_, item)| item).collect();

    tracing::debug!(before, after = kept.len(), "reconciled extractions");
    kept
}

fn class_of(item: &RawExtraction) -> &str {
    item.class_label().unwrap_or_default()
}

// Keeps, per key, the best-ranked item at the position of the group's first
// member.
fn dedupe_pass<I>(items: I) -> Vec<Slotted>
where
    I: IntoIterator<Item = (usize, RawExtraction, String)>,
{
    let mut slots: Vec<Slotted> = Vec::new();
    let mut group_slot: HashMap<String, usize> = HashMap::new();

    for (position, item, key) in items {
        match group_slot.get(&key) {
            Some(&slot) => {
                if item.rank() > slots[slot].1.rank() {
                    slots[slot].1 = item;
                }
            }
            None => {
                group_slot.insert(key, slots.len());
                slots.push((position, item));
            }
        }
    }

    slots
}

/// Collapses whitespace runs (including U+3000) to one space and trims.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{3000}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Order-independent serialization of the meaningful attributes.
///
/// Drops the evidence key and empty values; returns `None` when nothing is
/// left.
#[must_use]
pub fn canonical_attributes(attributes: &Map<String, Value>) -> Option<String> {
    let pruned = prune_object(attributes, true)?;
    Some(canonical_json(&pruned))
}

fn prune_object(object: &Map<String, Value>, top_level: bool) -> Option<Value> {
    let kept: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| !(top_level && key.as_str() == EVIDENCE_KEY))
        .filter_map(|(key, value)| prune(value).map(|v| (key.clone(), v)))
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(Value::Object(kept))
    }
}

fn prune(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter_map(prune).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Array(kept))
            }
        }
        Value::Object(object) => prune_object(object, false),
        other => Some(other.clone()),
    }
}

// serde_json preserves insertion order here, so keys are sorted by hand.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&object[k])))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(text: &str, confidence: f64) -> RawExtraction {
        RawExtraction::new("asset", text)
            .with_attribute("owner", "李四")
            .with_attribute("total_price", "320万元")
            .with_confidence(confidence)
    }

    #[test]
    fn test_highest_confidence_wins() {
        let kept = reconcile(vec![asset("住宅", 0.4), asset("住宅一套", 0.9)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, Some(0.9));
    }

    #[test]
    fn test_three_duplicates_keep_middle_confidence() {
        let kept = reconcile(vec![asset("a", 0.2), asset("b", 0.5), asset("c", 0.3)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "b");
    }

    #[test]
    fn test_tie_keeps_first_seen_and_absent_is_zero() {
        let first = RawExtraction::new("bank", "中国农业银行");
        let second = RawExtraction::new("bank", "中国农业银行").with_confidence(0.0);
        let kept = reconcile(vec![first.clone(), second]);
        assert_eq!(kept, vec![first]);
    }

    #[test]
    fn test_attribute_order_and_evidence_ignored() {
        let a = RawExtraction::new("asset", "住宅")
            .with_attribute("total_price", "320万元")
            .with_attribute("owner", "李四")
            .with_attribute("_evidence", "标的物一：住宅");
        let b = RawExtraction::new("asset", "住宅（一）")
            .with_attribute("owner", "李四")
            .with_attribute("note", "")
            .with_attribute("total_price", "320万元")
            .with_confidence(0.8);
        let kept = reconcile(vec![a, b.clone()]);
        assert_eq!(kept, vec![b]);
    }

    #[test]
    fn test_same_text_with_different_attributes_kept_apart() {
        let first = RawExtraction::new("asset", "住宅").with_attribute("owner", "李四");
        let second = RawExtraction::new("asset", "住宅").with_attribute("owner", "王五");
        let third = RawExtraction::new("asset", " 住宅 ").with_attribute("owner", "王五");
        let kept = reconcile(vec![first.clone(), second.clone(), third]);
        assert_eq!(kept, vec![first, second]);
    }

    #[test]
    fn test_attributed_item_not_merged_with_bare_text() {
        let bare = RawExtraction::new("asset", "住宅").with_confidence(0.9);
        let attributed = RawExtraction::new("asset", "住宅").with_attribute("owner", "李四");
        let kept = reconcile(vec![bare.clone(), attributed.clone()]);
        assert_eq!(kept, vec![bare, attributed]);
    }

    #[test]
    fn test_empty_attributes_skip_first_pass() {
        let a = RawExtraction::new("asset", "住宅").with_attribute("owner", json!(null));
        let b = RawExtraction::new("asset", "车位").with_attribute("_evidence", "x");
        assert_eq!(reconcile(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_whitespace_pass_respects_page() {
        let a = RawExtraction::new("client", "某某\u{3000}资产  管理").with_page(1);
        let b = RawExtraction::new("client", " 某某 资产 管理 ").with_page(1);
        let c = RawExtraction::new("client", "某某 资产 管理").with_page(2);
        let kept = reconcile(vec![a.clone(), b, c.clone()]);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn test_unlabelled_items_dropped() {
        let mut unlabelled = RawExtraction::new("x", "y");
        unlabelled.class = None;
        let blank = RawExtraction::new("   ", "z");
        let kept = reconcile(vec![unlabelled, blank, RawExtraction::new("bank", "工行")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "工行");
    }

    #[test]
    fn test_relative_order_preserved() {
        let items = vec![
            RawExtraction::new("report_number", "A-1"),
            RawExtraction::new("bank", "工行"),
            RawExtraction::new("report_number", "A-1").with_confidence(0.6),
            RawExtraction::new("client", "张三"),
        ];
        let classes: Vec<String> = reconcile(items)
            .into_iter()
            .filter_map(|e| e.class)
            .collect();
        assert_eq!(classes, vec!["report_number", "bank", "client"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let items = vec![
            asset("a", 0.2),
            asset("b", 0.5),
            RawExtraction::new("bank", "工行").with_page(1),
            RawExtraction::new("bank", " 工行 ").with_page(1).with_confidence(0.7),
            RawExtraction::new("bank", "工行").with_page(2),
            RawExtraction::new("asset", "车位"),
        ];
        let once = reconcile(items);
        let twice = reconcile(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("\u{3000}a \t\n b\u{3000}\u{3000}c  "), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_canonical_attributes_nested() {
        let a = json!({"b": {"y": 1, "x": [null, "", 2]}, "a": "v"});
        let b = json!({"a": "v", "b": {"x": [2], "y": 1}, "c": {}});
        assert_eq!(
            canonical_attributes(a.as_object().unwrap()),
            canonical_attributes(b.as_object().unwrap())
        );
        assert_eq!(canonical_attributes(json!({"_evidence": "q"}).as_object().unwrap()), None);
    }
}
