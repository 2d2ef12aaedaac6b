use adl_types::{AttributeKind, Caller, EntityId, ListItem};
use proptest::prelude::*;
use std::collections::HashSet;

// ── EntityId ──────────────────────────────────────────────────────

#[test]
fn entity_id_wraps_any_string() {
    let id = EntityId::new("THIS-IS-A-FID");
    assert_eq!(id.as_str(), "THIS-IS-A-FID");
    assert_eq!(id.to_string(), "THIS-IS-A-FID");
}

#[test]
fn entity_id_empty_is_allowed() {
    let id = EntityId::from("");
    assert_eq!(id.as_str(), "");
}

#[test]
fn entity_id_generate_is_unique() {
    let ids: HashSet<EntityId> = (0..100).map(|_| EntityId::generate()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn entity_id_generate_is_uuid_text() {
    let id = EntityId::generate();
    assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
}

#[test]
fn entity_id_from_string_and_str_agree() {
    assert_eq!(EntityId::from("abc"), EntityId::from("abc".to_string()));
}

#[test]
fn entity_id_serializes_transparently() {
    let id = EntityId::new("fid-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"fid-1\"");
}

// ── Caller ────────────────────────────────────────────────────────

#[test]
fn caller_anonymous() {
    assert!(Caller::anonymous().is_anonymous());
    assert!(!Caller::new("u1", "").is_anonymous());
    assert!(!Caller::new("", "p1").is_anonymous());
}

// ── AttributeKind ─────────────────────────────────────────────────

#[test]
fn attribute_kind_all_distinct_and_ordered() {
    let mut sorted = AttributeKind::ALL;
    sorted.sort();
    assert_eq!(sorted, AttributeKind::ALL);

    let names: HashSet<&str> = AttributeKind::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(names.len(), AttributeKind::ALL.len());
}

#[test]
fn attribute_kind_serde_uses_snake_case() {
    let json = serde_json::to_string(&AttributeKind::Metadata).unwrap();
    assert_eq!(json, "\"metadata\"");
    let parsed: AttributeKind = serde_json::from_str("\"counter\"").unwrap();
    assert_eq!(parsed, AttributeKind::Counter);
}

// ── ListItem ──────────────────────────────────────────────────────

#[test]
fn list_item_new() {
    let item = ListItem::new("1", "ONE");
    assert_eq!(item.key, "1");
    assert_eq!(item.value, "ONE");
}

proptest! {
    #[test]
    fn entity_id_display_matches_input(s in "[A-Za-z0-9-]{0,40}") {
        let id = EntityId::new(s.clone());
        prop_assert_eq!(id.to_string(), s);
    }
}
