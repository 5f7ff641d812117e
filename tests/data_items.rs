use std::collections::HashSet;

use cellfinder::datatype::{normalize_db_key, DataItem, DataItemKind, Decimal, WikiPage, NS_CATEGORY, NS_MAIN};
use cellfinder::property::{Property, TypeDescriptor};
use cellfinder::record::RecordValue;
use std::sync::Arc;

#[test]
fn titles_normalise_to_storage_keys() {
    assert_eq!(normalize_db_key("  main   street "), "Main_street");
    assert_eq!(normalize_db_key("has_a__gap"), "Has_a_gap");
    assert_eq!(normalize_db_key("émile"), "Émile");
    assert_eq!(normalize_db_key(" _ "), "");
    let page = WikiPage::new("the big  house", NS_MAIN);
    assert_eq!(page.db_key(), "The_big_house");
    assert_eq!(page.title(), "The big house");
}

#[test]
fn equality_follows_content() {
    assert_eq!(DataItem::page("alice"), DataItem::page("Alice"));
    assert_ne!(DataItem::page("Alice"), DataItem::category("Alice"));
    // same text, different kinds
    assert_ne!(DataItem::blob("1"), DataItem::number(1));
    let half = DataItem::Number(Decimal::from_str("1.50").unwrap());
    let other_half = DataItem::Number(Decimal::from_str("1.5").unwrap());
    assert_eq!(half, other_half);
    assert_eq!(half.item_hash(), other_half.item_hash());
    let distinct: HashSet<DataItem> = [
        DataItem::page("A"),
        DataItem::page("a"),
        DataItem::blob("A"),
        DataItem::category("A"),
    ]
    .into_iter()
    .collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn subobjects_are_separate_subjects() {
    let page = WikiPage::new("Alice", NS_MAIN);
    let part = page.clone().with_subobject("address");
    assert_ne!(DataItem::from(page), DataItem::from(part.clone()));
    assert_eq!(part.to_string(), "Alice#address");
}

#[test]
fn records_compare_by_components() {
    let a = DataItem::record(vec![Some(DataItem::blob("x")), None]);
    let b = DataItem::record(vec![Some(DataItem::blob("x")), None]);
    let c = DataItem::record(vec![None, Some(DataItem::blob("x"))]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.to_string(), "x; ");
}

#[test]
fn category_display() {
    let category = WikiPage::category("Living people");
    assert_eq!(category.namespace(), NS_CATEGORY);
    assert_eq!(category.to_string(), "Category:Living people");
}

#[test]
fn kinds_round_trip_through_uids() {
    for kind in DataItemKind::ALL {
        assert_eq!(DataItemKind::from_uid(kind.uid()), Some(kind));
    }
    assert_eq!(DataItemKind::from_uid(0), None);
}

#[test]
fn record_value_checks_component_kinds() {
    let descriptor = Arc::new(TypeDescriptor::record(vec![DataItemKind::Blob, DataItemKind::Number]).unwrap());
    // second component has the wrong kind
    let item = DataItem::record(vec![Some(DataItem::blob("Main St")), Some(DataItem::blob("one"))]);
    let value = RecordValue::new(&item, Arc::clone(&descriptor));
    assert!(value.is_valid());
    assert_eq!(value.data_items().len(), 2);
    assert_eq!(value.data_item_by_index(1), Some(DataItem::blob("Main St")));
    assert_eq!(value.data_item_by_index(2), None);
    assert_eq!(value.data_item_by_index(0), None);
    assert_eq!(value.data_item_by_index(3), None);

    let not_a_record = RecordValue::new(&DataItem::blob("Main St"), Arc::clone(&descriptor));
    assert!(!not_a_record.is_valid());
    assert_eq!(not_a_record.data_item_by_index(1), None);

    let plain = RecordValue::new(&item, Arc::new(TypeDescriptor::text()));
    assert!(!plain.is_valid());
}

#[test]
fn record_types_are_checked() {
    assert!(TypeDescriptor::record(vec![]).is_err());
    assert!(TypeDescriptor::record(vec![DataItemKind::Record]).is_err());
    assert!(TypeDescriptor::from_type_id("_num", &["_txt"]).is_err());
    assert!(TypeDescriptor::from_type_id("_rec", &["_nope"]).is_err());
    let descriptor = TypeDescriptor::from_type_id("_rec", &["_wpg", "_dat"]).unwrap();
    assert_eq!(descriptor.component_count(), 2);
    assert_eq!(descriptor.field(2), Some(DataItemKind::Time));
    assert_eq!(descriptor.field(0), None);
    let empty: [&str; 0] = [];
    assert!(!TypeDescriptor::from_type_id("_wpg", &empty).unwrap().is_multi_component());
}

#[test]
fn property_labels() {
    let category = Property::instance_of();
    assert!(category.is_predefined());
    assert_eq!(category.label(), "Category");
    let inverse = Property::new("has mother", true).unwrap();
    assert_eq!(inverse.key(), "Has_mother");
    assert_eq!(inverse.to_string(), "-Has mother");
    assert!(!inverse.forward().is_inverse());
    assert!(Property::new("a|b", false).is_err());
}

#[test]
fn hash_parts_cannot_run_into_each_other() {
    let with_subobject = WikiPage::new("A", NS_MAIN).with_subobject("x#0##");
    let with_hash_title = WikiPage::new("A#0##x", NS_MAIN);
    assert_ne!(DataItem::from(with_subobject.clone()), DataItem::from(with_hash_title.clone()));
    let shifted = WikiPage::new("A#0", NS_MAIN).with_subobject("x");
    let plain = WikiPage::new("A", NS_MAIN).with_subobject("0#x");
    assert_ne!(DataItem::from(shifted), DataItem::from(plain));
    assert_eq!(
        DataItem::from(with_subobject.clone()),
        DataItem::from(WikiPage::new("A", NS_MAIN).with_subobject("x#0##"))
    );
}

#[test]
fn ordered_keys_follow_numeric_order() {
    let numbers: Vec<Decimal> = [
        "-9007199254740993",
        "-9007199254740992",
        "-10",
        "-2",
        "-0.19",
        "-0.123",
        "-0.12",
        "0",
        "0.000001",
        "0.12",
        "0.123",
        "0.19",
        "1.5",
        "2",
        "10",
        "33",
        "9007199254740992",
        "9007199254740993",
        "1e30",
    ]
    .iter()
    .map(|n| Decimal::from_str(n).unwrap())
    .collect();
    let keys: Vec<String> = numbers.iter().map(Decimal::ordered_key).collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
    }
    assert_eq!(
        Decimal::from_str("1.50").unwrap().ordered_key(),
        Decimal::from_str("1.5").unwrap().ordered_key()
    );
}
