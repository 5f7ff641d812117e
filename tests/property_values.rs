use std::sync::Arc;

use cellfinder::cache::CategoryCache;
use cellfinder::datatype::{DataItem, DataItemKind, WikiPage, NS_MAIN};
use cellfinder::finder::ResultFieldMatchFinder;
use cellfinder::printout::PrintRequest;
use cellfinder::property::{Property, PropertyRegistry, TypeDescriptor};
use cellfinder::store::MemoryStore;

fn setup() -> (MemoryStore, PropertyRegistry, DataItem) {
    let mut registry = PropertyRegistry::new();
    registry
        .declare(
            "Has address",
            TypeDescriptor::record(vec![DataItemKind::Blob, DataItemKind::Number]).unwrap(),
        )
        .unwrap();
    registry.declare("Has age", TypeDescriptor::number()).unwrap();
    registry.declare("Has score", TypeDescriptor::number()).unwrap();

    let store = MemoryStore::new();
    let alice = WikiPage::new("Alice", NS_MAIN);
    let has_age = Property::new("Has age", false).unwrap();
    store.add_value(&alice, &has_age, DataItem::number(42)).unwrap();

    let has_score = Property::new("Has score", false).unwrap();
    for score in [10, 2, 33] {
        store.add_value(&alice, &has_score, DataItem::number(score)).unwrap();
    }

    let has_address = Property::new("Has address", false).unwrap();
    for record in [
        DataItem::record(vec![Some(DataItem::blob("Main St")), Some(DataItem::number(1))]),
        DataItem::record(vec![None, Some(DataItem::number(2))]),
        DataItem::record(vec![Some(DataItem::blob("Side St")), None]),
    ] {
        store.add_value(&alice, &has_address, record).unwrap();
    }
    (store, registry, DataItem::from(alice))
}

fn finder(store: &MemoryStore) -> ResultFieldMatchFinder<'_> {
    ResultFieldMatchFinder::with_cache(store, Arc::new(CategoryCache::single_slot()))
}

#[test]
fn plain_property_values() {
    let (store, registry, alice) = setup();
    let request = PrintRequest::property("Age", registry.property_value("Has age"));
    assert_eq!(finder(&store).results_for(&alice, &request).unwrap(), vec![DataItem::number(42)]);
    assert_eq!(request.type_id(), "_num");
}

#[test]
fn limit_and_order_reach_the_store() {
    let (store, registry, alice) = setup();
    let finder = finder(&store);
    let value = registry.property_value("Has score");
    let natural = PrintRequest::property("", value.clone());
    assert_eq!(
        finder.results_for(&alice, &natural).unwrap(),
        vec![DataItem::number(10), DataItem::number(2), DataItem::number(33)]
    );
    let request = PrintRequest::property("", value.clone()).with_order("desc").with_limit(2);
    assert_eq!(
        finder.results_for(&alice, &request).unwrap(),
        vec![DataItem::number(33), DataItem::number(10)]
    );
    let request = PrintRequest::property("", value).with_limit(0);
    assert!(finder.results_for(&alice, &request).unwrap().is_empty());
}

#[test]
fn unknown_property_gives_nothing() {
    let (store, registry, alice) = setup();
    let request = PrintRequest::property("", registry.property_value("Has nothing"));
    assert!(finder(&store).results_for(&alice, &request).unwrap().is_empty());
}

#[test]
fn invalid_property_never_reaches_the_store() {
    let (store, registry, alice) = setup();
    let finder = finder(&store);
    for label in ["Has [broken]", "", "-", "___"] {
        let value = registry.property_value(label);
        assert!(!value.is_valid(), "{label:?}");
        let request = PrintRequest::property(label, value);
        assert!(finder.results_for(&alice, &request).unwrap().is_empty());
    }
    // inverting a property that does not hold pages
    let value = registry.property_value("-Has age");
    assert!(!value.is_valid());
    assert!(!value.errors().is_empty());
    let request = PrintRequest::property("", value);
    assert!(finder.results_for(&alice, &request).unwrap().is_empty());
    assert_eq!(store.fetch_count(), 0);
}

#[test]
fn only_pages_have_property_values() {
    let (store, registry, _) = setup();
    let request = PrintRequest::property("", registry.property_value("Has age"));
    let finder = finder(&store);
    for subject in [DataItem::blob("Alice"), DataItem::number(7), DataItem::boolean(true)] {
        assert!(finder.results_for(&subject, &request).unwrap().is_empty());
    }
    assert_eq!(store.fetch_count(), 0);
}

#[test]
fn record_components_by_index() {
    let (store, registry, alice) = setup();
    let finder = finder(&store);
    let value = registry.property_value("Has address");
    let street = PrintRequest::property_component("Street", value.clone(), 1);
    assert_eq!(
        finder.results_for(&alice, &street).unwrap(),
        vec![DataItem::blob("Main St"), DataItem::blob("Side St")]
    );
    let number = PrintRequest::property_component("Number", value.clone(), 2);
    assert_eq!(
        finder.results_for(&alice, &number).unwrap(),
        vec![DataItem::number(1), DataItem::number(2)]
    );
    for index in [0, 3] {
        let request = PrintRequest::property_component("", value.clone(), index);
        assert!(finder.results_for(&alice, &request).unwrap().is_empty(), "index {index}");
    }
    let whole = PrintRequest::property("Address", value);
    assert_eq!(finder.results_for(&alice, &whole).unwrap().len(), 3);
}

#[test]
fn index_is_ignored_for_single_component_types() {
    let (store, registry, alice) = setup();
    let request = PrintRequest::property_component("", registry.property_value("Has age"), 2);
    assert_eq!(request.index(), Some(2));
    assert_eq!(finder(&store).results_for(&alice, &request).unwrap(), vec![DataItem::number(42)]);
}

#[test]
fn record_limit_counts_records_not_components() {
    let (store, registry, alice) = setup();
    // the second record has no street, so only one component survives
    let request =
        PrintRequest::property_component("", registry.property_value("Has address"), 1).with_limit(2);
    assert_eq!(
        finder(&store).results_for(&alice, &request).unwrap(),
        vec![DataItem::blob("Main St")]
    );
}

#[test]
fn inverse_property_lists_referring_pages() {
    let store = MemoryStore::new();
    let registry = PropertyRegistry::new();
    let has_mother = Property::new("Has mother", false).unwrap();
    let alice = WikiPage::new("Alice", NS_MAIN);
    for child in ["Bob", "Carol"] {
        store
            .add_value(&WikiPage::new(child, NS_MAIN), &has_mother, DataItem::from(alice.clone()))
            .unwrap();
    }
    let finder = finder(&store);
    let children = PrintRequest::property("Children", registry.property_value("-Has mother"));
    assert_eq!(
        finder.results_for(&DataItem::from(alice), &children).unwrap(),
        vec![DataItem::page("Bob"), DataItem::page("Carol")]
    );
    let mother = PrintRequest::property("Mother", registry.property_value("Has mother"));
    assert_eq!(
        finder.results_for(&DataItem::page("Bob"), &mother).unwrap(),
        vec![DataItem::page("Alice")]
    );
    // values are never added through the inverse
    assert!(store
        .add_value(&WikiPage::new("Dave", NS_MAIN), &Property::new("Has mother", true).unwrap(), DataItem::page("Alice"))
        .is_err());
}

#[test]
fn labels_are_normalised() {
    let (store, registry, alice) = setup();
    let request = PrintRequest::property("", registry.property_value("  has_age "));
    assert_eq!(finder(&store).results_for(&alice, &request).unwrap(), vec![DataItem::number(42)]);
}
