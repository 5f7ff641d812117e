use cellfinder::datatype::DataItemKind;
use cellfinder::persist::PersistenceMode;
use cellfinder::printout::{PrintMode, SortOrder};
use cellfinder::property::{Property, PropertyRegistry};
use cellfinder::settings::{ColumnSettings, Settings};
use cellfinder::CellfinderError;

fn setup(name: &str) -> PropertyRegistry {
    let path = write_settings(name, SETTINGS);
    let settings = Settings::load(Some(&path)).expect("settings");
    let _ = std::fs::remove_file(&path);
    settings.registry().expect("registry")
}

const SETTINGS: &str = r#"
subjects = ["Alice", "Bob"]

[cache]
capacity = 8

[[properties]]
name = "Has address"
type_id = "_rec"
fields = ["_txt", "_num"]

[[properties]]
name = "Has age"
type_id = "_num"

[[columns]]
mode = "this"

[[columns]]
mode = "categories"
limit = 2
order = " asc "

[[columns]]
mode = "category"
data = "Person"

[[columns]]
mode = "property"
data = "Has address"
label = "Street"
index = 1
"#;

fn write_settings(name: &str, content: &str) -> String {
    let path = std::env::temp_dir().join(format!("cellfinder_{}_{}.toml", name, std::process::id()));
    std::fs::write(&path, content).expect("settings file");
    path.to_string_lossy().to_string()
}

fn column(mode: &str, data: Option<&str>) -> ColumnSettings {
    ColumnSettings {
        mode: mode.to_string(),
        data: data.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn settings_file_is_layered_over_defaults() {
    let path = write_settings("layered", SETTINGS);
    let settings = Settings::load(Some(&path)).expect("settings");
    assert_eq!(settings.cache.capacity, 8);
    assert_eq!(settings.log.filter, "info");
    assert_eq!(settings.database.mode(), PersistenceMode::InMemory);
    assert_eq!(settings.subjects, vec!["Alice", "Bob"]);

    let registry = settings.registry().unwrap();
    let requests = settings.print_requests(&registry).unwrap();
    assert_eq!(requests.len(), 4);
    assert!(matches!(requests[0].mode(), PrintMode::This));
    assert!(matches!(requests[1].mode(), PrintMode::Categories));
    assert_eq!(requests[1].limit(), Some(2));
    assert_eq!(requests[1].order(), SortOrder::Ascending);
    match requests[2].mode() {
        PrintMode::CategoryCheck { category } => assert_eq!(category.db_key(), "Person"),
        other => panic!("unexpected mode {other:?}"),
    }
    assert_eq!(requests[3].label(), "Street");
    assert_eq!(requests[3].index(), Some(1));
    assert_eq!(requests[3].type_id(), "_rec");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_is_an_error_when_named() {
    assert!(Settings::load(Some("/definitely/not/here/cellfinder.toml")).is_err());
}

#[test]
fn declared_properties_keep_their_types() {
    let registry = setup("declared");
    let address = registry.descriptor(&Property::new("Has address", false).unwrap());
    assert_eq!(address.fields(), &[DataItemKind::Blob, DataItemKind::Number]);
    let age = registry.descriptor(&Property::new("Has age", false).unwrap());
    assert_eq!(age.kind(), DataItemKind::Number);
    // undeclared properties hold pages
    let friend = registry.descriptor(&Property::new("Has friend", false).unwrap());
    assert_eq!(friend.kind(), DataItemKind::WikiPage);
}

#[test]
fn column_modes() {
    let registry = setup("modes");
    let request = column("categories", None).to_print_request(&registry).unwrap();
    assert_eq!(request.label(), "Category");
    assert_eq!(request.type_id(), "_wpg");

    let request = column("category", Some("Person")).to_print_request(&registry).unwrap();
    assert_eq!(request.type_id(), "_boo");

    let request = column("property", Some("-Has friend")).to_print_request(&registry).unwrap();
    match request.mode() {
        PrintMode::Property { value, index } => {
            assert!(value.is_valid());
            assert!(value.property().unwrap().is_inverse());
            assert_eq!(*index, None);
        }
        other => panic!("unexpected mode {other:?}"),
    }
}

#[test]
fn malformed_columns_are_rejected() {
    let registry = setup("malformed");
    assert!(column("sideways", None).to_print_request(&registry).is_err());
    assert!(column("category", None).to_print_request(&registry).is_err());
    assert!(column("property", Some("  ")).to_print_request(&registry).is_err());
    let indexed_categories = ColumnSettings {
        index: Some(1),
        ..column("categories", None)
    };
    assert!(indexed_categories.to_print_request(&registry).is_err());
}

#[test]
fn unknown_property_types_are_rejected() {
    let path = write_settings(
        "bad_type",
        r#"
        [[properties]]
        name = "Has shape"
        type_id = "_geo"
        "#,
    );
    let settings = Settings::load(Some(&path)).expect("settings");
    assert!(settings.registry().is_err());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn the_binary_needs_a_database_file() {
    for (name, content) in [("no_database", SETTINGS), ("blank_database", "[database]\npath = \"  \"\n")] {
        let path = write_settings(name, content);
        let settings = Settings::load(Some(&path)).expect("settings");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(settings.database.existing_file(), Err(CellfinderError::Config(_))), "{name}");
    }
    let path = write_settings("with_database", "[database]\npath = \"wiki.db\"\n");
    let settings = Settings::load(Some(&path)).expect("settings");
    let _ = std::fs::remove_file(&path);
    assert_eq!(
        settings.database.existing_file().unwrap(),
        PersistenceMode::File(String::from("wiki.db"))
    );
}
