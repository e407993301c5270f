use attrforge::{AttrValue, DefinitionTable, EngineConfig, RawMap, Registry};
use serde_json::{json, Value};
use std::fs;

fn raw(value: Value) -> RawMap {
    value.as_object().unwrap().clone()
}

#[test]
fn test_file_settings_reach_data_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrforge.toml");
    fs::write(
        &path,
        r#"
datetime_format = "%d.%m.%Y %H:%M"
skip_non_attributes = false
extract_nulls = false
"#,
    )
    .unwrap();

    let registry = Registry::load(Some(path.as_path())).unwrap();
    assert_eq!(registry.config().datetime_format, "%d.%m.%Y %H:%M");
    assert_eq!(registry.config().date_format, "%Y-%m-%d");

    let event = registry
        .define("Event")
        .definitions(
            DefinitionTable::new()
                .shorthand("startsAt:datetime")
                .shorthand("note:string"),
        )
        .build()
        .unwrap();

    let entity = event
        .hydrate(raw(json!({"startsAt": "01.03.2014 09:30", "note": null, "junk": 1})))
        .unwrap();
    assert!(!entity.has("junk"));
    assert!(entity.value("startsAt").and_then(AttrValue::as_datetime).is_some());

    assert_eq!(
        event.extract(&entity).unwrap(),
        raw(json!({"startsAt": "01.03.2014 09:30"}))
    );
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_invalid_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "extract_nulls = \"sometimes\"").unwrap();

    let err = EngineConfig::load(Some(path.as_path())).unwrap_err();
    assert!(matches!(err, attrforge::Error::Config(_)));
}

#[test]
fn test_loose_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loose.toml");
    let config = EngineConfig {
        strict_definitions: false,
        ..Default::default()
    };
    fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    let registry = Registry::load(Some(path.as_path())).unwrap();
    let gadget = registry
        .define("Gadget")
        .definitions(DefinitionTable::new().config("size:int", json!({"unit": "cm"})))
        .build()
        .unwrap();
    let entity = gadget.hydrate(raw(json!({"size": "4"}))).unwrap();
    assert_eq!(entity.value("size"), Some(&AttrValue::Int(4)));
}
