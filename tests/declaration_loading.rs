//! Declaration Loading Tests
//!
//! End-to-end: class declarations on disk → loader → engine → typed target.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use fieldbind::binding::{BindingConfig, BindingEngine, BoundObject, FromBound, RawInput};
use fieldbind::schema::{ClassSpecLoader, ConfigResult};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(dir: &Path, name: &str, doc: serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

fn setup_specs() -> (TempDir, ClassSpecLoader) {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "address.json",
        json!({
            "name": "Address",
            "fields": [
                {"name": "city", "type": "string", "validators": ["not_blank"]},
                {"name": "zip", "type": "string",
                 "validators": [{"kind": "pattern", "regex": "^[0-9]{5}$"}]}
            ]
        }),
    );
    write(
        tmp.path(),
        "people.json",
        json!([
            {
                "name": "Person",
                "fields": [
                    {"name": "email", "type": "string", "validators": ["email"]},
                    {"name": "birthday", "type": "date", "required": false,
                     "binder_options": {"format": "%Y/%m/%d"}},
                    {"name": "address", "type": {"object": "Address"}},
                    {"name": "tags", "type": {"list": "string"}, "required": false,
                     "validators": [{"kind": "length", "max": 3}]}
                ]
            },
            {
                "name": "Member",
                "parent": "Person",
                "fields": [
                    {"name": "level", "type": "string",
                     "validators": [{"kind": "one_of", "choices": ["bronze", "gold"]}],
                     "error_codes": {"one_of": "member.level_unknown"},
                     "default": "bronze"}
                ]
            }
        ]),
    );

    let mut loader = ClassSpecLoader::new(tmp.path());
    loader.load_all().unwrap();
    (tmp, loader)
}

#[derive(Debug, PartialEq)]
struct Address {
    city: String,
    zip: String,
}

impl FromBound for Address {
    fn from_bound(obj: &BoundObject) -> ConfigResult<Self> {
        Ok(Self {
            city: obj.string("city")?,
            zip: obj.string("zip")?,
        })
    }
}

#[derive(Debug, PartialEq)]
struct Member {
    email: String,
    birthday: Option<NaiveDate>,
    address: Address,
    level: String,
}

impl FromBound for Member {
    fn from_bound(obj: &BoundObject) -> ConfigResult<Self> {
        Ok(Self {
            email: obj.string("email")?,
            birthday: obj.opt_date("birthday")?,
            address: obj.object("address")?,
            level: obj.string("level")?,
        })
    }
}

// =============================================================================
// Loading Tests
// =============================================================================

/// Every declared class is linked, including single- and multi-class files.
#[test]
fn test_all_classes_linked() {
    let (_tmp, loader) = setup_specs();
    assert_eq!(loader.class_names(), vec!["Address", "Member", "Person"]);

    let member = loader.get("Member").unwrap();
    assert_eq!(member.parent().unwrap().name(), "Person");
}

/// Every loaded class resolves under the default configuration.
#[test]
fn test_all_classes_resolve() {
    let (_tmp, loader) = setup_specs();
    let engine = BindingEngine::default();
    for name in loader.class_names() {
        engine.resolve(&loader.require(name).unwrap()).unwrap();
    }
}

// =============================================================================
// Binding Tests
// =============================================================================

/// A complete input binds into the typed target.
#[test]
fn test_bind_into_typed_target() {
    let (_tmp, loader) = setup_specs();
    let engine = BindingEngine::default();
    let member = loader.require("Member").unwrap();

    let raw = RawInput::from_json(json!({
        "email": "ada@example.com",
        "birthday": "1990/12/10",
        "address": {"city": "London", "zip": "12345"}
    }))
    .unwrap();

    let result = engine.bind_as::<Member>(&member, &raw).unwrap();
    assert_eq!(
        result.into_result().unwrap(),
        Member {
            email: "ada@example.com".into(),
            birthday: NaiveDate::from_ymd_opt(1990, 12, 10),
            address: Address {
                city: "London".into(),
                zip: "12345".into(),
            },
            level: "bronze".into(),
        }
    );
}

/// Nested, list and override errors are all reported with their paths.
#[test]
fn test_nested_errors_reported_with_paths() {
    let (_tmp, loader) = setup_specs();
    let engine = BindingEngine::default();
    let member = loader.require("Member").unwrap();

    let raw = RawInput::from_json(json!({
        "email": "ada@example.com",
        "address": {"city": " ", "zip": "ABC"},
        "tags": ["a", "b", "c", "d"],
        "level": "platinum"
    }))
    .unwrap();

    let result = engine.bind(&member, &raw).unwrap();
    assert!(result.instance().is_none());
    assert_eq!(
        result.errors().paths(),
        vec!["address.city", "address.zip", "tags", "level"]
    );
    assert_eq!(result.errors().codes("address.zip"), vec!["pattern.mismatch"]);
    assert_eq!(result.errors().codes("tags"), vec!["length.too_long"]);
    assert_eq!(result.errors().codes("level"), vec!["member.level_unknown"]);
}

/// Object fields reject scalar raw values.
#[test]
fn test_object_field_requires_mapping() {
    let (_tmp, loader) = setup_specs();
    let person = loader.require("Person").unwrap();

    let raw =
        RawInput::from_json(json!({"email": "ada@example.com", "address": "London"})).unwrap();
    let result = BindingEngine::default().bind(&person, &raw).unwrap();
    assert_eq!(result.errors().codes("address"), vec!["field.invalid_type"]);
}

/// A global date format from the configuration applies to unformatted fields.
#[test]
fn test_configured_date_format() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "event.json",
        json!({"name": "Event", "fields": [{"name": "on", "type": "date"}]}),
    );
    let mut loader = ClassSpecLoader::new(tmp.path());
    loader.load_all().unwrap();

    let config_path = tmp.path().join("binding.conf");
    fs::write(&config_path, r#"{"default_date_format": "%d.%m.%Y"}"#).unwrap();
    let engine = BindingEngine::new(BindingConfig::from_file(&config_path).unwrap()).unwrap();

    let raw = RawInput::from_json(json!({"on": "24.12.2024"})).unwrap();
    let result = engine.bind(&loader.require("Event").unwrap(), &raw).unwrap();
    assert_eq!(
        result.instance().unwrap().date("on").unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 24).unwrap()
    );
}
