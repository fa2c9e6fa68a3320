//! Property tests for field accessors.
//!
//! For every declared field and every value of the right type, writing through
//! an accessor and reading back yields the written value, regardless of how
//! the accessor was resolved.

use chrono::{DateTime, FixedOffset, TimeZone};
use proptest::prelude::*;
use rewind_reflect::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct ReflectionStub {
    int_property: i32,
    double_property: f64,
    string_property: String,
    guid_property: Uuid,
    timestamp_property: DateTime<FixedOffset>,
    reflection: Option<Box<ReflectionStub>>,
}

impl Reflect for ReflectionStub {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("int_property", |s| &s.int_property, |s| &mut s.int_property)
            .field(
                "double_property",
                |s| &s.double_property,
                |s| &mut s.double_property,
            )
            .field(
                "string_property",
                |s| &s.string_property,
                |s| &mut s.string_property,
            )
            .field("guid_property", |s| &s.guid_property, |s| &mut s.guid_property)
            .field(
                "timestamp_property",
                |s| &s.timestamp_property,
                |s| &mut s.timestamp_property,
            )
            .optional(
                "reflection",
                |s| s.reflection.as_deref(),
                |s| s.reflection.as_deref_mut(),
            );
    }
}

fn offset_time(hours: i32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2018, 1, 2, 3, 4, 5).single())
        .expect("valid fixed timestamp")
}

fn stub() -> ReflectionStub {
    ReflectionStub {
        int_property: 23,
        double_property: 34.5,
        string_property: "Original".to_owned(),
        guid_property: Uuid::new_v4(),
        timestamp_property: offset_time(6),
        reflection: None,
    }
}

fn nested_stub() -> ReflectionStub {
    let mut outer = stub();
    outer.reflection = Some(Box::new(stub()));
    outer
}

// ---------------------------------------------------------------------------
// Fixed-value checks per field type
// ---------------------------------------------------------------------------

fn assert_set_then_get<V>(name: &str, expected: V)
where
    V: Clone + PartialEq + std::fmt::Debug + 'static,
{
    let mut item = stub();
    let accessor = resolve_by_name::<ReflectionStub, V>(&ReflectionStub::schema(), name).unwrap();
    let original = accessor.get(&item).unwrap();
    assert_ne!(original, expected);

    accessor.set(&mut item, expected.clone()).unwrap();
    assert_eq!(accessor.get(&item).unwrap(), expected);
}

fn assert_bound_setter<V>(name: &str, expected: V)
where
    V: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static,
{
    let mut item = stub();
    let accessor = resolve_by_instance::<_, V>(&item, name).unwrap();
    let original = accessor.get(&item).unwrap();
    assert_ne!(original, expected);

    let setter = accessor.set_expression(expected.clone());
    setter.call(&mut item).unwrap();
    assert_eq!(accessor.get(&item).unwrap(), expected);
}

#[test]
fn set_value_int() {
    assert_set_then_get("int_property", 32i32);
    assert_bound_setter("int_property", 32i32);
}

#[test]
fn set_value_double() {
    assert_set_then_get("double_property", 35.4f64);
    assert_bound_setter("double_property", 35.4f64);
}

#[test]
fn set_value_string() {
    assert_set_then_get("string_property", "New".to_owned());
    assert_bound_setter("string_property", "New".to_owned());
}

#[test]
fn set_value_guid() {
    assert_set_then_get("guid_property", Uuid::new_v4());
    assert_bound_setter("guid_property", Uuid::new_v4());
}

#[test]
fn set_value_timestamp() {
    assert_set_then_get("timestamp_property", offset_time(5));
    assert_bound_setter("timestamp_property", offset_time(5));
}

#[test]
fn member_selector_by_type_and_by_instance_agree() {
    let item = stub();
    let by_type =
        resolve_by_name::<ReflectionStub, i32>(&ReflectionStub::schema(), "int_property").unwrap();
    let by_instance = resolve_by_instance::<_, i32>(&item, "int_property").unwrap();
    assert_eq!(by_type.get(&item).unwrap(), item.int_property);
    assert_eq!(by_instance.get(&item).unwrap(), item.int_property);
}

#[test]
fn member_selector_rejects_mismatched_type() {
    let item = stub();
    let err = resolve_by_instance::<_, i32>(&item, "string_property").unwrap_err();
    assert!(matches!(
        err,
        ReflectError::TypeMismatch { requested: "i32", .. }
    ));
}

#[test]
fn nested_selector_reports_innermost_member() {
    let accessor = resolve_by_selector::<ReflectionStub, i32>("x => x.reflection.int_property")
        .unwrap();
    assert_eq!(accessor.name(), "int_property");
    assert_eq!(accessor.path().depth(), 2);
}

#[test]
fn comparison_selector_is_rejected() {
    let err =
        resolve_by_selector::<ReflectionStub, bool>("x => x.int_property == 2").unwrap_err();
    assert!(matches!(err, ReflectError::InvalidPath { .. }));
}

#[test]
fn empty_selector_is_rejected() {
    let err = resolve_by_selector::<ReflectionStub, i32>("").unwrap_err();
    assert!(matches!(err, ReflectError::InvalidPath { .. }));
}

#[test]
fn timestamp_json_keeps_offset() {
    let item = stub();
    let json = ReflectionStub::schema()
        .get_json(&item, "timestamp_property")
        .unwrap();
    assert_eq!(json, serde_json::json!("2018-01-02T03:04:05+06:00"));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// set then get returns the value, for top-level fields.
    #[test]
    fn int_set_get(v in any::<i32>()) {
        let accessor = resolve_by_selector::<ReflectionStub, i32>("int_property").unwrap();
        let mut item = stub();
        accessor.set(&mut item, v).unwrap();
        prop_assert_eq!(accessor.get(&item).unwrap(), v);
        prop_assert_eq!(item.int_property, v);
    }

    #[test]
    fn double_set_get(v in any::<f64>().prop_filter("comparable", |v| !v.is_nan())) {
        let accessor = selector!(ReflectionStub, double_property);
        let mut item = stub();
        accessor.set(&mut item, v).unwrap();
        prop_assert_eq!(accessor.get(&item).unwrap(), v);
    }

    #[test]
    fn string_set_get(v in ".*") {
        let accessor = resolve_by_selector::<ReflectionStub, String>("|s| s.string_property").unwrap();
        let mut item = stub();
        accessor.set(&mut item, v.clone()).unwrap();
        prop_assert_eq!(accessor.get(&item).unwrap(), v);
    }

    #[test]
    fn guid_set_get(bytes in any::<[u8; 16]>()) {
        let v = Uuid::from_bytes(bytes);
        let accessor = resolve_by_selector::<ReflectionStub, Uuid>("guid_property").unwrap();
        let mut item = stub();
        accessor.set(&mut item, v).unwrap();
        prop_assert_eq!(accessor.get(&item).unwrap(), v);
    }

    /// Nested writes land on the inner object only.
    #[test]
    fn nested_set_get(v in any::<i32>()) {
        let accessor = resolve_by_selector::<ReflectionStub, i32>("reflection.int_property").unwrap();
        let mut item = nested_stub();
        let outer_before = item.int_property;
        accessor.set(&mut item, v).unwrap();
        prop_assert_eq!(accessor.get(&item).unwrap(), v);
        prop_assert_eq!(item.int_property, outer_before);
    }

    /// JSON writes decode into the declared type and read back identically.
    #[test]
    fn json_set_get(v in any::<i32>()) {
        let schema = ReflectionStub::schema();
        let mut item = stub();
        schema.set_json(&mut item, "int_property", &serde_json::json!(v)).unwrap();
        prop_assert_eq!(item.int_property, v);
        prop_assert_eq!(schema.get_json(&item, "int_property").unwrap(), serde_json::json!(v));
    }
}
