//! One-directional structural matcher
//!
//! [`deep_match`] checks that everything present on `expected` is echoed by
//! `actual`: every expected field must exist on the actual side with an equal
//! value, nested objects and arrays are walked recursively, and fields that
//! only exist on `actual` are never looked at.
//!
//! Errors carry the dotted path of the failing field (`details.phone_code`,
//! `[1].name`) together with the expected and received values.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::E2eResult;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error(
        "expected: {expected}\nreceived: {}\n\nDetail: match failed for property '{path}'",
        display_actual(.actual.as_ref())
    )]
    Mismatch {
        path: String,
        expected: Value,
        actual: Option<Value>,
    },

    #[error("actual value is undefined at '{path}' for property '{field}'")]
    ActualMissing { path: String, field: String },

    #[error("expected an object or array at '{path}', received: {actual}")]
    NotComposite { path: String, actual: Value },

    #[error("length mismatch at '{path}': expected {expected} elements, received {actual}")]
    LengthMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("failed to find {id_field} {id} child from other array")]
    NotFound { id_field: String, id: Value },
}

fn display_actual(actual: Option<&Value>) -> String {
    match actual {
        Some(value) => value.to_string(),
        None => "undefined".to_string(),
    }
}

/// Location of a field inside a JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    fn child(&self, segment: &Segment<'_>) -> Self {
        match segment {
            Segment::Key(key) if self.0.is_empty() => Self((*key).to_string()),
            Segment::Key(key) => Self(format!("{}.{}", self.0, key)),
            Segment::Index(index) => Self(format!("{}[{}]", self.0, index)),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.0)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

impl Segment<'_> {
    fn lookup<'v>(&self, parent: &'v Value) -> Option<&'v Value> {
        match (self, parent) {
            (Segment::Key(key), Value::Object(map)) => map.get(*key),
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Structural classification used to pick the comparison strategy
enum Shape<'a> {
    Scalar(&'a Value),
    Composite(Vec<(Segment<'a>, &'a Value)>),
}

impl<'a> Shape<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Shape::Composite(
                map.iter()
                    .map(|(key, child)| (Segment::Key(key.as_str()), child))
                    .collect(),
            ),
            Value::Array(items) => Shape::Composite(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| (Segment::Index(index), child))
                    .collect(),
            ),
            scalar => Shape::Scalar(scalar),
        }
    }
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Strict equality, with numbers compared by value so `3` equals `3.0`
fn scalars_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a == b
            } else {
                a.as_f64() == b.as_f64()
            }
        }
        (a, b) => a == b,
    }
}

fn match_at(path: &FieldPath, expected: &Value, actual: Option<&Value>) -> Result<(), MatchError> {
    match Shape::of(expected) {
        Shape::Scalar(expected) => match actual {
            Some(actual) if scalars_equal(expected, actual) => Ok(()),
            _ => Err(MatchError::Mismatch {
                path: path.to_string(),
                expected: expected.clone(),
                actual: actual.cloned(),
            }),
        },
        Shape::Composite(fields) => {
            let actual = match actual {
                None | Some(Value::Null) => None,
                Some(value) if is_composite(value) => Some(value),
                Some(other) => {
                    return Err(MatchError::NotComposite {
                        path: path.to_string(),
                        actual: other.clone(),
                    })
                }
            };

            for (segment, expected_child) in fields {
                let Some(actual) = actual else {
                    return Err(MatchError::ActualMissing {
                        path: path.to_string(),
                        field: segment.to_string(),
                    });
                };
                match_at(&path.child(&segment), expected_child, segment.lookup(actual))?;
            }
            Ok(())
        }
    }
}

/// Assert that `actual` echoes every field of `expected`
pub fn deep_match(expected: &Value, actual: &Value) -> Result<(), MatchError> {
    match_at(&FieldPath::root(), expected, Some(actual))
}

/// [`deep_match`] over anything serializable, e.g. typed entities
pub fn match_serialized<E, A>(expected: &E, actual: &A) -> E2eResult<()>
where
    E: Serialize + ?Sized,
    A: Serialize + ?Sized,
{
    let expected = serde_json::to_value(expected)?;
    let actual = serde_json::to_value(actual)?;
    Ok(deep_match(&expected, &actual)?)
}

fn check_len(expected: &[Value], actual: &[Value]) -> Result<(), MatchError> {
    if expected.len() != actual.len() {
        return Err(MatchError::LengthMismatch {
            path: FieldPath::root().to_string(),
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Compare two lists element by element, by position
pub fn match_array(expected: &[Value], actual: &[Value]) -> Result<(), MatchError> {
    check_len(expected, actual)?;
    let root = FieldPath::root();
    for (index, (expected, actual)) in expected.iter().zip(actual).enumerate() {
        match_at(&root.child(&Segment::Index(index)), expected, Some(actual))?;
    }
    Ok(())
}

/// Compare two lists by identity: each expected element is paired with the
/// actual element carrying the same `id_field` value, wherever it sits.
pub fn match_array_property(
    id_field: &str,
    expected: &[Value],
    actual: &[Value],
) -> Result<(), MatchError> {
    check_len(expected, actual)?;
    let root = FieldPath::root();
    for (index, expected) in expected.iter().enumerate() {
        let id = expected.get(id_field).unwrap_or(&Value::Null);
        let Some(found) = actual.iter().find(|a| a.get(id_field).unwrap_or(&Value::Null) == id)
        else {
            return Err(MatchError::NotFound {
                id_field: id_field.to_string(),
                id: id.clone(),
            });
        };
        match_at(&root.child(&Segment::Index(index)), expected, Some(found))?;
    }
    Ok(())
}

/// Shallow copy of `obj` without `keys`; non-objects are returned as-is
pub fn remove_properties(obj: &Value, keys: &[&str]) -> Value {
    match obj {
        Value::Object(map) => {
            let mut out = map.clone();
            for key in keys {
                out.remove(*key);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

pub fn remove_properties_array(list: &[Value], keys: &[&str]) -> Vec<Value> {
    list.iter().map(|item| remove_properties(item, keys)).collect()
}

/// Shallow merge: a copy of `base` with every top-level field of `patch`
/// overriding it. A non-object `patch` leaves `base` unchanged.
pub fn assign(base: &Value, patch: &Value) -> Value {
    let mut out = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(patch) = patch {
        for (key, value) in patch {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use earth_common::{Continent, ContinentType};
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    fn continent() -> Value {
        json!({
            "uuid": "0b7c",
            "name": "Europe",
            "type": 3,
            "area_by_km2": 366033131,
            "creator": {"email": "makkara.sinappi@gmail.com", "name": "Makkara Sinappi"},
        })
    }

    #[test_case(json!({}) ; "empty object")]
    #[test_case(json!([1, "a", null]) ; "array")]
    #[test_case(continent() ; "nested object")]
    #[test_case(json!({"details": {"continent": {}}}) ; "empty nested composite")]
    fn test_reflexive(value: Value) {
        deep_match(&value, &value).unwrap();
    }

    #[test]
    fn test_extra_actual_fields_are_ignored() {
        let mut actual = continent();
        actual["created"] = json!("2021-04-01T10:00:00Z");
        actual["creator"]["id"] = json!(12);
        deep_match(&continent(), &actual).unwrap();
    }

    #[test_case("name", json!("Asia"), "name" ; "top level")]
    #[test_case("type", json!(1), "type" ; "number")]
    fn test_differing_field_is_named(field: &str, value: Value, path: &str) {
        let mut actual = continent();
        actual[field] = value;
        let err = deep_match(&continent(), &actual).unwrap_err();
        assert!(err.to_string().contains(&format!("property '{}'", path)));
    }

    #[test]
    fn test_nested_mismatch_reports_dotted_path() {
        let mut actual = continent();
        actual["creator"]["email"] = json!("other@example.com");
        let err = deep_match(&continent(), &actual).unwrap_err();
        assert_eq!(
            err,
            MatchError::Mismatch {
                path: "creator.email".to_string(),
                expected: json!("makkara.sinappi@gmail.com"),
                actual: Some(json!("other@example.com")),
            }
        );
        let message = err.to_string();
        assert!(message.contains("received: \"other@example.com\""));
        assert!(message.contains("Detail: match failed for property 'creator.email'"));
    }

    #[test]
    fn test_missing_scalar_is_undefined() {
        let err = deep_match(&json!({"name": "Europe"}), &json!({})).unwrap_err();
        assert!(err.to_string().contains("received: undefined"));
    }

    #[test]
    fn test_missing_composite_names_field() {
        let expected = json!({"details": {"phone_code": "358"}});
        let err = deep_match(&expected, &json!({"name": "Finland"})).unwrap_err();
        assert_eq!(
            err,
            MatchError::ActualMissing {
                path: "details".to_string(),
                field: "phone_code".to_string(),
            }
        );
    }

    #[test]
    fn test_scalar_where_composite_expected() {
        let err = deep_match(&json!({"details": {"a": 1}}), &json!({"details": "x"})).unwrap_err();
        assert!(matches!(err, MatchError::NotComposite { ref path, .. } if path == "details"));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        deep_match(&json!({"area": 3}), &json!({"area": 3.0})).unwrap();
    }

    #[test]
    fn test_null_is_scalar() {
        deep_match(&json!({"x": null}), &json!({"x": null})).unwrap();
        assert!(deep_match(&json!({"x": null}), &json!({})).is_err());
    }

    #[test]
    fn test_nested_array_path() {
        let err = deep_match(
            &json!({"items": [{"name": "a"}, {"name": "b"}]}),
            &json!({"items": [{"name": "a"}, {"name": "c"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::Mismatch { ref path, .. } if path == "items[1].name"));
    }

    #[test]
    fn test_match_array_is_positional() {
        let a = vec![json!({"uuid": "x"}), json!({"uuid": "y"})];
        let b = vec![json!({"uuid": "y"}), json!({"uuid": "x"})];
        match_array(&a, &a).unwrap();
        assert!(match_array(&a, &b).is_err());
        assert!(matches!(
            match_array(&a, &b[..1]),
            Err(MatchError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_match_array_property_by_identity() {
        let expected = vec![json!({"uuid": "x", "name": "A"})];
        match_array_property("uuid", &expected, &[json!({"uuid": "x", "name": "A"})]).unwrap();

        let err =
            match_array_property("uuid", &expected, &[json!({"uuid": "y", "name": "A"})]).unwrap_err();
        assert!(err.to_string().contains("failed to find uuid \"x\""));
    }

    #[test]
    fn test_match_array_property_length_mismatch() {
        let expected = vec![json!({"uuid": "x"}), json!({"uuid": "y"})];
        let err = match_array_property("uuid", &expected, &[json!({"uuid": "x"})]).unwrap_err();
        assert_eq!(
            err,
            MatchError::LengthMismatch {
                path: "(root)".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_match_serialized_typed_entities() {
        let expected = Continent {
            name: Some("Europe".to_string()),
            kind: Some(ContinentType::Europe),
            ..Default::default()
        };
        let actual = Continent {
            uuid: Some("0b7c".to_string()),
            area_by_km2: Some(366033131),
            ..expected.clone()
        };
        match_serialized(&expected, &actual).unwrap();
        match_serialized(&expected, &continent()).unwrap();

        let other = Continent {
            kind: Some(ContinentType::Asia),
            ..actual
        };
        let err = match_serialized(&expected, &other).unwrap_err();
        assert!(err.to_string().contains("property 'type'"), "{err}");
    }

    #[test]
    fn test_match_array_property_ignores_order() {
        let expected = vec![json!({"uuid": "x", "n": 1}), json!({"uuid": "y", "n": 2})];
        let actual = vec![json!({"uuid": "y", "n": 2}), json!({"uuid": "x", "n": 1})];
        match_array_property("uuid", &expected, &actual).unwrap();
    }

    #[test]
    fn test_remove_properties_leaves_original() {
        let original = json!({"uuid": "1", "name": "A", "updated": "t"});
        let out = remove_properties(&original, &["updated"]);
        assert_eq!(out, json!({"uuid": "1", "name": "A"}));
        assert_eq!(original["updated"], "t");
    }

    #[test]
    fn test_remove_properties_array() {
        let list = vec![json!({"a": 1, "b": 2}), json!({"b": 3})];
        assert_eq!(
            remove_properties_array(&list, &["b"]),
            vec![json!({"a": 1}), json!({})]
        );
    }

    #[test]
    fn test_assign_later_fields_win() {
        let merged = assign(
            &continent(),
            &json!({"name": "Europe #Updated", "area_by_km2": 266033131}),
        );
        assert_eq!(merged["name"], "Europe #Updated");
        assert_eq!(merged["area_by_km2"], 266033131);
        assert_eq!(merged["uuid"], "0b7c");
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-e]", inner, 0..4)
                    .prop_map(|fields| Value::Object(fields.into_iter().collect())),
            ]
        })
    }

    fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::btree_map("[a-e]", arb_json(), 0..5)
            .prop_map(|fields| fields.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_every_value_matches_itself(value in arb_json()) {
            prop_assert!(deep_match(&value, &value).is_ok());
        }

        #[test]
        fn prop_fields_only_on_actual_are_ignored(
            expected in arb_object(),
            extra in prop::collection::btree_map("[f-j]", arb_json(), 0..4),
        ) {
            let expected = Value::Object(expected);
            let extra: Map<String, Value> = extra.into_iter().collect();
            let actual = assign(&Value::Object(extra), &expected);
            prop_assert!(deep_match(&expected, &actual).is_ok());
        }

        #[test]
        fn prop_differing_field_is_named(
            base in arb_object(),
            key in "[a-e]",
            value in "[a-z]{0,6}",
        ) {
            let mut expected = base.clone();
            expected.insert(key.clone(), Value::String(value.clone()));
            let mut actual = base;
            actual.insert(key.clone(), Value::String(format!("{value}!")));

            let err = deep_match(&Value::Object(expected), &Value::Object(actual)).unwrap_err();
            prop_assert_eq!(
                err,
                MatchError::Mismatch {
                    path: key,
                    expected: Value::String(value.clone()),
                    actual: Some(Value::String(format!("{value}!"))),
                }
            );
        }
    }
}
