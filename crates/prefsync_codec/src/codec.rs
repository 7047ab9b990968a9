//! Conversion between the typed preference domain and the remote domain.

use crate::error::{CodecError, CodecResult};
use crate::remote::RemoteValue;
use crate::value::PrefValue;
use std::collections::BTreeSet;

/// Encode a typed preference value into its remote representation.
///
/// Encoding is total. Scalars map 1:1, floats widen to doubles, and a
/// string-set becomes a list of text values in set iteration order.
pub fn encode(value: &PrefValue) -> RemoteValue {
    match value {
        PrefValue::Text(s) => RemoteValue::Text(s.clone()),
        PrefValue::Long(n) => RemoteValue::Long(*n),
        PrefValue::Int(n) => RemoteValue::Int(*n),
        PrefValue::Float(f) => RemoteValue::Double(f64::from(*f)),
        PrefValue::Bool(b) => RemoteValue::Bool(*b),
        PrefValue::StringSet(set) => RemoteValue::List(
            set.iter()
                .map(|s| RemoteValue::Text(s.clone()))
                .collect(),
        ),
    }
}

/// Decode a remote value into the typed preference domain.
///
/// A list decodes as a string-set only when every element is text;
/// duplicate elements collapse into one. Any other shape mismatch yields
/// an error scoped to this single value.
pub fn decode(value: &RemoteValue) -> CodecResult<PrefValue> {
    match value {
        RemoteValue::Text(s) => Ok(PrefValue::Text(s.clone())),
        RemoteValue::Long(n) => Ok(PrefValue::Long(*n)),
        RemoteValue::Int(n) => Ok(PrefValue::Int(*n)),
        #[allow(clippy::cast_possible_truncation)]
        RemoteValue::Double(d) => Ok(PrefValue::Float(*d as f32)),
        RemoteValue::Bool(b) => Ok(PrefValue::Bool(*b)),
        RemoteValue::List(items) => {
            let mut set = BTreeSet::new();
            for (index, item) in items.iter().enumerate() {
                match item {
                    RemoteValue::Text(s) => {
                        set.insert(s.clone());
                    }
                    other => {
                        return Err(CodecError::MixedList {
                            index,
                            shape: other.shape_name().to_string(),
                        })
                    }
                }
            }
            Ok(PrefValue::StringSet(set))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scalar_roundtrip() {
        let values = vec![
            PrefValue::Text("hello".into()),
            PrefValue::Long(i64::MAX),
            PrefValue::Long(-1),
            PrefValue::Int(i32::MIN),
            PrefValue::Float(3.25),
            PrefValue::Bool(false),
        ];

        for value in values {
            assert_eq!(decode(&encode(&value)).unwrap(), value);
        }
    }

    #[test]
    fn string_set_roundtrip() {
        let value = PrefValue::StringSet(set_of(&["b", "a", "c"]));
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn empty_string_set_roundtrip() {
        let value = PrefValue::StringSet(BTreeSet::new());
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn list_duplicates_collapse() {
        let list = RemoteValue::List(vec![
            RemoteValue::Text("a".into()),
            RemoteValue::Text("b".into()),
            RemoteValue::Text("a".into()),
        ]);
        assert_eq!(
            decode(&list).unwrap(),
            PrefValue::StringSet(set_of(&["a", "b"]))
        );
    }

    #[test]
    fn list_order_is_not_semantic() {
        let forward = RemoteValue::List(vec![
            RemoteValue::Text("x".into()),
            RemoteValue::Text("y".into()),
        ]);
        let reverse = RemoteValue::List(vec![
            RemoteValue::Text("y".into()),
            RemoteValue::Text("x".into()),
        ]);
        assert_eq!(decode(&forward).unwrap(), decode(&reverse).unwrap());
    }

    #[test]
    fn float_widens_to_double() {
        assert_eq!(encode(&PrefValue::Float(1.5)), RemoteValue::Double(1.5));
        assert_eq!(decode(&RemoteValue::Double(1.5)).unwrap(), PrefValue::Float(1.5));
    }

    #[test]
    fn mixed_list_is_rejected() {
        let list = RemoteValue::List(vec![
            RemoteValue::Text("ok".into()),
            RemoteValue::Long(1),
        ]);
        let err = decode(&list).unwrap_err();
        assert_eq!(
            err,
            CodecError::MixedList {
                index: 1,
                shape: "long".to_string()
            }
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_pref_value() -> impl Strategy<Value = PrefValue> {
            prop_oneof![
                ".*".prop_map(PrefValue::Text),
                any::<i64>().prop_map(PrefValue::Long),
                any::<i32>().prop_map(PrefValue::Int),
                any::<f32>()
                    .prop_filter("finite floats only", |f| f.is_finite())
                    .prop_map(PrefValue::Float),
                any::<bool>().prop_map(PrefValue::Bool),
                proptest::collection::btree_set(".*", 0..8).prop_map(PrefValue::StringSet),
            ]
        }

        proptest! {
            #[test]
            fn roundtrip(value in arb_pref_value()) {
                prop_assert_eq!(decode(&encode(&value)).unwrap(), value);
            }

            #[test]
            fn encoded_set_elements_are_text(set in proptest::collection::btree_set(".*", 0..8)) {
                let encoded = encode(&PrefValue::StringSet(set));
                if let RemoteValue::List(items) = encoded {
                    for item in items {
                        prop_assert!(matches!(item, RemoteValue::Text(_)));
                    }
                } else {
                    prop_assert!(false, "string-set must encode as a list");
                }
            }
        }
    }
}
