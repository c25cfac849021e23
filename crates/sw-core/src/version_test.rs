use super::*;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

#[test]
fn test_parse_dotted_and_underscored() {
    assert_eq!(v("1.2.3"), v("1_2_3"));
    assert_eq!(v("1.2.3").to_string(), "1.2.3");
    assert_eq!(v("1_2").to_string(), "1.2");
}

#[test]
fn test_trailing_zeros_are_insignificant() {
    assert_eq!(v("1"), v("1.0"));
    assert_eq!(v("1.0.0").to_string(), "1");
    assert_eq!(v("0").to_string(), "0");
    assert_eq!(v("0.0"), v("0"));
}

#[test]
fn test_ordering_is_numeric_per_segment() {
    assert!(v("2") < v("10"));
    assert!(v("1.9") < v("1.10"));
    assert!(v("1") < v("1.0.1"));
    assert!(v("1.5") < v("2"));
    assert_eq!(v("3.0").cmp(&v("3")), std::cmp::Ordering::Equal);
}

#[test]
fn test_hash_agrees_with_eq() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(v("4"));
    set.insert(v("4.0"));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_invalid_versions() {
    for bad in ["", "a", "1..2", "1.", ".1", "1.x", "-1", "1 2"] {
        let err = Version::parse(bad).unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidVersion { .. }),
            "expected InvalidVersion for {bad:?}"
        );
    }
}

#[test]
fn test_deserialize_from_integer_or_string() {
    let a: Version = serde_yaml::from_str("3").unwrap();
    let b: Version = serde_yaml::from_str("\"3.1\"").unwrap();
    assert_eq!(a, v("3"));
    assert_eq!(b, v("3.1"));
    assert!(serde_yaml::from_str::<Version>("\"x\"").is_err());
}

#[test]
fn test_serialize_as_canonical_string() {
    assert_eq!(serde_json::to_string(&v("2.0")).unwrap(), "\"2\"");
}
