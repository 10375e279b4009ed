use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;

/// Serialize an ordered list of pairs as a map, keeping insertion order.
pub fn serialize_pairs_as_map<S, K, V>(pairs: &[(K, V)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Serialize,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (k, v) in pairs {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize_pairs(pairs: &[(String, Vec<u32>)]) -> String {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            #[serde(serialize_with = "serialize_pairs_as_map")]
            lines: &'a [(String, Vec<u32>)],
        }

        serde_json::to_string(&Wrapper { lines: pairs }).unwrap()
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize_pairs(&[]), r#"{"lines":{}}"#);
    }

    #[test]
    fn test_serialize_keeps_order() {
        let pairs = vec![
            ("zeta line".to_string(), vec![1]),
            ("alpha line".to_string(), vec![]),
        ];
        assert_eq!(serialize_pairs(&pairs), r#"{"lines":{"zeta line":[1],"alpha line":[]}}"#);
    }

    #[test]
    fn test_serialize_special_characters() {
        let pairs = vec![("line with \"quotes\" and \\backslashes".to_string(), vec![])];
        let json = serialize_pairs(&pairs);
        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
    }
}
