use super::{Case, Value};

/// split breaks a configuration path into its segments.
/// The empty path addresses the whole tree and has no segments.
pub fn split<'p>(path: &'p str, delimiter: &str) -> Vec<&'p str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(delimiter).collect()
    }
}

/// descend walks `root` segment by segment, folding each segment with
/// `case`, and returns the live node at the path. A missing key, or a
/// non-object node reached while segments remain, yields None.
pub fn descend<'v>(root: &'v Value, segments: &[&str], case: Case) -> Option<&'v Value> {
    let mut node = root;

    for segment in segments {
        match node {
            Value::Object(map) => node = map.get(case, segment)?,
            _ => return None,
        }
    }
    Some(node)
}

#[cfg(test)]
mod test {
    use super::{descend, split};
    use crate::{Case, Value};
    use serde_json::json;

    #[test]
    fn test_split() {
        assert_eq!(split("", "."), Vec::<&str>::new());
        assert_eq!(split("a", "."), vec!["a"]);
        assert_eq!(split("a.b.c", "."), vec!["a", "b", "c"]);
        assert_eq!(split("a/b", "/"), vec!["a", "b"]);

        // Segments are split verbatim: an odd path keeps its empty segments.
        assert_eq!(split("a..b", "."), vec!["a", "", "b"]);
    }

    #[test]
    fn test_descend() {
        let doc = Value::from_json(
            json!({
                "Server": {"Host": "example.com", "Port": 8080},
                "tags": ["a", "b"],
                "leaf": 1,
            }),
            Case::Insensitive,
        );

        // Empty path returns the whole tree.
        assert_eq!(descend(&doc, &[], Case::Insensitive), Some(&doc));

        // Folded descent succeeds regardless of the provider's spelling.
        assert_eq!(
            descend(&doc, &["server", "host"], Case::Insensitive),
            Some(&Value::String("example.com".to_string())),
        );
        assert_eq!(
            descend(&doc, &["SERVER", "PORT"], Case::Insensitive),
            Some(&Value::PosInt(8080)),
        );

        // Missing keys, and descent through non-objects, are absent.
        assert_eq!(descend(&doc, &["absent"], Case::Insensitive), None);
        assert_eq!(descend(&doc, &["leaf", "child"], Case::Insensitive), None);
        assert_eq!(descend(&doc, &["tags", "0"], Case::Insensitive), None);
    }
}
