use super::Value;

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::NegInt(n) => serializer.serialize_i64(*n),
            Value::PosInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => {
                if serializer.is_human_readable() {
                    serializer.collect_str(&base64::display::Base64Display::with_config(
                        b,
                        base64::STANDARD,
                    ))
                } else {
                    serializer.serialize_bytes(b)
                }
            }
            Value::Array(items) => serializer.collect_seq(items),
            // Objects serialize under their original spellings.
            Value::Object(map) => {
                serializer.collect_map(map.iter().map(|(_, e)| (e.spelling.as_str(), &e.value)))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{Case, Value};
    use serde_json::json;

    #[test]
    fn test_spellings_survive_serialization() {
        let doc = json!({"Server": {"HostName": "example.com"}});
        let value = Value::from_json(doc.clone(), Case::Insensitive);

        assert_eq!(serde_json::to_value(&value).unwrap(), doc);
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let value = Value::Bytes(vec![8, 6, 7, 5, 3, 0, 9]);

        assert_eq!(serde_json::to_value(&value).unwrap(), json!("CAYHBQMACQ=="));
    }
}
