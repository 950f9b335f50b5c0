use std::sync::Arc;
use tree::{Case, Map, Value};

/// Kind names the shape the decoder was asked to produce, so a hook can
/// decide whether it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Seq,
    Tuple(usize),
    Map,
    /// A struct target, carrying its type name (`"Duration"` for
    /// `std::time::Duration`).
    Struct(&'static str),
    Enum(&'static str),
}

type HookFn = dyn Fn(&Value, Kind) -> Result<Option<Value>, String> + Send + Sync;

/// Hook rewrites a source value before default decoding. Returning
/// `Ok(None)` declines and falls through to later hooks and the default
/// handling; returning an error fails the leaf. Hooks compose in
/// registration order, each seeing the previous hook's output.
#[derive(Clone)]
pub struct Hook {
    name: &'static str,
    apply: Arc<HookFn>,
}

impl Hook {
    pub fn new<F>(name: &'static str, apply: F) -> Hook
    where
        F: Fn(&Value, Kind) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        Hook {
            name,
            apply: Arc::new(apply),
        }
    }

    pub(crate) fn apply(&self, value: &Value, kind: Kind) -> Result<Option<Value>, String> {
        (self.apply)(value, kind)
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Hook").field(&self.name).finish()
    }
}

/// Rewrites a string like `"1m30s"` into the `{secs, nanos}` shape a
/// `std::time::Duration` target expects.
pub fn string_to_duration() -> Hook {
    Hook::new("string_to_duration", |value, kind| {
        let (Value::String(s), Kind::Struct("Duration")) = (value, kind) else {
            return Ok(None);
        };
        let duration = humantime::parse_duration(s)
            .map_err(|err| format!("cannot parse '{s}' as a duration: {err}"))?;

        let mut fields = Map::new();
        fields.insert(
            Case::Insensitive,
            "secs".to_string(),
            Value::PosInt(duration.as_secs()),
        );
        fields.insert(
            Case::Insensitive,
            "nanos".to_string(),
            Value::PosInt(duration.subsec_nanos() as u64),
        );
        Ok(Some(Value::Object(fields)))
    })
}

/// Splits a string on `separator` when a sequence is wanted.
pub fn string_to_list(separator: &'static str) -> Hook {
    Hook::new("string_to_list", move |value, kind| {
        let (Value::String(s), Kind::Seq | Kind::Tuple(_)) = (value, kind) else {
            return Ok(None);
        };
        if s.is_empty() {
            return Ok(Some(Value::Array(Vec::new())));
        }
        Ok(Some(Value::Array(
            s.split(separator)
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )))
    })
}

/// The baseline hook chain installed by `Config::builder()`.
pub fn default_hooks() -> Vec<Hook> {
    vec![string_to_duration(), string_to_list(",")]
}
