//! A `serde::Deserializer` over [`tree::Value`] with the weak-typing
//! coercions configuration callers expect: numbers parse from strings,
//! bools from `0/1/true/false`, scalars lift into single-element
//! sequences, and object keys match struct fields under case folding.
//!
//! Leaf conversion failures do not abort the pass. Each failure is
//! recorded with the dotted path of the faulty leaf and the requested
//! shape's zero value is substituted, so one pass reports every bad leaf
//! and the target is populated best-effort.

use serde::de::{self, DeserializeOwned, Deserializer as _};
use std::cell::RefCell;
use tree::{Case, Map, Value};

mod hook;
pub use hook::{default_hooks, string_to_duration, string_to_list, Hook, Kind};

/// A single leaf decoding failure, located by the dotted path of the leaf.
#[derive(thiserror::Error, Debug)]
#[error("decoding '{path}': {message}")]
pub struct Error {
    pub(crate) path: String,
    pub(crate) message: String,
}

impl de::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error {
            path: String::new(),
            message: msg.to_string(),
        }
    }
}

impl Error {
    // Visitor-originated errors surface without a location; stamp the
    // frame's path onto them as they bubble through it.
    fn located(mut self, path: &str) -> Self {
        if self.path.is_empty() {
            self.path = path.to_string();
        }
        self
    }
}

/// Every leaf failure of one decoding pass, joined.
#[derive(thiserror::Error, Debug)]
#[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
pub struct Errors(pub Vec<Error>);

/// Decoder configuration, owned by the Config that drives it.
pub(crate) struct Options {
    pub case: Case,
    pub delimiter: String,
    pub hooks: Vec<Hook>,
    pub key_mapper: Option<KeyMapper>,
}

/// Transforms a struct field name prior to matching it against source keys.
pub type KeyMapper = std::sync::Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Decode `value` into a `T`. Returns the decoded value, if one could be
/// produced at all, alongside every collected leaf failure.
pub(crate) fn from_value<T: DeserializeOwned>(
    value: &Value,
    options: &Options,
) -> (Option<T>, Vec<Error>) {
    let errors = RefCell::new(Vec::new());
    let decoder = Decoder {
        value,
        path: String::new(),
        hooked: false,
        options,
        errors: &errors,
    };

    let decoded = match T::deserialize(decoder) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            errors.borrow_mut().push(err);
            None
        }
    };
    (decoded, errors.into_inner())
}

struct Decoder<'a> {
    value: &'a Value,
    path: String,
    // Set while decoding a hook-produced value, so the chain runs once.
    hooked: bool,
    options: &'a Options,
    errors: &'a RefCell<Vec<Error>>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::NegInt(_) | Value::PosInt(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Bytes(_) => "bytes",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'a> Decoder<'a> {
    fn child(&self, value: &'a Value, path: String) -> Decoder<'a> {
        Decoder {
            value,
            path,
            hooked: false,
            options: self.options,
            errors: self.errors,
        }
    }

    fn child_key(&self, value: &'a Value, segment: &str) -> Decoder<'a> {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}{}{}", self.path, self.options.delimiter, segment)
        };
        self.child(value, path)
    }

    fn child_index(&self, value: &'a Value, index: usize) -> Decoder<'a> {
        self.child(value, format!("{}[{index}]", self.path))
    }

    // Decode a hook-rewritten or variant-payload value in this frame's
    // position. `hooked` suppresses a second pass of the hook chain.
    fn redecode<'b>(&self, value: &'b Value, hooked: bool) -> Decoder<'b>
    where
        'a: 'b,
    {
        Decoder {
            value,
            path: self.path.clone(),
            hooked,
            options: self.options,
            errors: self.errors,
        }
    }

    fn fail(&self, message: String) -> Error {
        Error {
            path: self.path.clone(),
            message,
        }
    }

    fn record(&self, err: Error) {
        self.errors.borrow_mut().push(err);
    }

    /// Run the hook chain for the requested shape. Each hook may rewrite
    /// the running value; the chained result (if any hook fired) replaces
    /// the source for default handling.
    fn run_hooks(&self, kind: Kind) -> Result<Option<Value>, Error> {
        if self.hooked || self.options.hooks.is_empty() {
            return Ok(None);
        }
        let mut current: Option<Value> = None;

        for hook in &self.options.hooks {
            let source = current.as_ref().unwrap_or(self.value);
            match hook.apply(source, kind) {
                Ok(Some(rewritten)) => current = Some(rewritten),
                Ok(None) => (),
                Err(message) => return Err(self.fail(message)),
            }
        }
        Ok(current)
    }

    fn coerce_bool(&self) -> Result<bool, Error> {
        match self.value {
            Value::Bool(b) => Ok(*b),
            Value::NegInt(n) => Ok(*n != 0),
            Value::PosInt(n) => Ok(*n != 0),
            Value::Float(n) => Ok(*n != 0.0),
            Value::String(s) if s.is_empty() => Ok(false),
            Value::String(s) => match s.as_str() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
                _ => Err(self.fail(format!("cannot parse '{s}' as bool"))),
            },
            other => Err(self.fail(format!("cannot decode {} as bool", type_name(other)))),
        }
    }

    fn coerce_i64(&self) -> Result<i64, Error> {
        match self.value {
            Value::NegInt(n) => Ok(*n),
            Value::PosInt(n) => i64::try_from(*n)
                .map_err(|_| self.fail(format!("value {n} overflows the integer target"))),
            Value::Float(n) => {
                if n.is_finite() && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    Ok(n.trunc() as i64)
                } else {
                    Err(self.fail(format!("value {n} overflows the integer target")))
                }
            }
            Value::Bool(b) => Ok(*b as i64),
            Value::String(s) if s.is_empty() => Ok(0),
            Value::String(s) => s
                .parse()
                .map_err(|err| self.fail(format!("cannot parse '{s}' as integer: {err}"))),
            other => Err(self.fail(format!("cannot decode {} as integer", type_name(other)))),
        }
    }

    fn coerce_u64(&self) -> Result<u64, Error> {
        match self.value {
            Value::PosInt(n) => Ok(*n),
            Value::NegInt(n) => Err(self.fail(format!(
                "cannot decode negative value {n} into an unsigned integer"
            ))),
            Value::Float(n) => {
                if n.is_sign_negative() && *n != 0.0 {
                    Err(self.fail(format!(
                        "cannot decode negative value {n} into an unsigned integer"
                    )))
                } else if n.is_finite() && *n <= u64::MAX as f64 {
                    Ok(n.trunc() as u64)
                } else {
                    Err(self.fail(format!("value {n} overflows the integer target")))
                }
            }
            Value::Bool(b) => Ok(*b as u64),
            Value::String(s) if s.is_empty() => Ok(0),
            Value::String(s) if s.starts_with('-') => Err(self.fail(format!(
                "cannot decode negative value {s} into an unsigned integer"
            ))),
            Value::String(s) => s
                .parse()
                .map_err(|err| self.fail(format!("cannot parse '{s}' as integer: {err}"))),
            other => Err(self.fail(format!("cannot decode {} as integer", type_name(other)))),
        }
    }

    fn coerce_f64(&self) -> Result<f64, Error> {
        match self.value {
            Value::Float(n) => Ok(*n),
            Value::NegInt(n) => Ok(*n as f64),
            Value::PosInt(n) => Ok(*n as f64),
            Value::Bool(b) => Ok(*b as u8 as f64),
            Value::String(s) if s.is_empty() => Ok(0.0),
            Value::String(s) => s
                .parse()
                .map_err(|err| self.fail(format!("cannot parse '{s}' as float: {err}"))),
            other => Err(self.fail(format!("cannot decode {} as float", type_name(other)))),
        }
    }

    fn coerce_string(&self) -> Result<String, Error> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            Value::NegInt(n) => Ok(n.to_string()),
            Value::PosInt(n) => Ok(n.to_string()),
            Value::Float(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
            other => Err(self.fail(format!("cannot decode {} as string", type_name(other)))),
        }
    }
}

// Runs the hook chain; a hook failure is recorded and the zero value
// substituted, exactly like a failed coercion.
macro_rules! hook_or_record {
    ($self:ident, $kind:expr, $visitor:ident, $visit:ident, $zero:expr) => {
        match $self.run_hooks($kind) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                $self.record(err);
                return $visitor.$visit($zero);
            }
        }
    };
}

// Integer targets coerce through i64/u64, then narrow here so that a
// narrowing failure is recorded like any other leaf failure.
macro_rules! deserialize_signed {
    ($method:ident, $visit:ident, $int:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Error>
        where
            V: de::Visitor<'de>,
        {
            if let Some(rewritten) = hook_or_record!(self, Kind::Int, visitor, $visit, 0) {
                return self.redecode(&rewritten, true).$method(visitor);
            }
            match self.coerce_i64().and_then(|n| {
                <$int>::try_from(n)
                    .map_err(|_| self.fail(format!("value {n} overflows the integer target")))
            }) {
                Ok(n) => visitor.$visit(n),
                Err(err) => {
                    self.record(err);
                    visitor.$visit(0)
                }
            }
        }
    };
}

macro_rules! deserialize_unsigned {
    ($method:ident, $visit:ident, $int:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Error>
        where
            V: de::Visitor<'de>,
        {
            if let Some(rewritten) = hook_or_record!(self, Kind::Uint, visitor, $visit, 0) {
                return self.redecode(&rewritten, true).$method(visitor);
            }
            match self.coerce_u64().and_then(|n| {
                <$int>::try_from(n)
                    .map_err(|_| self.fail(format!("value {n} overflows the integer target")))
            }) {
                Ok(n) => visitor.$visit(n),
                Err(err) => {
                    self.record(err);
                    visitor.$visit(0)
                }
            }
        }
    };
}

impl<'de, 'a> de::Deserializer<'de> for Decoder<'a> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        let path = self.path.clone();
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::NegInt(n) => visitor.visit_i64(*n),
            Value::PosInt(n) => visitor.visit_u64(*n),
            Value::Float(n) => visitor.visit_f64(*n),
            Value::String(s) => visitor.visit_str(s),
            Value::Bytes(b) => visitor.visit_bytes(b),
            Value::Array(items) => visitor.visit_seq(SeqAccess::new(&self, items.iter())),
            Value::Object(map) => visitor.visit_map(MapAccess::new(&self, Some(map), None)),
        }
        .map_err(|err: Error| err.located(&path))
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Bool, visitor, visit_bool, false) {
            return self.redecode(&rewritten, true).deserialize_bool(visitor);
        }
        match self.coerce_bool() {
            Ok(b) => visitor.visit_bool(b),
            Err(err) => {
                self.record(err);
                visitor.visit_bool(false)
            }
        }
    }

    deserialize_signed!(deserialize_i8, visit_i8, i8);
    deserialize_signed!(deserialize_i16, visit_i16, i16);
    deserialize_signed!(deserialize_i32, visit_i32, i32);
    deserialize_signed!(deserialize_i64, visit_i64, i64);
    deserialize_unsigned!(deserialize_u8, visit_u8, u8);
    deserialize_unsigned!(deserialize_u16, visit_u16, u16);
    deserialize_unsigned!(deserialize_u32, visit_u32, u32);
    deserialize_unsigned!(deserialize_u64, visit_u64, u64);

    fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Int, visitor, visit_i128, 0) {
            return self.redecode(&rewritten, true).deserialize_i128(visitor);
        }
        match self.coerce_i64() {
            Ok(n) => visitor.visit_i128(n as i128),
            Err(err) => {
                self.record(err);
                visitor.visit_i128(0)
            }
        }
    }

    fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Uint, visitor, visit_u128, 0) {
            return self.redecode(&rewritten, true).deserialize_u128(visitor);
        }
        match self.coerce_u64() {
            Ok(n) => visitor.visit_u128(n as u128),
            Err(err) => {
                self.record(err);
                visitor.visit_u128(0)
            }
        }
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Float, visitor, visit_f32, 0.0) {
            return self.redecode(&rewritten, true).deserialize_f32(visitor);
        }
        match self.coerce_f64() {
            Ok(n) => visitor.visit_f32(n as f32),
            Err(err) => {
                self.record(err);
                visitor.visit_f32(0.0)
            }
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Float, visitor, visit_f64, 0.0) {
            return self.redecode(&rewritten, true).deserialize_f64(visitor);
        }
        match self.coerce_f64() {
            Ok(n) => visitor.visit_f64(n),
            Err(err) => {
                self.record(err);
                visitor.visit_f64(0.0)
            }
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        let c = match self.coerce_string() {
            Ok(s) if s.chars().count() == 1 => s.chars().next().unwrap(),
            Ok(s) => {
                self.record(self.fail(format!("cannot decode '{s}' as a single character")));
                '\0'
            }
            Err(err) => {
                self.record(err);
                '\0'
            }
        };
        visitor.visit_char(c)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if let Some(rewritten) = hook_or_record!(self, Kind::Str, visitor, visit_str, "") {
            return self.redecode(&rewritten, true).deserialize_string(visitor);
        }
        match self.coerce_string() {
            Ok(s) => visitor.visit_string(s),
            Err(err) => {
                self.record(err);
                visitor.visit_str("")
            }
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Bytes(b) => visitor.visit_bytes(b),
            // Strings convert to their code units.
            Value::String(s) => visitor.visit_bytes(s.as_bytes()),
            other => {
                self.record(self.fail(format!("cannot decode {} as bytes", type_name(other))));
                visitor.visit_bytes(&[])
            }
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        if !matches!(self.value, Value::Null) {
            self.record(self.fail(format!(
                "cannot decode {} as unit",
                type_name(self.value)
            )));
        }
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.run_hooks(Kind::Seq) {
            Ok(Some(rewritten)) => {
                return self.redecode(&rewritten, true).deserialize_seq(visitor)
            }
            Ok(None) => (),
            Err(err) => return Err(err),
        }
        static EMPTY: [Value; 0] = [];
        let path = self.path.clone();
        match self.value {
            Value::Array(items) => visitor.visit_seq(SeqAccess::new(&self, items.iter())),
            // An empty object lifts to an empty sequence; a non-empty
            // object, like any other value, to a sequence of itself.
            Value::Object(map) if map.is_empty() => {
                visitor.visit_seq(SeqAccess::new(&self, EMPTY.iter()))
            }
            Value::Null => visitor.visit_seq(SeqAccess::new(&self, EMPTY.iter())),
            other => visitor.visit_seq(SeqAccess::new(&self, std::slice::from_ref(other).iter())),
        }
        .map_err(|err: Error| err.located(&path))
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.run_hooks(Kind::Tuple(len)) {
            Ok(Some(rewritten)) => {
                return self.redecode(&rewritten, true).deserialize_tuple(len, visitor)
            }
            Ok(None) => (),
            Err(err) => return Err(err),
        }
        if let Value::Array(items) = self.value {
            if items.len() > len {
                self.record(self.fail(format!(
                    "cannot fit {} elements into a target of length {len}",
                    items.len()
                )));
                let path = self.path.clone();
                return visitor
                    .visit_seq(SeqAccess::new(&self, items[..len].iter()))
                    .map_err(|err: Error| err.located(&path));
            }
        }
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.run_hooks(Kind::Map) {
            Ok(Some(rewritten)) => {
                return self.redecode(&rewritten, true).deserialize_map(visitor)
            }
            Ok(None) => (),
            Err(err) => return Err(err),
        }
        let path = self.path.clone();
        match self.value {
            Value::Object(map) => visitor.visit_map(MapAccess::new(&self, Some(map), None)),
            Value::Null => visitor.visit_map(MapAccess::new(&self, None, None)),
            other => Err(self.fail(format!("cannot decode {} as a mapping", type_name(other)))),
        }
        .map_err(|err: Error| err.located(&path))
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.run_hooks(Kind::Struct(name)) {
            Ok(Some(rewritten)) => {
                return self
                    .redecode(&rewritten, true)
                    .deserialize_struct(name, fields, visitor)
            }
            Ok(None) => (),
            Err(err) => return Err(err),
        }
        let path = self.path.clone();
        match self.value {
            Value::Object(map) => visitor.visit_map(MapAccess::new(&self, Some(map), Some(fields))),
            other => Err(self.fail(format!(
                "cannot decode {} as struct {name}",
                type_name(other)
            ))),
        }
        .map_err(|err: Error| err.located(&path))
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.run_hooks(Kind::Enum(name)) {
            Ok(Some(rewritten)) => {
                return self
                    .redecode(&rewritten, true)
                    .deserialize_enum(name, variants, visitor)
            }
            Ok(None) => (),
            Err(err) => return Err(err),
        }
        match self.value {
            // A bare string is a unit variant, matched under case folding.
            Value::String(s) => {
                let variant = match_name(s, variants, self.options);
                visitor.visit_enum(EnumAccess {
                    variant,
                    value: None,
                    decoder: &self,
                })
            }
            // An object of exactly one key carries the variant's payload.
            Value::Object(map) if map.len() == 1 => {
                let (_, entry) = map.iter().next().unwrap();
                let variant = match_name(&entry.spelling, variants, self.options);
                visitor.visit_enum(EnumAccess {
                    variant,
                    value: Some(&entry.value),
                    decoder: &self,
                })
            }
            other => Err(self.fail(format!(
                "cannot decode {} as enum {name}",
                type_name(other)
            ))),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

// Match a source name against a static candidate list (struct fields or
// enum variants) under the configured fold and key mapper. Unmatched
// names pass through verbatim for serde to ignore or reject.
fn match_name(name: &str, candidates: &'static [&'static str], options: &Options) -> String {
    let folded = options.case.fold(name);

    for candidate in candidates {
        let mapped = match &options.key_mapper {
            Some(mapper) => mapper(candidate),
            None => (*candidate).to_string(),
        };
        if options.case.fold(&mapped) == folded {
            return (*candidate).to_string();
        }
    }
    name.to_string()
}

struct SeqAccess<'d, 'a> {
    decoder: &'d Decoder<'a>,
    items: std::slice::Iter<'a, Value>,
    index: usize,
}

impl<'d, 'a> SeqAccess<'d, 'a> {
    fn new(decoder: &'d Decoder<'a>, items: std::slice::Iter<'a, Value>) -> Self {
        SeqAccess {
            decoder,
            items,
            index: 0,
        }
    }
}

impl<'de, 'd, 'a> de::SeqAccess<'de> for SeqAccess<'d, 'a> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let child = self.decoder.child_index(item, self.index);
        self.index += 1;

        seed.deserialize(child).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapAccess<'d, 'a> {
    decoder: &'d Decoder<'a>,
    entries: Option<std::collections::btree_map::Iter<'a, String, tree::Entry>>,
    // Static field names of a struct target, for fold matching.
    fields: Option<&'static [&'static str]>,
    pending: Option<&'a tree::Entry>,
}

impl<'d, 'a> MapAccess<'d, 'a> {
    fn new(
        decoder: &'d Decoder<'a>,
        map: Option<&'a Map>,
        fields: Option<&'static [&'static str]>,
    ) -> Self {
        MapAccess {
            decoder,
            entries: map.map(Map::iter),
            fields,
            pending: None,
        }
    }
}

impl<'de, 'd, 'a> de::MapAccess<'de> for MapAccess<'d, 'a> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        let Some((_, entry)) = self.entries.as_mut().and_then(Iterator::next) else {
            return Ok(None);
        };
        self.pending = Some(entry);

        // A struct target receives the matched field name; a mapping
        // target receives the provider's original spelling.
        let key = match self.fields {
            Some(fields) => match_name(&entry.spelling, fields, self.decoder.options),
            None => entry.spelling.clone(),
        };
        seed.deserialize(KeyDecoder {
            key,
            path: self.decoder.path.clone(),
        })
        .map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let entry = self.pending.take().expect("next_key_seed was called");
        seed.deserialize(self.decoder.child_key(&entry.value, &entry.spelling))
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.as_ref().map(ExactSizeIterator::len)
    }
}

/// Decodes an object key or enum variant name. Numeric and boolean map
/// keys parse from their string form.
struct KeyDecoder {
    key: String,
    path: String,
}

impl KeyDecoder {
    fn parse<T>(&self, what: &'static str) -> Result<T, Error>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.key.parse().map_err(|err| Error {
            path: self.path.clone(),
            message: format!("cannot parse key '{}' as {what}: {err}", self.key),
        })
    }
}

macro_rules! deserialize_key_int {
    ($method:ident, $visit:ident, $int:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Error>
        where
            V: de::Visitor<'de>,
        {
            let n: $int = self.parse("integer")?;
            visitor.$visit(n)
        }
    };
}

impl<'de> de::Deserializer<'de> for KeyDecoder {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.key)
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        let b = self.parse("bool")?;
        visitor.visit_bool(b)
    }

    deserialize_key_int!(deserialize_i8, visit_i8, i8);
    deserialize_key_int!(deserialize_i16, visit_i16, i16);
    deserialize_key_int!(deserialize_i32, visit_i32, i32);
    deserialize_key_int!(deserialize_i64, visit_i64, i64);
    deserialize_key_int!(deserialize_u8, visit_u8, u8);
    deserialize_key_int!(deserialize_u16, visit_u16, u16);
    deserialize_key_int!(deserialize_u32, visit_u32, u32);
    deserialize_key_int!(deserialize_u64, visit_u64, u64);

    serde::forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit
        unit_struct newtype_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}

struct EnumAccess<'d, 'a> {
    variant: String,
    value: Option<&'a Value>,
    decoder: &'d Decoder<'a>,
}

impl<'de, 'd, 'a> de::EnumAccess<'de> for EnumAccess<'d, 'a> {
    type Error = Error;
    type Variant = VariantAccess<'d, 'a>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(KeyDecoder {
            key: self.variant,
            path: self.decoder.path.clone(),
        })?;
        Ok((
            variant,
            VariantAccess {
                value: self.value,
                decoder: self.decoder,
            },
        ))
    }
}

struct VariantAccess<'d, 'a> {
    value: Option<&'a Value>,
    decoder: &'d Decoder<'a>,
}

impl<'de, 'd, 'a> de::VariantAccess<'de> for VariantAccess<'d, 'a> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.value {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(self
                .decoder
                .fail(format!("unexpected {} for unit variant", type_name(other)))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(self.decoder.redecode(value, false)),
            None => Err(self
                .decoder
                .fail("missing payload for newtype variant".to_string())),
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(value) => self
                .decoder
                .redecode(value, false)
                .deserialize_tuple(len, visitor),
            None => Err(self
                .decoder
                .fail("missing payload for tuple variant".to_string())),
        }
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(value) => self
                .decoder
                .redecode(value, false)
                .deserialize_struct("", fields, visitor),
            None => Err(self
                .decoder
                .fail("missing payload for struct variant".to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{default_hooks, from_value, Options};
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tree::{Case, Value};

    fn options() -> Options {
        Options {
            case: Case::Insensitive,
            delimiter: ".".to_string(),
            hooks: default_hooks(),
            key_mapper: None,
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(doc: serde_json::Value) -> T {
        let value = Value::from_json(doc, Case::Insensitive);
        let (decoded, errors) = from_value(&value, &options());
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        decoded.unwrap()
    }

    #[test]
    fn test_weakly_typed_scalars() {
        use serde_json::json;

        assert_eq!(decode::<i16>(json!("8080")), 8080);
        assert_eq!(decode::<u32>(json!("123")), 123);
        assert_eq!(decode::<i64>(json!(true)), 1);
        assert_eq!(decode::<f64>(json!("1.5")), 1.5);
        assert_eq!(decode::<f64>(json!(3)), 3.0);
        assert_eq!(decode::<bool>(json!("true")), true);
        assert_eq!(decode::<bool>(json!("0")), false);
        assert_eq!(decode::<bool>(json!(1)), true);
        assert_eq!(decode::<String>(json!(8080)), "8080");
        assert_eq!(decode::<String>(json!(1.25)), "1.25");
        assert_eq!(decode::<String>(json!(true)), "1");

        // Empty strings are zero values.
        assert_eq!(decode::<i32>(json!("")), 0);
        assert_eq!(decode::<bool>(json!("")), false);
    }

    #[test]
    fn test_scalars_lift_into_sequences() {
        use serde_json::json;

        assert_eq!(decode::<Vec<u16>>(json!(1)), vec![1]);
        assert_eq!(decode::<Vec<String>>(json!([1, 2])), vec!["1", "2"]);
        assert_eq!(decode::<Vec<String>>(json!({})), Vec::<String>::new());
    }

    #[test]
    fn test_structs_match_fields_case_folded() {
        use serde_json::json;

        #[derive(Deserialize, Debug, Default, PartialEq)]
        #[serde(default)]
        struct Server {
            host: String,
            port: u16,
        }

        let server: Server = decode(json!({"Host": "example.com", "PORT": "8080"}));
        assert_eq!(
            server,
            Server {
                host: "example.com".to_string(),
                port: 8080,
            }
        );
    }

    #[test]
    fn test_unmatched_source_keys_are_ignored() {
        use serde_json::json;

        #[derive(Deserialize, Debug, Default, PartialEq)]
        #[serde(default)]
        struct Thin {
            keep: u8,
        }

        let thin: Thin = decode(json!({"keep": 1, "extra": {"deep": true}}));
        assert_eq!(thin, Thin { keep: 1 });
    }

    #[test]
    fn test_map_targets_receive_original_spellings() {
        use serde_json::json;

        let map: BTreeMap<String, u8> = decode(json!({"Alpha": 1, "BETA": 2}));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["Alpha".to_string(), "BETA".to_string()]);
    }

    #[test]
    fn test_duration_hook() {
        use serde_json::json;

        assert_eq!(decode::<Duration>(json!("2s")), Duration::from_secs(2));
        assert_eq!(
            decode::<Duration>(json!("1m30s")),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_duration_without_hook_fails() {
        use serde_json::json;

        let value = Value::from_json(json!("2s"), Case::Insensitive);
        let options = Options {
            hooks: Vec::new(),
            ..options()
        };
        let (_, errors) = from_value::<Duration>(&value, &options);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_list_hook_splits_strings() {
        use serde_json::json;

        assert_eq!(
            decode::<Vec<String>>(json!("a,b,c")),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_error_aggregation_reports_every_leaf() {
        use serde_json::json;

        #[derive(Deserialize, Debug, Default)]
        #[serde(default)]
        struct Counts {
            a: u32,
            b: u32,
        }

        let value = Value::from_json(json!({"a": -1, "b": -2}), Case::Insensitive);
        let (decoded, errors) = from_value::<Counts>(&value, &options());

        // Both faulty leaves are reported by path in one pass, and the
        // target is populated best-effort with zero substitutes.
        assert_eq!(errors.len(), 2);
        let rendered: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
        assert!(rendered.iter().any(|e| e.contains("'a'")), "{rendered:?}");
        assert!(rendered.iter().any(|e| e.contains("'b'")), "{rendered:?}");

        let counts = decoded.unwrap();
        assert_eq!((counts.a, counts.b), (0, 0));
    }

    #[test]
    fn test_nested_error_paths_are_dotted() {
        use serde_json::json;

        #[derive(Deserialize, Debug, Default)]
        #[serde(default)]
        struct Outer {
            inner: Inner,
        }
        #[derive(Deserialize, Debug, Default)]
        #[serde(default)]
        struct Inner {
            port: u16,
        }

        let value = Value::from_json(json!({"inner": {"port": "oops"}}), Case::Insensitive);
        let (_, errors) = from_value::<Outer>(&value, &options());

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("inner.port"), "{errors:?}");
    }

    #[test]
    fn test_array_length_mismatch() {
        use serde_json::json;

        let value = Value::from_json(json!([1, 2, 3]), Case::Insensitive);
        let (_, errors) = from_value::<[u8; 2]>(&value, &options());
        assert!(
            errors.iter().any(|e| e.to_string().contains("length")),
            "{errors:?}"
        );
    }

    #[test]
    fn test_options_and_nulls() {
        use serde_json::json;

        assert_eq!(decode::<Option<u8>>(json!(null)), None);
        assert_eq!(decode::<Option<u8>>(json!("7")), Some(7));
    }

    #[test]
    fn test_enums_match_variants_case_folded() {
        use serde_json::json;

        #[derive(Deserialize, Debug, PartialEq)]
        enum Level {
            Debug,
            Warn,
        }

        assert_eq!(decode::<Level>(json!("warn")), Level::Warn);
        assert_eq!(decode::<Level>(json!("Debug")), Level::Debug);
    }
}
