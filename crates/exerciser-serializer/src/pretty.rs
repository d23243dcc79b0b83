//! Indented structured text for result values
//!
//! Layout is serde_json's 2-space pretty printing with numbers written by
//! `format_number`. Values with no JSON form are replaced during
//! serialization: functions become descriptive strings, undefined object
//! members are dropped and undefined array elements become `null`.

use crate::number::format_number;
use exerciser_core::ResultValue;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;
use tracing::warn;

/// Render `value` as indented text; `None` when the value itself is undefined
pub fn pretty_print(value: &ResultValue) -> Option<String> {
    if value.is_undefined() {
        return None;
    }
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, ResultFormatter::new());
    if let Err(err) = Layout(value).serialize(&mut serializer) {
        warn!(error = %err, "could not lay out result value");
        return None;
    }
    String::from_utf8(out).ok()
}

/// Display string for a function value
pub fn describe_function(value: &ResultValue) -> Option<String> {
    match value {
        ResultValue::Lambda { signature } => Some(format!("{{function:{}}}", signature.as_deref().unwrap_or(""))),
        ResultValue::NativeFunction { arity } => Some(format!("<native function>#{}", arity)),
        _ => None,
    }
}

/// Serializable view of a result value
struct Layout<'a>(&'a ResultValue);

impl Serialize for Layout<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            ResultValue::Undefined | ResultValue::Null => serializer.serialize_unit(),
            ResultValue::Bool(b) => serializer.serialize_bool(*b),
            ResultValue::Number(n) => serializer.serialize_f64(*n),
            ResultValue::String(s) => serializer.serialize_str(s),
            ResultValue::Lambda { .. } | ResultValue::NativeFunction { .. } => {
                serializer.serialize_str(&describe_function(self.0).unwrap_or_default())
            }
            ResultValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Layout(item))?;
                }
                seq.end()
            }
            ResultValue::Object(entries) => {
                let members: Vec<_> = entries.iter().filter(|(_, v)| !v.is_undefined()).collect();
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, member) in members {
                    map.serialize_entry(key, &Layout(member))?;
                }
                map.end()
            }
        }
    }
}

/// `PrettyFormatter` with display-style numbers
struct ResultFormatter {
    pretty: PrettyFormatter<'static>,
}

impl ResultFormatter {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for ResultFormatter {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(format_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}
