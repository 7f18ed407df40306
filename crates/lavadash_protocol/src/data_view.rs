//! Data view descriptors and query results.

use crate::error::{ProtocolError, ProtocolResult};
use crate::records::{decode_list, Fields};
use lavadash_xmlrpc::Value;
use std::fmt;

/// A named server-side query, as listed by `data_views()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataView {
    /// Name used to invoke the view.
    pub name: String,
    /// One-line summary.
    pub summary: String,
    /// Longer free-form documentation.
    pub documentation: String,
    /// Declared arguments.
    pub arguments: Vec<DataViewArgument>,
}

/// A declared data view argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataViewArgument {
    /// Argument name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Default value; an argument without one must be supplied.
    pub default: Option<String>,
}

impl DataView {
    /// Decodes a `data_views()` list element.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("data view", value)?;
        let arguments = match fields.required("arguments") {
            Ok(list) => decode_list("data_views", list, DataViewArgument::from_value)?,
            Err(ProtocolError::MissingField { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };
        Ok(Self {
            name: fields.required_str("name")?,
            summary: fields.optional_str("summary")?.unwrap_or_default(),
            documentation: fields.optional_str("documentation")?.unwrap_or_default(),
            arguments,
        })
    }

    /// Decodes a whole `data_views()` reply.
    pub fn list_from_value(reply: &Value) -> ProtocolResult<Vec<Self>> {
        decode_list("data_views", reply, Self::from_value)
    }

    /// Encodes as a `data_views()` list element.
    pub fn to_value(&self) -> Value {
        Value::structure([
            ("name", Value::from(self.name.as_str())),
            ("summary", Value::from(self.summary.as_str())),
            ("documentation", Value::from(self.documentation.as_str())),
            (
                "arguments",
                Value::Array(self.arguments.iter().map(DataViewArgument::to_value).collect()),
            ),
        ])
    }

    /// Looks up a declared argument by name.
    pub fn argument(&self, name: &str) -> Option<&DataViewArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

impl DataViewArgument {
    /// Decodes one entry of a view's `arguments`.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("data view argument", value)?;
        Ok(Self {
            name: fields.required_str("name")?,
            help: fields.optional_str("help")?.unwrap_or_default(),
            default: fields.optional_str("default")?,
        })
    }

    /// Encodes as an `arguments` entry.
    pub fn to_value(&self) -> Value {
        Value::structure([
            ("name", Value::from(self.name.as_str())),
            ("help", Value::from(self.help.as_str())),
            ("default", Value::optional_string(self.default.as_deref())),
        ])
    }
}

/// Reply of `query_data_view(name, args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names, in display order.
    pub columns: Vec<String>,
    /// Row cells, positionally matching `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Decodes a `query_data_view()` reply.
    ///
    /// Columns arrive as `{name, type}` structs; only the name is kept.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("query result", value)?;
        let columns = decode_list("query_data_view", fields.required("columns")?, |column| {
            Fields::new("column", column)?.required_str("name")
        })?;
        let rows = decode_list("query_data_view", fields.required("rows")?, |row| {
            row.as_array()
                .map(<[Value]>::to_vec)
                .ok_or_else(|| ProtocolError::UnexpectedReply {
                    method: "query_data_view",
                    message: format!("row should be array, got {}", row.type_name()),
                })
        })?;
        Ok(Self { columns, rows })
    }

    /// Encodes as a `query_data_view()` reply.
    pub fn to_value(&self) -> Value {
        let columns = self
            .columns
            .iter()
            .map(|name| Value::structure([("name", Value::from(name.as_str()))]))
            .collect();
        let rows = self.rows.iter().cloned().map(Value::Array).collect();
        Value::structure([("columns", Value::Array(columns)), ("rows", Value::Array(rows))])
    }
}

/// Display adapter for a single result cell.
pub struct Cell<'a>(pub &'a Value);

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Nil => f.write_str("None"),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
            Value::Base64(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Cell(item))?;
                }
                f.write_str("]")
            }
            Value::Struct(members) => {
                f.write_str("{")?;
                for (i, (name, item)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {}", Cell(item))?;
                }
                f.write_str("}")
            }
        }
    }
}
