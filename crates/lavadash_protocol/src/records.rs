//! Stream and bundle records exchanged with the dashboard.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::NaiveDateTime;
use lavadash_xmlrpc::Value;

/// Accessor over a struct-valued reply member set.
pub(crate) struct Fields<'a> {
    record: &'static str,
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(record: &'static str, value: &'a Value) -> ProtocolResult<Self> {
        if value.as_struct().is_none() {
            return Err(ProtocolError::WrongType {
                record,
                field: "<record>",
                expected: "struct",
                actual: value.type_name(),
            });
        }
        Ok(Self { record, value })
    }

    /// Member, with nil folded into absence.
    fn member(&self, field: &'static str) -> Option<&'a Value> {
        self.value.get(field).filter(|v| !v.is_nil())
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str, v: &Value) -> ProtocolError {
        ProtocolError::WrongType {
            record: self.record,
            field,
            expected,
            actual: v.type_name(),
        }
    }

    pub(crate) fn required_str(&self, field: &'static str) -> ProtocolResult<String> {
        self.optional_str(field)?
            .ok_or(ProtocolError::MissingField {
                record: self.record,
                field,
            })
    }

    pub(crate) fn optional_str(&self, field: &'static str) -> ProtocolResult<Option<String>> {
        match self.member(field) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.wrong_type(field, "string", v)),
        }
    }

    pub(crate) fn optional_u64(&self, field: &'static str) -> ProtocolResult<Option<u64>> {
        match self.member(field) {
            None => Ok(None),
            Some(v) => v
                .as_i32()
                .and_then(|n| u64::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.wrong_type(field, "non-negative int", v)),
        }
    }

    pub(crate) fn optional_bool(&self, field: &'static str) -> ProtocolResult<Option<bool>> {
        match self.member(field) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.wrong_type(field, "boolean", v)),
        }
    }

    pub(crate) fn optional_datetime(
        &self,
        field: &'static str,
    ) -> ProtocolResult<Option<NaiveDateTime>> {
        match self.member(field) {
            None => Ok(None),
            Some(v) => v
                .as_datetime()
                .map(Some)
                .ok_or_else(|| self.wrong_type(field, "dateTime.iso8601", v)),
        }
    }

    pub(crate) fn required_bytes(&self, field: &'static str) -> ProtocolResult<Vec<u8>> {
        let v = self.member(field).ok_or(ProtocolError::MissingField {
            record: self.record,
            field,
        })?;
        v.as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| self.wrong_type(field, "base64", v))
    }

    pub(crate) fn required(&self, field: &'static str) -> ProtocolResult<&'a Value> {
        self.member(field).ok_or(ProtocolError::MissingField {
            record: self.record,
            field,
        })
    }
}

/// Decode every element of an array reply with `decode`.
pub(crate) fn decode_list<T>(
    method: &'static str,
    reply: &Value,
    decode: impl Fn(&Value) -> ProtocolResult<T>,
) -> ProtocolResult<Vec<T>> {
    reply
        .as_array()
        .ok_or_else(|| ProtocolError::UnexpectedReply {
            method,
            message: format!("expected array, got {}", reply.type_name()),
        })?
        .iter()
        .map(decode)
        .collect()
}

/// A bundle stream as listed by `streams()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    /// Unique pathname, `/anonymous/…/` or `/{personal|team}/…/`.
    pub pathname: String,
    /// Human readable name; may be empty.
    pub name: String,
    /// Owning user, for personal streams.
    pub user: Option<String>,
    /// Owning group, for team streams.
    pub group: Option<String>,
    /// Number of bundles in the stream.
    pub bundle_count: u64,
}

impl Stream {
    /// Creates a stream record with no owner.
    pub fn new(pathname: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            name: name.into(),
            user: None,
            group: None,
            bundle_count: 0,
        }
    }

    /// Decodes a `streams()` list element.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("stream", value)?;
        Ok(Self {
            pathname: fields.required_str("pathname")?,
            name: fields.optional_str("name")?.unwrap_or_default(),
            user: fields.optional_str("user")?,
            group: fields.optional_str("group")?,
            bundle_count: fields.optional_u64("bundle_count")?.unwrap_or(0),
        })
    }

    /// Decodes a whole `streams()` reply.
    pub fn list_from_value(reply: &Value) -> ProtocolResult<Vec<Self>> {
        decode_list("streams", reply, Self::from_value)
    }

    /// Encodes as a `streams()` list element.
    pub fn to_value(&self) -> Value {
        Value::structure([
            ("pathname", Value::from(self.pathname.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("user", Value::optional_string(self.user.as_deref())),
            ("group", Value::optional_string(self.group.as_deref())),
            ("bundle_count", int_value(self.bundle_count)),
        ])
    }
}

/// A bundle as listed by `bundles(pathname)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// SHA-1 of the content; the global deduplication key.
    pub content_sha1: String,
    /// File name the bundle was uploaded under.
    pub content_filename: String,
    /// Content size in bytes; older servers omit it.
    pub content_size: Option<u64>,
    /// Uploader, `None` for anonymous uploads.
    pub uploaded_by: Option<String>,
    /// Upload timestamp.
    pub uploaded_on: Option<NaiveDateTime>,
    /// Whether the server has deserialized the bundle.
    pub is_deserialized: Option<bool>,
}

impl Bundle {
    /// Decodes a `bundles()` list element.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("bundle", value)?;
        Ok(Self {
            content_sha1: fields.required_str("content_sha1")?,
            content_filename: fields.optional_str("content_filename")?.unwrap_or_default(),
            content_size: fields.optional_u64("content_size")?,
            uploaded_by: fields.optional_str("uploaded_by")?,
            uploaded_on: fields.optional_datetime("uploaded_on")?,
            is_deserialized: fields.optional_bool("is_deserialized")?,
        })
    }

    /// Decodes a whole `bundles()` reply.
    pub fn list_from_value(reply: &Value) -> ProtocolResult<Vec<Self>> {
        decode_list("bundles", reply, Self::from_value)
    }

    /// Encodes as a `bundles()` list element.
    ///
    /// Absent optional members are left out rather than sent as nil,
    /// matching servers that predate them.
    pub fn to_value(&self) -> Value {
        let mut members = vec![
            ("content_sha1", Value::from(self.content_sha1.as_str())),
            ("content_filename", Value::from(self.content_filename.as_str())),
            ("uploaded_by", Value::optional_string(self.uploaded_by.as_deref())),
        ];
        if let Some(size) = self.content_size {
            members.push(("content_size", int_value(size)));
        }
        if let Some(on) = self.uploaded_on {
            members.push(("uploaded_on", Value::DateTime(on)));
        }
        if let Some(flag) = self.is_deserialized {
            members.push(("is_deserialized", Value::Boolean(flag)));
        }
        Value::structure(members)
    }
}

/// Reply of `get(sha1)`.
#[derive(Clone, PartialEq, Eq)]
pub struct BundleContent {
    /// Raw bundle bytes.
    pub content: Vec<u8>,
    /// File name the bundle was uploaded under.
    pub content_filename: String,
}

impl BundleContent {
    /// Decodes a `get()` reply.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let fields = Fields::new("bundle content", value)?;
        Ok(Self {
            content: fields.required_bytes("content")?,
            content_filename: fields.optional_str("content_filename")?.unwrap_or_default(),
        })
    }

    /// Encodes as a `get()` reply.
    pub fn to_value(&self) -> Value {
        Value::structure([
            ("content", Value::Base64(self.content.clone())),
            ("content_filename", Value::from(self.content_filename.as_str())),
        ])
    }
}

impl std::fmt::Debug for BundleContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleContent")
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("content_filename", &self.content_filename)
            .finish()
    }
}

fn int_value(n: u64) -> Value {
    Value::Int(i32::try_from(n).unwrap_or(i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn stream_with_nil_owner() {
        let value = Value::structure([
            ("pathname", Value::from("/anonymous/")),
            ("name", Value::Nil),
            ("user", Value::Nil),
            ("group", Value::Nil),
            ("bundle_count", Value::Int(4)),
        ]);
        let stream = Stream::from_value(&value).unwrap();
        assert_eq!(stream.pathname, "/anonymous/");
        assert_eq!(stream.name, "");
        assert_eq!(stream.user, None);
        assert_eq!(stream.bundle_count, 4);
    }

    #[test]
    fn stream_without_pathname_is_rejected() {
        let value = Value::structure([("name", Value::from("x"))]);
        assert_eq!(
            Stream::from_value(&value),
            Err(ProtocolError::MissingField {
                record: "stream",
                field: "pathname"
            })
        );
    }

    #[test]
    fn legacy_bundle_has_no_size() {
        let value = Value::structure([
            ("content_sha1", Value::from("aa")),
            ("content_filename", Value::from("a.json")),
            ("uploaded_by", Value::Nil),
        ]);
        let bundle = Bundle::from_value(&value).unwrap();
        assert_eq!(bundle.content_size, None);
        assert_eq!(bundle.uploaded_by, None);
    }

    #[test]
    fn bundle_record_survives_encoding() {
        let bundle = Bundle {
            content_sha1: "bb".into(),
            content_filename: "b.json".into(),
            content_size: Some(120),
            uploaded_by: Some("alice".into()),
            uploaded_on: NaiveDate::from_ymd_opt(2011, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5),
            is_deserialized: Some(false),
        };
        assert_eq!(Bundle::from_value(&bundle.to_value()).unwrap(), bundle);
    }

    #[test]
    fn wrong_member_type_is_reported() {
        let value = Value::structure([
            ("content_sha1", Value::from("aa")),
            ("content_size", Value::from("big")),
        ]);
        assert!(matches!(
            Bundle::from_value(&value),
            Err(ProtocolError::WrongType {
                field: "content_size",
                ..
            })
        ));
    }

    #[test]
    fn content_accepts_plain_strings() {
        let value = Value::structure([
            ("content", Value::from("{\"format\": \"Dashboard Bundle Format 1.0\"}")),
            ("content_filename", Value::from("b.json")),
        ]);
        let content = BundleContent::from_value(&value).unwrap();
        assert!(content.content.starts_with(b"{\"format\""));
    }

    #[test]
    fn list_reply_must_be_array() {
        assert!(matches!(
            Stream::list_from_value(&Value::Int(1)),
            Err(ProtocolError::UnexpectedReply { method: "streams", .. })
        ));
    }
}
