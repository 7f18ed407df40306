//! XML-RPC document encoder.

use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use quick_xml::escape::escape;

/// Timestamp layout of `<dateTime.iso8601>`.
pub(crate) const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>\n";

/// Encode a `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value]) -> Vec<u8> {
    let mut encoder = XmlEncoder::new();
    encoder.raw(XML_DECLARATION);
    encoder.raw("<methodCall>\n<methodName>");
    encoder.text(method);
    encoder.raw("</methodName>\n<params>\n");
    for param in params {
        encoder.raw("<param>\n");
        encoder.encode(param);
        encoder.raw("</param>\n");
    }
    encoder.raw("</params>\n</methodCall>\n");
    encoder.into_bytes()
}

/// Encode a successful `<methodResponse>` carrying one value.
pub fn encode_response(value: &Value) -> Vec<u8> {
    let mut encoder = XmlEncoder::new();
    encoder.raw(XML_DECLARATION);
    encoder.raw("<methodResponse>\n<params>\n<param>\n");
    encoder.encode(value);
    encoder.raw("</param>\n</params>\n</methodResponse>\n");
    encoder.into_bytes()
}

/// Encode a `<methodResponse>` carrying a fault.
pub fn encode_fault(code: i32, message: &str) -> Vec<u8> {
    let fault = Value::structure([
        ("faultCode", Value::Int(code)),
        ("faultString", Value::from(message)),
    ]);
    let mut encoder = XmlEncoder::new();
    encoder.raw(XML_DECLARATION);
    encoder.raw("<methodResponse>\n<fault>\n");
    encoder.encode(&fault);
    encoder.raw("</fault>\n</methodResponse>\n");
    encoder.into_bytes()
}

/// Streaming writer for XML-RPC `<value>` trees.
pub struct XmlEncoder {
    buffer: String,
}

impl XmlEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Encode one `<value>` element.
    pub fn encode(&mut self, value: &Value) {
        self.raw("<value>");
        match value {
            Value::Nil => self.raw("<nil/>"),
            Value::Boolean(b) => self.scalar("boolean", if *b { "1" } else { "0" }),
            Value::Int(n) => self.scalar("int", &n.to_string()),
            Value::Double(n) => self.scalar("double", &n.to_string()),
            Value::String(s) => {
                self.raw("<string>");
                self.text(s);
                self.raw("</string>");
            }
            Value::DateTime(dt) => {
                self.scalar("dateTime.iso8601", &dt.format(DATETIME_FORMAT).to_string())
            }
            Value::Base64(bytes) => self.scalar("base64", &STANDARD.encode(bytes)),
            Value::Array(items) => {
                self.raw("<array><data>\n");
                for item in items {
                    self.encode(item);
                }
                self.raw("</data></array>");
            }
            Value::Struct(members) => {
                self.raw("<struct>\n");
                for (name, member) in members {
                    self.raw("<member>\n<name>");
                    self.text(name);
                    self.raw("</name>\n");
                    self.encode(member);
                    self.raw("</member>\n");
                }
                self.raw("</struct>");
            }
        }
        self.raw("</value>\n");
    }

    /// Consume this encoder and return the document bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }

    /// Get the document produced so far.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    fn scalar(&mut self, element: &str, text: &str) {
        self.buffer.push('<');
        self.buffer.push_str(element);
        self.buffer.push('>');
        self.buffer.push_str(text);
        self.buffer.push_str("</");
        self.buffer.push_str(element);
        self.buffer.push('>');
    }

    fn text(&mut self, text: &str) {
        self.buffer.push_str(&escape(text));
    }

    fn raw(&mut self, markup: &str) {
        self.buffer.push_str(markup);
    }
}

impl Default for XmlEncoder {
    fn default() -> Self {
        Self::new()
    }
}
