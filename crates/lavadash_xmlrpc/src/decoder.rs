//! XML-RPC document decoder.
//!
//! Documents are first read into a small element tree with `quick-xml`
//! and then interpreted, which keeps whitespace handling in one place:
//! text inside `<string>` and untyped `<value>` elements is preserved
//! verbatim, text anywhere else is ignored.

use crate::encoder::DATETIME_FORMAT;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The call succeeded and returned a value.
    Success(Value),
    /// The server answered with a fault.
    Fault {
        /// `faultCode` member.
        code: i32,
        /// `faultString` member.
        message: String,
    },
}

/// Decoded `<methodCall>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Dotted method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

/// Decode a `<methodResponse>` document.
///
/// # Errors
///
/// Returns an error if the bytes are not well-formed XML or do not
/// follow the XML-RPC response layout.
pub fn decode_response(bytes: &[u8]) -> CodecResult<Response> {
    let root = parse_tree(bytes)?;
    root.expect_name("methodResponse")?;

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.required_child("value")?)?;
        let code = value
            .get("faultCode")
            .and_then(Value::as_i32)
            .ok_or_else(|| CodecError::invalid_structure("fault without integer faultCode"))?;
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(Response::Fault { code, message });
    }

    let value = root
        .required_child("params")?
        .required_child("param")?
        .required_child("value")?;
    decode_value(value).map(Response::Success)
}

/// Decode a `<methodCall>` document.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid XML-RPC call.
pub fn decode_call(bytes: &[u8]) -> CodecResult<MethodCall> {
    let root = parse_tree(bytes)?;
    root.expect_name("methodCall")?;

    let method = root.required_child("methodName")?.text.trim().to_string();
    if method.is_empty() {
        return Err(CodecError::invalid_structure("empty methodName"));
    }

    let mut params = Vec::new();
    if let Some(list) = root.child("params") {
        for param in list.children_named("param") {
            params.push(decode_value(param.required_child("value")?)?);
        }
    }

    Ok(MethodCall { method, params })
}

/// Element tree node; only what XML-RPC needs.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn required_child(&self, name: &str) -> CodecResult<&Element> {
        self.child(name).ok_or_else(|| {
            CodecError::invalid_structure(format!("<{}> without <{}>", self.name, name))
        })
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn expect_name(&self, name: &str) -> CodecResult<()> {
        if self.name == name {
            Ok(())
        } else {
            Err(CodecError::invalid_structure(format!(
                "expected <{}>, found <{}>",
                name, self.name
            )))
        }
    }
}

fn parse_tree(bytes: &[u8]) -> CodecResult<Element> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| CodecError::malformed(e.to_string()))?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(Element::new(name));
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                attach(&mut stack, &mut root, Element::new(name))?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CodecError::malformed("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| CodecError::malformed(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(CodecError::malformed("unexpected end of document"));
    }
    root.ok_or_else(|| CodecError::invalid_structure("empty document"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> CodecResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(CodecError::malformed("multiple root elements")),
    }
}

fn decode_value(element: &Element) -> CodecResult<Value> {
    element.expect_name("value")?;

    // An untyped <value> is a string.
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.trim();
    match typed.name.as_str() {
        "string" => Ok(Value::String(typed.text.clone())),
        "int" | "i4" => text
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| CodecError::invalid_scalar(&typed.name, text)),
        "i8" => {
            let wide = text
                .parse::<i64>()
                .map_err(|_| CodecError::invalid_scalar("i8", text))?;
            i32::try_from(wide)
                .map(Value::Int)
                .map_err(|_| CodecError::IntegerOverflow(wide))
        }
        "boolean" => match text {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            _ => Err(CodecError::invalid_scalar("boolean", text)),
        },
        "double" => text
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| CodecError::invalid_scalar("double", text)),
        "dateTime.iso8601" => parse_datetime(text)
            .map(Value::DateTime)
            .ok_or_else(|| CodecError::invalid_scalar("dateTime.iso8601", text)),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map(Value::Base64)
                .map_err(|_| CodecError::invalid_scalar("base64", text))
        }
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed.required_child("data")?;
            data.children_named("value")
                .map(decode_value)
                .collect::<CodecResult<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children_named("member") {
                let name = member.required_child("name")?.text.clone();
                let value = decode_value(member.required_child("value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        other => Err(CodecError::unsupported_type(other)),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
