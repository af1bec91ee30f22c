//! XML-RPC codec and the Testopia client built on it.

use crate::core::error::{Error, Result};
use crate::model::{TestCase, TestRun};
use crate::parser::xml::{Element, parse_document};
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fmt::Write;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    /// `dateTime.iso8601`, kept as text.
    DateTime(String),
    /// `base64`, kept encoded.
    Base64(String),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// Member of a struct value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(n) => i32::try_from(*n).ok(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Textual rendering of scalar values.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => Some(s.clone()),
            Value::Int(n) => Some(n.to_string()),
            Value::Double(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::String(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn encode(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(n) => {
                let _ = write!(out, "<int>{n}</int>");
            }
            Value::Bool(b) => {
                let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
            }
            Value::Double(n) => {
                let _ = write!(out, "<double>{n}</double>");
            }
            Value::String(s) => {
                let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
            }
            Value::DateTime(s) => {
                let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", escape(s.as_str()));
            }
            Value::Base64(s) => {
                let _ = write!(out, "<base64>{}</base64>", escape(s.as_str()));
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                    value.encode(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.encode(out);
                }
                out.push_str("</data></array>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }

    fn decode(element: &Element) -> Result<Value> {
        let Some(typed) = element.children.first() else {
            // Untyped values are strings.
            return Ok(Value::String(element.text.clone()));
        };
        let text = typed.text.as_str();
        let bad = |what: &str| Error::registry(format!("invalid XML-RPC {what} value '{text}'"));

        Ok(match typed.name.as_str() {
            "i4" | "int" | "i8" => Value::Int(text.trim().parse().map_err(|_| bad("int"))?),
            "boolean" => Value::Bool(match text.trim() {
                "1" => true,
                "0" => false,
                _ => return Err(bad("boolean")),
            }),
            "double" => Value::Double(text.trim().parse().map_err(|_| bad("double"))?),
            "string" => Value::String(text.to_string()),
            "dateTime.iso8601" => Value::DateTime(text.trim().to_string()),
            "base64" => Value::Base64(text.trim().to_string()),
            "nil" => Value::Nil,
            "struct" => {
                let mut members = BTreeMap::new();
                for member in typed.children_named("member") {
                    let name = member
                        .child("name")
                        .map(|n| n.text.clone())
                        .ok_or_else(|| Error::registry("XML-RPC struct member without name"))?;
                    let value = match member.child("value") {
                        Some(value) => Value::decode(value)?,
                        None => Value::Nil,
                    };
                    members.insert(name, value);
                }
                Value::Struct(members)
            }
            "array" => {
                let values = match typed.child("data") {
                    Some(data) => data
                        .children_named("value")
                        .map(Value::decode)
                        .collect::<Result<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Value::Array(values)
            }
            other => {
                return Err(Error::registry(format!("unsupported XML-RPC type <{other}>")));
            }
        })
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    let _ = write!(
        out,
        "<methodCall><methodName>{}</methodName><params>",
        escape(method)
    );
    for param in params {
        out.push_str("<param>");
        param.encode(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Decode a `methodResponse` document. Faults become registry errors.
pub fn decode_response(body: &str) -> Result<Value> {
    let root = parse_document(body)
        .map_err(|e| Error::registry(format!("malformed XML-RPC response: {e}")))?;
    if root.name != "methodResponse" {
        return Err(Error::registry(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .map(Value::decode)
            .transpose()?
            .unwrap_or(Value::Nil);
        let code = value.get("faultCode").and_then(Value::as_i32).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::as_string)
            .unwrap_or_default();
        return Err(Error::registry(format!("fault {code}: {message}")));
    }

    root.child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .map(Value::decode)
        .unwrap_or(Ok(Value::Nil))
}

fn int_field(value: &Value, key: &str) -> Option<i32> {
    value.get(key).and_then(Value::as_i32)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_string)
        .filter(|s| !s.is_empty())
}

/// Map a `TestRun.get_test_cases` entry onto a [`TestCase`].
pub fn test_case_from_value(value: &Value) -> Result<TestCase> {
    let id = int_field(value, "case_id")
        .or_else(|| int_field(value, "id"))
        .ok_or_else(|| Error::registry("test case without case_id"))?;

    Ok(TestCase {
        id,
        case_status_id: int_field(value, "case_status_id"),
        category_id: int_field(value, "category_id"),
        priority_id: int_field(value, "priority_id"),
        author_id: int_field(value, "author_id"),
        default_tester_id: int_field(value, "default_tester_id"),
        creation_date: string_field(value, "creation_date"),
        estimated_time: string_field(value, "estimated_time"),
        automated: value
            .get("isautomated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        sort_key: string_field(value, "sortkey"),
        script: string_field(value, "script"),
        arguments: string_field(value, "arguments"),
        summary: string_field(value, "summary"),
        requirement: string_field(value, "requirement"),
        alias: string_field(value, "alias"),
    })
}

/// A run reference may be a bare id or a nested record carrying `<key>_id`.
fn reference_field(value: &Value, key: &str) -> String {
    let id_key = format!("{key}_id");
    match value.get(key) {
        Some(nested @ Value::Struct(_)) => nested.get(&id_key).and_then(Value::as_string),
        Some(other) => other.as_string(),
        None => value.get(&id_key).and_then(Value::as_string),
    }
    .unwrap_or_default()
}

/// Map a `TestRun.get` result onto a [`TestRun`].
pub fn test_run_from_value(value: &Value) -> Result<TestRun> {
    let id = int_field(value, "run_id")
        .or_else(|| int_field(value, "id"))
        .ok_or_else(|| Error::registry("test run without run_id"))?;

    Ok(TestRun {
        id,
        build: reference_field(value, "build"),
        environment: reference_field(value, "environment"),
        manager: string_field(value, "manager_id").or_else(|| string_field(value, "manager")),
        notes: string_field(value, "notes"),
        product_version: string_field(value, "product_version"),
        summary: string_field(value, "summary"),
        case_count: int_field(value, "case_count"),
        plan_id: int_field(value, "plan_id"),
        plan_text_version: int_field(value, "plan_text_version"),
        status: int_field(value, "status"),
        target_completion_date: string_field(value, "target_completion"),
        target_pass_rate: value.get("target_pass").and_then(Value::as_f64),
    })
}

/// Session cookies keyed by name. A later `Set-Cookie` for the same name
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Record the `name=value` pair of one `Set-Cookie` header value.
    pub fn store(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or(set_cookie);
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.cookies.insert(name.to_string(), value.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header.
    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(feature = "xmlrpc")]
pub use client::XmlRpcRegistry;

#[cfg(feature = "xmlrpc")]
mod client {
    use super::*;
    use crate::model::AutomatedTestCase;
    use crate::registry::TestRegistry;
    use tracing::{debug, info};

    /// Testopia client speaking XML-RPC over HTTP(S).
    pub struct XmlRpcRegistry {
        url: String,
        agent: ureq::Agent,
        token: Option<String>,
        cookies: CookieJar,
    }

    impl XmlRpcRegistry {
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                url: url.into(),
                agent: ureq::Agent::new_with_defaults(),
                token: None,
                cookies: CookieJar::default(),
            }
        }

        fn call(&mut self, method: &str, params: &[Value]) -> Result<Value> {
            let body = encode_call(method, params);
            debug!(method, url = %self.url, "XML-RPC call");

            let mut request = self.agent.post(self.url.as_str()).header("Content-Type", "text/xml");
            if !self.cookies.is_empty() {
                request = request.header("Cookie", self.cookies.header());
            }
            let mut response = request.send(body)?;

            for cookie in response.headers().get_all("set-cookie") {
                if let Ok(cookie) = cookie.to_str() {
                    self.cookies.store(cookie);
                }
            }

            let text = response.body_mut().read_to_string()?;
            decode_response(&text)
        }

        /// Struct parameters with the session token attached.
        fn params(&self, members: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
            let mut map: BTreeMap<String, Value> = members
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            if let Some(token) = &self.token {
                map.insert("Bugzilla_token".to_string(), Value::String(token.clone()));
            }
            Value::Struct(map)
        }
    }

    impl TestRegistry for XmlRpcRegistry {
        fn login(&mut self, username: &str, password: &str) -> Result<()> {
            let params = self.params([("login", username.into()), ("password", password.into())]);
            let result = self
                .call("User.login", &[params])
                .map_err(|e| Error::login(format!("{username} at {}: {e}", self.url)))?;
            self.token = string_field(&result, "token");
            info!(user = username, url = %self.url, "logged in to Testopia");
            Ok(())
        }

        fn test_run(&mut self, run_id: i32) -> Result<TestRun> {
            let params = self.params([("run_id", run_id.into())]);
            let result = self.call("TestRun.get", &[params])?;
            test_run_from_value(&result)
        }

        fn test_cases_for_run(&mut self, run_id: i32) -> Result<Vec<TestCase>> {
            let params = self.params([("run_id", run_id.into())]);
            match self.call("TestRun.get_test_cases", &[params])? {
                Value::Array(items) => items.iter().map(test_case_from_value).collect(),
                Value::Nil => Ok(Vec::new()),
                other => Err(Error::registry(format!(
                    "TestRun.get_test_cases returned {other:?}"
                ))),
            }
        }

        fn update(&mut self, entry: &AutomatedTestCase) -> Result<()> {
            let params = self.params([
                ("run_id", entry.run_id().into()),
                ("case_id", entry.id().into()),
                ("build_id", entry.build_id().into()),
                ("env_id", entry.env_id().into()),
                ("case_run_status_id", entry.status_id().into()),
            ]);
            self.call("TestCaseRun.update", &[params])?;
            Ok(())
        }

        fn name(&self) -> &str {
            "xmlrpc"
        }
    }
}
