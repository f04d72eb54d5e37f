//! Header-encoded log field overrides
//!
//! Handlers can force individual record fields by appending `M-Log-Key`
//! response headers of the form `FieldName=value`. The middleware decodes
//! them once the handler returns and strips every entry before the response
//! reaches the client.
//!
//! Values are percent-escaped on the wire, so any string (multi-line
//! content included) yields a valid header value.
//!
//! ```rust
//! use actix_web::HttpResponse;
//! use oplog_actix::fields::{log_field, LogField};
//!
//! let res = HttpResponse::Ok()
//!     .append_header(log_field(LogField::EventType, "reset_password"))
//!     .append_header(log_field(LogField::Result, "1"))
//!     .finish();
//! assert_eq!(res.headers().get_all("m-log-key").count(), 2);
//! ```

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::fmt;

use crate::error::LogError;
use crate::record::Outcome;

/// Side-channel header name (header names are case-insensitive)
pub const LOG_FIELD_HEADER: &str = "m-log-key";

/// Bytes a header value cannot carry, plus the escape character itself.
/// Non-ASCII characters are always escaped by `utf8_percent_encode`.
const VALUE_ESCAPES: &AsciiSet = &CONTROLS.add(b'%');

fn header_name() -> HeaderName {
    HeaderName::from_static(LOG_FIELD_HEADER)
}

/// Record fields that can be overridden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogField {
    EventType,
    Username,
    Ip,
    Content,
    Result,
}

impl LogField {
    pub fn as_str(self) -> &'static str {
        match self {
            LogField::EventType => "EventType",
            LogField::Username => "Username",
            LogField::Ip => "IP",
            LogField::Content => "Content",
            LogField::Result => "Result",
        }
    }

    /// Exact, case-sensitive match on the wire name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "EventType" => Some(LogField::EventType),
            "Username" => Some(LogField::Username),
            "IP" => Some(LogField::Ip),
            "Content" => Some(LogField::Content),
            "Result" => Some(LogField::Result),
            _ => None,
        }
    }
}

impl fmt::Display for LogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode one override line: `FieldName=value`, with the value escaped
pub fn encode(field: LogField, value: &str) -> String {
    format!("{}={}", field, utf8_percent_encode(value, VALUE_ESCAPES))
}

/// Decode one override line. Splits on the first `=` and unescapes
/// everything after it. A line without `=` names a field with an empty
/// value. Unknown field names yield `None`.
pub fn decode(line: &str) -> Option<(LogField, Cow<'_, str>)> {
    let (name, value) = line.split_once('=').unwrap_or((line, ""));
    let field = LogField::parse(name)?;
    Some((field, percent_decode_str(value).decode_utf8_lossy()))
}

/// Header pair for `HttpResponseBuilder::append_header`. The value is
/// always a valid header value.
pub fn log_field(field: LogField, value: impl AsRef<str>) -> (HeaderName, String) {
    (header_name(), encode(field, value.as_ref()))
}

/// Append an override line to an existing header map
pub fn add_log_field(headers: &mut HeaderMap, field: LogField, value: &str) -> Result<(), LogError> {
    let value = HeaderValue::try_from(encode(field, value))?;
    headers.append(header_name(), value);
    Ok(())
}

/// Explicit field values supplied by the handler. Empty strings and a zero
/// result count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    event_type: Option<String>,
    username: Option<String>,
    ip: Option<String>,
    content: Option<String>,
    result: Option<Outcome>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one encoded line; later lines for the same field win
    pub fn apply(&mut self, line: &str) {
        let Some((field, value)) = decode(line) else {
            return;
        };

        match field {
            LogField::EventType => self.event_type = Some(value.into_owned()),
            LogField::Username => self.username = Some(value.into_owned()),
            LogField::Ip => self.ip = Some(value.into_owned()),
            LogField::Content => self.content = Some(value.into_owned()),
            LogField::Result => {
                let code = value.trim().parse::<i64>().unwrap_or(0);
                self.result = Outcome::from_code(code);
            }
        }
    }

    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = Self::new();
        for line in lines {
            set.apply(line);
        }
        set
    }

    /// Decode every override line in arrival order, then remove them all.
    ///
    /// Returns `None` when the header was absent.
    pub fn take_from_headers(headers: &mut HeaderMap) -> Option<Self> {
        let name = header_name();
        let lines: Vec<String> = headers
            .get_all(&name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        headers.remove(&name);

        if lines.is_empty() {
            return None;
        }
        Some(Self::from_lines(lines.iter().map(String::as_str)))
    }

    pub fn set(&mut self, field: LogField, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        self.apply(&encode(field, &value));
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        non_empty(&self.event_type)
    }

    pub fn username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    pub fn ip(&self) -> Option<&str> {
        non_empty(&self.ip)
    }

    pub fn content(&self) -> Option<&str> {
        non_empty(&self.content)
    }

    pub fn result(&self) -> Option<Outcome> {
        self.result
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_line() {
        assert_eq!(encode(LogField::Ip, "10.1.2.3"), "IP=10.1.2.3");
        assert_eq!(decode("IP=10.1.2.3"), Some((LogField::Ip, "10.1.2.3".into())));
    }

    #[test]
    fn test_decode_keeps_extra_equals_in_value() {
        assert_eq!(
            decode("Content=a=b=c"),
            Some((LogField::Content, "a=b=c".into()))
        );
    }

    #[test]
    fn test_control_characters_are_escaped() {
        let line = encode(LogField::Content, "line1\nline2\t100%");
        assert_eq!(line, "Content=line1%0Aline2%09100%25");
        assert_eq!(
            decode(&line),
            Some((LogField::Content, "line1\nline2\t100%".into()))
        );
    }

    #[test]
    fn test_non_ascii_value_survives_the_header() {
        let (name, value) = log_field(LogField::Username, "zoë");
        let mut headers = HeaderMap::new();
        headers.append(name, HeaderValue::try_from(value).expect("valid header value"));

        let set = OverrideSet::take_from_headers(&mut headers).expect("overrides present");
        assert_eq!(set.username(), Some("zoë"));
    }

    #[test]
    fn test_unescaped_percent_is_kept() {
        assert_eq!(decode("Content=100%"), Some((LogField::Content, "100%".into())));
    }

    #[test]
    fn test_decode_unknown_or_miscased_field() {
        assert_eq!(decode("Nickname=bob"), None);
        assert_eq!(decode("eventtype=login"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_decode_without_separator_is_empty_value() {
        assert_eq!(decode("Username"), Some((LogField::Username, "".into())));
    }

    #[test]
    fn test_last_write_wins() {
        let set = OverrideSet::from_lines(["EventType=first", "Username=bob", "EventType=second"]);
        assert_eq!(set.event_type(), Some("second"));
        assert_eq!(set.username(), Some("bob"));
        assert_eq!(set.ip(), None);
    }

    #[test]
    fn test_later_empty_value_clears_earlier_one() {
        let set = OverrideSet::from_lines(["EventType=login", "EventType="]);
        assert_eq!(set.event_type(), None);
    }

    #[test]
    fn test_result_parsing() {
        assert_eq!(OverrideSet::from_lines(["Result=1"]).result(), Some(Outcome::Success));
        assert_eq!(OverrideSet::from_lines(["Result=2"]).result(), Some(Outcome::Failure));
        assert_eq!(OverrideSet::from_lines(["Result=0"]).result(), None);
        assert_eq!(OverrideSet::from_lines(["Result=yes"]).result(), None);
        assert_eq!(OverrideSet::from_lines(["Result=1", "Result=oops"]).result(), None);
    }

    #[test]
    fn test_take_from_headers_strips_every_entry() {
        let mut headers = HeaderMap::new();
        add_log_field(&mut headers, LogField::EventType, "login").unwrap();
        add_log_field(&mut headers, LogField::Username, "alice").unwrap();
        add_log_field(&mut headers, LogField::Content, "custom").unwrap();
        headers.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("application/json"),
        );

        let set = OverrideSet::take_from_headers(&mut headers).expect("overrides present");

        assert_eq!(set.event_type(), Some("login"));
        assert_eq!(set.username(), Some("alice"));
        assert_eq!(set.content(), Some("custom"));
        assert_eq!(headers.get_all(LOG_FIELD_HEADER).count(), 0);
        assert!(headers.contains_key("content-type"));
    }

    #[test]
    fn test_take_from_headers_without_entries() {
        let mut headers = HeaderMap::new();
        assert!(OverrideSet::take_from_headers(&mut headers).is_none());
    }

    #[test]
    fn test_add_log_field_carries_multi_line_values() {
        let mut headers = HeaderMap::new();
        add_log_field(&mut headers, LogField::Content, "line1\r\nline2\0").unwrap();

        let set = OverrideSet::take_from_headers(&mut headers).expect("overrides present");
        assert_eq!(set.content(), Some("line1\r\nline2\0"));
    }

    #[test]
    fn test_set_builder() {
        let mut set = OverrideSet::new();
        set.set(LogField::Ip, "1.2.3.4").set(LogField::Result, "2");
        assert_eq!(set.ip(), Some("1.2.3.4"));
        assert_eq!(set.result(), Some(Outcome::Failure));
    }
}
