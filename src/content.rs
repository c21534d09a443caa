//! Immutable message content
//!
//! A [`MessageContent`] is what a client hands to a folder when
//! appending or sending. Once a folder wraps it into a
//! [`Message`](crate::Message) the content never changes again.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use serde::Serialize;

/// Header and body content of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    headers: Vec<(String, String)>,
    subject: Option<String>,
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    date: Option<DateTime<Utc>>,
    body: String,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl MessageContent {
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Parse an RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes do not contain a header
    /// section.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| Error::Parse("not an RFC 5322 message".into()))?;

        if message.headers().is_empty() {
            return Err(Error::Parse("message has no headers".into()));
        }

        let headers = message
            .headers()
            .iter()
            .filter_map(|h| {
                h.value()
                    .as_text()
                    .map(|v| (h.name().to_string(), v.to_string()))
            })
            .collect();

        Ok(Self {
            headers,
            subject: message.subject().map(str::to_string),
            from: message
                .from()
                .and_then(|a| a.first())
                .and_then(|a| a.address())
                .map(str::to_string),
            to: address_list(message.to()),
            cc: address_list(message.cc()),
            date: message
                .date()
                .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
            body: message
                .body_text(0)
                .map(|b| b.into_owned())
                .unwrap_or_default(),
            raw: raw.to_vec(),
        })
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    #[must_use]
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    #[must_use]
    pub const fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// First header with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Size of the message in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }
}

fn address_list(list: Option<&mail_parser::Address<'_>>) -> Vec<String> {
    list.map(|a| {
        a.iter()
            .filter_map(|addr| addr.address().map(str::to_string))
            .collect()
    })
    .unwrap_or_default()
}

/// Builder for [`MessageContent`].
///
/// ```
/// use mockmail::MessageContent;
///
/// let content = MessageContent::builder()
///     .subject("Test")
///     .from("from@sender.com")
///     .to("hendrik@unknown.com")
///     .text("Some text here ...")
///     .build();
/// assert_eq!(content.subject(), Some("Test"));
/// ```
#[derive(Debug, Default)]
pub struct MessageBuilder {
    subject: Option<String>,
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    date: Option<DateTime<Utc>>,
    text: String,
    extra: Vec<(String, String)>,
}

impl MessageBuilder {
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Add a `To` recipient. May be called repeatedly.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    #[must_use]
    pub fn cc(mut self, cc: impl Into<String>) -> Self {
        self.cc.push(cc.into());
        self
    }

    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> MessageContent {
        let mut headers = Vec::new();
        if let Some(from) = &self.from {
            headers.push(("From".to_string(), from.clone()));
        }
        if !self.to.is_empty() {
            headers.push(("To".to_string(), self.to.join(", ")));
        }
        if !self.cc.is_empty() {
            headers.push(("Cc".to_string(), self.cc.join(", ")));
        }
        if let Some(subject) = &self.subject {
            headers.push(("Subject".to_string(), subject.clone()));
        }
        if let Some(date) = self.date {
            headers.push(("Date".to_string(), date.to_rfc2822()));
        }
        headers.extend(self.extra);
        headers.push((
            "Content-Type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        ));

        let mut raw = String::new();
        for (name, value) in &headers {
            raw.push_str(name);
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
        raw.push_str("\r\n");
        raw.push_str(&self.text);

        MessageContent {
            headers,
            subject: self.subject,
            from: self.from,
            to: self.to,
            cc: self.cc,
            date: self.date,
            body: self.text,
            raw: raw.into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_raw_email(subject: &str) -> Vec<u8> {
        format!(
            "From: alice@example.com\r\n\
             To: bob@example.com, carol@example.com\r\n\
             Subject: {subject}\r\n\
             Date: Mon, 01 Jan 2024 12:00:00 +0000\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             This is a test email."
        )
        .into_bytes()
    }

    #[test]
    fn parse_raw_message() {
        let raw = make_raw_email("Hello Bob");
        let content = MessageContent::parse(&raw).unwrap();

        assert_eq!(content.subject(), Some("Hello Bob"));
        assert_eq!(content.from(), Some("alice@example.com"));
        assert_eq!(content.to(), ["bob@example.com", "carol@example.com"]);
        assert_eq!(
            content.date().unwrap().to_rfc3339(),
            "2024-01-01T12:00:00+00:00"
        );
        assert!(content.body().contains("This is a test email."));
        assert_eq!(content.size(), raw.len());
    }

    #[test]
    fn builder_renders_headers() {
        let content = MessageContent::builder()
            .subject("Test")
            .from("from@sender.com")
            .to("a@b.com")
            .header("X-Custom", "yes")
            .text("body")
            .build();

        assert_eq!(content.header("subject"), Some("Test"));
        assert_eq!(content.header("x-custom"), Some("yes"));
        let raw = String::from_utf8(content.raw().to_vec()).unwrap();
        assert!(raw.starts_with("From: from@sender.com\r\n"));
        assert!(raw.ends_with("\r\n\r\nbody"));
    }

    #[test]
    fn builder_output_parses_back() {
        let built = MessageContent::builder()
            .subject("Round")
            .from("x@y.org")
            .to("z@y.org")
            .text("hi")
            .build();
        let parsed = MessageContent::parse(built.raw()).unwrap();
        assert_eq!(parsed.subject(), Some("Round"));
        assert_eq!(parsed.from(), Some("x@y.org"));
    }
}
