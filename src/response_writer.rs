use crate::status_code_registry::{self, ReasonPhrase};

#[derive(Debug, Default)]
pub struct ResponseWriter {
    status_code: Option<u16>,
    reason_phrase: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn get_status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = Some(status_code);
        self.reason_phrase =
            status_code_registry::get_reason_phrase(status_code).map(|r| r.to_string());
    }

    pub fn set_reason_phrase(&mut self, reason_phrase: ReasonPhrase) {
        self.status_code = Some(reason_phrase.status_code());
        self.reason_phrase = Some(reason_phrase.to_string());
    }

    pub fn set_header(&mut self, k: impl Into<String>, v: impl Into<String>) {
        let (k, v) = (k.into(), v.into());
        if let Some(entry) = self
            .headers
            .iter_mut()
            .find(|entry| entry.0.eq_ignore_ascii_case(&k))
        {
            entry.1 = v;
        } else {
            self.headers.push((k, v));
        }
    }

    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|entry| entry.0.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_content_type_header(&self) -> Option<&str> {
        self.get_header("Content-Type")
    }

    pub fn add_content_encoding_header(&mut self, content_encoding: &str) {
        self.set_header("Content-Encoding", content_encoding);
    }

    pub fn get_body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) {
        self.body = body;
        self.set_header("Content-Type", content_type);
    }

    pub fn set_body_str(&mut self, body: &str) {
        self.set_body(body.as_bytes().to_vec(), "text/plain; charset=utf-8");
    }

    /// Drops everything written so far so another handler can start over.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Serializes the response. With `include_body` unset (HEAD) the
    /// `Content-Length` still reflects the body that would have been sent.
    pub fn write(self, include_body: bool) -> Vec<u8> {
        let status_code = self.status_code.unwrap_or(200);
        let reason_phrase = self.reason_phrase.or_else(|| {
            status_code_registry::get_reason_phrase(status_code).map(|r| r.to_string())
        });

        let mut head = format!("HTTP/1.1 {}", status_code);
        if let Some(reason_phrase) = &reason_phrase {
            head = format!("{} {}", head, reason_phrase);
        }
        head.push_str("\r\n");

        for (k, v) in &self.headers {
            if !k.eq_ignore_ascii_case("content-length") {
                head.push_str(&format!("{}: {}\r\n", k, v));
            }
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));

        let mut resp = head.into_bytes();
        if include_body {
            resp.extend(self.body);
        }
        resp
    }
}
