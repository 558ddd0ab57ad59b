use std::{
    borrow::Cow,
    collections::HashMap,
    io::{BufRead, BufReader, ErrorKind, Read, Take},
};

use thiserror::Error;
use tracing::debug;

const REQUEST_LINE_LIMIT: u64 = 8 * 1024;
const HEADERS_LIMIT: u64 = 16 * 1024;
const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug)]
pub struct Request {
    http_method: String,
    request_target: String,
    http_version: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(
        http_method: impl Into<String>,
        request_target: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            http_method: http_method.into(),
            request_target: request_target.into(),
            http_version: "HTTP/1.1".to_owned(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            body,
        }
    }

    pub fn get_http_method(&self) -> &str {
        &self.http_method
    }

    /// The raw request target, query string included.
    pub fn get_request_target(&self) -> &str {
        &self.request_target
    }

    /// The request target without the query string.
    pub fn get_path(&self) -> &str {
        match self.request_target.split_once('?') {
            Some((path, _)) => path,
            None => &self.request_target,
        }
    }

    /// The request path with percent escapes decoded. A `+` stays a `+`.
    pub fn get_decoded_path(&self) -> Result<Cow<'_, str>, InvalidRequest> {
        percent_decode(self.get_path())
    }

    pub fn get_query(&self) -> Option<&str> {
        self.request_target.split_once('?').map(|(_, query)| query)
    }

    pub fn get_http_version(&self) -> &str {
        &self.http_version
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    pub fn get_host(&self) -> Option<&str> {
        self.get_header("host")
    }

    pub fn get_range(&self) -> Option<&str> {
        self.get_header("range")
    }

    /// Iterates over the comma separated content codings the client accepts,
    /// quality values stripped.
    pub fn get_accept_encoding(&self) -> Option<impl Iterator<Item = &str> + '_> {
        self.get_header("accept-encoding").map(|v| {
            v.split(',')
                .map(|coding| coding.split(';').next().unwrap_or_default().trim())
        })
    }

    pub fn wants_close(&self) -> bool {
        self.get_header("connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")))
    }

    pub fn get_body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Decodes `%XX` escapes. Malformed escapes are kept as is; a result that is
/// not valid UTF-8 is an error.
fn percent_decode(s: &str) -> Result<Cow<'_, str>, InvalidRequest> {
    if !s.contains('%') {
        return Ok(Cow::Borrowed(s));
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|&b| hex_digit(b)),
                bytes.get(i + 2).and_then(|&b| hex_digit(b)),
            ) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out)
        .map(Cow::Owned)
        .map_err(|_| InvalidRequest)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[derive(Error, Debug)]
#[error("end of file")]
pub struct EndOfFile;

#[derive(Error, Debug)]
#[error("invalid request")]
pub struct InvalidRequest;

pub struct RequestReader<R> {
    buf_reader: Take<BufReader<R>>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(r: R) -> Self {
        Self {
            buf_reader: BufReader::new(r).take(u64::MAX),
        }
    }

    pub fn read(&mut self) -> anyhow::Result<Request> {
        let mut request_line = String::new();
        self.buf_reader.set_limit(REQUEST_LINE_LIMIT);
        let n = self.buf_reader.read_line(&mut request_line)?;
        if n == 0 {
            Err(EndOfFile)?
        }
        let request_line = request_line.strip_suffix("\r\n").ok_or(InvalidRequest)?;

        let mut parts = request_line.split(' ');
        let (Some(http_method), Some(request_target), Some(http_version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidRequest.into());
        };
        if http_method.is_empty() || !request_target.starts_with(['/', '*']) {
            Err(InvalidRequest)?
        }
        debug!(?request_line);

        let mut headers = HashMap::new();
        self.buf_reader.set_limit(HEADERS_LIMIT);
        loop {
            let mut line = String::new();
            self.buf_reader.read_line(&mut line)?;
            let line = line.strip_suffix("\r\n").ok_or(InvalidRequest)?;

            if line.is_empty() {
                break;
            }
            let (k, v) = line.split_once(':').ok_or(InvalidRequest)?;
            headers.insert(k.trim().to_lowercase(), v.trim().to_owned());
        }

        let mut body = None;
        if let Some(content_length) = headers.get("content-length") {
            let content_length: usize = content_length.parse().map_err(|_| InvalidRequest)?;
            if content_length > BODY_LIMIT {
                Err(InvalidRequest)?
            }
            self.buf_reader.set_limit(content_length as u64);
            let mut buf = vec![0; content_length];
            if let Err(err) = self.buf_reader.read_exact(&mut buf) {
                if err.kind() == ErrorKind::UnexpectedEof {
                    Err(InvalidRequest)?
                } else {
                    Err(err)?
                }
            }
            body = Some(buf);
        }

        Ok(Request {
            http_method: http_method.to_owned(),
            request_target: request_target.to_owned(),
            http_version: http_version.to_owned(),
            headers,
            body,
        })
    }
}
