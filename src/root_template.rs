use crate::{error::RouterError, request::Request};

#[derive(Debug, Clone, Eq, PartialEq)]
enum Part {
    Literal(String),
    /// `{host}`: the Host header, port included.
    Host,
    /// `{hostname}`: the Host header without the port.
    Hostname,
    /// `{method}`: the request method.
    Method,
}

/// A file-system root evaluated per request, e.g. `./sites/{hostname}`.
///
/// Parsing validates the whole template, so rendering cannot fail.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RootTemplate {
    parts: Vec<Part>,
}

impl RootTemplate {
    pub fn parse(template: &str) -> Result<Self, RouterError> {
        let invalid = |reason: &str| RouterError::InvalidRootTemplate {
            template: template.to_owned(),
            reason: reason.to_owned(),
        };

        // An empty root restricts serving to the working directory.
        let mut rest = if template.is_empty() { "." } else { template };
        if rest.len() > 1 {
            rest = rest.strip_suffix('/').unwrap_or(rest);
        }

        let mut parts = vec![];
        while !rest.is_empty() {
            let open = rest.find('{');
            let close = rest.find('}');
            match (open, close) {
                (None, None) => {
                    parts.push(Part::Literal(rest.to_owned()));
                    break;
                }
                (Some(open), Some(close)) if open < close => {
                    if open > 0 {
                        parts.push(Part::Literal(rest[..open].to_owned()));
                    }
                    let part = match rest[open + 1..close].trim() {
                        "host" => Part::Host,
                        "hostname" => Part::Hostname,
                        "method" => Part::Method,
                        name => return Err(invalid(&format!("unknown placeholder {:?}", name))),
                    };
                    parts.push(part);
                    rest = &rest[close + 1..];
                }
                (Some(_), None) => return Err(invalid("unclosed '{'")),
                _ => return Err(invalid("unexpected '}'")),
            }
        }
        Ok(Self { parts })
    }

    pub fn render(&self, r: &Request) -> String {
        let raw_host = r.get_host().unwrap_or_default();
        let raw_hostname = match raw_host.rsplit_once(':') {
            Some((hostname, port)) if port.chars().all(|c| c.is_ascii_digit()) => hostname,
            _ => raw_host,
        };
        // Each value is sanitized in the form it is rendered in.
        let host = sanitize_host(raw_host);
        let hostname = sanitize_host(raw_hostname);

        let mut root = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => root.push_str(s),
                Part::Host => root.push_str(&host),
                Part::Hostname => root.push_str(&hostname),
                Part::Method => root.push_str(r.get_http_method()),
            }
        }
        root
    }
}

/// Keeps a client supplied Host header from escaping the template's directory:
/// no separators, and never a value made of dots only.
fn sanitize_host(host: &str) -> String {
    let host: String = host
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':'))
        .collect();
    if host.chars().all(|c| c == '.') {
        "_".to_owned()
    } else {
        host
    }
}
