use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

// https://www.iana.org/assignments/http-status-codes/http-status-codes.xhtml
// Only the codes the router and the file server produce are listed.

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter)]
#[repr(u16)]
pub enum ReasonPhrase {
    OK = 200,
    Created = 201,
    NoContent = 204,
    PartialContent = 206,
    MovedPermanently = 301,
    NotModified = 304,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RangeNotSatisfiable = 416,
    InternalServerError = 500,
    NotImplemented = 501,
}

impl ReasonPhrase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OK => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::PartialContent => "Partial Content",
            Self::MovedPermanently => "Moved Permanently",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::RangeNotSatisfiable => "Range Not Satisfiable",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
        }
    }

    pub fn status_code(self) -> u16 {
        get_status_code(self)
    }
}

impl Display for ReasonPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref STATUS_CODE_REGISTRY: StatusCodeRegistry = StatusCodeRegistry::new();
}

pub fn get_reason_phrase(status_code: u16) -> Option<ReasonPhrase> {
    STATUS_CODE_REGISTRY.reason_phrase_lookup.get(&status_code).copied()
}

pub fn get_status_code(reason_phrase: ReasonPhrase) -> u16 {
    STATUS_CODE_REGISTRY.status_code_lookup[&reason_phrase]
}

struct StatusCodeRegistry {
    reason_phrase_lookup: HashMap<u16, ReasonPhrase>,
    status_code_lookup: HashMap<ReasonPhrase, u16>,
}

impl StatusCodeRegistry {
    fn new() -> Self {
        let (reason_phrase_lookup, status_code_lookup) = ReasonPhrase::iter()
            .map(|reason_phrase| {
                let status_code = reason_phrase as u16;
                ((status_code, reason_phrase), (reason_phrase, status_code))
            })
            .unzip();
        Self {
            reason_phrase_lookup,
            status_code_lookup,
        }
    }
}
