use std::io::Read;

use flate2::{bufread::GzEncoder, Compression};
use tracing::error;

use crate::{request::Request, response_writer::ResponseWriter};

/// Gzips the response body in place when the client accepts it.
pub fn compress(w: &mut ResponseWriter, r: &Request) {
    let body = w.get_body();
    if body.is_empty() {
        return;
    }

    let Some(content_type) = w.get_content_type_header() else {
        error!("Content-Type is supposed to be present");
        return;
    };
    let content_type = String::from(content_type);

    let accepts_gzip = r
        .get_accept_encoding()
        .is_some_and(|mut encodings| encodings.any(|encoding| encoding == "gzip"));
    if !accepts_gzip {
        return;
    }

    let mut gz = GzEncoder::new(body, Compression::fast());
    let mut buffer = vec![];
    if let Err(err) = gz.read_to_end(&mut buffer) {
        error!(?err);
        return;
    }

    w.set_body(buffer, &content_type);
    w.add_content_encoding_header("gzip");
    w.set_header("Vary", "Accept-Encoding");
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Read};

    use flate2::read::GzDecoder;

    use crate::{request::Request, response_writer::ResponseWriter};

    use super::compress;

    fn request(accept_encoding: Option<&str>) -> Request {
        let headers = accept_encoding
            .map(|v| HashMap::from([("Accept-Encoding".to_owned(), v.to_owned())]))
            .unwrap_or_default();
        Request::new("GET", "/", headers, None)
    }

    #[test]
    fn test_compress_when_accepted() {
        let mut w = ResponseWriter::new_empty();
        w.set_body_str("hello hello hello");
        compress(&mut w, &request(Some("deflate, gzip")));

        assert_eq!(w.get_header("content-encoding"), Some("gzip"));
        let mut decoded = String::new();
        GzDecoder::new(w.get_body())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "hello hello hello");
    }

    #[test]
    fn test_skip_when_not_accepted() {
        let mut w = ResponseWriter::new_empty();
        w.set_body_str("hello");
        compress(&mut w, &request(None));
        assert_eq!(w.get_header("content-encoding"), None);
        assert_eq!(w.get_body(), b"hello");
    }
}
