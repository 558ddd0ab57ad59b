use std::{
    fmt::Write as _,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    middleware::gzip_compressor, request::Request, response_writer::ResponseWriter,
    status_code_registry::ReasonPhrase,
};

/// Options for a static mount.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Static {
    /// Gzip responses for clients that accept it.
    pub compress: bool,
    /// Honour `Range: bytes=...` requests.
    pub byte_range: bool,
    /// Render a listing for directories without an index file.
    pub browse: bool,
    /// File served for a directory.
    pub index: String,
}

impl Default for Static {
    fn default() -> Self {
        Self {
            compress: false,
            byte_range: false,
            browse: false,
            index: "index.html".to_owned(),
        }
    }
}

/// Serves files below one resolved root.
///
/// Construction only records configuration, so two servers built for the
/// same root are interchangeable.
#[derive(Debug)]
pub struct FileServer {
    root: PathBuf,
    config: Static,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>, config: Static) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the response for `lookup_path`, resolved below the root.
    /// `path` is the request path, used for links in directory listings.
    /// A missing file leaves a 404 in `w`.
    pub fn serve(&self, w: &mut ResponseWriter, r: &Request, path: &str, lookup_path: &str) {
        let Ok(mut file_path) = build_path(&self.root, lookup_path.trim_start_matches('/')) else {
            w.set_reason_phrase(ReasonPhrase::BadRequest);
            return;
        };
        debug!(root = ?self.root, lookup_path, "file path: {:?}", file_path);

        let metadata = match fs::metadata(&file_path) {
            Ok(metadata) => metadata,
            Err(err) => return respond_io_error(w, err),
        };

        if metadata.is_dir() {
            let index = file_path.join(&self.config.index);
            if index.is_file() {
                file_path = index;
            } else if self.config.browse {
                return self.list_dir(w, &file_path, path);
            } else {
                w.set_reason_phrase(ReasonPhrase::Forbidden);
                w.set_body_str("Directory index is forbidden");
                return;
            }
        }

        let contents = match fs::read(&file_path) {
            Ok(contents) => contents,
            Err(err) => return respond_io_error(w, err),
        };
        let content_type = content_type(&file_path);

        if self.config.byte_range {
            w.set_header("Accept-Ranges", "bytes");
            if let Some(range) = r.get_range() {
                return serve_range(w, contents, content_type, range);
            }
        }

        w.set_reason_phrase(ReasonPhrase::OK);
        w.set_body(contents, content_type);
        if self.config.compress {
            gzip_compressor::compress(w, r);
        }
    }

    /// Links are built from the request path so they resolve through the mount.
    fn list_dir(&self, w: &mut ResponseWriter, dir: &Path, path: &str) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => return respond_io_error(w, err),
        };
        let mut names: Vec<(String, bool)> = entries
            .filter_map(Result::ok)
            .map(|e| {
                let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
                (e.file_name().to_string_lossy().into_owned(), is_dir)
            })
            .collect();
        names.sort();

        let base = path.trim_end_matches('/');
        let mut html = format!(
            "<html><head><title>{0}</title></head><body><h1>{0}</h1><ul>",
            escape_html(path)
        );
        if !base.is_empty() {
            html.push_str("<li><a href=\"..\">..</a></li>");
        }
        for (name, is_dir) in names {
            let slash = if is_dir { "/" } else { "" };
            let _ = write!(
                html,
                "<li><a href=\"{}/{}{}\">{}{}</a></li>",
                escape_html(base),
                escape_html(&name),
                slash,
                escape_html(&name),
                slash
            );
        }
        html.push_str("</ul></body></html>");

        w.set_reason_phrase(ReasonPhrase::OK);
        w.set_body(html.into_bytes(), "text/html; charset=utf-8");
    }
}

fn respond_io_error(w: &mut ResponseWriter, err: std::io::Error) {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => {
            w.set_reason_phrase(ReasonPhrase::NotFound);
            w.set_body_str("Not Found");
        }
        ErrorKind::PermissionDenied => {
            w.set_reason_phrase(ReasonPhrase::Forbidden);
        }
        _ => {
            error!(?err);
            w.set_reason_phrase(ReasonPhrase::InternalServerError);
        }
    }
}

fn serve_range(w: &mut ResponseWriter, contents: Vec<u8>, content_type: &str, range: &str) {
    let len = contents.len();
    let Some((start, end)) = parse_range(range, len) else {
        w.set_reason_phrase(ReasonPhrase::RangeNotSatisfiable);
        w.set_header("Content-Range", format!("bytes */{}", len));
        return;
    };
    w.set_reason_phrase(ReasonPhrase::PartialContent);
    w.set_header("Content-Range", format!("bytes {}-{}/{}", start, end, len));
    w.set_body(contents[start..=end].to_vec(), content_type);
}

/// Parses a single `bytes=` range into inclusive offsets.
fn parse_range(range: &str, len: usize) -> Option<(usize, usize)> {
    let spec = range.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.trim().split_once('-')?;
    if len == 0 {
        return None;
    }
    let (start, end) = match (start.trim(), end.trim()) {
        ("", suffix) => {
            let suffix: usize = suffix.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (len.saturating_sub(suffix), len - 1)
        }
        (start, "") => (start.parse().ok()?, len - 1),
        (start, end) => {
            let end: usize = end.parse().ok()?;
            (start.parse().ok()?, end.min(len - 1))
        }
    };
    (start <= end && start < len).then_some((start, end))
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Error, Debug)]
#[error("invalid path")]
struct InvalidPath;

fn build_path(
    base_path: impl AsRef<Path>,
    suffix: impl AsRef<Path>,
) -> Result<PathBuf, InvalidPath> {
    let path = path_clean::clean(base_path.as_ref().join(&suffix));

    let base = path_clean::clean(base_path.as_ref());
    if base.as_os_str() != "." && !path.starts_with(&base) {
        warn!("file path: {:?}", path);
        return Err(InvalidPath);
    }
    if base.as_os_str() == "." && (path.is_absolute() || path.starts_with("..")) {
        warn!("file path: {:?}", path);
        return Err(InvalidPath);
    }
    Ok(path)
}
