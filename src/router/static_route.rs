use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{
    error::RouterError,
    file_server::{FileServer, Static},
    root_template::RootTemplate,
    server::HttpMethod,
};

use super::{
    ctx::Ctx,
    pattern::{sanitize, CompiledPath, Settings, Strategy},
    route::{handler, Handler},
};

/// Builds the middleware route behind [`super::Router::mount_static`].
pub(super) fn compile(
    prefix: &str,
    root: &str,
    config: Static,
    settings: &Settings,
) -> Result<(CompiledPath, Handler), RouterError> {
    let mut prefix = sanitize(prefix);
    let mut wildcard = false;
    if prefix == "*" || prefix == "/*" {
        wildcard = true;
        prefix = "/".to_owned();
    }
    if !settings.case_sensitive {
        prefix = prefix.to_lowercase();
    }
    let is_slash = prefix == "/";
    if let Some((before, _)) = prefix.split_once('*') {
        wildcard = true;
        prefix = before.to_owned();
    }
    let strip = !is_slash;
    let case_sensitive = settings.case_sensitive;

    let template = RootTemplate::parse(root)?;
    let file_servers: DashMap<String, Arc<FileServer>> = DashMap::new();

    let compiled = CompiledPath {
        path: prefix.clone(),
        strategy: if is_slash {
            Strategy::Wildcard
        } else {
            Strategy::Prefix
        },
    };

    let handler = handler(move |c: &mut Ctx<'_>| {
        if matches!(c.method(), HttpMethod::Get | HttpMethod::Head) {
            let path = if wildcard {
                prefix.clone()
            } else {
                c.original_path().to_owned()
            };
            let lookup = if strip {
                mount_len(&path, &prefix, case_sensitive).map(|n| &path[n..])
            } else {
                Some(path.as_str())
            };
            if let Some(lookup) = lookup {
                let root = template.render(c.request());
                let file_server = cached_file_server(&file_servers, root, &config);
                let r = c.request();
                file_server.serve(c.response_mut(), r, &path, lookup);
                if c.response().get_status_code() != Some(404) {
                    return;
                }
                c.reset_response();
            }
        }
        c.next();
    });

    Ok((compiled, handler))
}

/// One server per rendered root. The cache grows by one entry for every
/// distinct sanitized host a per-host template sees and is never pruned.
fn cached_file_server(
    file_servers: &DashMap<String, Arc<FileServer>>,
    root: String,
    config: &Static,
) -> Arc<FileServer> {
    if let Some(file_server) = file_servers.get(&root) {
        return Arc::clone(&file_server);
    }
    let file_server = file_servers.entry(root.clone()).or_insert_with(|| {
        debug!(root = root.as_str(), "new file server");
        Arc::new(FileServer::new(&root, config.clone()))
    });
    Arc::clone(&file_server)
}

/// Byte length of the part of `path` that the mount prefix matched.
///
/// `prefix` was matched against the normalized path, whose length can differ
/// from the request path once it is lowercased.
fn mount_len(path: &str, prefix: &str, case_sensitive: bool) -> Option<usize> {
    if case_sensitive {
        return path.starts_with(prefix).then_some(prefix.len());
    }
    let mut lowered = String::with_capacity(prefix.len());
    for (i, ch) in path.char_indices() {
        if lowered == prefix {
            return Some(i);
        }
        if !prefix.starts_with(lowered.as_str()) {
            return None;
        }
        lowered.extend(ch.to_lowercase());
    }
    (lowered == prefix).then_some(path.len())
}
