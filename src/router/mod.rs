use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::RouterError,
    file_server::Static,
    request::Request,
    response_writer::ResponseWriter,
    server::{HttpMethod, Service},
    status_code_registry::ReasonPhrase,
};

pub use ctx::Ctx;
pub use pattern::{CompiledPath, PathPattern, Settings, Strategy};
pub use route::{handler, Handler, Route, RouteMethod, Verb};

mod ctx;
mod pattern;
mod route;
mod static_route;

/// An ordered route table.
///
/// Routes are tried in registration order and the first one that accepts
/// the request runs. The table is built up front; once the router is handed
/// to the server it can no longer be changed.
#[derive(Debug, Default)]
pub struct Router {
    settings: Settings,
    routes: Vec<Route>,
}

macro_rules! method_helpers {
    ($($(#[$doc:meta])* $name:ident => $verb:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouterError>
            where
                F: Fn(&mut Ctx<'_>) + Send + Sync + 'static,
            {
                self.register($verb, path, [handler(f)])
            }
        )*
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            routes: vec![],
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Appends one route per handler. The handlers share the compiled path.
    pub fn register(
        &mut self,
        verb: Verb,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<&mut Self, RouterError> {
        let handlers: Vec<Handler> = handlers.into_iter().collect();
        if handlers.is_empty() {
            return Err(RouterError::MissingHandler {
                path: path.to_owned(),
            });
        }

        let middleware = verb == Verb::Use;
        let method = match verb {
            Verb::Use | Verb::All => RouteMethod::Any,
            Verb::Http(m) => RouteMethod::Only(m),
        };
        let compiled = Arc::new(CompiledPath::compile(path, &self.settings, middleware)?);
        info!(
            %method,
            path = compiled.path.as_str(),
            middleware,
            handlers = handlers.len(),
            "route"
        );

        for handler in handlers {
            self.routes.push(Route::new(
                method,
                middleware,
                Arc::clone(&compiled),
                handler,
            ));
        }
        Ok(self)
    }

    /// Like [`Router::register`] with the method given by name: `USE`, `ALL`
    /// or an HTTP method.
    pub fn add(
        &mut self,
        method: &str,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<&mut Self, RouterError> {
        self.register(method.parse()?, path, handlers)
    }

    method_helpers! {
        /// Also answers HEAD requests.
        get => Verb::Http(HttpMethod::Get);
        head => Verb::Http(HttpMethod::Head);
        post => Verb::Http(HttpMethod::Post);
        put => Verb::Http(HttpMethod::Put);
        patch => Verb::Http(HttpMethod::Patch);
        delete => Verb::Http(HttpMethod::Delete);
        options => Verb::Http(HttpMethod::Options);
        trace => Verb::Http(HttpMethod::Trace);
        connect => Verb::Http(HttpMethod::Connect);
        /// Endpoint for every method.
        all => Verb::All;
        /// Middleware: runs for every method on paths starting with `path`.
        /// Call [`Ctx::next`] to continue with the following routes.
        use_ => Verb::Use;
    }

    /// Serves files from `root` for GET and HEAD requests below `prefix`.
    ///
    /// `root` may reference the request through `{host}`, `{hostname}` and
    /// `{method}`. Requests for missing files, and requests with other
    /// methods, continue with the next route.
    pub fn mount_static(
        &mut self,
        prefix: &str,
        root: &str,
        config: Option<Static>,
    ) -> Result<&mut Self, RouterError> {
        let (compiled, handler) =
            static_route::compile(prefix, root, config.unwrap_or_default(), &self.settings)?;
        info!(prefix = compiled.path.as_str(), root, "static");
        self.routes.push(Route::new(
            RouteMethod::Any,
            true,
            Arc::new(compiled),
            handler,
        ));
        Ok(self)
    }

    pub fn handle(&self, w: &mut ResponseWriter, r: &Request) {
        let Ok(http_method) = HttpMethod::try_from(r.get_http_method()) else {
            w.set_reason_phrase(ReasonPhrase::BadRequest);
            return;
        };
        let Ok(decoded_path) = r.get_decoded_path() else {
            debug!(target = r.get_request_target(), "undecodable path");
            w.set_reason_phrase(ReasonPhrase::BadRequest);
            return;
        };
        let path = pattern::normalize(&decoded_path, &self.settings);

        let mut c = Ctx::new(&self.routes, r, w, http_method, decoded_path.into_owned(), path);
        c.next();
    }
}

impl Service for Router {
    fn serve(&self, w: &mut ResponseWriter, r: &mut Request) {
        self.handle(w, r);
    }
}
