use std::{fmt, str::FromStr, sync::Arc};

use crate::{error::RouterError, server::HttpMethod};

use super::{
    ctx::Ctx,
    pattern::{CompiledPath, Strategy},
};

/// A route handler. Handlers receive the request-scoped context and may call
/// [`Ctx::next`] to hand the request on to the following routes.
pub type Handler = Arc<dyn Fn(&mut Ctx<'_>) + Send + Sync>;

/// Boxes a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Ctx<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a registration asks for.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Verb {
    /// Middleware: prefix match, every method.
    Use,
    /// Endpoint for every method.
    All,
    Http(HttpMethod),
}

impl FromStr for Verb {
    type Err = RouterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("use") {
            return Ok(Self::Use);
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        HttpMethod::try_from(s)
            .map(Self::Http)
            .map_err(|_| RouterError::UnknownMethod(s.to_owned()))
    }
}

/// The method a stored route accepts.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RouteMethod {
    Any,
    Only(HttpMethod),
}

impl RouteMethod {
    /// GET routes answer HEAD requests as well.
    pub fn accepts(self, method: HttpMethod) -> bool {
        match self {
            Self::Any => true,
            Self::Only(m) => m == method || (m == HttpMethod::Get && method == HttpMethod::Head),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(m) => write!(f, "{}", m),
        }
    }
}

#[derive(Clone)]
pub struct Route {
    method: RouteMethod,
    middleware: bool,
    compiled: Arc<CompiledPath>,
    handler: Handler,
}

impl Route {
    pub(crate) fn new(
        method: RouteMethod,
        middleware: bool,
        compiled: Arc<CompiledPath>,
        handler: Handler,
    ) -> Self {
        Self {
            method,
            middleware,
            compiled,
            handler,
        }
    }

    pub fn method(&self) -> RouteMethod {
        self.method
    }

    /// The normalized route path.
    pub fn path(&self) -> &str {
        &self.compiled.path
    }

    pub fn is_middleware(&self) -> bool {
        self.middleware
    }

    pub fn strategy(&self) -> &Strategy {
        &self.compiled.strategy
    }

    pub fn param_names(&self) -> &[String] {
        match &self.compiled.strategy {
            Strategy::Pattern(pattern) => pattern.param_names(),
            _ => &[],
        }
    }

    pub(crate) fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Decides whether this route takes the request. `path` must already be
    /// normalized. On a match the captured parameter values are returned,
    /// empty unless the route is a pattern.
    pub fn matches(&self, method: HttpMethod, path: &str) -> Option<Vec<String>> {
        if !self.method.accepts(method) {
            return None;
        }
        let matched = match &self.compiled.strategy {
            Strategy::Wildcard => true,
            Strategy::Prefix => path.starts_with(self.compiled.path.as_str()),
            Strategy::ExactSlash => path == "/",
            Strategy::Pattern(pattern) => return pattern.captures(path),
            Strategy::Literal => {
                path.len() == self.compiled.path.len() && path == self.compiled.path
            }
        };
        matched.then(Vec::new)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("middleware", &self.middleware)
            .field("path", &self.compiled.path)
            .field("strategy", &self.compiled.strategy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        router::pattern::{CompiledPath, Settings},
        server::HttpMethod,
    };

    use super::{handler, Route, RouteMethod, Verb};

    fn route(method: RouteMethod, template: &str, middleware: bool) -> Route {
        let compiled = CompiledPath::compile(template, &Settings::default(), middleware).unwrap();
        Route::new(method, middleware, Arc::new(compiled), handler(|_| {}))
    }

    #[test]
    fn test_verb_from_str() {
        assert_eq!("use".parse::<Verb>().unwrap(), Verb::Use);
        assert_eq!("ALL".parse::<Verb>().unwrap(), Verb::All);
        assert_eq!("Get".parse::<Verb>().unwrap(), Verb::Http(HttpMethod::Get));
        assert!("BREW".parse::<Verb>().is_err());
    }

    #[test]
    fn test_method_gate() {
        let get = RouteMethod::Only(HttpMethod::Get);
        let post = RouteMethod::Only(HttpMethod::Post);

        let tests = [
            (get, HttpMethod::Get, true),
            (get, HttpMethod::Head, true),
            (get, HttpMethod::Post, false),
            (post, HttpMethod::Head, false),
            (RouteMethod::Any, HttpMethod::Delete, true),
            (RouteMethod::Only(HttpMethod::Head), HttpMethod::Get, false),
        ];
        for (route_method, method, want) in tests {
            assert_eq!(route_method.accepts(method), want, "{route_method} {method}");
        }
    }

    #[test]
    fn test_matches() {
        let get = RouteMethod::Only(HttpMethod::Get);

        struct Test {
            route: Route,
            method: HttpMethod,
            path: &'static str,
            want: Option<Vec<&'static str>>,
        }

        let tests = [
            Test {
                route: route(RouteMethod::Any, "/", true),
                method: HttpMethod::Patch,
                path: "/anything/at/all",
                want: Some(vec![]),
            },
            Test {
                route: route(RouteMethod::Any, "/api", true),
                method: HttpMethod::Post,
                path: "/api/users",
                want: Some(vec![]),
            },
            Test {
                route: route(RouteMethod::Any, "/api", true),
                method: HttpMethod::Get,
                path: "/about",
                want: None,
            },
            Test {
                route: route(get, "/", false),
                method: HttpMethod::Get,
                path: "/",
                want: Some(vec![]),
            },
            Test {
                route: route(get, "/", false),
                method: HttpMethod::Get,
                path: "/x",
                want: None,
            },
            Test {
                route: route(get, "*", false),
                method: HttpMethod::Head,
                path: "/x/y",
                want: Some(vec![]),
            },
            Test {
                route: route(get, "*", false),
                method: HttpMethod::Post,
                path: "/x/y",
                want: None,
            },
            Test {
                route: route(get, "/user/:id", false),
                method: HttpMethod::Get,
                path: "/user/42",
                want: Some(vec!["42"]),
            },
            Test {
                route: route(get, "/about", false),
                method: HttpMethod::Get,
                path: "/about",
                want: Some(vec![]),
            },
            Test {
                route: route(get, "/about", false),
                method: HttpMethod::Get,
                path: "/about/us",
                want: None,
            },
        ];

        for test in tests {
            let got = test.route.matches(test.method, test.path);
            let want = test
                .want
                .map(|v| v.into_iter().map(str::to_owned).collect::<Vec<_>>());
            assert_eq!(got, want, "{:?} {} {}", test.route, test.method, test.path);
        }
    }
}
