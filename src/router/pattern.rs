use regex::Regex;

use crate::error::RouterError;

/// Routing flags shared by registration and dispatch so both sides
/// normalize paths the same way.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Settings {
    /// When unset, `/Foo` and `/foo` are the same route.
    pub case_sensitive: bool,
    /// When unset, `/foo/` and `/foo` are the same route.
    pub strict_routing: bool,
}

/// Applies the case and trailing slash rules to a path.
pub fn normalize(path: &str, settings: &Settings) -> String {
    let mut path = if settings.case_sensitive {
        path.to_owned()
    } else {
        path.to_lowercase()
    };
    if !settings.strict_routing && path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// Defaults an empty template to `/` and makes sure it starts with `/` or `*`.
pub fn sanitize(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with(['/', '*']) {
        path.to_owned()
    } else {
        format!("/{}", path)
    }
}

/// How a route decides whether a request path belongs to it.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Every path.
    Wildcard,
    /// Only `/`.
    ExactSlash,
    /// Named parameters, matched through a compiled regex.
    Pattern(PathPattern),
    /// Byte-for-byte equality with the normalized route path.
    Literal,
    /// Middleware only: the request path starts with the route path.
    Prefix,
}

/// The matching half of a route, computed once at registration.
#[derive(Debug, Clone)]
pub struct CompiledPath {
    pub path: String,
    pub strategy: Strategy,
}

impl CompiledPath {
    /// Classifies `template` for an endpoint (`middleware == false`) or a
    /// middleware route.
    pub fn compile(
        template: &str,
        settings: &Settings,
        middleware: bool,
    ) -> Result<Self, RouterError> {
        let original = sanitize(template);

        if middleware {
            let cut = match original.split_once('*') {
                Some((before, _)) => before,
                None => &original,
            };
            let path = normalize(cut, settings);
            let strategy = if path.is_empty() || path == "/" {
                Strategy::Wildcard
            } else {
                Strategy::Prefix
            };
            return Ok(Self { path, strategy });
        }

        let path = normalize(&original, settings);
        let strategy = if path == "*" || path == "/*" {
            Strategy::Wildcard
        } else if let Some(pattern) = PathPattern::compile(&original, &path)? {
            Strategy::Pattern(pattern)
        } else if path == "/" {
            Strategy::ExactSlash
        } else {
            Strategy::Literal
        };
        Ok(Self { path, strategy })
    }
}

/// A compiled parameterized path.
///
/// Syntax, per `/` separated segment:
/// - `:name` binds one non-empty segment
/// - `:name?` binds an optional segment, reported as `""` when absent
/// - `*...` binds the rest of the path under the name `*`
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Parameter names come from `original` so they keep their case, the
    /// regex is built from the normalized `path`. Returns `None` when the
    /// template declares no parameters.
    pub fn compile(original: &str, path: &str) -> Result<Option<Self>, RouterError> {
        let param_names = param_names(original);
        if param_names.is_empty() {
            return Ok(None);
        }

        let mut regex_str = String::from("^");
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment.starts_with(':') {
                if segment.contains('?') {
                    regex_str.push_str("(?:/([^/]+?))?");
                } else {
                    regex_str.push_str("/(?:([^/]+?))");
                }
            } else if segment.starts_with('*') {
                regex_str.push_str("/(.*)");
            } else {
                regex_str.push('/');
                regex_str.push_str(&regex::escape(segment));
            }
        }
        regex_str.push_str("/?$");

        let regex = Regex::new(&regex_str).map_err(|source| RouterError::InvalidPattern {
            path: original.to_owned(),
            source,
        })?;
        Ok(Some(Self { regex, param_names }))
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the captured values in parameter order.
    ///
    /// A match that produced no capture groups while parameters are declared
    /// is a non-match: values must never go missing silently.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        if caps.len() <= 1 {
            return None;
        }
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }
}

fn param_names(template: &str) -> Vec<String> {
    let mut names = vec![];
    for segment in template.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = segment.strip_prefix(':') {
            names.push(name.replace(['?', ':'], ""));
        }
        if segment.contains('*') {
            names.push("*".to_owned());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::{normalize, param_names, sanitize, CompiledPath, Settings, Strategy};

    fn compile(template: &str, middleware: bool) -> CompiledPath {
        CompiledPath::compile(template, &Settings::default(), middleware).unwrap()
    }

    #[test]
    fn test_normalize() {
        let loose = Settings::default();
        let strict = Settings {
            case_sensitive: true,
            strict_routing: true,
        };

        let tests = [
            ("/Foo/", &loose, "/foo"),
            ("/foo//", &loose, "/foo/"),
            ("/", &loose, "/"),
            ("/Foo/", &strict, "/Foo/"),
        ];
        for (path, settings, want) in tests {
            assert_eq!(normalize(path, settings), want);
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(""), "/");
        assert_eq!(sanitize("users"), "/users");
        assert_eq!(sanitize("*"), "*");
        assert_eq!(sanitize("/users"), "/users");
    }

    #[test]
    fn test_param_names() {
        assert_eq!(param_names("/user/:ID/posts/:slug?"), vec!["ID", "slug"]);
        assert_eq!(param_names("/files/*"), vec!["*"]);
        assert!(param_names("/plain/path").is_empty());
    }

    #[test]
    fn test_classify_endpoint() {
        assert!(matches!(compile("*", false).strategy, Strategy::Wildcard));
        assert!(matches!(compile("/*", false).strategy, Strategy::Wildcard));
        assert!(matches!(compile("/", false).strategy, Strategy::ExactSlash));
        assert!(matches!(compile("", false).strategy, Strategy::ExactSlash));
        assert!(matches!(compile("/about", false).strategy, Strategy::Literal));
        assert!(matches!(
            compile("/user/:id", false).strategy,
            Strategy::Pattern(_)
        ));
    }

    #[test]
    fn test_classify_middleware() {
        assert!(matches!(compile("/", true).strategy, Strategy::Wildcard));
        assert!(matches!(compile("*", true).strategy, Strategy::Wildcard));
        let c = compile("/API/", true);
        assert!(matches!(c.strategy, Strategy::Prefix));
        assert_eq!(c.path, "/api");
        let c = compile("/a*", true);
        assert!(matches!(c.strategy, Strategy::Prefix));
        assert_eq!(c.path, "/a");
    }

    #[test]
    fn test_pattern_captures() {
        let Strategy::Pattern(pattern) = compile("/user/:id", false).strategy else {
            panic!("expected a pattern");
        };
        assert_eq!(pattern.param_names(), ["id"]);
        assert_eq!(pattern.captures("/user/42").unwrap(), vec!["42"]);
        assert_eq!(pattern.captures("/user/42/").unwrap(), vec!["42"]);
        assert!(pattern.captures("/user").is_none());
        assert!(pattern.captures("/user/").is_none());
        assert!(pattern.captures("/user/42/extra").is_none());
    }

    #[test]
    fn test_pattern_optional_and_wildcard() {
        let Strategy::Pattern(pattern) = compile("/posts/:slug?", false).strategy else {
            panic!("expected a pattern");
        };
        assert_eq!(pattern.captures("/posts").unwrap(), vec![""]);
        assert_eq!(pattern.captures("/posts/hello").unwrap(), vec!["hello"]);

        let Strategy::Pattern(pattern) = compile("/files/:dir/*", false).strategy else {
            panic!("expected a pattern");
        };
        assert_eq!(pattern.param_names(), ["dir", "*"]);
        assert_eq!(
            pattern.captures("/files/docs/a/b.txt").unwrap(),
            vec!["docs", "a/b.txt"]
        );
    }

    #[test]
    fn test_pattern_without_capture_group_is_no_match() {
        // `*` inside a segment declares a parameter without emitting a group.
        let Strategy::Pattern(pattern) = compile("/foo*", false).strategy else {
            panic!("expected a pattern");
        };
        assert_eq!(pattern.param_names(), ["*"]);
        assert!(pattern.captures("/foo*").is_none());
    }

    #[test]
    fn test_pattern_escapes_literals() {
        let Strategy::Pattern(pattern) = compile("/v1.0/:id", false).strategy else {
            panic!("expected a pattern");
        };
        assert!(pattern.captures("/v1.0/7").is_some());
        assert!(pattern.captures("/v1x0/7").is_none());
    }
}
