use tracing::{debug, info};

use crate::{
    request::Request, response_writer::ResponseWriter, server::HttpMethod,
    status_code_registry::ReasonPhrase,
};

use super::route::Route;

/// Request-scoped dispatch state.
///
/// Holds the cursor into the route table, the route that is currently
/// running and the parameter values it captured. Nothing in here outlives
/// the request or is shared with another one.
pub struct Ctx<'r> {
    routes: &'r [Route],
    request: &'r Request,
    response: &'r mut ResponseWriter,
    method: HttpMethod,
    decoded_path: String,
    path: String,
    next_index: usize,
    route: Option<&'r Route>,
    values: Vec<String>,
}

impl<'r> Ctx<'r> {
    pub(crate) fn new(
        routes: &'r [Route],
        request: &'r Request,
        response: &'r mut ResponseWriter,
        method: HttpMethod,
        decoded_path: String,
        path: String,
    ) -> Self {
        Self {
            routes,
            request,
            response,
            method,
            decoded_path,
            path,
            next_index: 0,
            route: None,
            values: vec![],
        }
    }

    /// Runs the first route after the current one that accepts the request.
    ///
    /// When the table runs out and nothing has written a body yet, the
    /// response becomes a 404.
    pub fn next(&mut self) {
        let routes = self.routes;
        while let Some(route) = routes.get(self.next_index) {
            self.next_index += 1;
            let Some(values) = route.matches(self.method, &self.path) else {
                continue;
            };
            debug!(
                index = self.next_index - 1,
                method = %route.method(),
                path = route.path(),
                "match"
            );
            self.route = Some(route);
            self.values = values;
            (route.handler())(self);
            return;
        }

        if self.response.get_body().is_empty() {
            info!(path = self.path.as_str(), "no route matched");
            self.send_status(ReasonPhrase::NotFound);
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The normalized path used for matching.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The percent-decoded request path before normalization, without the
    /// query string.
    pub fn original_path(&self) -> &str {
        &self.decoded_path
    }

    pub fn request(&self) -> &'r Request {
        self.request
    }

    pub fn route(&self) -> Option<&'r Route> {
        self.route
    }

    pub fn params(&self) -> &[String] {
        &self.values
    }

    /// Looks up a parameter value by name, ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&str> {
        let route = self.route?;
        let idx = route
            .param_names()
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn response(&self) -> &ResponseWriter {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut *self.response
    }

    pub fn status(&mut self, reason_phrase: ReasonPhrase) -> &mut Self {
        self.response.set_reason_phrase(reason_phrase);
        self
    }

    pub fn send_str(&mut self, body: &str) {
        self.response.set_body_str(body);
    }

    pub fn send_bytes(&mut self, body: Vec<u8>, content_type: &str) {
        self.response.set_body(body, content_type);
    }

    /// Sets the status and, if nothing has been written yet, uses the reason
    /// phrase as the body.
    pub fn send_status(&mut self, reason_phrase: ReasonPhrase) {
        self.response.set_reason_phrase(reason_phrase);
        if self.response.get_body().is_empty() {
            self.response.set_body_str(reason_phrase.as_str());
        }
    }

    pub fn reset_response(&mut self) {
        self.response.reset();
    }
}
