pub use error::RouterError;
pub use file_server::{FileServer, Static};
pub use request::Request;
pub use response_writer::ResponseWriter;
pub use router::{
    handler, CompiledPath, Ctx, Handler, PathPattern, Route, RouteMethod, Router, Settings,
    Strategy, Verb,
};
pub use server::{HttpMethod, Server, Service};
pub use status_code_registry::ReasonPhrase;

mod error;
mod file_server;
pub mod middleware;
mod request;
mod response_writer;
mod root_template;
mod router;
mod server;
mod status_code_registry;
#[cfg(test)]
mod test_utils;
