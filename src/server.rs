#[cfg(test)]
use std::net::SocketAddr;
use std::{
    io::Write,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    thread,
    time::Duration,
};

use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{error, info, span, Level, Span};

use crate::{
    request::{EndOfFile, Request, RequestReader},
    response_writer::ResponseWriter,
    status_code_registry::ReasonPhrase,
};

// `EnumString` also derives `TryFrom<&str>`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
    Connect,
}

/// Anything the server can hand a parsed request to.
pub trait Service {
    fn serve(&self, w: &mut ResponseWriter, r: &mut Request);
}

impl<T> Service for T
where
    T: Fn(&mut ResponseWriter, &mut Request),
{
    fn serve(&self, w: &mut ResponseWriter, r: &mut Request) {
        self(w, r)
    }
}

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    read_timeout: Option<Duration>,
}

impl Server {
    pub fn new(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
            read_timeout: Some(Duration::from_secs(10)),
        })
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr().unwrap()
    }

    /// Accepts connections forever, one thread per connection. The service
    /// is shared read-only between all of them.
    pub fn run(&self, service: impl Service + Sync) {
        let read_timeout = self.read_timeout;
        let service = &service;
        thread::scope(|s| {
            for stream in self.listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        error!(?err);
                        continue;
                    }
                };

                s.spawn(move || {
                    let span = create_conn_span(&stream);
                    let _guard = span.enter();
                    info!("new conn");

                    if let Err(err) = handle_connection(stream, read_timeout, service) {
                        error!(?err);
                    }

                    info!("conn end");
                });
            }
        });
    }
}

#[derive(Debug)]
enum ConnCtrl {
    KeepAlive,
    Close,
}

fn handle_connection(
    stream: TcpStream,
    read_timeout: Option<Duration>,
    service: &impl Service,
) -> anyhow::Result<()> {
    let (reader, writer) = (&stream, &stream);
    reader.set_read_timeout(read_timeout)?;
    let mut request_reader = RequestReader::new(reader);

    loop {
        match handle_request(&mut request_reader, writer, service)? {
            ConnCtrl::KeepAlive => continue,
            ConnCtrl::Close => return Ok(()),
        }
    }
}

fn handle_request(
    request_reader: &mut RequestReader<&TcpStream>,
    mut writer: &TcpStream,
    service: &impl Service,
) -> anyhow::Result<ConnCtrl> {
    let mut r = match request_reader.read() {
        Ok(r) => r,
        Err(err) => {
            if err.downcast_ref::<EndOfFile>().is_some() {
                return Ok(ConnCtrl::Close);
            }

            error!(?err);
            let mut w = ResponseWriter::new_empty();
            w.set_reason_phrase(ReasonPhrase::BadRequest);
            writer.write_all(&w.write(true))?;
            return Ok(ConnCtrl::Close);
        }
    };

    let span = create_req_span(&r);
    let _guard = span.enter();
    info!(?r);

    let conn_ctrl = if r.wants_close() {
        ConnCtrl::Close
    } else {
        ConnCtrl::KeepAlive
    };
    let include_body = !r.get_http_method().eq_ignore_ascii_case("HEAD");

    let mut w = ResponseWriter::new_empty();
    service.serve(&mut w, &mut r);
    info!(status_code = w.get_status_code(), "response");
    writer.write_all(&w.write(include_body))?;
    Ok(conn_ctrl)
}

fn create_conn_span(stream: &TcpStream) -> Span {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(err) => {
            error!(?err);
            "unknown".to_owned()
        }
    };

    span!(Level::INFO, "conn", peer_addr = peer_addr.as_str())
}

fn create_req_span(r: &Request) -> Span {
    let http_method = r.get_http_method();
    let request_target = r.get_request_target();
    span!(
        Level::INFO,
        "req",
        method = http_method,
        target = request_target
    )
}

#[cfg(test)]
pub fn noop_service() -> impl Service {
    |_: &mut ResponseWriter, _: &mut Request| {}
}

#[cfg(test)]
pub mod tests {
    use std::{
        io::{BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        thread,
        time::Duration,
    };

    use crate::{
        request::Request, response_writer::ResponseWriter, status_code_registry::ReasonPhrase,
    };

    use super::{handle_connection, noop_service, HttpMethod, Server};

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::try_from("GET").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::try_from("delete").unwrap(), HttpMethod::Delete);
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
        assert!(HttpMethod::try_from("BREW").is_err());
    }

    #[test]
    fn test_request_reader_timeout() {
        let timeout = Some(Duration::from_millis(100));

        let listener = TcpListener::bind("localhost:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, timeout, &noop_service())
        });

        let client = TcpStream::connect(addr).unwrap();
        (&client).write_all(b"GET / HTTP/1.1\r\n").unwrap();

        // The stalled request is answered with 400 and the connection closed.
        server_handle.join().unwrap().unwrap();
        drop(client);
    }

    #[test]
    fn test_persistent_connection() {
        let timeout = Some(Duration::from_millis(100));

        let server = Server::new("localhost:0").unwrap();
        let addr = server.local_addr();

        thread::spawn(move || {
            server.run(|w: &mut ResponseWriter, _: &mut Request| {
                w.set_reason_phrase(ReasonPhrase::OK);
            });
        });

        let stream = TcpStream::connect(addr).unwrap();
        let (r, mut writer) = (&stream, &stream);
        r.set_read_timeout(timeout).unwrap();
        let mut reader = BufReader::new(r);

        writer.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        // The connection stays open, so reading to the end runs into
        // the client's read timeout instead of an EOF.
        let mut buf = vec![];
        let res = reader.read_to_end(&mut buf);
        res.unwrap_err();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_head_response_has_no_body() {
        let server = Server::new("localhost:0").unwrap();
        let addr = server.local_addr();

        thread::spawn(move || {
            server.run(|w: &mut ResponseWriter, _: &mut Request| {
                w.set_body_str("hello");
            });
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert!(buf.ends_with("Content-Length: 5\r\n\r\n"));
    }
}
