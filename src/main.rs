use clap::Parser;
use tracing::info;
use waymark::{ReasonPhrase, Router, Server, Settings, Static};

/// Serves a directory through the router, with a health check in front.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:4221")]
    addr: String,

    /// URL prefix the files are mounted at. A trailing `*` serves the
    /// prefix itself for every sub-path.
    #[arg(long, default_value = "/")]
    prefix: String,

    /// Directory to serve. May contain `{host}`, `{hostname}` or `{method}`.
    #[arg(long, default_value = ".")]
    root: String,

    #[arg(long)]
    compress: bool,

    #[arg(long)]
    byte_range: bool,

    #[arg(long)]
    browse: bool,

    #[arg(long, default_value = "index.html")]
    index: String,

    #[arg(long)]
    case_sensitive: bool,

    #[arg(long)]
    strict_routing: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    info!(?args);

    let mut router = Router::with_settings(Settings {
        case_sensitive: args.case_sensitive,
        strict_routing: args.strict_routing,
    });
    router
        .get("/healthz", |c| c.send_status(ReasonPhrase::OK))?
        .mount_static(
            &args.prefix,
            &args.root,
            Some(Static {
                compress: args.compress,
                byte_range: args.byte_range,
                browse: args.browse,
                index: args.index,
            }),
        )?;

    let server = Server::new(&args.addr)?;
    info!(addr = args.addr.as_str(), routes = router.routes().len(), "listening");
    server.run(router);
    Ok(())
}
