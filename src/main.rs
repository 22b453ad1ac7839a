use apiroute::{bundle, config, logger, statics};
use apiroute::{Dispatch, Engine, Mode};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "serve".to_string());
    let config_path = args.next().unwrap_or_else(|| "config".to_string());

    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    match command.as_str() {
        "serve" => run_server(cfg),
        "bundle" => {
            let report = bundle::build(&cfg, Path::new("dist"))?;
            println!(
                "[BUNDLE] {} handler file(s), {} static file(s) -> dist/",
                report.handler_files, report.static_files
            );
            Ok(())
        }
        other => Err(format!("unknown command '{other}' (expected: serve, bundle)").into()),
    }
}

fn run_server(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;
    runtime.block_on(serve(cfg))
}

async fn serve(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    let engine = Arc::new(Engine::new(&cfg, Mode::Production)?);
    let static_root: Arc<PathBuf> = Arc::new(std::path::absolute(&cfg.server.static_dir)?);
    let index_file = Arc::new(cfg.server.index_file.clone());

    logger::log_server_start(&addr, &cfg);

    loop {
        match listener.accept().await {
            Ok((stream, _peer_addr)) => {
                handle_connection(
                    stream,
                    Arc::clone(&engine),
                    Arc::clone(&static_root),
                    Arc::clone(&index_file),
                    &cfg,
                );
            }
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
            }
        }
    }
}

/// Serve one connection in a spawned task with keep-alive and a
/// connection-level timeout from the performance config.
fn handle_connection(
    stream: tokio::net::TcpStream,
    engine: Arc<Engine>,
    static_root: Arc<PathBuf>,
    index_file: Arc<String>,
    cfg: &config::Config,
) {
    let keep_alive = cfg.performance.keep_alive_timeout > 0;
    let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
        cfg.performance.read_timeout,
        cfg.performance.write_timeout,
    ));

    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        if keep_alive {
            builder.keep_alive(true);
        }

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let engine = Arc::clone(&engine);
                let static_root = Arc::clone(&static_root);
                let index_file = Arc::clone(&index_file);
                async move { handle_request(req, &engine, &static_root, &index_file).await }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            )),
        }
    });
}

/// API routes go through the engine; everything else is a static asset with
/// index-document fallback.
async fn handle_request<B>(
    req: Request<B>,
    engine: &Engine,
    static_root: &Path,
    index_file: &str,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body + Unpin,
    B::Error: std::fmt::Display,
{
    // Liveness probe, always fast.
    if req.uri().path() == "/healthz" {
        return Ok(apiroute::http::build_json_response(
            hyper::StatusCode::OK,
            &serde_json::json!({"status": "ok"}),
        ));
    }

    match engine.dispatch(req).await {
        Dispatch::Handled(response) => Ok(response),
        Dispatch::Forward(req) => {
            let method = req.method();
            if *method != Method::GET && *method != Method::HEAD {
                return Ok(apiroute::http::build_405_response());
            }
            let is_head = *method == Method::HEAD;
            let pathname = apiroute::engine::context::decode_pathname(req.uri().path());
            Ok(statics::serve(static_root, &pathname, index_file, is_head).await)
        }
    }
}


/// Create a `TcpListener` with `SO_REUSEPORT` and `SO_REUSEADDR` enabled, so
/// a replacement process can bind before the old one exits.
fn create_reusable_listener(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
