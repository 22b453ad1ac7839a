//! Logger module
//!
//! Server lifecycle, access, and error logging with optional file targets.

pub mod writer;

use crate::config::Config;
use chrono::Local;
use std::net::SocketAddr;

/// Initialize the logger with configuration.
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("API router started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("API prefix: {}", config.api_prefix()));
    write_info(&format!("Handler root: {}", config.api.dir));
    write_info(&format!("Static root: {}", config.server.static_dir));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    write_info("======================================");
}

/// One access-log line per finished request.
pub fn log_access(method: &str, path: &str, status: u16) {
    write_info(&format!(
        "[{}] {method} {path} - {status}",
        Local::now().format("%d/%b/%Y:%H:%M:%S %z")
    ));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}
