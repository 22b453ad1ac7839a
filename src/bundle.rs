//! Build step
//!
//! Copies the handler tree and static assets into a self-contained output
//! directory and writes the production configuration alongside them, so the
//! production process starts from an explicit config file instead of
//! environment side channels. Failures abort the build; there is no partial-
//! output guarantee beyond what was already written.

use crate::config::Config;
use std::io;
use std::path::Path;

/// Where bundled handler scripts land, relative to the output directory.
pub const BUNDLED_API_DIR: &str = "server/api";
/// Where bundled static assets land, relative to the output directory.
pub const BUNDLED_STATIC_DIR: &str = "public";

/// Summary of a completed bundle step.
#[derive(Debug)]
pub struct BundleReport {
    pub handler_files: usize,
    pub static_files: usize,
}

/// Copy handlers and static assets into `out_dir` and emit the rewritten
/// production config as `out_dir/config.toml`.
pub fn build(config: &Config, out_dir: &Path) -> io::Result<BundleReport> {
    let handler_files = copy_tree(
        Path::new(&config.api.dir),
        &out_dir.join(BUNDLED_API_DIR),
    )?;

    let static_src = Path::new(&config.server.static_dir);
    let static_files = if static_src.is_dir() {
        copy_tree(static_src, &out_dir.join(BUNDLED_STATIC_DIR))?
    } else {
        0
    };

    write_bundled_config(config, out_dir)?;

    Ok(BundleReport {
        handler_files,
        static_files,
    })
}

/// Recursively copy a directory tree, returning the number of files copied.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    std::fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Emit the production config with paths rewritten to the bundled layout.
fn write_bundled_config(config: &Config, out_dir: &Path) -> io::Result<()> {
    let mut bundled = config.clone();
    bundled.api.dir = out_dir.join(BUNDLED_API_DIR).to_string_lossy().into_owned();
    bundled.server.static_dir = out_dir
        .join(BUNDLED_STATIC_DIR)
        .to_string_lossy()
        .into_owned();

    let rendered = toml::to_string_pretty(&bundled)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(out_dir.join("config.toml"), rendered)
}
