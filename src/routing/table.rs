//! Route table construction
//!
//! The table is built by recursively listing handler scripts under the API
//! root. Directory entries are visited in lexicographic order and the final
//! table is sorted with literal segments ranking before parameter segments,
//! so first-match resolution is deterministic and the most specific route
//! wins regardless of filesystem enumeration order.

use crate::routing::matcher::{match_segments, Segment};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// File extension handler scripts must carry.
pub const HANDLER_EXTENSION: &str = "rhai";

/// One resolvable handler location.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Absolute path of the handler script.
    pub file_path: PathBuf,
    /// Compiled segment pattern over the route's URL path.
    pub segments: Vec<Segment>,
}

impl RouteEntry {
    /// Ordered names of the parameters bound by bracket segments.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    fn sort_key(&self) -> Vec<(u8, &str)> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => (0, lit.as_str()),
                Segment::Param(name) => (1, name.as_str()),
            })
            .collect()
    }
}

/// The cached set of resolvable handler locations. Immutable once built;
/// invalidation replaces the whole table reference.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build the table by walking `api_root` recursively.
    pub fn build(api_root: &Path) -> io::Result<Self> {
        let mut files = Vec::new();
        collect_scripts(api_root, &mut files)?;

        let mut entries: Vec<RouteEntry> = files
            .into_iter()
            .filter_map(|file_path| {
                let segments = route_segments(api_root, &file_path)?;
                Some(RouteEntry {
                    file_path,
                    segments,
                })
            })
            .collect();

        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(Self { entries })
    }

    /// First entry whose pattern accepts the path, with its bound parameters.
    pub fn resolve(
        &self,
        path_segments: &[&str],
    ) -> Option<(&RouteEntry, HashMap<String, String>)> {
        self.entries
            .iter()
            .find_map(|entry| match_segments(&entry.segments, path_segments).map(|p| (entry, p)))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }
}

/// Turn a handler file path into its route pattern, relative to the root.
fn route_segments(api_root: &Path, file_path: &Path) -> Option<Vec<Segment>> {
    let relative = file_path.strip_prefix(api_root).ok()?;
    let without_ext = relative.with_extension("");
    let segments = without_ext
        .components()
        .map(|c| Segment::parse(&c.as_os_str().to_string_lossy()))
        .collect();
    Some(segments)
}

/// Recursively collect handler scripts, visiting entries in sorted order so
/// the walk is reproducible across platforms.
fn collect_scripts(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    children.sort();

    for child in children {
        if child.is_dir() {
            collect_scripts(&child, out)?;
        } else if child.extension().and_then(|e| e.to_str()) == Some(HANDLER_EXTENSION) {
            out.push(child);
        }
    }
    Ok(())
}
