//! # Static Files
//!
//! Filesystem abstraction behind `static_dir` / `static_fs` mounts.
//!
//! A mount registers `GET` and `HEAD` for `<mount>/*filepath`. Its handler
//! probes the filesystem first; a miss is sent through the engine's
//! not-found chain rather than answered here, so routed and static 404s
//! look the same.

use crate::context::{Context, HandlerFunc};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of files for a static mount
pub trait FileSystem: Send + Sync {
    /// Open `path` (relative, `/`-separated) for reading
    ///
    /// # Errors
    ///
    /// Any IO error; `NotFound` for paths that do not exist or are refused.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Files under a local directory
#[derive(Debug, Clone)]
pub struct Dir {
    base_dir: PathBuf,
}

impl Dir {
    /// Serve files below `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    /// Map a URL path onto the base directory, refusing to leave it
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }
}

impl FileSystem for Dir {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let full = self
            .map_path(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !full.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        Ok(Box::new(File::open(full)?))
    }
}

/// Content type guessed from a file extension
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Build the handler for a mount whose absolute prefix is `mount`
pub(crate) fn static_handler(mount: String, fs: Arc<dyn FileSystem>) -> HandlerFunc {
    Arc::new(move |ctx: &mut Context<'_>| {
        let file = ctx.param("filepath").to_string();
        match fs.open(&file) {
            Ok(reader) => {
                debug!(mount = %mount, file = %file, "Serving static file");
                ctx.data_from_reader(200, content_type_for(&file), reader, &[]);
            }
            Err(err) => {
                debug!(mount = %mount, file = %file, error = %err, "Static file missing");
                ctx.redirect_to_no_route();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_map_path_prevents_traversal() {
        let dir = Dir::new("/srv/static");
        assert!(dir.map_path("../Cargo.toml").is_none());
        assert!(dir.map_path("css/../../etc/passwd").is_none());
        assert_eq!(
            dir.map_path("/css/./a.css"),
            Some(PathBuf::from("/srv/static/css/a.css"))
        );
    }

    #[test]
    fn test_open_existing_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("hello.txt"), "Hello\n").unwrap();
        let dir = Dir::new(tmp.path());

        let mut out = String::new();
        dir.open("hello.txt").unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "Hello\n");

        let err = dir.open("nope.txt").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_directories_are_not_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("css")).unwrap();
        assert!(Dir::new(tmp.path()).open("css").is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/b.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("voice.mp3"), "audio/mpeg");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
