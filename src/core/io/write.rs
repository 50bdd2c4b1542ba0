use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Serialize `value` as pretty JSON into `path`, creating missing parent directories.
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let body = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    write_file(path, body)
}
