// File-level helpers for the resource store.
//
// Streaming SHA-256 reads, atomic temp-then-rename writes, and directory
// "fence" timestamps (a folder mtime mirrored from the file it tracks).

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use filetime::FileTime;
use sha2::{Digest, Sha256};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Suffix of in-flight writes; such files are never artifacts.
pub const TEMP_EXTENSION: &str = "tmp";

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Read a whole file, hashing it as it streams in.
///
/// Returns the bytes and their lowercase hex SHA-256.
pub fn read_with_digest(path: &Path) -> io::Result<(Vec<u8>, String)> {
    let file = File::open(path)?;
    let size_hint = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let mut reader = BufReader::with_capacity(BUF_SIZE, file);
    let mut hasher = Sha256::new();
    let mut data = Vec::with_capacity(size_hint);
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        data.extend_from_slice(&buf[..n]);
    }
    Ok((data, hex::encode(hasher.finalize())))
}

/// Decode bytes as text.
///
/// Valid UTF-8 is taken as is; anything else is read as ISO-8859-1, one
/// char per byte, so distinct non-UTF-8 inputs never decode alike.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Read a file as text (see [`decode_text`]).
pub fn read_text(path: &Path) -> io::Result<String> {
    fs::read(path).map(|bytes| decode_text(&bytes))
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Write `content` next to `target` and rename it into place, so readers
/// never observe a partial file.
pub fn atomic_write(target: &Path, content: &[u8]) -> io::Result<()> {
    let temp = target.with_extension(TEMP_EXTENSION);
    {
        let mut f = File::create(&temp)?;
        f.write_all(content)?;
        f.sync_all()?;
    }
    if let Err(e) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

/// Modification time of `path`.
pub fn mtime(path: &Path) -> io::Result<FileTime> {
    let meta = fs::metadata(path)?;
    Ok(FileTime::from_last_modification_time(&meta))
}

/// Stamp the `fence` folder with `stamp`, normally the source mtime taken
/// before the source was read.
pub fn set_fence(fence: &Path, stamp: FileTime) -> io::Result<()> {
    filetime::set_file_mtime(fence, stamp)
}

/// Whether the fence folder carries exactly `source`'s modification time.
///
/// A missing fence or source counts as out of date.
pub fn fence_matches(fence: &Path, source: &Path) -> bool {
    match (mtime(fence), mtime(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
