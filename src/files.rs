use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const MAX_ATTEMPTS: usize = 64;

/// Create a new file `<dir>/<base><suffix>` where the random suffix makes the
/// name unused. Creation is create-if-absent, so concurrent callers can never
/// receive the same name.
pub fn create_unique(dir: &Path, base: &str) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    for _ in 0..MAX_ATTEMPTS {
        let candidate = dir.join(format!("{}{:04}", base, rand::random::<u16>() % 10_000));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", base, dir.display()),
    ))
}

/// Replace `path` with `data` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (tmp_path, mut file) = create_unique(dir, &format!(".{}.tmp", name))?;
    let written = file.write_all(data).and_then(|_| file.sync_all());
    drop(file);
    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}
