use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Creates `path` and any missing parents. Succeeds when it already exists.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    fs::create_dir_all(path)?;
    tracing::debug!("Output folder ready: {}", path.display());
    Ok(path.to_path_buf())
}

/// Lists the entries directly under `dir`, sorted by file name.
pub fn list_dir(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir.as_ref())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Recursively copies `src` into `dst`, returning the top-level entries created.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        copy_entry(&entry.path(), &target)?;
        created.push(target);
    }
    Ok(created)
}

fn copy_entry(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_entry(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dst)?;
    }
    Ok(())
}

/// Removes a file or directory tree; missing paths are ignored.
pub fn remove_entry(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
