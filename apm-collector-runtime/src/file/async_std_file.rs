use futures::StreamExt;
use std::{io::Result, path::Path};

pub use async_std::fs::{create_dir_all, read, remove_file, rename};

/// Size in bytes of the file at `path`.
pub async fn file_len<P: AsRef<Path>>(path: P) -> Result<u64> {
    Ok(async_std::fs::metadata(path.as_ref()).await?.len())
}

/// Names of the regular files directly under `dir`. Names that are not valid UTF-8 are skipped.
pub async fn list_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = async_std::fs::read_dir(dir.as_ref()).await?;
    while let Some(entry) = entries.next().await {
        let entry = entry?;
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}
