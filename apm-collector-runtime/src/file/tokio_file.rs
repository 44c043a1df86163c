use std::{io::Result, path::Path};

pub use tokio::fs::{create_dir_all, read, remove_file, rename};

/// Size in bytes of the file at `path`.
pub async fn file_len<P: AsRef<Path>>(path: P) -> Result<u64> {
    Ok(tokio::fs::metadata(path).await?.len())
}

/// Names of the regular files directly under `dir`. Names that are not valid UTF-8 are skipped.
pub async fn list_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}
