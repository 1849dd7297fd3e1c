use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::capture::types::CapturedItem;
use crate::sink::{ItemRecord, SinkError};

/// Replace `path` with a JSON array of `items`, in capture order.
#[instrument(skip(items), fields(path = %path.display(), items = items.len()))]
pub async fn write_json_array(path: &Path, items: &[CapturedItem]) -> Result<usize, SinkError> {
    let records: Vec<ItemRecord> = items.iter().map(ItemRecord::from).collect();
    write_records(path, &records).await?;
    Ok(records.len())
}

/// Records in an existing array file. A missing file reads as empty.
pub async fn read_json_array(path: &Path) -> Result<Vec<ItemRecord>, SinkError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Add items whose identifier the file does not hold yet. Returns how many were added.
#[instrument(skip(items), fields(path = %path.display(), items = items.len()))]
pub async fn append_json_array(path: &Path, items: &[CapturedItem]) -> Result<usize, SinkError> {
    let mut records = read_json_array(path).await?;
    let mut known: HashSet<String> = records.iter().map(|r| r.identifier.clone()).collect();

    let before = records.len();
    for item in items {
        if known.insert(item.identifier.clone()) {
            records.push(ItemRecord::from(item));
        }
    }
    let appended = records.len() - before;

    if appended > 0 {
        write_records(path, &records).await?;
    }
    debug!("Appended {} of {} items", appended, items.len());
    Ok(appended)
}

async fn write_records(path: &Path, records: &[ItemRecord]) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(records)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
