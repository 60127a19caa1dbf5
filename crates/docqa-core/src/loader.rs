//! Document enumeration for a docs directory.
//!
//! Only `.txt`, `.md` and `.markdown` files are documents; everything else is
//! ignored silently. A file that cannot be read as UTF-8 is skipped with a
//! warning so one bad file never aborts the whole run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Load every supported document under `data_dir`, recursively, in path order.
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>> {
    if !data_dir.is_dir() {
        return Err(Error::NoDocumentsFound(format!(
            "document directory '{}' does not exist",
            data_dir.display()
        )));
    }
    let files = list_document_files(data_dir);
    if files.is_empty() {
        return Err(Error::NoDocumentsFound(format!(
            "no .txt or .md files found in '{}'",
            data_dir.display()
        )));
    }

    let mut documents = Vec::with_capacity(files.len());
    for (file_index, file_path) in files.iter().enumerate() {
        debug!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
        match read_file_content(file_path) {
            Ok(text) => documents.push(Document::new(file_path.to_string_lossy(), text)),
            Err(e) => warn!(path = %file_path.display(), error = %e, "skipping unreadable file"),
        }
    }
    if documents.is_empty() {
        return Err(Error::NoDocumentsFound(format!(
            "none of the {} candidate files in '{}' could be read",
            files.len(),
            data_dir.display()
        )));
    }
    info!("Loaded {} of {} documents from {}", documents.len(), files.len(), data_dir.display());
    Ok(documents)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)?;
    String::from_utf8(bytes).map_err(|e| {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error()))
    })
}

fn list_document_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_supported(path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}
