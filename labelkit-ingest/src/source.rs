//! Corpus file reading

use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Read a corpus file as text
///
/// An empty file reads as an empty string; a leading UTF-8 byte-order mark
/// is dropped.
pub async fn read_source_text(path: &Path) -> std::io::Result<String> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Ok(String::new());
    }

    let content = tokio::fs::read_to_string(path).await?;
    Ok(match content.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}
