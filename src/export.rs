//! Write extracted documents as a JSON array.
//!
//! Output goes to a file when a path is given, otherwise to stdout so the
//! export can be piped. Non-ASCII text is written as UTF-8, not escaped.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_documents(docs: &[Value], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_json(docs, BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => write_json(docs, std::io::stdout().lock()),
    }
}

fn write_json<W: Write>(docs: &[Value], mut writer: W) -> Result<()> {
    serde_json::to_writer(&mut writer, docs)?;
    writer.flush()?;
    Ok(())
}
