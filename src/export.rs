//! Export stored documents as a `;`-separated text file.
//!
//! One header line, then one row per document in URL order:
//!
//! ```text
//! ENTITY;URL;AUTHOR
//! Ana Lima (PT-SP);https://.../prop_mostrarintegra?codteor=1;Ana Lima
//! ```

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::models::Document;
use crate::store::{self, Store};

pub const HEADER: [&str; 3] = ["ENTITY", "URL", "AUTHOR"];
const SEPARATOR: char = ';';

/// Write every stored document to `output`. Returns the row count.
pub async fn run_export(store: &dyn Store, output: &Path) -> Result<usize> {
    let documents = store::load_documents(store).await?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    write_documents(&mut writer, &documents)?;
    writer.flush()?;

    Ok(documents.len())
}

pub fn write_documents<W: Write>(mut w: W, documents: &[Document]) -> std::io::Result<()> {
    write_row(&mut w, &HEADER)?;
    for doc in documents {
        write_row(
            &mut w,
            &[doc.entity_name.as_str(), doc.url.as_str(), doc.author.as_str()],
        )?;
    }
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> std::io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEPARATOR)?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
