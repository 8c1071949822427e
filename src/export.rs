use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ExportError;
use crate::geometry::Vertex;

/// Tabular layout of an exported polygon, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateFormat {
    Csv,
    Txt,
}

impl CoordinateFormat {
    /// `.csv` (any case) selects CSV; everything else is tab-separated text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Txt,
        }
    }

    fn separator(self) -> char {
        match self {
            Self::Csv => ',',
            Self::Txt => '\t',
        }
    }
}

/// Write a header row and one 1-based row per vertex.
pub fn write_coordinates<W: Write>(
    mut out: W,
    format: CoordinateFormat,
    vertices: &[Vertex],
) -> std::io::Result<()> {
    let sep = format.separator();
    writeln!(out, "index{sep}X{sep}Y")?;
    for (i, v) in vertices.iter().enumerate() {
        writeln!(out, "{}{sep}{}{sep}{}", i + 1, v.x, v.y)?;
    }
    out.flush()
}

pub fn export_coordinates(path: &Path, vertices: &[Vertex]) -> Result<CoordinateFormat, ExportError> {
    if vertices.is_empty() {
        return Err(ExportError::Empty);
    }
    let format = CoordinateFormat::from_path(path);
    let file = File::create(path)?;
    write_coordinates(BufWriter::new(file), format, vertices)?;
    log::info!(
        "exported {} vertices as {:?} to {}",
        vertices.len(),
        format,
        path.display()
    );
    Ok(format)
}
