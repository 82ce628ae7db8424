//! Summary table printed after a completed search and by `show`.

use owo_colors::OwoColorize;
use revtrace_types::{Occurrence, short_revision};
use std::fmt::Write;

/// One version's newest occurrence plus how many changes it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub version: String,
    pub changes: usize,
    pub depth: u64,
    pub revision: String,
    pub date: String,
}

pub fn rows<'a, I>(versions: I) -> Vec<Row>
where
    I: IntoIterator<Item = (&'a str, &'a [Occurrence])>,
{
    versions
        .into_iter()
        .filter_map(|(version, occurrences)| {
            let newest = occurrences.iter().min_by_key(|o| o.depth)?;
            Some(Row {
                version: version.to_string(),
                changes: occurrences.len(),
                depth: newest.depth,
                revision: short_revision(&newest.revision).to_string(),
                date: newest.date.clone(),
            })
        })
        .collect()
}

const HEADERS: [&str; 5] = ["VERSION", "CHANGES", "DEPTH", "REVISION", "DATE"];

pub fn render(rows: &[Row], color: bool) -> String {
    if rows.is_empty() {
        return "No changes recorded.".to_string();
    }

    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.version.clone(),
                row.changes.to_string(),
                row.depth.to_string(),
                row.revision.clone(),
                row.date.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = join_padded(&HEADERS.map(String::from), &widths);
    if color {
        let _ = writeln!(out, "{}", header.bold());
    } else {
        let _ = writeln!(out, "{}", header);
    }

    for line in &cells {
        let mut padded = join_padded(line, &widths);
        if color {
            // pad first so escape codes don't skew the columns
            let version = format!("{:<w$}", line[0], w = widths[0]);
            padded = padded.replacen(&version, &version.green().to_string(), 1);
        }
        let _ = writeln!(out, "{}", padded);
    }

    out.trim_end().to_string()
}

fn join_padded(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<w$}", cell, w = width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
