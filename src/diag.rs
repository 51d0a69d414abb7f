//! Diagnostic matrix dumps
//!
//! When the `DMP` environment variable is set, the binary opens a dump
//! file and the matrix code writes each construction and recovery stage
//! into it. The sink is process-global so the hot paths stay free of
//! plumbing; everything here is a no-op unless [`enable`] ran first,
//! and dump failures are swallowed.

use crate::error::Result;
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;

static SINK: OnceCell<Mutex<File>> = OnceCell::new();

/// Open `path` as the dump sink. Later calls are ignored.
pub fn enable(path: &str) -> Result<()> {
    let file = File::create(path)?;
    let _ = SINK.set(Mutex::new(file));
    Ok(())
}

/// True once a sink is installed.
pub fn enabled() -> bool {
    SINK.get().is_some()
}

/// Dump a labelled matrix stage as tab-separated decimal rows.
pub fn dump_matrix(label: &str, rows: usize, cols: usize, cell: &dyn Fn(usize, usize) -> u8) {
    let Some(sink) = SINK.get() else {
        return;
    };
    let Ok(mut file) = sink.lock() else {
        return;
    };
    let _ = write_matrix(&mut *file, label, rows, cols, cell);
}

fn write_matrix(
    out: &mut dyn Write,
    label: &str,
    rows: usize,
    cols: usize,
    cell: &dyn Fn(usize, usize) -> u8,
) -> io::Result<()> {
    writeln!(out, "{label}")?;
    for row in 0..rows {
        for col in 0..cols {
            write!(out, "\t{}", cell(row, col))?;
        }
        writeln!(out)?;
    }
    writeln!(out)
}
