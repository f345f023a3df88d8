// `econfab inspect` - preview files without building anything

use std::path::PathBuf;

use econfab_config::Settings;
use econfab_io::TableParser;
use econfab_pipeline::{ingest_paths, switch_sheet, UploadedFile};
use serde_json::json;

use crate::{warn_dropped, CliError};

/// Cells wider than this are cut in the text table.
const MAX_CELL_WIDTH: usize = 24;

pub async fn cmd_inspect(
    files: Vec<PathBuf>,
    sheet: Option<String>,
    rows: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let preview_rows = match rows {
        Some(0) => return Err(CliError::usage("--rows must be at least 1")),
        Some(n) => n,
        None => settings.preview_rows,
    };
    let parser = TableParser::new(preview_rows);

    let mut report = ingest_paths(parser, &files).await;
    warn_dropped(&report);
    if report.is_empty() {
        return Err(CliError::nothing_ingested(&report));
    }

    if let Some(sheet) = &sheet {
        apply_sheet(parser, &mut report.files, sheet).await?;
    }

    if json {
        let out: Vec<serde_json::Value> = report.files.iter().map(file_json).collect();
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else {
        for (i, file) in report.files.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_file(file);
        }
    }
    Ok(())
}

/// Switch every file that has `sheet` to it. Fails if no file has it.
pub async fn apply_sheet(parser: TableParser, files: &mut [UploadedFile], sheet: &str) -> Result<(), CliError> {
    let mut matched = false;
    for file in files.iter_mut() {
        if !file.raw.has_sheet(sheet) {
            continue;
        }
        *file = switch_sheet(parser, file, sheet).await.map_err(|e| CliError::parse(e.to_string()))?;
        matched = true;
    }
    if matched {
        Ok(())
    } else {
        Err(CliError::usage(format!("no input file has a sheet named '{}'", sheet))
            .with_hint("run `econfab inspect` to list the sheets of each file"))
    }
}

fn file_json(file: &UploadedFile) -> serde_json::Value {
    let preview = &file.parsed.preview;
    let rows: Vec<Vec<&str>> = preview
        .rows()
        .iter()
        .map(|row| row.iter().map(|c| c.as_str()).collect())
        .collect();
    json!({
        "file": file.name(),
        "kind": file.raw.kind().to_string(),
        "sheets": file.parsed.sheet_names,
        "activeSheet": file.active_sheet(),
        "headers": preview.headers(),
        "rows": rows,
        "totalRows": preview.total_rows(),
    })
}

fn print_file(file: &UploadedFile) {
    let preview = &file.parsed.preview;
    println!("{}", file.name());
    if file.parsed.is_multi_sheet() {
        println!("  sheets: {} (showing '{}')", file.parsed.sheet_names.join(", "), file.active_sheet());
    }
    println!("  {} rows x {} columns", preview.total_rows(), preview.headers().len());
    println!();

    let headers: Vec<String> = preview.headers().iter().map(|h| clip(h)).collect();
    let body: Vec<Vec<String>> = preview
        .rows()
        .iter()
        .map(|row| row.iter().map(|c| clip(c.as_str())).collect())
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            body.iter()
                .filter_map(|row| row.get(col))
                .chain(std::iter::once(&headers[col]))
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!("  {}", pad_row(&headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("  {}", rule.join("  "));
    for row in &body {
        println!("  {}", pad_row(row, &widths));
    }
    let hidden = preview.total_rows().saturating_sub(preview.rows().len());
    if hidden > 0 {
        println!("  ... {} more rows", hidden);
    }
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
        out.push('…');
        out
    }
}
