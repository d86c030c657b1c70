//! Parsing for the Shift_JIS CSV exports of the Mynavi portals.

use std::{collections::HashSet, path::Path};

use encoding_rs::SHIFT_JIS;
use scout_domain::RawRecord;

use crate::Result;

/// Reads an export, deletes the file, and returns one record per data row.
///
/// When `id_column` is set only rows whose id is in `wanted` are kept.
pub async fn consume_export(
	path: &Path,
	id_column: Option<usize>,
	wanted: &[String],
) -> Result<Vec<RawRecord>> {
	let bytes = tokio::fs::read(path).await;
	let removed = tokio::fs::remove_file(path).await;

	if let Err(err) = removed {
		tracing::warn!(path = %path.display(), error = %err, "Failed to delete export file.");
	}

	parse_export(&bytes?, id_column, wanted)
}

pub fn parse_export(
	bytes: &[u8],
	id_column: Option<usize>,
	wanted: &[String],
) -> Result<Vec<RawRecord>> {
	let (text, _, had_errors) = SHIFT_JIS.decode(bytes);

	if had_errors {
		tracing::warn!("Export contained bytes that are not valid Shift_JIS.");
	}

	let wanted = wanted.iter().map(|id| id.trim()).collect::<HashSet<_>>();
	let mut reader =
		csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(text.as_bytes());
	let mut out = Vec::new();

	for row in reader.records() {
		let row = row?;
		let fields = row.iter().map(|field| field.trim().to_string()).collect::<Vec<_>>();
		let external_id = id_column
			.and_then(|column| fields.get(column))
			.filter(|id| !id.is_empty())
			.cloned();

		if id_column.is_some() && !wanted.is_empty() {
			match external_id.as_deref() {
				Some(id) if wanted.contains(id) => {},
				_ => continue,
			}
		}

		out.push(RawRecord { external_id, fields });
	}

	Ok(out)
}
