//! Spreadsheet input: header validation and row extraction.

use crate::error::ConfigurationError;
use calamine::{open_workbook_auto, Data, Reader};
use extractai_extraction::{InputRow, RowRecord};
use std::collections::BTreeMap;
use std::path::Path;

/// Loads the rows a record type needs from the first worksheet.
///
/// # Errors
///
/// See [`load_rows`].
pub fn load_rows_for<T: RowRecord>(path: &Path) -> Result<Vec<InputRow>, ConfigurationError> {
    load_rows(path, T::INPUT_COLUMN, T::METADATA_COLUMNS)
}

/// Reads `input_column` and `metadata_columns` from the first worksheet.
///
/// The first row is the header. Row indices are 1-based and count every data
/// row. Rows with a blank input cell are kept so the run can report them.
///
/// # Errors
///
/// Returns `ConfigurationError::Unreadable` if the workbook cannot be opened,
/// `NoWorksheet` if it is empty and `MissingColumns` listing every absent
/// column.
pub fn load_rows(
    path: &Path,
    input_column: &str,
    metadata_columns: &[&str],
) -> Result<Vec<InputRow>, ConfigurationError> {
    let unreadable = |reason: String| ConfigurationError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConfigurationError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(|e| unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();

    let position = |name: &str| header.iter().position(|h| h == name);
    let missing: Vec<String> = std::iter::once(input_column)
        .chain(metadata_columns.iter().copied())
        .filter(|name| position(name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ConfigurationError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let input_at = position(input_column).unwrap_or_default();
    let metadata_at: Vec<(&str, usize)> = metadata_columns
        .iter()
        .filter_map(|name| position(name).map(|i| (*name, i)))
        .collect();

    let mut loaded = Vec::new();
    for (offset, cells) in rows.enumerate() {
        let index = offset + 1;
        let text = cells.get(input_at).map(cell_text).unwrap_or_default();
        if text.trim().is_empty() {
            tracing::debug!(index, column = input_column, "row has blank input");
        }

        let metadata: BTreeMap<String, String> = metadata_at
            .iter()
            .map(|(name, i)| ((*name).to_string(), cells.get(*i).map(cell_text).unwrap_or_default()))
            .collect();
        loaded.push(InputRow { index, text, metadata });
    }

    tracing::info!(path = %path.display(), rows = loaded.len(), "loaded input rows");
    Ok(loaded)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractai_extraction::{HouseInfo, LandInfo};
    use rust_xlsxwriter::Workbook;

    fn write_sheet(path: &Path, rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet
                        .write_string(u32::try_from(r).unwrap(), u16::try_from(c).unwrap(), *value)
                        .unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_load_land_rows_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("land.xlsx");
        write_sheet(
            &path,
            &[
                &["标题", "全文", "当前网页URL"],
                &["a", "宗地编号：长土2024-017", "http://gtj.example/1"],
                &["b", "", "http://gtj.example/2"],
                &["c", "宗地编号：长土2024-018", "http://gtj.example/3"],
            ],
        );

        let rows = load_rows_for::<LandInfo>(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].metadata["当前网页URL"], "http://gtj.example/1");
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].text, "");
        assert_eq!(rows[1].metadata["当前网页URL"], "http://gtj.example/2");
        assert_eq!(rows[2].index, 3);
        assert_eq!(rows[2].text, "宗地编号：长土2024-018");
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        write_sheet(&path, &[&["全文"], &["正文"]]);

        match load_rows_for::<LandInfo>(&path) {
            Err(ConfigurationError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["当前网页URL".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = load_rows_for::<HouseInfo>(&path).unwrap_err();
        assert!(err.to_string().contains("详细地址"));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        assert!(matches!(
            load_rows_for::<HouseInfo>(&path),
            Err(ConfigurationError::Unreadable { .. })
        ));
    }
}
