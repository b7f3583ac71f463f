//! Excel export of homogeneous record sequences.

use crate::error::ExportError;
use chrono::{DateTime, Local, TimeZone};
use extractai_extraction::schema::coerce_text;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default export directory, relative to the working directory.
pub const DEFAULT_EXPORT_DIR: &str = "exports";

const RECORDS_SHEET: &str = "records";
const RAW_JSON_SHEET: &str = "raw_json";

/// Writes records to timestamped `.xlsx` files in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSink {
    dir: PathBuf,
    raw_json: bool,
}

impl Default for ExportSink {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_DIR)
    }
}

impl ExportSink {
    /// Exports into `dir`, created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            raw_json: false,
        }
    }

    /// Adds a `raw_json` sheet with one JSON document per record.
    #[must_use]
    pub const fn with_raw_json(mut self, raw_json: bool) -> Self {
        self.raw_json = raw_json;
        self
    }

    /// Export directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<dir>/<prefix>_<YYYYMMDD_HHMMSS>.xlsx`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::EmptyInput` without touching the filesystem when
    /// `records` is empty, otherwise any directory, serialization or workbook
    /// error.
    pub fn export<T: Serialize>(&self, prefix: &str, records: &[T]) -> Result<PathBuf, ExportError> {
        self.export_as(&timestamped_name(prefix, &Local::now()), records)
    }

    /// Writes `<dir>/<file_name>`, adding `.xlsx` if it has no extension.
    ///
    /// # Errors
    ///
    /// Same as [`ExportSink::export`].
    pub fn export_as<T: Serialize>(&self, file_name: &str, records: &[T]) -> Result<PathBuf, ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyInput {
                prefix: file_name.to_string(),
            });
        }

        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let flat: Vec<Map<String, Value>> = rows.iter().map(flatten_record).collect();
        let columns = column_order(&flat);

        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(RECORDS_SHEET)?;
        for (col, name) in (0u16..).zip(&columns) {
            sheet.write_string_with_format(0, col, name, &header)?;
        }
        for (row, record) in (1u32..).zip(&flat) {
            for (col, name) in (0u16..).zip(&columns) {
                let text = record.get(name).map(coerce_text).unwrap_or_default();
                if !text.is_empty() {
                    sheet.write_string(row, col, text)?;
                }
            }
        }

        if self.raw_json {
            let audit = workbook.add_worksheet();
            audit.set_name(RAW_JSON_SHEET)?;
            audit.write_string_with_format(0, 0, "json", &header)?;
            for (row, value) in (1u32..).zip(&rows) {
                audit.write_string(row, 0, serde_json::to_string(value)?)?;
            }
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(with_extension(file_name));
        workbook.save(&path)?;

        tracing::info!(path = %path.display(), records = records.len(), "exported records");
        Ok(path)
    }
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.xlsx` for the given instant.
#[must_use]
pub fn timestamped_name<Tz: TimeZone>(prefix: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}

fn with_extension(file_name: &str) -> String {
    if Path::new(file_name).extension().is_some() {
        file_name.to_string()
    } else {
        format!("{file_name}.xlsx")
    }
}

/// Flattens nested objects into `parent.child` keys, preserving field order.
#[must_use]
pub fn flatten_record(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    match value {
        Value::Object(object) => flatten_into(&mut flat, None, object),
        other => {
            flat.insert("value".to_string(), other.clone());
        }
    }
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, parent: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let name = parent.map_or_else(|| key.clone(), |p| format!("{p}.{key}"));
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(flat, Some(&name), child),
            other => {
                flat.insert(name, other.clone());
            }
        }
    }
}

fn column_order(records: &[Map<String, Value>]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Reader};
    use chrono::NaiveDate;
    use extractai_extraction::{HouseInfo, LandInfo};
    use serde_json::json;

    #[test]
    fn test_timestamped_name() {
        let at = NaiveDate::from_ymd_opt(2024, 8, 18)
            .and_then(|d| d.and_hms_opt(9, 5, 7))
            .unwrap()
            .and_utc();
        assert_eq!(timestamped_name("地块清单", &at), "地块清单_20240818_090507.xlsx");
    }

    #[test]
    fn test_flatten_nested() {
        let flat = flatten_record(&json!({"a": 1, "b": {"c": "x", "d": {"e": null}}, "f": [1, 2], "g": {}}));
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b.c", "b.d.e", "f", "g"]);
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let sink = ExportSink::new(&target);

        let err = sink.export::<LandInfo>("地块清单", &[]).unwrap_err();
        assert!(matches!(err, ExportError::EmptyInput { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn test_export_writes_columns_in_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(dir.path().join("out")).with_raw_json(true);
        let records = vec![
            HouseInfo {
                detailed_address: "长沙市岳麓区梅溪湖壹号3栋1802".to_string(),
                estate_name: "梅溪湖壹号".to_string(),
                room: "1802".to_string(),
                ..HouseInfo::default()
            },
            HouseInfo {
                estate_name: "洋湖壹号".to_string(),
                ..HouseInfo::default()
            },
        ];

        let path = sink.export("解析清单", &records).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("解析清单_") && name.ends_with(".xlsx"));

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![RECORDS_SHEET.to_string(), RAW_JSON_SHEET.to_string()]);
        let range = workbook.worksheet_range(RECORDS_SHEET).unwrap();
        let header: Vec<String> = range.rows().next().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(
            header,
            vec!["详细地址", "城市名称", "区域名称", "宗地坐落", "楼盘名称", "楼栋名称", "房号名称"]
        );
        assert_eq!(range.height(), 3);
        assert_eq!(range.get_value((2, 4)).map(ToString::to_string).as_deref(), Some("洋湖壹号"));
    }

    #[test]
    fn test_export_as_keeps_given_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(dir.path());
        let path = sink.export_as("报告", &[json!({"report_number": "HB-1"})]).unwrap();
        assert_eq!(path, dir.path().join("报告.xlsx"));
        assert!(path.exists());
    }
}
