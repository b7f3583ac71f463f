//! Human-readable run summary.

use crate::errors::CliError;
use crate::pipeline::RunOutcome;
use std::io::Write;
use std::path::PathBuf;

/// Prints the summary, then surfaces the export result.
///
/// The counts and every failure are written even when the export failed, so
/// a run with zero records still reports why each row was lost.
///
/// # Errors
///
/// Returns the export error (typically `ExportError::EmptyInput`) after the
/// summary is written, or an I/O error from `out`.
pub fn finish(outcome: RunOutcome, out: &mut impl Write) -> Result<PathBuf, CliError> {
    for (label, value) in &outcome.headline {
        writeln!(out, "{label}: {value}")?;
    }
    writeln!(
        out,
        "处理完成：成功 {} 条，失败 {} 条",
        outcome.success_count,
        outcome.failures.len()
    )?;
    for failure in &outcome.failures {
        writeln!(out, "  第{}条失败：{}", failure.index, failure.error)?;
    }

    let path = outcome.export?;
    writeln!(out, "结果已导出：{}", path.display())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractai_extraction::RowFailure;
    use extractai_io::ExportError;

    #[test]
    fn test_summary_precedes_empty_export_error() {
        let outcome = RunOutcome {
            success_count: 0,
            failures: vec![RowFailure {
                index: 2,
                input_text: "公告".to_string(),
                error: "[kimi] inference timed out after 20s".to_string(),
                primary_error: None,
            }],
            headline: Vec::new(),
            export: Err(ExportError::EmptyInput {
                prefix: "地块清单".to_string(),
            }),
        };

        let mut out = Vec::new();
        let err = finish(outcome, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Export(ExportError::EmptyInput { .. })));

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("成功 0 条，失败 1 条"));
        assert!(printed.contains("第2条失败：[kimi] inference timed out after 20s"));
        assert!(!printed.contains("结果已导出"));
    }

    #[test]
    fn test_summary_with_headline_and_path() {
        let outcome = RunOutcome {
            success_count: 1,
            failures: Vec::new(),
            headline: vec![("报告编号", "HB-2024-001".to_string())],
            export: Ok(PathBuf::from("exports/报告.xlsx")),
        };
        let mut out = Vec::new();
        let path = finish(outcome, &mut out).unwrap();
        assert_eq!(path, PathBuf::from("exports/报告.xlsx"));
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("报告编号: HB-2024-001\n"));
        assert!(printed.ends_with("结果已导出：exports/报告.xlsx\n"));
    }
}
