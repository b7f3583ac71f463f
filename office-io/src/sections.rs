//! Locating the parts of an appraisal report worth sending to a model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opening line of the cover letter to the client.
pub const LETTER_START: &str = "致估价委托人函";
/// Heading that follows the cover letter.
pub const LETTER_END: &str = "目录";
/// Title of the summary table of appraised assets.
pub const BASIC_INFO_TITLE: &str = "估价对象基本情况一览表";

static TITLE_NOISE: Lazy<Regex> = Lazy::new(|| static_regex(r"[\s：:，,（(）)\[\]【】]+"));
static ATX_HEADING: Lazy<Regex> = Lazy::new(|| static_regex(r"^(#{1,6})\s+(.*?)\s*#*\s*$"));
static SETEXT_RULE: Lazy<Regex> = Lazy::new(|| static_regex(r"^\s*-{3,}\s*$"));

// Patterns are literals exercised by this module's tests.
#[allow(clippy::expect_used)]
fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid static regex")
}

/// Which part of a report is extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportSection {
    /// All text read from the document.
    #[default]
    Full,
    /// The cover letter, from [`LETTER_START`] up to [`LETTER_END`].
    Letter,
    /// The [`BASIC_INFO_TITLE`] line and the table below it.
    BasicInfo,
}

impl ReportSection {
    /// Name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Letter => "letter",
            Self::BasicInfo => "basic-info",
        }
    }

    /// Selects this section from `text`; `None` if it is not present.
    #[must_use]
    pub fn select(self, text: &str) -> Option<String> {
        match self {
            Self::Full => Some(text.to_string()),
            Self::Letter => letter_section(text).map(str::to_string),
            Self::BasicInfo => title_with_table(text, BASIC_INFO_TITLE),
        }
    }
}

/// Text from the first [`LETTER_START`] up to the next [`LETTER_END`] after it.
///
/// Runs to the end of the text when no end marker follows.
#[must_use]
pub fn letter_section(text: &str) -> Option<&str> {
    slice_between(text, LETTER_START, LETTER_END)
}

/// Text from `start` (inclusive) to the next `end` after it (exclusive).
#[must_use]
pub fn slice_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)?;
    let rest = &text[from..];
    let until = rest[start.len()..]
        .find(end)
        .map_or(rest.len(), |i| i + start.len());
    let section = rest[..until].trim();
    (!section.is_empty()).then_some(section)
}

fn is_table_row(line: &str) -> bool {
    let line = line.trim();
    (line.starts_with('|') && line.matches('|').count() >= 2) || line.contains(" | ")
}

/// The line equal to `title` plus the table rows directly below it.
///
/// Blank lines and a setext `---` rule between the title and the table are
/// skipped. Returns just the title when no table follows.
#[must_use]
pub fn title_with_table(text: &str, title: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let title_at = lines.iter().position(|line| line.trim() == title)?;

    let skip_blank = |mut i: usize| {
        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }
        i
    };
    let mut i = skip_blank(title_at + 1);
    if i < lines.len() && SETEXT_RULE.is_match(lines[i]) {
        i = skip_blank(i + 1);
    }

    let table: Vec<&str> = lines[i.min(lines.len())..]
        .iter()
        .take_while(|line| is_table_row(line))
        .copied()
        .collect();

    let mut out = vec![lines[title_at].trim()];
    out.extend(table);
    Some(out.join("\n"))
}

/// Lower-cases a title and drops whitespace and common punctuation.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    TITLE_NOISE.replace_all(&title.trim().to_lowercase(), "").into_owned()
}

/// A heading and the body text up to the next heading of any level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading level, 1 for `#`.
    pub level: usize,
    /// Heading text without the leading `#`s.
    pub title: String,
    /// Body text, trimmed.
    pub content: String,
}

/// Splits markdown into sections at ATX (`#`) headings.
///
/// Text before the first heading is not part of any section.
#[must_use]
pub fn sectionize(markdown: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if let Some(caps) = ATX_HEADING.captures(line) {
            close(&mut sections, &mut body);
            sections.push(Section {
                level: caps[1].len(),
                title: caps[2].trim().to_string(),
                content: String::new(),
            });
        } else if !sections.is_empty() {
            body.push(line);
        }
    }
    close(&mut sections, &mut body);
    sections
}

fn close(sections: &mut [Section], body: &mut Vec<&str>) {
    if let Some(last) = sections.last_mut() {
        last.content = body.join("\n").trim().to_string();
    }
    body.clear();
}

/// Groups sections under business keys by title synonym.
///
/// A normalized title equal to a normalized synonym wins; otherwise the first
/// synonym contained in the title is used. Unmatched sections are dropped.
#[must_use]
pub fn bucket_by_targets<'a>(
    sections: &'a [Section],
    targets: &[(&str, &[&str])],
) -> BTreeMap<String, Vec<&'a Section>> {
    let synonyms: Vec<(String, &str)> = targets
        .iter()
        .flat_map(|(key, syns)| syns.iter().map(move |s| (normalize_title(s), *key)))
        .filter(|(syn, _)| !syn.is_empty())
        .collect();

    let mut buckets: BTreeMap<String, Vec<&Section>> = BTreeMap::new();
    for section in sections {
        let title = normalize_title(&section.title);
        let hit = synonyms
            .iter()
            .find(|(syn, _)| *syn == title)
            .or_else(|| synonyms.iter().find(|(syn, _)| title.contains(syn.as_str())));
        if let Some((_, key)) = hit {
            buckets.entry((*key).to_string()).or_default().push(section);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "房地产估价报告\n估价报告编号：湘华信估字[2024]第0815号\n\
        致估价委托人函\n某某资产管理有限公司：\n承蒙委托，我公司对位于长沙市的住宅进行了估价。\n\
        目录\n一、估价师声明\n\
        估价对象基本情况一览表\n\n产权人 | 坐落 | 总价\n李四 | 岳麓区 | 320万元\n\n注：以上数据仅供参考。";

    #[test]
    fn test_static_patterns_compile() {
        for pattern in [&TITLE_NOISE, &ATX_HEADING, &SETEXT_RULE] {
            assert!(!Lazy::force(pattern).as_str().is_empty());
        }
    }

    #[test]
    fn test_letter_section() {
        let letter = letter_section(REPORT).unwrap();
        assert!(letter.starts_with("致估价委托人函"));
        assert!(letter.ends_with("进行了估价。"));
        assert!(!letter.contains("目录"));
    }

    #[test]
    fn test_letter_without_end_runs_to_end() {
        assert_eq!(letter_section("前言\n致估价委托人函\n正文"), Some("致估价委托人函\n正文"));
        assert_eq!(letter_section("没有函件"), None);
    }

    #[test]
    fn test_title_with_table() {
        let table = title_with_table(REPORT, BASIC_INFO_TITLE).unwrap();
        assert_eq!(table, "估价对象基本情况一览表\n产权人 | 坐落 | 总价\n李四 | 岳麓区 | 320万元");

        let md = "汇总\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n后文";
        assert_eq!(title_with_table(md, "汇总").unwrap(), "汇总\n| a | b |\n|---|---|\n| 1 | 2 |");
        assert_eq!(title_with_table("汇总\n正文", "汇总").unwrap(), "汇总");
        assert_eq!(title_with_table("正文", "汇总"), None);
    }

    #[test]
    fn test_report_section_select() {
        assert_eq!(ReportSection::Full.select("x").as_deref(), Some("x"));
        assert!(ReportSection::Letter.select(REPORT).is_some());
        assert!(ReportSection::BasicInfo.select("无表格").is_none());
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title(" 估价结果（一）： "), "估价结果一");
        assert_eq!(normalize_title("Part 【A】, Notes"), "partanotes");
    }

    #[test]
    fn test_sectionize_and_bucket() {
        let md = "前言\n# 估价师声明\n声明内容\n## 估价结果（一）\n结果一\n## 其他说明\n无\n# 附件：估价结果明细\n明细";
        let sections = sectionize(md);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["估价师声明", "估价结果（一）", "其他说明", "附件：估价结果明细"]);
        assert_eq!(sections[1].content, "结果一");
        assert_eq!(sections[1].level, 2);

        const RESULT: &[&str] = &["估价结果"];
        const STATEMENT: &[&str] = &["估价师声明"];
        let buckets = bucket_by_targets(&sections, &[("result", RESULT), ("statement", STATEMENT)]);
        assert_eq!(buckets["statement"].len(), 1);
        let results: Vec<&str> = buckets["result"].iter().map(|s| s.title.as_str()).collect();
        assert_eq!(results, vec!["估价结果（一）", "附件：估价结果明细"]);
        assert!(!buckets.contains_key("other"));
    }
}
