//! Folding reconciled extractions into an appraisal report summary.

use crate::raw::RawExtraction;
use crate::records::ValuationTarget;
use crate::schema::coerce_text;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extraction class of one appraised asset.
pub const ASSET_CLASS: &str = "asset";

const REPORT_NUMBER_KEYS: &[&str] = &["report_number", "报告编号", "编号"];
const REPORT_DATE_KEYS: &[&str] = &["report_date", "报告时间", "时间"];
const BANK_KEYS: &[&str] = &["bank", "银行"];
const CLIENT_KEYS: &[&str] = &["client", "委托人", "委托单位"];
const OWNER_KEYS: &[&str] = &["owner", "产权人", "权利人"];
const ASSET_TYPE_KEYS: &[&str] = &["asset_type", "标的物类型", "类型"];
const TOTAL_PRICE_KEYS: &[&str] = &["total_price", "标的物总价", "总价", "总金额"];

/// One appraised asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Holder of the property right.
    pub owner: String,
    /// Kind of asset, such as a dwelling or a parking space.
    pub asset_type: String,
    /// Appraised total price as written in the report.
    pub total_price: String,
}

/// Header facts and assets of one appraisal report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationReport {
    /// Report number printed on the cover.
    pub report_number: String,
    /// Date the report was issued.
    pub report_date: String,
    /// Lending bank the appraisal was made for.
    pub bank: String,
    /// Party that commissioned the appraisal.
    pub client: String,
    /// Appraised assets in document order.
    pub assets: Vec<AssetInfo>,
}

impl ValuationReport {
    /// Builds a report from extractions in document order.
    ///
    /// Header fields keep the first non-empty value found. Attribute lookup
    /// tries each synonym key in turn and falls back to the extraction text.
    /// Classes are matched case-insensitively; unknown classes are ignored.
    #[must_use]
    pub fn from_extractions(extractions: &[RawExtraction]) -> Self {
        let mut report = Self::default();

        for extraction in extractions {
            let Some(label) = extraction.class_label() else {
                continue;
            };
            let text = extraction.text.trim();
            let attributes = &extraction.attributes;

            let (slot, keys) = match label.to_lowercase().as_str() {
                ASSET_CLASS => {
                    report.assets.push(AssetInfo {
                        owner: lookup(attributes, OWNER_KEYS, ""),
                        asset_type: lookup(attributes, ASSET_TYPE_KEYS, text),
                        total_price: lookup(attributes, TOTAL_PRICE_KEYS, ""),
                    });
                    continue;
                }
                "report_number" => (&mut report.report_number, REPORT_NUMBER_KEYS),
                "report_date" => (&mut report.report_date, REPORT_DATE_KEYS),
                "bank" => (&mut report.bank, BANK_KEYS),
                "client" => (&mut report.client, CLIENT_KEYS),
                other => {
                    tracing::debug!(class = other, "ignoring extraction class");
                    continue;
                }
            };

            if slot.is_empty() {
                *slot = lookup(attributes, keys, text);
            }
        }

        report
    }

    /// One export row per asset, or a single row with blank asset columns.
    #[must_use]
    pub fn to_targets(&self) -> Vec<ValuationTarget> {
        let base = ValuationTarget {
            report_number: self.report_number.clone(),
            report_date: self.report_date.clone(),
            bank: self.bank.clone(),
            client: self.client.clone(),
            ..ValuationTarget::default()
        };

        if self.assets.is_empty() {
            return vec![base];
        }

        self.assets
            .iter()
            .map(|asset| ValuationTarget {
                asset_owner: asset.owner.clone(),
                asset_type: asset.asset_type.clone(),
                asset_total_price: asset.total_price.clone(),
                ..base.clone()
            })
            .collect()
    }
}

fn lookup(attributes: &Map<String, Value>, keys: &[&str], fallback: &str) -> String {
    keys.iter()
        .filter_map(|key| attributes.get(*key))
        .map(|value| coerce_text(value).trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.trim().to_string())
}
