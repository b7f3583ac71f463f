//! Target records extracted from land auctions, collateral addresses and
//! appraisal reports.

use crate::schema::{FieldReader, RecordSchema, RowRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spreadsheet column with the full announcement text.
pub const FULL_TEXT_COLUMN: &str = "全文";
/// Spreadsheet column with the announcement's source URL.
pub const SOURCE_URL_COLUMN: &str = "当前网页URL";
/// Spreadsheet column with a collateral's free-form address.
pub const DETAILED_ADDRESS_COLUMN: &str = "详细地址";

/// One land parcel from a land-transfer announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LandInfo {
    /// Source page URL, copied from the input row.
    #[serde(rename = "网址", default)]
    pub url: String,
    /// Parcel id.
    #[serde(rename = "宗地编号")]
    pub parcel_id: String,
    /// Total area, in square metres.
    #[serde(rename = "宗地总面积", default)]
    pub total_area: String,
    /// Parcel location.
    #[serde(rename = "宗地坐落", default)]
    pub location: String,
    /// Land-use term, in years.
    #[serde(rename = "使用年限", default)]
    pub tenure_years: String,
    /// Floor area ratio.
    #[serde(rename = "容积率", default)]
    pub floor_area_ratio: String,
    /// Building density.
    #[serde(rename = "建筑密度", default)]
    pub building_density: String,
    /// Green space ratio.
    #[serde(rename = "绿化率", default)]
    pub green_ratio: String,
    /// Building height limit.
    #[serde(rename = "建筑限高", default)]
    pub height_limit: String,
    /// Permitted land use.
    #[serde(rename = "土地用途", default)]
    pub land_use: String,
    /// Starting price, in units of 10k yuan.
    #[serde(rename = "起始价", default)]
    pub starting_price: String,
    /// Bid deposit, in units of 10k yuan.
    #[serde(rename = "竞买保证金", default)]
    pub bid_deposit: String,
    /// Bid increment, in units of 10k yuan.
    #[serde(rename = "加价幅度", default)]
    pub bid_increment: String,
    /// Appraisal report filing number.
    #[serde(rename = "估价报告备案号", default)]
    pub appraisal_filing_no: String,
}

impl RecordSchema for LandInfo {
    const NAME: &'static str = "LandInfo";
    const REQUIRED: &'static [&'static str] = &["宗地编号"];

    fn from_fields(fields: &FieldReader<'_>) -> Self {
        Self {
            url: fields.text("网址"),
            parcel_id: fields.text("宗地编号"),
            total_area: fields.text("宗地总面积"),
            location: fields.text("宗地坐落"),
            tenure_years: fields.text("使用年限"),
            floor_area_ratio: fields.text("容积率"),
            building_density: fields.text("建筑密度"),
            green_ratio: fields.text("绿化率"),
            height_limit: fields.text("建筑限高"),
            land_use: fields.text("土地用途"),
            starting_price: fields.text("起始价"),
            bid_deposit: fields.text("竞买保证金"),
            bid_increment: fields.text("加价幅度"),
            appraisal_filing_no: fields.text("估价报告备案号"),
        }
    }
}

impl RowRecord for LandInfo {
    const INPUT_COLUMN: &'static str = FULL_TEXT_COLUMN;
    const METADATA_COLUMNS: &'static [&'static str] = &[SOURCE_URL_COLUMN];

    fn attach_metadata(&mut self, _source_text: &str, metadata: &BTreeMap<String, String>) {
        if let Some(url) = metadata.get(SOURCE_URL_COLUMN) {
            self.url.clone_from(url);
        }
    }
}

/// A collateral address normalised into its components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HouseInfo {
    /// Original address text, copied from the input row.
    #[serde(rename = "详细地址", default)]
    pub detailed_address: String,
    /// City, e.g. 长沙市.
    #[serde(rename = "城市名称", default)]
    pub city: String,
    /// District within the city.
    #[serde(rename = "区域名称", default)]
    pub district: String,
    /// Road or parcel location below the district.
    #[serde(rename = "宗地坐落", default)]
    pub parcel_location: String,
    /// Estate (residential compound) name.
    #[serde(rename = "楼盘名称")]
    pub estate_name: String,
    /// Building within the estate.
    #[serde(rename = "楼栋名称", default)]
    pub building: String,
    /// Room or unit number.
    #[serde(rename = "房号名称", default)]
    pub room: String,
}

impl RecordSchema for HouseInfo {
    const NAME: &'static str = "HouseInfo";
    const REQUIRED: &'static [&'static str] = &["楼盘名称"];

    fn from_fields(fields: &FieldReader<'_>) -> Self {
        Self {
            detailed_address: fields.text("详细地址"),
            city: fields.text("城市名称"),
            district: fields.text("区域名称"),
            parcel_location: fields.text("宗地坐落"),
            estate_name: fields.text("楼盘名称"),
            building: fields.text("楼栋名称"),
            room: fields.text("房号名称"),
        }
    }
}

impl RowRecord for HouseInfo {
    const INPUT_COLUMN: &'static str = DETAILED_ADDRESS_COLUMN;

    fn attach_metadata(&mut self, source_text: &str, _metadata: &BTreeMap<String, String>) {
        self.detailed_address = source_text.to_string();
    }
}

/// One appraised asset of a valuation report, with the report's header facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValuationTarget {
    /// Report number, repeated on every asset row.
    pub report_number: String,
    /// Report date.
    pub report_date: String,
    /// Lending bank.
    pub bank: String,
    /// Commissioning client.
    pub client: String,
    /// Owner of this asset.
    pub asset_owner: String,
    /// Kind of this asset.
    pub asset_type: String,
    /// Appraised total price of this asset.
    pub asset_total_price: String,
}

impl RecordSchema for ValuationTarget {
    const NAME: &'static str = "ValuationTarget";
    const REQUIRED: &'static [&'static str] = &[];

    fn from_fields(fields: &FieldReader<'_>) -> Self {
        Self {
            report_number: fields.text("report_number"),
            report_date: fields.text("report_date"),
            bank: fields.text("bank"),
            client: fields.text("client"),
            asset_owner: fields.text("asset_owner"),
            asset_type: fields.text("asset_type"),
            asset_total_price: fields.text("asset_total_price"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::parse_record;

    #[test]
    fn test_land_info_lenient_parse() {
        let raw = "<think>\n这是一则土地出让公告。\n</think>\n```json\n{\"宗地编号\": \"长土2024-017\", \"宗地总面积\": 35210.4, \"使用年限\": 70, \"土地用途\": null}\n```";
        let land: LandInfo = parse_record(raw).unwrap();
        assert_eq!(land.parcel_id, "长土2024-017");
        assert_eq!(land.total_area, "35210.4");
        assert_eq!(land.tenure_years, "70");
        assert_eq!(land.land_use, "");
        assert_eq!(land.url, "");
    }

    #[test]
    fn test_land_info_requires_parcel_id() {
        let err = parse_record::<LandInfo>("{\"宗地编号\": \"  \", \"宗地坐落\": \"岳麓区\"}").unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingRequiredField {
                record: "LandInfo",
                field: "宗地编号"
            }
        );
    }

    #[test]
    fn test_array_payload_is_invalid_json() {
        let err = parse_record::<LandInfo>("[{\"宗地编号\": \"A\"}]").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson { .. }));
    }

    #[test]
    fn test_parse_is_idempotent_over_serialization() {
        let land: LandInfo = parse_record(
            "{\"宗地编号\": \"A-1\", \"容积率\": \"≤2.5\", \"起始价\": 12800, \"网址\": \"http://x\"}",
        )
        .unwrap();
        let again: LandInfo = parse_record(&serde_json::to_string(&land).unwrap()).unwrap();
        assert_eq!(land, again);

        let house: HouseInfo = parse_record("{\"楼盘名称\": \"梅溪湖壹号\", \"房号名称\": 1802}").unwrap();
        let again: HouseInfo = parse_record(&serde_json::to_string(&house).unwrap()).unwrap();
        assert_eq!(house, again);
    }

    #[test]
    fn test_metadata_attachment() {
        let mut land = LandInfo::default();
        let metadata = BTreeMap::from([(SOURCE_URL_COLUMN.to_string(), "http://gtj.example/1".to_string())]);
        land.attach_metadata("全文", &metadata);
        assert_eq!(land.url, "http://gtj.example/1");

        let mut house = HouseInfo::default();
        house.attach_metadata("长沙市岳麓区梅溪湖壹号3栋1802", &BTreeMap::new());
        assert_eq!(house.detailed_address, "长沙市岳麓区梅溪湖壹号3栋1802");
    }

    #[test]
    fn test_required_columns() {
        assert_eq!(LandInfo::required_columns(), vec!["全文", "当前网页URL"]);
        assert_eq!(HouseInfo::required_columns(), vec!["详细地址"]);
    }

    #[test]
    fn test_schema_marks_required_field() {
        let schema = LandInfo::schema_json();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "宗地编号"));
        assert!(schema["properties"].get("宗地坐落").is_some());
    }
}
