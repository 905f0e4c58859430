use std::fmt::Display;

use serde::{Deserialize, Serialize, Serializer};

/// One entry of the bulletin list page. Identity is the link.
///
/// `date` is the `YYYY-MM-DD` text found next to the entry, kept as matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinReference {
    pub title: String,
    pub date: String,
    pub link: String,
}

impl Display for BulletinReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} <{}>", self.date, self.title, self.link)
    }
}

/// Statistics disclosed by a single bulletin paragraph.
///
/// Dates are kept as the matched `MM月DD日` / `YYYY年MM月DD日` text and are
/// never calendar-validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(serialize_with = "serialize_count")]
    pub count: f64,
    pub count_date: String,
    pub positive_percent: String,
    pub positive_percent_date: String,
}

impl Display for ExtractionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Count:    {} ({})", self.count, self.count_date)?;
        write!(
            f,
            "Positive: {} ({})",
            self.positive_percent, self.positive_percent_date
        )
    }
}

/// Integral counts are written as JSON integers, everything else as floats.
fn serialize_count<S: Serializer>(count: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if count.fract() == 0.0 && *count >= 0.0 && *count <= u64::MAX as f64 {
        serializer.serialize_u64(*count as u64)
    } else {
        serializer.serialize_f64(*count)
    }
}

/// One output record per processed bulletin, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractionResult>,
    pub post: BulletinReference,
}

impl Display for StatsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(data) => write!(
                f,
                "{} count={} ({}) positive={} ({})",
                self.post.date,
                data.count,
                data.count_date,
                data.positive_percent,
                data.positive_percent_date
            ),
            None => write!(f, "{} no statistics found", self.post.date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> BulletinReference {
        BulletinReference {
            title: "全国新型冠状病毒感染疫情情况".to_string(),
            date: "2023-01-25".to_string(),
            link: "https://www.chinacdc.cn/jkzt/crb/zl/szkb_11803/jszl_13141/202301/t20230125_263519.html"
                .to_string(),
        }
    }

    #[test]
    fn test_record_without_data_omits_key() {
        let record = StatsRecord {
            data: None,
            post: post(),
        };

        let json = serde_json::to_value(&record).expect("Failed to serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["post"]["date"], "2023-01-25");
    }

    #[test]
    fn test_record_with_data_uses_camel_case_and_integral_count() {
        let record = StatsRecord {
            data: Some(ExtractionResult {
                count: 35000.0,
                count_date: "10月5日".to_string(),
                positive_percent: "20.5%".to_string(),
                positive_percent_date: "10月6日".to_string(),
            }),
            post: post(),
        };

        let json = serde_json::to_string(&record).expect("Failed to serialize");
        assert!(json.contains(r#""count":35000,"#), "got {json}");
        assert!(json.contains(r#""countDate":"10月5日""#));
        assert!(json.contains(r#""positivePercent":"20.5%""#));
        assert!(json.contains(r#""positivePercentDate":"10月6日""#));
    }

    #[test]
    fn test_fractional_count_stays_float() {
        let result = ExtractionResult {
            count: 12.5,
            count_date: "1月1日".to_string(),
            positive_percent: "1%".to_string(),
            positive_percent_date: "1月2日".to_string(),
        };

        let json = serde_json::to_value(&result).expect("Failed to serialize");
        assert_eq!(json["count"].as_f64(), Some(12.5));
    }
}
