use crate::types::StatsRecord;

#[derive(Debug)]
pub struct RunSummary {
    pub with_data: usize,
    pub missing: usize,
    pub total: usize,
}

impl RunSummary {
    pub fn from_records(records: &[StatsRecord]) -> RunSummary {
        let with_data = records.iter().filter(|r| r.data.is_some()).count();
        RunSummary {
            with_data,
            missing: records.len() - with_data,
            total: records.len(),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Bulletins with data: {}", self.with_data)?;
        writeln!(f, "  Bulletins missing:   {}", self.missing)?;
        writeln!(f, "  Total:               {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BulletinReference, ExtractionResult};

    fn record(day: u32, with_data: bool) -> StatsRecord {
        StatsRecord {
            data: with_data.then(|| ExtractionResult {
                count: 100.0,
                count_date: format!("1月{day}日"),
                positive_percent: "5%".to_string(),
                positive_percent_date: format!("1月{day}日"),
            }),
            post: BulletinReference {
                title: format!("第{day}期"),
                date: format!("2023-01-{day:02}"),
                link: format!("https://www.chinacdc.cn/{day}.html"),
            },
        }
    }

    #[test]
    fn test_run_summary_counts() {
        let records = vec![record(29, true), record(22, false), record(15, true)];

        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_data, 2);
        assert_eq!(summary.missing, 1);
        assert!(summary.to_string().contains("Bulletins missing:   1"));
    }
}
