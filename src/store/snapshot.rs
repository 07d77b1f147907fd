//! JSON snapshot export of everything in the store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{FundStore, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub funds: usize,
    pub combined_path: PathBuf,
    pub per_fund_dir: PathBuf,
}

impl FundStore {
    /// Writes a combined `all_funds.json` plus one file per fund under
    /// `funds/`. Files are flat JSON so downstream tooling can diff them.
    pub async fn export_snapshot(&self, snapshot_dir: &Path) -> Result<SnapshotReport, StoreError> {
        let per_fund_dir = snapshot_dir.join("funds");
        fs::create_dir_all(&per_fund_dir).map_err(StoreError::Snapshot)?;

        let mut records = Vec::new();
        for fund_id in self.fund_ids().await? {
            if let Some(record) = self.get(fund_id).await? {
                records.push(record);
            }
        }

        let combined_path = snapshot_dir.join("all_funds.json");
        let combined = serde_json::to_string_pretty(&records).map_err(StoreError::Serialize)?;
        fs::write(&combined_path, combined).map_err(StoreError::Snapshot)?;

        for record in &records {
            let file_name = format!("{}_{}.json", record.id, slugify(&record.name));
            let body = serde_json::to_string_pretty(record).map_err(StoreError::Serialize)?;
            fs::write(per_fund_dir.join(file_name), body).map_err(StoreError::Snapshot)?;
        }

        Ok(SnapshotReport {
            funds: records.len(),
            combined_path,
            per_fund_dir,
        })
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FaqEntry, FundFact, FundRecord};

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Parag Parikh Flexi Cap"), "parag-parikh-flexi-cap");
        assert_eq!(slugify("SBI Contra (Direct)"), "sbi-contra-direct");
    }

    #[tokio::test]
    async fn snapshot_writes_combined_and_per_fund_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FundStore::new(tmp.path().join("funds.db")).await.unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        store
            .upsert(&FundRecord {
                id: 0,
                name: "Axis Bluechip".to_string(),
                source_url: "https://x/1".to_string(),
                scraped_at: now.clone(),
                facts: vec![FundFact {
                    id: 0,
                    name: "expense_ratio".to_string(),
                    value: "0.6%".to_string(),
                    source_url: "https://x/1".to_string(),
                    extracted_at: now,
                }],
                holdings: vec![],
                peers: vec![],
                faqs: vec![FaqEntry {
                    id: 0,
                    fund_id: 0,
                    question: "Is there an exit load?".to_string(),
                    answer: "1% within 12 months".to_string(),
                    source_url: "https://x/1".to_string(),
                }],
            })
            .await
            .unwrap();

        let report = store
            .export_snapshot(&tmp.path().join("snapshots"))
            .await
            .unwrap();
        assert_eq!(report.funds, 1);

        let combined = std::fs::read_to_string(&report.combined_path).unwrap();
        assert!(combined.contains("Axis Bluechip"));
        assert!(combined.contains("https://x/1"));

        let per_fund: Vec<_> = std::fs::read_dir(&report.per_fund_dir)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(per_fund.len(), 1);
        let name = per_fund[0].file_name().to_string_lossy().to_string();
        assert!(name.ends_with("_axis-bluechip.json"));
    }
}
