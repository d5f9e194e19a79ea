use anyhow::Context;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{PredictionInput, PredictionRecord, RiskLevel};
use crate::slot::Slot;

/// Newest-first prediction history mirrored to a single slot key.
pub struct HistoryStore {
    slot: Box<dyn Slot>,
    key: String,
    records: Vec<PredictionRecord>,
}

impl HistoryStore {
    /// Reads the slot once. Missing, unreadable or malformed contents start an empty history.
    pub async fn load(slot: Box<dyn Slot>, key: impl Into<String>) -> Self {
        let key = key.into();
        let records = match slot.read(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<PredictionRecord>>(&raw) {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "ignoring malformed prediction history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "prediction history unavailable");
                Vec::new()
            }
        };

        tracing::debug!(key = %key, count = records.len(), "loaded prediction history");
        Self { slot, key, records }
    }

    /// Stamps a fresh id and timestamp, prepends the record and rewrites the slot.
    ///
    /// The record stays in memory even when persisting fails.
    pub async fn append(&mut self, input: PredictionInput) -> anyhow::Result<PredictionRecord> {
        let record = PredictionRecord {
            id: Uuid::new_v4().to_string(),
            marks: input.marks,
            attendance: input.attendance,
            feedback: input.feedback,
            risk: input.risk,
            sentiment: input.sentiment,
            reasons: input.reasons,
            created_at: Utc::now(),
        };

        self.records.insert(0, record.clone());
        self.persist().await?;
        Ok(record)
    }

    pub async fn clear(&mut self) -> anyhow::Result<()> {
        self.records.clear();
        self.slot
            .remove(&self.key)
            .await
            .context("failed to clear prediction history")
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter_by_risk(&self, risk: RiskLevel) -> Vec<&PredictionRecord> {
        self.records.iter().filter(|r| r.risk == risk).collect()
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let encoded = serde_json::to_string(&self.records)?;
        self.slot
            .write(&self.key, &encoded)
            .await
            .context("failed to save prediction history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::slot::MemorySlot;
    use std::collections::HashSet;

    const KEY: &str = "test-history";

    fn input(marks: f64, risk: RiskLevel) -> PredictionInput {
        PredictionInput {
            marks,
            attendance: 72.0,
            feedback: "Good performance".to_string(),
            risk,
            sentiment: Sentiment::Positive,
            reasons: vec!["Overall good academic performance".to_string()],
        }
    }

    #[tokio::test]
    async fn append_round_trips_through_the_slot() {
        let slot = MemorySlot::default();
        let mut store = HistoryStore::load(Box::new(slot.clone()), KEY).await;
        let before = Utc::now();
        let record = store.append(input(65.0, RiskLevel::Average)).await.unwrap();

        let reloaded = HistoryStore::load(Box::new(slot), KEY).await;
        assert_eq!(reloaded.len(), 1);
        let stored = &reloaded.records()[0];
        assert_eq!(stored, &record);
        assert_eq!(stored.feedback, "Good performance");
        assert_eq!(stored.risk, RiskLevel::Average);
        assert_eq!(stored.reasons, vec!["Overall good academic performance"]);
        assert!(stored.created_at >= before);
        assert!(!stored.id.is_empty());
    }

    #[tokio::test]
    async fn records_are_newest_first_with_unique_ids() {
        let mut store = HistoryStore::load(Box::new(MemorySlot::default()), KEY).await;
        for marks in [10.0, 20.0, 30.0, 40.0] {
            store.append(input(marks, RiskLevel::Good)).await.unwrap();
        }

        let marks: Vec<f64> = store.records().iter().map(|r| r.marks).collect();
        assert_eq!(marks, vec![40.0, 30.0, 20.0, 10.0]);
        let ids: HashSet<&str> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn clear_removes_the_slot_entirely() {
        let slot = MemorySlot::default();
        let mut store = HistoryStore::load(Box::new(slot.clone()), KEY).await;
        store.append(input(55.0, RiskLevel::AtRisk)).await.unwrap();
        assert!(slot.get(KEY).is_some());

        store.clear().await.unwrap();
        assert!(store.is_empty());
        assert!(slot.get(KEY).is_none());
        assert!(HistoryStore::load(Box::new(slot), KEY).await.is_empty());
    }

    #[tokio::test]
    async fn clear_without_prior_appends_leaves_empty_history() {
        let slot = MemorySlot::default();
        let mut store = HistoryStore::load(Box::new(slot.clone()), KEY).await;
        store.clear().await.unwrap();
        assert!(HistoryStore::load(Box::new(slot), KEY).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_slot_loads_as_empty() {
        let slot = MemorySlot::with_value(KEY, "{not json");
        let store = HistoryStore::load(Box::new(slot), KEY).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unreadable_slot_loads_as_empty() {
        let store = HistoryStore::load(Box::new(MemorySlot::unreadable()), KEY).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_record_in_memory() {
        let mut store = HistoryStore::load(Box::new(MemorySlot::read_only()), KEY).await;
        assert!(store.append(input(70.0, RiskLevel::Good)).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn filter_by_risk_keeps_order() {
        let mut store = HistoryStore::load(Box::new(MemorySlot::default()), KEY).await;
        store.append(input(30.0, RiskLevel::AtRisk)).await.unwrap();
        store.append(input(90.0, RiskLevel::Good)).await.unwrap();
        store.append(input(20.0, RiskLevel::AtRisk)).await.unwrap();

        let at_risk: Vec<f64> = store
            .filter_by_risk(RiskLevel::AtRisk)
            .iter()
            .map(|r| r.marks)
            .collect();
        assert_eq!(at_risk, vec![20.0, 30.0]);
    }
}
