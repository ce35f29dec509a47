// ==============================================================================
// refresher.rs - Consensus Snapshot Refresh
// ==============================================================================
// Description: Clears the previous consensus snapshot and uploads a new one
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Sequence:
//   1. Clear   - collect old consensus ids and annotations, delete both tables
//   2. Compute - aggregate all labs and classify every variant
//   3. Upload  - annotations first, then consensus rows
// A failure at any step aborts the run; the job is rerun from scratch.
// ==============================================================================

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::classifier::classify_all;
use crate::config::TableNames;
use crate::disease::DiseaseLookup;
use crate::models::{AnnotationRow, ConsensusRow, RefreshReport, CONSENSUS_PREFIX, DEFAULT_ANNOTATION};
use crate::store::{encode_row, page_offsets, Row, TableStore, BATCH_SIZE, PAGE_SIZE};

/// State collected from the previous snapshot before it is deleted
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClearedSnapshot {
    /// Ids of the deleted consensus rows
    pub consensus_ids: Vec<String>,
    /// Disease code per old consensus id, for rows that had one
    pub old_diseases: HashMap<String, String>,
    /// Ids of the deleted annotation rows
    pub annotation_ids: Vec<String>,
    /// Annotation text per consensus id, carried into the new snapshot
    pub carried_annotations: HashMap<String, String>,
}

/// Outcome of the upload step
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub annotations_carried_forward: usize,
    pub annotations_defaulted: usize,
    pub consensus_rows_uploaded: usize,
}

/// Annotation rows for a new snapshot, reusing carried-forward text by id
pub fn build_annotations(
    rows: &[ConsensusRow],
    carried: &HashMap<String, String>,
) -> (Vec<AnnotationRow>, usize) {
    let mut reused = 0;
    let annotations = rows
        .iter()
        .map(|row| {
            let comments = match carried.get(&row.id) {
                Some(text) => {
                    reused += 1;
                    text.clone()
                }
                None => DEFAULT_ANNOTATION.to_string(),
            };
            AnnotationRow {
                id: row.id.clone(),
                comments,
            }
        })
        .collect();

    (annotations, reused)
}

/// Orchestrates a full clear / compute / upload cycle
pub struct SnapshotRefresher<'a, S: TableStore + ?Sized> {
    store: &'a S,
    tables: TableNames,
    labs: Vec<String>,
    diseases: &'a DiseaseLookup,
}

impl<'a, S: TableStore + ?Sized> SnapshotRefresher<'a, S> {
    pub fn new(store: &'a S, tables: TableNames, labs: Vec<String>, diseases: &'a DiseaseLookup) -> Self {
        Self {
            store,
            tables,
            labs,
            diseases,
        }
    }

    /// Run the whole cycle
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let started_at = Utc::now();
        info!("Started consensus refresh for labs: {}", self.labs.join(", "));

        let cleared = self.clear().await?;
        let rows = self.compute().await?;
        let summary = self.upload(&rows, &cleared.carried_annotations).await?;

        let mut classifications = BTreeMap::new();
        for row in &rows {
            let label = row.consensus_classification.as_deref().unwrap_or("unclassified");
            *classifications.entry(label.to_string()).or_insert(0) += 1;
        }

        Ok(RefreshReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            labs: self.labs.clone(),
            consensus_rows_deleted: cleared.consensus_ids.len(),
            annotation_rows_deleted: cleared.annotation_ids.len(),
            consensus_rows_uploaded: summary.consensus_rows_uploaded,
            annotations_carried_forward: summary.annotations_carried_forward,
            annotations_defaulted: summary.annotations_defaulted,
            classifications,
        })
    }

    /// Step 1: collect and delete the previous snapshot
    pub async fn clear(&self) -> Result<ClearedSnapshot> {
        let mut cleared = ClearedSnapshot::default();

        self.collect_consensus(&mut cleared).await?;
        delete_in_batches(self.store, &self.tables.consensus(), &cleared.consensus_ids).await?;

        self.collect_annotations(&mut cleared).await?;
        delete_in_batches(self.store, &self.tables.comments(), &cleared.annotation_ids).await?;

        info!(
            "Done cleaning: {} consensus rows, {} annotations ({} carried forward)",
            cleared.consensus_ids.len(),
            cleared.annotation_ids.len(),
            cleared.carried_annotations.len()
        );
        Ok(cleared)
    }

    /// Step 2: aggregate every lab and classify each variant
    pub async fn compute(&self) -> Result<Vec<ConsensusRow>> {
        let merged = Aggregator::new(self.store, &self.tables, self.diseases)
            .aggregate(&self.labs)
            .await?;
        Ok(classify_all(merged))
    }

    /// Step 3: upload annotations, then consensus rows
    pub async fn upload(&self, rows: &[ConsensusRow], carried: &HashMap<String, String>) -> Result<UploadSummary> {
        let (annotations, reused) = build_annotations(rows, carried);

        insert_in_batches(self.store, &self.tables.comments(), &annotations).await?;
        info!("Comments uploaded ({} carried forward)", reused);

        insert_in_batches(self.store, &self.tables.consensus(), rows).await?;
        info!("Consensus uploaded ({} rows)", rows.len());

        Ok(UploadSummary {
            annotations_carried_forward: reused,
            annotations_defaulted: annotations.len() - reused,
            consensus_rows_uploaded: rows.len(),
        })
    }

    async fn collect_consensus(&self, cleared: &mut ClearedSnapshot) -> Result<()> {
        let table = self.tables.consensus();
        let total = self
            .store
            .count(&table)
            .await
            .with_context(|| format!("Failed to count rows of {}", table))?;

        if total > 0 {
            info!("Clearing consensus ({} rows)", total);
        }

        for offset in page_offsets(total, PAGE_SIZE) {
            for row in self.read_page(&table, offset).await? {
                let Some(id) = row_id(&row) else { continue };
                if let Some(code) = disease_code(&row) {
                    cleared.old_diseases.insert(id.clone(), code);
                }
                cleared.consensus_ids.push(id);
            }
        }

        Ok(())
    }

    async fn collect_annotations(&self, cleared: &mut ClearedSnapshot) -> Result<()> {
        let table = self.tables.comments();
        let total = self
            .store
            .count(&table)
            .await
            .with_context(|| format!("Failed to count rows of {}", table))?;

        if total > 0 {
            info!("Clearing comments ({} rows)", total);
        }

        for offset in page_offsets(total, PAGE_SIZE) {
            debug!("Processing {} to {} of {}", offset, offset + PAGE_SIZE, total);
            for row in self.read_page(&table, offset).await? {
                // Annotations of other tables share this one; leave them alone
                let Some(id) = row_id(&row).filter(|id| id.starts_with(CONSENSUS_PREFIX)) else {
                    continue;
                };
                if let Some(text) = row.get("comments").and_then(|v| v.as_str()) {
                    cleared.carried_annotations.insert(id.clone(), text.to_string());
                }
                cleared.annotation_ids.push(id);
            }
        }

        Ok(())
    }

    async fn read_page(&self, table: &str, offset: usize) -> Result<Vec<Row>> {
        self.store
            .read_page(table, PAGE_SIZE, offset)
            .await
            .with_context(|| format!("Failed to read {} at offset {}", table, offset))
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(|v| v.as_str()).map(str::to_string)
}

/// Disease reference of a consensus row: an expanded reference or a bare code
fn disease_code(row: &Row) -> Option<String> {
    match row.get("disease")? {
        serde_json::Value::String(code) => Some(code.clone()),
        serde_json::Value::Object(reference) => reference
            .get("mim_number")
            .or_else(|| reference.get("id"))
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        _ => None,
    }
}

/// Delete ids in chunks of `BATCH_SIZE`; an empty set issues no call
async fn delete_in_batches<S: TableStore + ?Sized>(store: &S, table: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let chunks = ids.len().div_ceil(BATCH_SIZE);
    info!("Deleting {} rows from {}", ids.len(), table);
    for (i, chunk) in ids.chunks(BATCH_SIZE).enumerate() {
        debug!("Deleting chunk {} of {}", i + 1, chunks);
        store
            .delete_batch(table, chunk)
            .await
            .with_context(|| format!("Failed to delete chunk {} of {} from {}", i + 1, chunks, table))?;
    }

    Ok(())
}

/// Insert rows in chunks of `BATCH_SIZE`
async fn insert_in_batches<S, T>(store: &S, table: &str, items: &[T]) -> Result<()>
where
    S: TableStore + ?Sized,
    T: Serialize,
{
    let chunks = items.len().div_ceil(BATCH_SIZE);
    for (i, chunk) in items.chunks(BATCH_SIZE).enumerate() {
        let rows = chunk
            .iter()
            .map(|item| encode_row(table, item))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Uploading chunk {} of {} to {}", i + 1, chunks, table);
        store
            .insert_batch(table, &rows)
            .await
            .with_context(|| format!("Failed to upload chunk {} of {} to {}", i + 1, chunks, table))?;
    }

    Ok(())
}
