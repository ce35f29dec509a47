// ==============================================================================
// aggregator.rs - Cross-Lab Variant Aggregation
// ==============================================================================
// Description: Merges every lab's classifications into one entry per variant
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::TableNames;
use crate::disease::DiseaseLookup;
use crate::models::{ClassificationCategory, ConsensusEntry, LabRecord};
use crate::store::{page_offsets, Row, StoreError, TableStore, PAGE_SIZE};

/// Variant identity of a lab row: its id without the `<lab>_` prefix
///
/// Ids that do not carry the prefix are used unchanged.
pub fn variant_identity<'a>(lab: &str, record_id: &'a str) -> &'a str {
    record_id
        .strip_prefix(lab)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(record_id)
}

/// Variant identity -> merge accumulator, in first-seen order
#[derive(Debug, Default)]
pub struct MergeMap {
    entries: Vec<ConsensusEntry>,
    index: HashMap<String, usize>,
}

impl MergeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one lab record into the map
    ///
    /// The first record for a variant seeds the shared attributes; later
    /// records only add their lab's call. Every record counts towards the tally.
    pub fn merge(&mut self, lab: &str, record: &LabRecord, diseases: &DiseaseLookup) {
        let variant_id = variant_identity(lab, &record.id);
        if variant_id == record.id {
            debug!("Row {} of {} has no lab prefix, using full id", record.id, lab);
        }

        let slot = match self.index.get(variant_id) {
            Some(&slot) => {
                self.entries[slot].set_lab_call(lab, record);
                slot
            }
            None => {
                let disease = diseases.lookup(&record.gene).map(str::to_string);
                self.entries.push(ConsensusEntry::seed(lab, variant_id, record, disease));
                self.index.insert(variant_id.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        self.entries[slot]
            .tally
            .record(ClassificationCategory::from_label(&record.classification));
    }

    pub fn get(&self, variant_id: &str) -> Option<&ConsensusEntry> {
        self.index.get(variant_id).map(|&slot| &self.entries[slot])
    }

    pub fn entries(&self) -> &[ConsensusEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ConsensusEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads every lab table page by page and builds the merge map
pub struct Aggregator<'a, S: TableStore + ?Sized> {
    store: &'a S,
    tables: &'a TableNames,
    diseases: &'a DiseaseLookup,
}

impl<'a, S: TableStore + ?Sized> Aggregator<'a, S> {
    pub fn new(store: &'a S, tables: &'a TableNames, diseases: &'a DiseaseLookup) -> Self {
        Self { store, tables, diseases }
    }

    /// Merge all labs, in the given order
    pub async fn aggregate(&self, labs: &[String]) -> Result<MergeMap> {
        let mut merged = MergeMap::new();

        for lab in labs {
            self.process_lab(lab, &mut merged).await?;
        }

        info!("Aggregated {} distinct variants from {} labs", merged.len(), labs.len());
        Ok(merged)
    }

    async fn process_lab(&self, lab: &str, merged: &mut MergeMap) -> Result<()> {
        let table = self.tables.lab(lab);
        info!("Processing data of {}", lab);

        let total = self
            .store
            .count(&table)
            .await
            .with_context(|| format!("Failed to count rows of {}", table))?;

        for offset in page_offsets(total, PAGE_SIZE) {
            debug!("Processing {} to {} of {}", offset, offset + PAGE_SIZE, total);
            let page = self
                .store
                .read_page(&table, PAGE_SIZE, offset)
                .await
                .with_context(|| format!("Failed to read {} at offset {}", table, offset))?;

            for row in page {
                let record = decode_lab_record(&table, row)?;
                merged.merge(lab, &record, self.diseases);
            }
        }

        info!("Read {} rows from {}", total, table);
        Ok(())
    }
}

fn decode_lab_record(table: &str, row: Row) -> Result<LabRecord, StoreError> {
    serde_json::from_value(serde_json::Value::Object(row)).map_err(|source| StoreError::Decode {
        table: table.to_string(),
        source,
    })
}
