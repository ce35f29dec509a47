// ==============================================================================
// models.rs - Consensus Data Models
// ==============================================================================
// Description: Lab records, merge accumulators and persisted consensus rows
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Prefix shared by consensus row ids and their annotation rows
pub const CONSENSUS_PREFIX: &str = "consensus_";

/// Annotation text used when no earlier annotation exists
pub const DEFAULT_ANNOTATION: &str = "-";

/// Build the `consensus_<variantId>` id used by both output tables
pub fn consensus_id(variant_id: &str) -> String {
    format!("{}{}", CONSENSUS_PREFIX, variant_id)
}

/// One classification submitted by one lab for one variant
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabRecord {
    /// Lab-qualified id (e.g., "UMCG_chr1_123_A_G")
    pub id: String,

    #[serde(rename = "REF")]
    pub ref_allele: String,

    #[serde(rename = "ALT")]
    pub alt_allele: String,

    /// HGNC gene symbol
    pub gene: String,

    #[serde(rename = "cDNA")]
    pub cdna: String,

    /// Protein change, absent for non-coding variants
    #[serde(default)]
    pub protein: Option<String>,

    #[serde(deserialize_with = "string_or_number")]
    pub chromosome: String,

    #[serde(deserialize_with = "string_or_number")]
    pub stop: String,

    #[serde(rename = "POS", deserialize_with = "string_or_number")]
    pub position: String,

    /// Classification label as submitted (e.g., "Likely benign")
    pub classification: String,
}

/// The data service returns positions as numbers and chromosomes as either
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Category a classification label counts towards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationCategory {
    Benign,
    Pathogenic,
    Uncertain,
}

impl ClassificationCategory {
    /// Unrecognised labels always fold into `Uncertain`
    pub fn from_label(label: &str) -> Self {
        match label {
            "Benign" | "Likely benign" => ClassificationCategory::Benign,
            "Pathogenic" | "Likely pathogenic" => ClassificationCategory::Pathogenic,
            _ => ClassificationCategory::Uncertain,
        }
    }
}

/// Per-variant count of classifications across labs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub benign: u32,
    pub pathogenic: u32,
    pub uncertain: u32,
}

impl Tally {
    pub fn new(benign: u32, pathogenic: u32, uncertain: u32) -> Self {
        Self { benign, pathogenic, uncertain }
    }

    pub fn record(&mut self, category: ClassificationCategory) {
        match category {
            ClassificationCategory::Benign => self.benign += 1,
            ClassificationCategory::Pathogenic => self.pathogenic += 1,
            ClassificationCategory::Uncertain => self.uncertain += 1,
        }
    }
}

/// One lab's contribution to a consensus entry
#[derive(Debug, Clone, PartialEq)]
pub struct LabCall {
    /// Lab name as configured (e.g., "UMCG")
    pub lab: String,
    /// Id of the lab row this call came from
    pub source_id: String,
    /// Classification label as submitted
    pub classification: String,
}

impl LabCall {
    /// Column holding the source row id (e.g., "UMCG_classification")
    pub fn source_column(&self) -> String {
        format!("{}_classification", self.lab)
    }

    /// Column holding the label, named by the lowercased lab (e.g., "umcg")
    pub fn classification_column(&self) -> String {
        self.lab.to_lowercase()
    }
}

/// Merge accumulator for one variant across all labs
///
/// Shared variant attributes are seeded from the first lab record seen for
/// the variant and never overwritten afterwards. Labs are visited in
/// configuration order, so "first seen" means the earliest configured lab
/// that reports the variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusEntry {
    pub variant_id: String,
    pub ref_allele: String,
    pub alt_allele: String,
    pub gene: String,
    pub cdna: String,
    pub protein: String,
    pub chromosome: String,
    pub stop: String,
    pub position: String,
    /// OMIM code resolved from the gene symbol
    pub disease: Option<String>,
    /// Calls in the order labs were processed
    pub lab_calls: Vec<LabCall>,
    /// Transient; dropped when the entry is finalised into a `ConsensusRow`
    pub tally: Tally,
}

impl ConsensusEntry {
    /// Seed a new entry from the first record seen for a variant
    pub fn seed(lab: &str, variant_id: &str, record: &LabRecord, disease: Option<String>) -> Self {
        let mut entry = Self {
            variant_id: variant_id.to_string(),
            ref_allele: record.ref_allele.clone(),
            alt_allele: record.alt_allele.clone(),
            gene: record.gene.clone(),
            cdna: record.cdna.clone(),
            protein: record.protein.clone().unwrap_or_default(),
            chromosome: record.chromosome.clone(),
            stop: record.stop.clone(),
            position: record.position.clone(),
            disease,
            lab_calls: Vec::new(),
            tally: Tally::default(),
        };
        entry.set_lab_call(lab, record);
        entry
    }

    /// Set this lab's fields; a repeated lab replaces its earlier call
    pub fn set_lab_call(&mut self, lab: &str, record: &LabRecord) {
        let call = LabCall {
            lab: lab.to_string(),
            source_id: record.id.clone(),
            classification: record.classification.clone(),
        };

        match self.lab_calls.iter_mut().find(|c| c.lab == lab) {
            Some(existing) => *existing = call,
            None => self.lab_calls.push(call),
        }
    }

    pub fn id(&self) -> String {
        consensus_id(&self.variant_id)
    }
}

/// Persisted form of a consensus entry (no tally)
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusRow {
    pub id: String,
    pub ref_allele: String,
    pub alt_allele: String,
    pub gene: String,
    pub cdna: String,
    pub protein: String,
    pub chromosome: String,
    pub stop: String,
    pub position: String,
    /// Id of the annotation row for this variant
    pub comments: String,
    pub disease: Option<String>,
    pub lab_calls: Vec<LabCall>,
    pub consensus_classification: Option<String>,
}

impl Serialize for ConsensusRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("REF", &self.ref_allele)?;
        map.serialize_entry("ALT", &self.alt_allele)?;
        map.serialize_entry("gene", &self.gene)?;
        map.serialize_entry("cDNA", &self.cdna)?;
        map.serialize_entry("protein", &self.protein)?;
        map.serialize_entry("chromosome", &self.chromosome)?;
        map.serialize_entry("stop", &self.stop)?;
        map.serialize_entry("POS", &self.position)?;
        map.serialize_entry("comments", &self.comments)?;
        if let Some(disease) = &self.disease {
            map.serialize_entry("disease", disease)?;
        }
        for call in &self.lab_calls {
            map.serialize_entry(&call.source_column(), &call.source_id)?;
            map.serialize_entry(&call.classification_column(), &call.classification)?;
        }
        if let Some(label) = &self.consensus_classification {
            map.serialize_entry("consensus_classification", label)?;
        }
        map.end()
    }
}

/// Free-text annotation keyed by the consensus id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub id: String,
    pub comments: String,
}

/// Summary of one refresh cycle, logged as JSON at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub labs: Vec<String>,
    pub consensus_rows_deleted: usize,
    pub annotation_rows_deleted: usize,
    pub consensus_rows_uploaded: usize,
    pub annotations_carried_forward: usize,
    pub annotations_defaulted: usize,
    /// Row count per consensus label ("unclassified" for rows without one)
    pub classifications: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, classification: &str) -> LabRecord {
        serde_json::from_value(json!({
            "id": id,
            "REF": "A",
            "ALT": "G",
            "gene": "BRCA2",
            "cDNA": "c.123A>G",
            "chromosome": 13,
            "stop": 32890600,
            "POS": "32890599",
            "classification": classification,
        }))
        .unwrap()
    }

    #[test]
    fn test_lab_record_normalises_numbers_and_missing_protein() {
        let rec = record("UMCG_13_32890599_A_G", "Benign");
        assert_eq!(rec.chromosome, "13");
        assert_eq!(rec.stop, "32890600");
        assert_eq!(rec.position, "32890599");
        assert_eq!(rec.protein, None);
    }

    #[test]
    fn test_lab_record_rejects_non_scalar_position() {
        let result: Result<LabRecord, _> = serde_json::from_value(json!({
            "id": "x", "REF": "A", "ALT": "G", "gene": "G", "cDNA": "c.1A>G",
            "chromosome": "1", "stop": [1], "POS": "1", "classification": "Benign",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_classification_categories() {
        use ClassificationCategory::*;
        assert_eq!(ClassificationCategory::from_label("Benign"), Benign);
        assert_eq!(ClassificationCategory::from_label("Likely benign"), Benign);
        assert_eq!(ClassificationCategory::from_label("Pathogenic"), Pathogenic);
        assert_eq!(ClassificationCategory::from_label("Likely pathogenic"), Pathogenic);
        assert_eq!(ClassificationCategory::from_label("Uncertain significance"), Uncertain);
        assert_eq!(ClassificationCategory::from_label("benign"), Uncertain); // Case sensitive
        assert_eq!(ClassificationCategory::from_label(""), Uncertain);
    }

    #[test]
    fn test_seed_and_repeat_lab_call() {
        let mut entry = ConsensusEntry::seed("UMCG", "13_1_A_G", &record("UMCG_13_1_A_G", "Benign"), None);
        assert_eq!(entry.protein, "");
        assert_eq!(entry.id(), "consensus_13_1_A_G");
        assert_eq!(entry.tally, Tally::default());

        entry.set_lab_call("UMCG", &record("UMCG_13_1_A_G", "Pathogenic"));
        assert_eq!(entry.lab_calls.len(), 1);
        assert_eq!(entry.lab_calls[0].classification, "Pathogenic");
    }

    #[test]
    fn test_consensus_row_serialization() {
        let row = ConsensusRow {
            id: "consensus_1_100_A_G".to_string(),
            ref_allele: "A".to_string(),
            alt_allele: "G".to_string(),
            gene: "MLH1".to_string(),
            cdna: "c.1A>G".to_string(),
            protein: String::new(),
            chromosome: "1".to_string(),
            stop: "100".to_string(),
            position: "100".to_string(),
            comments: "consensus_1_100_A_G".to_string(),
            disease: None,
            lab_calls: vec![LabCall {
                lab: "AMC".to_string(),
                source_id: "AMC_1_100_A_G".to_string(),
                classification: "Benign".to_string(),
            }],
            consensus_classification: Some("Classified by one lab".to_string()),
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["AMC_classification"], "AMC_1_100_A_G");
        assert_eq!(value["amc"], "Benign");
        assert_eq!(value["POS"], "100");
        assert_eq!(value["consensus_classification"], "Classified by one lab");
        assert!(value.get("disease").is_none());
        assert!(value.get("counter").is_none());
        assert!(value.get("tally").is_none());
    }
}
