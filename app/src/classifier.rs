// ==============================================================================
// classifier.rs - Consensus Classification
// ==============================================================================
// Description: Derives the consensus label from a per-variant tally
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use crate::aggregator::MergeMap;
use crate::models::{consensus_id, ConsensusEntry, ConsensusRow, Tally};

pub const OPPOSITE_CLASSIFICATION: &str = "Opposite classification";
pub const NO_CONSENSUS: &str = "No consensus";
pub const CLASSIFIED_BY_ONE_LAB: &str = "Classified by one lab";

/// Consensus label for a tally, evaluated as an ordered decision list
///
/// 1. only benign-like calls, more than one     -> "(Likely) benign (b)"
/// 2. only pathogenic-like calls, more than one -> "(Likely) pathogenic (p)"
/// 3. only uncertain calls, more than one       -> "VUS(v)"
/// 4. benign-like and pathogenic-like calls     -> "Opposite classification"
/// 5. uncertain mixed with either of the above  -> "No consensus"
/// 6. a single call                             -> "Classified by one lab"
///
/// An all-zero tally matches nothing and yields `None`; the row is then
/// stored without a consensus label.
pub fn classify(tally: &Tally) -> Option<String> {
    let Tally { benign: b, pathogenic: p, uncertain: v } = *tally;

    if b > 1 && p == 0 && v == 0 {
        Some(format!("(Likely) benign ({})", b))
    } else if b == 0 && p > 1 && v == 0 {
        Some(format!("(Likely) pathogenic ({})", p))
    } else if b == 0 && p == 0 && v > 1 {
        Some(format!("VUS({})", v))
    } else if b > 0 && p > 0 {
        Some(OPPOSITE_CLASSIFICATION.to_string())
    } else if (b > 0 && v > 0) || (p > 0 && v > 0) {
        Some(NO_CONSENSUS.to_string())
    } else if matches!((b, p, v), (1, 0, 0) | (0, 1, 0) | (0, 0, 1)) {
        Some(CLASSIFIED_BY_ONE_LAB.to_string())
    } else {
        None
    }
}

/// Classify an entry and drop its tally
pub fn finalize(entry: ConsensusEntry) -> ConsensusRow {
    let consensus_classification = classify(&entry.tally);
    let id = consensus_id(&entry.variant_id);

    ConsensusRow {
        comments: id.clone(),
        id,
        ref_allele: entry.ref_allele,
        alt_allele: entry.alt_allele,
        gene: entry.gene,
        cdna: entry.cdna,
        protein: entry.protein,
        chromosome: entry.chromosome,
        stop: entry.stop,
        position: entry.position,
        disease: entry.disease,
        lab_calls: entry.lab_calls,
        consensus_classification,
    }
}

/// Finalise every entry of a merge map, keeping first-seen order
pub fn classify_all(merged: MergeMap) -> Vec<ConsensusRow> {
    merged.into_entries().into_iter().map(finalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(b: u32, p: u32, v: u32) -> Option<String> {
        classify(&Tally::new(b, p, v))
    }

    #[test]
    fn test_agreeing_labs_embed_count() {
        assert_eq!(label(2, 0, 0).as_deref(), Some("(Likely) benign (2)"));
        assert_eq!(label(5, 0, 0).as_deref(), Some("(Likely) benign (5)"));
        assert_eq!(label(0, 2, 0).as_deref(), Some("(Likely) pathogenic (2)"));
        assert_eq!(label(0, 0, 3).as_deref(), Some("VUS(3)"));
    }

    #[test]
    fn test_single_lab() {
        for (b, p, v) in [(1, 0, 0), (0, 1, 0), (0, 0, 1)] {
            assert_eq!(label(b, p, v).as_deref(), Some(CLASSIFIED_BY_ONE_LAB));
        }
    }

    #[test]
    fn test_opposite_beats_no_consensus() {
        assert_eq!(label(1, 1, 0).as_deref(), Some(OPPOSITE_CLASSIFICATION));
        assert_eq!(label(3, 1, 0).as_deref(), Some(OPPOSITE_CLASSIFICATION));
        // Uncertain calls present as well: rule 4 still wins
        assert_eq!(label(1, 1, 1).as_deref(), Some(OPPOSITE_CLASSIFICATION));
        assert_eq!(label(2, 2, 4).as_deref(), Some(OPPOSITE_CLASSIFICATION));
    }

    #[test]
    fn test_no_consensus() {
        assert_eq!(label(1, 0, 1).as_deref(), Some(NO_CONSENSUS));
        assert_eq!(label(0, 2, 1).as_deref(), Some(NO_CONSENSUS));
        assert_eq!(label(3, 0, 2).as_deref(), Some(NO_CONSENSUS));
    }

    #[test]
    fn test_empty_tally_has_no_label() {
        assert_eq!(label(0, 0, 0), None);
    }
}
