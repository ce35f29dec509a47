// ==============================================================================
// lib.rs - VKGL Consensus Library
// ==============================================================================
// Description: Library interface for the cross-lab consensus refresh job
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod models;
pub mod store;
pub mod molgenis;
pub mod disease;
pub mod config;
pub mod aggregator;
pub mod classifier;
pub mod refresher;
