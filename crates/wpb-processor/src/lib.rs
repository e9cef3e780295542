//! # wpb-processor
//!
//! The Z→ℓℓ control-region processor. One [`ZToLLProcessor`] turns an
//! [`wpb_columnar::EventBatch`] into a [`ChunkOutput`]:
//!
//! 1. select good leptons of the configured channel and good b jets;
//! 2. correct jet energies and MET (simulation);
//! 3. fill the weight ledger (simulation);
//! 4. compute dilepton variables and register the selection masks;
//! 5. account the cutflow of the channel's region;
//! 6. extract the features of the events passing the region.
//!
//! Chunk outputs combine with [`ChunkOutput::merge`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod output;
pub mod processor;
pub mod selection;
pub mod variables;

pub use config::{
    ElectronSelection, JetSelection, LeptonFlavor, MetFilterLists, MetFilterTable, MuonSelection,
    ProcessorConfig, TriggerTable, ZToLLSelectionConfig,
};
pub use output::{ChunkOutput, FeatureTable, RunMetadata, WeightStatisticsTable};
pub use processor::ZToLLProcessor;
pub use selection::{select_good_bjets, select_good_electrons, select_good_muons};
pub use variables::{DileptonVariables, Lepton};
