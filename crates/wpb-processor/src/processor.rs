//! The Z→ℓℓ control-region processor.

use std::collections::BTreeMap;

use wpb_columnar::event::{Jet, Met};
use wpb_columnar::{Cutflow, EventBatch, Jagged, Selection, Weights, delta_r_mask, normalize};
use wpb_core::{Error, Result};
use wpb_corrections::{
    BTagCorrector, ElectronCorrector, IsoWp, JesShift, JetCorrector, MuonCorrector, MuonWp, SfType,
    add_l1prefiring_weight, add_pileup_weight, add_pujetid_weight, met_phi_correction,
    propagate_jet_corrections,
};

use crate::config::{LeptonFlavor, MetFilterLists, ProcessorConfig};
use crate::output::{ChunkOutput, FeatureTable, RunMetadata};
use crate::selection::{BJetCuts, ElectronCuts, MuonCuts};
use crate::variables::{DileptonVariables, Lepton};

/// b jets closer than this to a selected lepton are not counted.
const BJET_LEPTON_DR: f64 = 0.4;
const MLL_WINDOW: (f64, f64) = (60.0, 120.0);
const MTH_MAX: f64 = 60.0;

/// Event selection, correction and feature extraction for one Z→ℓℓ channel.
///
/// All configuration is validated by [`ZToLLProcessor::new`]. Processing
/// keeps no state between chunks, so one processor can be shared across
/// threads.
pub struct ZToLLProcessor {
    config: ProcessorConfig,
    electron_cuts: ElectronCuts,
    muon_cuts: MuonCuts,
    bjet_cuts: BJetCuts,
    trigger_ele: Vec<String>,
    trigger_mu: Vec<String>,
    met_filters: MetFilterLists,
}

impl ZToLLProcessor {
    /// Validate `config` and build the processor.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        let period = config.period;
        let sel = &config.selection;
        let electron_cuts =
            ElectronCuts::new(sel.electron.pt_threshold, &sel.electron.id_wp, sel.electron.iso_wp.as_deref())?;
        let muon_cuts = MuonCuts::new(sel.muon.pt_threshold, &sel.muon.id_wp, &sel.muon.iso_wp)?;
        let bjet_cuts = BJetCuts::new(
            period,
            sel.jet.pt_threshold,
            &sel.jet.jet_id,
            &sel.jet.pileup_id,
            &sel.jet.btag_wp,
        )?;
        config.btag_sf_type.parse::<SfType>()?;

        if config.lepton_flavor == LeptonFlavor::Mu {
            muon_cuts.iso.muon_iso_key(muon_cuts.id)?;
            if muon_cuts.id != MuonWp::Tight || muon_cuts.iso != IsoWp::Tight {
                return Err(Error::Configuration(format!(
                    "the muon channel applies trigger scale factors, which require tight ID and \
                     tight isolation (got '{}' ID, '{}' isolation)",
                    sel.muon.id_wp, sel.muon.iso_wp
                )));
            }
        }

        let trigger_ele = config.triggers.paths(period, "ele")?.to_vec();
        let trigger_mu = config.triggers.paths(period, "mu")?.to_vec();
        let met_filters = config.met_filters.lists(period)?.clone();
        log::debug!("configured {config:?}");

        Ok(Self { config, electron_cuts, muon_cuts, bjet_cuts, trigger_ele, trigger_mu, met_filters })
    }

    /// The validated configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one chunk.
    pub fn process(&self, events: &EventBatch) -> Result<ChunkOutput> {
        events.validate()?;
        let n = events.n_events();
        let is_mc = events.is_mc();
        log::debug!(
            "processing {n} events of '{}' ({})",
            events.dataset,
            if is_mc { "simulation" } else { "data" }
        );

        // Object selection.
        let leptons: Jagged<Lepton> = match self.config.lepton_flavor {
            LeptonFlavor::Ele => {
                let mask = self.electron_cuts.mask(&events.electrons);
                events.electrons.filter(&mask)?.map(|e| Lepton::from(e))
            }
            LeptonFlavor::Mu => {
                let mask = self.muon_cuts.mask(&events.muons);
                events.muons.filter(&mask)?.map(|m| Lepton::from(m))
            }
        };

        // Kinematic corrections.
        let (jets, met) = self.correct_jets_and_met(events)?;
        let good_bjets = self.bjet_cuts.mask(&jets).and(&delta_r_mask(&jets, &leptons, BJET_LEPTON_DR)?)?;
        let n_bjets = good_bjets.count_true();
        log::debug!("object selection: {} leptons, {} b jets", leptons.n_objects(), n_bjets.iter().sum::<usize>());

        // Weights.
        let mut weights = Weights::new(n);
        if is_mc {
            self.add_weights(events, &jets, &mut weights)?;
        }
        let weight = weights.weight(None)?;
        let sumw: f64 = weight.iter().sum();

        // Variables.
        let vars = DileptonVariables::compute(&leptons, &met)?;
        let nvtx: Vec<f64> = events.npvs_good.iter().map(|&v| f64::from(v)).collect();

        // Masks.
        let mut selection = Selection::new(n);
        let lumi = if is_mc {
            vec![true; n]
        } else {
            self.config.lumi_mask.mask(&events.run, &events.luminosity_block)
        };
        selection.add("lumi", lumi)?;
        selection.add("trigger_ele", any_of(&events.hlt, &self.trigger_ele, n))?;
        selection.add("trigger_mu", any_of(&events.hlt, &self.trigger_mu, n))?;
        let filters = if is_mc { &self.met_filters.mc } else { &self.met_filters.data };
        selection.add("metfilters", all_of(&events.flags, filters, n))?;
        selection.add("goodvertex", events.npvs_good.iter().map(|&v| v > 0).collect())?;
        selection.add("two_leptons", leptons.counts().iter().map(|&c| c == 2).collect())?;
        selection.add("neutral", vars.charge_product.iter().map(|q| q.is_some_and(|q| q < 0)).collect())?;
        selection.add(
            "mass_range",
            vars.mll.iter().map(|m| m.is_some_and(|m| MLL_WINDOW.0 < m && m < MLL_WINDOW.1)).collect(),
        )?;
        selection.add("bjet_veto", n_bjets.iter().map(|&c| c == 0).collect())?;
        selection.add("mthlt60", vars.mth.iter().map(|m| m.is_some_and(|m| m < MTH_MAX)).collect())?;
        for (name, product) in [("ee", -11 * 11), ("mumu", -13 * 13), ("emu", -11 * 13)] {
            selection.add(name, vars.pdg_id_product.iter().map(|&p| p == product).collect())?;
        }

        // Cutflow.
        let cuts = self.config.lepton_flavor.region();
        let cutflow = Cutflow::compute(&selection, &weight, &cuts)?;
        let region = selection.all(&cuts)?;
        let events_after = region.iter().filter(|&&r| r).count();
        log::debug!("region '{}': {events_after}/{n} events selected", self.config.lepton_flavor);

        // Features.
        let pick = |values: &[Option<f64>]| -> Vec<f64> {
            let kept: Vec<Option<f64>> =
                values.iter().zip(&region).filter(|(_, r)| **r).map(|(v, _)| *v).collect();
            normalize(&kept)
        };
        let pick_dense = |values: &[f64]| -> Vec<f64> {
            values.iter().zip(&region).filter(|(_, r)| **r).map(|(v, _)| *v).collect()
        };
        let mut arrays = FeatureTable::new();
        arrays.insert("ptl1", pick(&vars.ptl1))?;
        arrays.insert("ptl2", pick(&vars.ptl2))?;
        arrays.insert("ptll", pick(&vars.ptll))?;
        arrays.insert("mll", pick(&vars.mll))?;
        arrays.insert("dphill", pick(&vars.dphill))?;
        arrays.insert("drll", pick(&vars.drll))?;
        arrays.insert("mth", pick(&vars.mth))?;
        arrays.insert("nvtx", pick_dense(&nvtx))?;
        arrays.insert("weights", pick_dense(&weight))?;

        let metadata = RunMetadata {
            sumw,
            weight_statistics: weights.weight_statistics().into_iter().collect(),
            cutflow,
            events_before: n as u64,
            events_after: events_after as u64,
        };
        Ok(ChunkOutput { metadata, arrays })
    }

    /// Corrected jets and MET: jet energy corrections with type-1 propagation
    /// for simulation, then the MET φ correction.
    fn correct_jets_and_met(&self, events: &EventBatch) -> Result<(Jagged<Jet>, Vec<Met>)> {
        let period = self.config.period;
        let is_mc = events.is_mc();
        let (jets, met) = if is_mc {
            let shift = JesShift::from_variation(self.config.variation.as_str());
            let jets = JetCorrector::new(self.config.scale_factors.as_ref(), period).correct(events, shift)?;
            let met = propagate_jet_corrections(&events.met, &events.jets, &jets)?;
            (jets, met)
        } else {
            (events.jets.clone(), events.met.clone())
        };
        let met = met_phi_correction(&met, &events.npvs_good, period, is_mc)?;
        Ok((jets, met))
    }

    /// Fill the ledger of a simulated chunk.
    ///
    /// Lepton scale factors cover every reconstructed lepton of the channel's
    /// flavour, not only the selected ones. The pileup jet-ID weight is looked
    /// up with the jet `pileup_id` working point, the one the jet selection
    /// applies.
    fn add_weights(&self, events: &EventBatch, jets: &Jagged<Jet>, weights: &mut Weights) -> Result<()> {
        let period = self.config.period;
        let variation = &self.config.variation;
        let service = self.config.scale_factors.as_ref();
        let jet_sel = &self.config.selection.jet;

        let gen_weight = events
            .gen_weight
            .clone()
            .ok_or_else(|| Error::Configuration("simulated chunk without generator weights".into()))?;
        weights.add("genweight", gen_weight, None, None)?;
        add_l1prefiring_weight(events, weights, period, variation)?;
        add_pileup_weight(events, weights, service, period, variation)?;
        add_pujetid_weight(jets, weights, service, period, &jet_sel.pileup_id, variation)?;
        BTagCorrector::new(jets, weights, service, &self.config.btag_sf_type, &jet_sel.btag_wp, period, variation)?
            .add_btag_weights("bc")?;

        match self.config.lepton_flavor {
            LeptonFlavor::Ele => {
                let mut corrector = ElectronCorrector::new(&events.electrons, weights, service, period, variation);
                corrector.add_id_weight(&self.config.selection.electron.id_wp)?;
                corrector.add_reco_weight()?;
            }
            LeptonFlavor::Mu => {
                let muon = &self.config.selection.muon;
                let mut corrector =
                    MuonCorrector::new(&events.muons, weights, service, period, variation, &muon.id_wp, &muon.iso_wp)?;
                corrector.add_id_weight()?;
                corrector.add_iso_weight()?;
                corrector.add_triggeriso_weight()?;
            }
        }
        log::debug!("registered weights: {:?}", weights.names().collect::<Vec<_>>());
        Ok(())
    }
}

/// OR of the named bits; names absent from the chunk are skipped.
fn any_of(bits: &BTreeMap<String, Vec<bool>>, names: &[String], n: usize) -> Vec<bool> {
    let mut out = vec![false; n];
    for name in names {
        match bits.get(name) {
            Some(values) => out.iter_mut().zip(values).for_each(|(o, &v)| *o |= v),
            None => log::warn!("trigger '{name}' not present, skipped"),
        }
    }
    out
}

/// AND of the named bits; names absent from the chunk are skipped.
fn all_of(bits: &BTreeMap<String, Vec<bool>>, names: &[String], n: usize) -> Vec<bool> {
    let mut out = vec![true; n];
    for name in names {
        match bits.get(name) {
            Some(values) => out.iter_mut().zip(values).for_each(|(o, &v)| *o &= v),
            None => log::warn!("MET filter '{name}' not present, skipped"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_or_and_filter_and_skip_missing_names() {
        let bits = BTreeMap::from([
            ("A".to_string(), vec![true, false, false]),
            ("B".to_string(), vec![false, false, true]),
        ]);
        let names = ["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(any_of(&bits, &names, 3), vec![true, false, true]);
        assert_eq!(all_of(&bits, &names, 3), vec![false, false, false]);
        assert_eq!(all_of(&bits, &["C".to_string()], 3), vec![true; 3]);
        assert_eq!(any_of(&bits, &[], 3), vec![false; 3]);
    }
}
