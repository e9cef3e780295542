//! End-to-end chunks through the Z→ℓℓ processor.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use approx::assert_relative_eq;
use wpb_columnar::event::{Electron, Jet, Met, Muon, PrefiringWeights};
use wpb_columnar::{EventBatch, Jagged};
use wpb_core::{Error, Period};
use wpb_corrections::{BinnedCorrectionSet, GoldenJson};
use wpb_processor::{LeptonFlavor, ProcessorConfig, ZToLLProcessor, ZToLLSelectionConfig};

const UNIT_TABLES: &str = r#"{
    "corrections": {
        "jet_energy_scale": [{"values": [1.0]}],
        "pileup": [{"values": [1.0]}],
        "PUJetID_eff": [{"values": [1.0]}],
        "deepJet_comb": [{"values": [1.0]}],
        "btag_efficiency": [{"values": [0.5]}],
        "NUM_TightID_DEN_TrackerMuons": [{"values": [1.0]}],
        "NUM_TightRelIso_DEN_TightIDandIPCut": [{"values": [1.0]}],
        "NUM_IsoMu27_DEN_CutBasedIdTight_and_PFIsoTight": [{"values": [1.0]}],
        "UL-Electron-ID-SF": [{"values": [1.0]}]
    }
}"#;

fn tables() -> Arc<BinnedCorrectionSet> {
    Arc::new(BinnedCorrectionSet::from_json_str(UNIT_TABLES).unwrap())
}

/// Unit tables with one entry replaced.
fn tables_with(key: &str, entries: &str) -> Arc<BinnedCorrectionSet> {
    let unit = format!(r#""{key}": [{{"values": [1.0]}}]"#);
    assert!(UNIT_TABLES.contains(&unit));
    let text = UNIT_TABLES.replace(&unit, &format!(r#""{key}": {entries}"#));
    Arc::new(BinnedCorrectionSet::from_json_str(&text).unwrap())
}

fn processor(flavor: LeptonFlavor) -> ZToLLProcessor {
    ZToLLProcessor::new(ProcessorConfig::new(Period::Y2017, flavor, tables())).unwrap()
}

/// One simulated 2017 event with the given muons and jets.
fn single_event(muons: Vec<Muon>, jets: Vec<Jet>) -> EventBatch {
    EventBatch {
        run: vec![1],
        luminosity_block: vec![1],
        gen_weight: Some(vec![1.0]),
        pileup_n_true_int: Some(vec![30.0]),
        l1_prefiring: Some(PrefiringWeights { nom: vec![1.0], up: vec![1.0], dn: vec![1.0] }),
        npvs_good: vec![20],
        rho: Some(vec![15.0]),
        met: vec![Met { pt: 5.0, phi: 0.3 }],
        hlt: BTreeMap::from([("IsoMu27".to_string(), vec![true])]),
        electrons: Jagged::empty(1),
        muons: Jagged::from_nested(vec![muons]),
        jets: Jagged::from_nested(vec![jets]),
        ..Default::default()
    }
}

fn z_pair() -> Vec<Muon> {
    vec![Muon::new(45.5, 0.0, 0.0, 1), Muon::new(45.5, 0.0, PI, -1)]
}

/// Ten simulated 2017 events; only events 0 and 1 hold an on-shell Z→μμ pair.
fn ten_events() -> EventBatch {
    let n = 10;
    let muons = vec![
        z_pair(),
        z_pair(),
        // Same-sign pair.
        vec![Muon::new(45.5, 0.0, 0.0, 1), Muon::new(45.5, 0.0, PI, 1)],
        // Opposite-sign pair far below the Z mass.
        vec![Muon::new(31.0, 0.0, 0.0, 1), Muon::new(31.0, 0.0, 1.0, -1)],
        vec![Muon::new(50.0, 0.5, 0.0, -1)],
        vec![],
        vec![],
        // Second muon below the pt threshold.
        vec![Muon::new(45.5, 0.0, 0.0, 1), Muon::new(10.0, 0.0, PI, -1)],
        vec![],
        vec![],
    ];
    EventBatch {
        dataset: "DYJetsToLL_M-50".into(),
        run: vec![1; n],
        luminosity_block: (0..n as u32).collect(),
        gen_weight: Some(vec![1.0; n]),
        pileup_n_true_int: Some(vec![30.0; n]),
        l1_prefiring: Some(PrefiringWeights { nom: vec![1.0; n], up: vec![1.0; n], dn: vec![1.0; n] }),
        npvs_good: vec![20; n],
        rho: Some(vec![15.0; n]),
        met: vec![Met { pt: 5.0, phi: 0.3 }; n],
        hlt: BTreeMap::from([("IsoMu27".to_string(), vec![true; n])]),
        flags: BTreeMap::new(),
        electrons: Jagged::empty(n),
        muons: Jagged::from_nested(muons),
        jets: Jagged::empty(n),
    }
}

#[test]
fn two_z_candidates_survive() {
    let out = processor(LeptonFlavor::Mu).process(&ten_events()).unwrap();
    let meta = &out.metadata;
    assert_eq!(meta.events_before, 10);
    assert_eq!(meta.events_after, 2);
    assert_relative_eq!(meta.sumw, 10.0, epsilon = 1e-12);

    assert_eq!(out.arrays.len(), 2);
    for &mll in out.arrays.get("mll").unwrap() {
        assert_relative_eq!(mll, 91.0, epsilon = 1e-2);
    }
    assert_eq!(out.arrays.get("nvtx").unwrap(), &[20.0, 20.0]);
    assert_eq!(out.arrays.get("weights").unwrap(), &[1.0, 1.0]);
    assert_eq!(
        out.arrays.names(),
        ["ptl1", "ptl2", "ptll", "mll", "dphill", "drll", "mth", "nvtx", "weights"]
    );

    let cf = &meta.cutflow;
    let names: Vec<_> = cf.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, LeptonFlavor::Mu.region());
    assert_eq!(cf.n_events("two_leptons"), Some(4));
    assert_eq!(cf.n_events("neutral"), Some(3));
    assert_eq!(cf.n_events("mass_range"), Some(2));
    assert!(cf.sumw("mass_range").unwrap() <= cf.sumw("two_leptons").unwrap());
    for pair in cf.steps.windows(2) {
        assert!(pair[1].sumw <= pair[0].sumw);
    }

    for name in ["genweight", "l1prefiring", "pileup", "pujetid", "btag_bc", "muon_id", "muon_iso", "muon_triggeriso"] {
        assert!(meta.weight_statistics.contains_key(name), "missing {name}");
    }
}

#[test]
fn zero_generator_weights() {
    let mut events = ten_events();
    events.gen_weight = Some(vec![0.0; 10]);
    let out = processor(LeptonFlavor::Mu).process(&events).unwrap();
    assert_eq!(out.metadata.sumw, 0.0);
    assert!(out.arrays.get("weights").unwrap().iter().all(|&w| w == 0.0));
    assert!(out.metadata.cutflow.steps.iter().all(|s| s.sumw == 0.0));
    assert_eq!(out.metadata.cutflow.n_events("two_leptons"), Some(4));
    assert_eq!(out.metadata.events_after, 2);
}

#[test]
fn empty_chunk() {
    let events = EventBatch {
        gen_weight: Some(vec![]),
        pileup_n_true_int: Some(vec![]),
        l1_prefiring: Some(PrefiringWeights::default()),
        rho: Some(vec![]),
        ..Default::default()
    };
    let out = processor(LeptonFlavor::Mu).process(&events).unwrap();
    assert_eq!(out.metadata.events_before, 0);
    assert_eq!(out.metadata.events_after, 0);
    assert_eq!(out.arrays.names().len(), 9);
    assert!(out.arrays.is_empty());
    assert!(out.arrays.get("mll").unwrap().is_empty());
}

#[test]
fn muon_channel_with_loose_id_is_rejected() {
    let mut selection = ZToLLSelectionConfig::default();
    selection.muon.id_wp = "loose".into();
    selection.muon.iso_wp = "loose".into();
    let config = ProcessorConfig::new(Period::Y2017, LeptonFlavor::Mu, tables()).selection(selection);
    assert!(matches!(ZToLLProcessor::new(config), Err(Error::Configuration(_))));
}

#[test]
fn unknown_working_point_is_rejected_before_processing() {
    let mut selection = ZToLLSelectionConfig::default();
    selection.jet.btag_wp = "XT".into();
    let config = ProcessorConfig::new(Period::Y2018, LeptonFlavor::Ele, tables()).selection(selection);
    assert!(matches!(ZToLLProcessor::new(config), Err(Error::Configuration(_))));
}

#[test]
fn data_uses_lumi_mask_and_no_weights() {
    let mut events = ten_events();
    events.gen_weight = None;
    events.pileup_n_true_int = None;
    events.l1_prefiring = None;
    let golden = GoldenJson::from_json_str(r#"{"1": [[1, 9]]}"#).unwrap();
    let config = ProcessorConfig::new(Period::Y2017, LeptonFlavor::Mu, tables()).lumi_mask(Arc::new(golden));
    let out = ZToLLProcessor::new(config).unwrap().process(&events).unwrap();

    // Event 0 sits in luminosity block 0, outside the certified range.
    assert_eq!(out.metadata.events_after, 1);
    assert_eq!(out.metadata.cutflow.n_events("lumi"), Some(9));
    assert!(out.metadata.weight_statistics.is_empty());
    assert_eq!(out.arrays.get("weights").unwrap(), &[1.0]);
}

#[test]
fn missing_trigger_rejects_every_event() {
    let mut events = ten_events();
    events.hlt.clear();
    let out = processor(LeptonFlavor::Mu).process(&events).unwrap();
    assert_eq!(out.metadata.cutflow.n_events("trigger_mu"), Some(0));
    assert_eq!(out.metadata.events_after, 0);
    assert_eq!(out.arrays.names().len(), 9);
}

#[test]
fn electron_channel() {
    let n = 2;
    let events = EventBatch {
        run: vec![1; n],
        luminosity_block: vec![1; n],
        gen_weight: Some(vec![2.0, 1.0]),
        pileup_n_true_int: Some(vec![30.0; n]),
        l1_prefiring: Some(PrefiringWeights { nom: vec![0.5; n], up: vec![0.6; n], dn: vec![0.4; n] }),
        npvs_good: vec![10; n],
        rho: Some(vec![15.0; n]),
        met: vec![Met::default(); n],
        hlt: BTreeMap::from([("Ele35_WPTight_Gsf".to_string(), vec![true, false])]),
        electrons: Jagged::from_nested(vec![
            vec![Electron::new(45.5, 0.0, 0.0, 1), Electron::new(45.5, 0.0, PI, -1)],
            vec![Electron::new(45.5, 0.0, 0.0, 1), Electron::new(45.5, 0.0, PI, -1)],
        ]),
        muons: Jagged::empty(n),
        jets: Jagged::empty(n),
        ..Default::default()
    };
    let out = processor(LeptonFlavor::Ele).process(&events).unwrap();
    assert_eq!(out.metadata.events_after, 1);
    assert_eq!(out.arrays.get("weights").unwrap(), &[1.0]);
    assert_relative_eq!(out.metadata.sumw, 1.5, epsilon = 1e-12);
    assert!(out.metadata.weight_statistics.contains_key("electron_reco"));
}

#[test]
fn processor_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ZToLLProcessor>();

    let p = processor(LeptonFlavor::Mu);
    let events = ten_events();
    let first = p.process(&events).unwrap();
    let second = p.process(&events).unwrap();
    assert_eq!(first, second);
}

#[test]
fn weight_statistics_follow_registration_order() {
    let out = processor(LeptonFlavor::Mu).process(&ten_events()).unwrap();
    let names: Vec<&str> = out.metadata.weight_statistics.names().collect();
    assert_eq!(
        names,
        ["genweight", "l1prefiring", "pileup", "pujetid", "btag_bc", "muon_id", "muon_iso", "muon_triggeriso"]
    );
    let json = serde_json::to_string(&out.metadata).unwrap();
    assert!(json.find("\"genweight\"").unwrap() < json.find("\"btag_bc\"").unwrap());
}

#[test]
fn lepton_scale_factors_cover_every_reconstructed_lepton() {
    let sf = tables_with("NUM_TightID_DEN_TrackerMuons", r#"[{"values": [0.9]}]"#);
    let p = ZToLLProcessor::new(ProcessorConfig::new(Period::Y2017, LeptonFlavor::Mu, sf)).unwrap();
    let mut soft = Muon::new(10.0, 0.0, 1.0, 1);
    soft.tight_id = false;
    let events = single_event(vec![z_pair()[0].clone(), z_pair()[1].clone(), soft], vec![]);
    let out = p.process(&events).unwrap();

    assert_eq!(out.metadata.events_after, 1);
    let muon_id = out.metadata.weight_statistics.get("muon_id").unwrap();
    assert_relative_eq!(muon_id.sumw, 0.9 * 0.9 * 0.9, epsilon = 1e-12);
    assert_relative_eq!(out.arrays.get("weights").unwrap()[0], 0.729, epsilon = 1e-12);
    assert_relative_eq!(out.metadata.sumw, 0.729, epsilon = 1e-12);
}

#[test]
fn pileup_jet_id_weight_uses_the_jet_pileup_working_point() {
    let sf = tables_with("PUJetID_eff", r#"[{"working_point": "T", "values": [0.95]}]"#);
    let p = ZToLLProcessor::new(ProcessorConfig::new(Period::Y2017, LeptonFlavor::Mu, sf)).unwrap();
    let events = single_event(z_pair(), vec![Jet::new(30.0, 0.5, 1.5)]);
    let out = p.process(&events).unwrap();

    let pujetid = out.metadata.weight_statistics.get("pujetid").unwrap();
    assert_relative_eq!(pujetid.sumw, 0.95, epsilon = 1e-12);
}
