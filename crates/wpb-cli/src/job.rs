//! Job configuration file (YAML or JSON).
//!
//! ```yaml
//! scale_factors: corrections.json
//! lumi_mask: golden.json          # optional
//! triggers: triggers.json         # optional, built-in Run 2 UL table otherwise
//! met_filters: metfilters.json    # optional, built-in Run 2 UL table otherwise
//! btag_sf_type: comb
//! selection:
//!   muon: { pt_threshold: 30, id_wp: tight, iso_wp: tight }
//! ```
//!
//! Relative paths are resolved against the directory of the job file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wpb_core::{Period, Variation};
use wpb_corrections::{BinnedCorrectionSet, GoldenJson};
use wpb_processor::{LeptonFlavor, MetFilterTable, ProcessorConfig, TriggerTable, ZToLLSelectionConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub scale_factors: PathBuf,
    #[serde(default)]
    pub lumi_mask: Option<PathBuf>,
    #[serde(default)]
    pub triggers: Option<PathBuf>,
    #[serde(default)]
    pub met_filters: Option<PathBuf>,
    #[serde(default)]
    pub btag_sf_type: Option<String>,
    #[serde(default)]
    pub selection: ZToLLSelectionConfig,
    #[serde(skip)]
    base_dir: PathBuf,
}

pub fn read_job_config(path: &Path) -> Result<JobConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading job config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let mut cfg: JobConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    cfg.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(cfg)
}

impl JobConfig {
    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() { p.to_path_buf() } else { self.base_dir.join(p) }
    }

    /// Load every referenced table and assemble the processor configuration.
    pub fn processor_config(
        &self,
        period: Period,
        flavor: LeptonFlavor,
        variation: Variation,
    ) -> Result<ProcessorConfig> {
        let sf_path = self.resolve(&self.scale_factors);
        let tables = BinnedCorrectionSet::from_path(&sf_path)
            .with_context(|| format!("loading scale factors {}", sf_path.display()))?;
        tracing::info!(path = %sf_path.display(), keys = tables.keys().count(), "scale factors loaded");

        let mut config = ProcessorConfig::new(period, flavor, Arc::new(tables))
            .variation(variation)
            .selection(self.selection.clone());
        if let Some(sf_type) = &self.btag_sf_type {
            config = config.btag_sf_type(sf_type.clone());
        }
        if let Some(p) = &self.lumi_mask {
            let p = self.resolve(p);
            let mask = GoldenJson::from_path(&p).with_context(|| format!("loading lumi mask {}", p.display()))?;
            tracing::info!(path = %p.display(), runs = mask.n_runs(), "lumi mask loaded");
            config = config.lumi_mask(Arc::new(mask));
        }
        if let Some(p) = &self.triggers {
            let p = self.resolve(p);
            let table =
                TriggerTable::from_path(&p).with_context(|| format!("loading trigger table {}", p.display()))?;
            config = config.triggers(table);
        }
        if let Some(p) = &self.met_filters {
            let p = self.resolve(p);
            let table = MetFilterTable::from_path(&p)
                .with_context(|| format!("loading MET filter table {}", p.display()))?;
            config = config.met_filters(table);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_with_partial_selection() {
        let cfg: JobConfig = serde_yaml_ng::from_str(
            "scale_factors: sf.json\nselection:\n  muon:\n    pt_threshold: 25\n",
        )
        .unwrap();
        assert_eq!(cfg.selection.muon.pt_threshold, 25.0);
        assert_eq!(cfg.selection.muon.id_wp, "tight");
        assert_eq!(cfg.selection.jet.btag_wp, "M");
        assert!(cfg.lumi_mask.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: std::result::Result<JobConfig, _> =
            serde_yaml_ng::from_str("scale_factors: sf.json\nlumimask: golden.json\n");
        assert!(res.is_err());
    }

    #[test]
    fn relative_paths_follow_the_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(&job, r#"{"scale_factors": "tables/sf.json"}"#).unwrap();
        let cfg = read_job_config(&job).unwrap();
        assert_eq!(cfg.resolve(&cfg.scale_factors), dir.path().join("tables/sf.json"));
        assert_eq!(cfg.resolve(Path::new("/abs/sf.json")), PathBuf::from("/abs/sf.json"));
    }
}
