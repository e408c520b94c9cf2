//! Evidence Aggregator (§4.G): condenses user protein- and site-level
//! measurement tables into one [`ProteinEvidence`] record per protein.
//!
//! The protein table carries one row (or more; rollup is a maximum)
//! per protein with both whole-protein and phospho-summary p-value/
//! fold-change columns. The optional site table carries one row per
//! phosphosite observation, which the regulatory-annotation flag routes
//! into either `reg_sites` or `ptm_sites` before a localization-
//! probability filter and top-k aggregation collapse it to a scalar.
//!
//! An id column that already carries canonical accessions needs no
//! help; one that carries native ids (gene symbols, Entrez ids, ...)
//! needs an identifier-mapping table passed in to resolve them.

use crate::ids::{looks_like_canonical_id, normalize_uniprot_cell};
use crate::mapping::MappingTable;
use crate::scoring::weights::Weights;
use crate::tabular::{parse_numeric, parse_truthy, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the columns the aggregator reads, with reasonable defaults
/// overridable by the CLI's column-mapping flags (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub protein_id_col: String,
    pub p_col_prot: String,
    pub fc_col_prot: String,
    pub p_col_phospho: String,
    pub fc_col_phospho: String,
    pub p_col_site: String,
    pub fc_col_site: String,
    pub site_uniprot_col: String,
    pub site_key_col: Option<String>,
    pub site_key_cols: Option<Vec<String>>,
    pub reg_annot_col: String,
    pub locprob_col: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            protein_id_col: "Uniprot".to_string(),
            p_col_prot: "pvalue".to_string(),
            fc_col_prot: "log2fc".to_string(),
            p_col_phospho: "phospho_pvalue".to_string(),
            fc_col_phospho: "phospho_log2fc".to_string(),
            p_col_site: "pvalue".to_string(),
            fc_col_site: "log2fc".to_string(),
            site_uniprot_col: "Uniprot".to_string(),
            site_key_col: Some("site".to_string()),
            site_key_cols: None,
            reg_annot_col: "regulatory".to_string(),
            locprob_col: Some("localization_prob".to_string()),
        }
    }
}

/// A single regulatory site's contribution, retained (up to `site_top_k`
/// per protein) so downstream reporting can show why a protein gated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegSite {
    pub site_key: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProteinEvidence {
    pub canonical_id: String,
    pub single_score: f64,
    pub reg_evidence: f64,
    pub ptm_evidence: f64,
    pub ab_evidence: f64,
    pub has_regulatory_evidence: bool,
    pub top_reg_sites: Vec<RegSite>,
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// `sig(p) = clamp01((-log10(p)) / sig_scale)` for `p > 0`; `p == 0` is
/// treated as `1e-300`.
fn sig(p: f64, scale: f64) -> f64 {
    let p = if p == 0.0 { 1e-300 } else { p };
    if p <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    clamp01((-p.log10()) / scale)
}

/// `eff(fc) = clamp01(|log2(|fc|)| / eff_scale)`; `fc == 0` contributes
/// `0`. The outer/inner absolute values already neutralize sign, so a
/// negative fold-change (down-regulation) is handled the same as a
/// positive one.
fn eff(fc: f64, scale: f64) -> f64 {
    if fc == 0.0 || scale <= 0.0 {
        return 0.0;
    }
    clamp01(fc.abs().log2().abs() / scale)
}

fn sig_cell(table: &Table, row: usize, col: &str, scale: f64) -> f64 {
    match parse_numeric(table.cell(row, col)) {
        Some(p) => sig(p, scale),
        None => 0.0,
    }
}

fn eff_cell(table: &Table, row: usize, col: &str, scale: f64) -> f64 {
    match parse_numeric(table.cell(row, col)) {
        Some(fc) => eff(fc, scale),
        None => 0.0,
    }
}

/// Resolve one row's identifier cell to the canonical accession(s) it
/// denotes. A cell already shaped like a canonical accession is used
/// as-is. Otherwise, when an identifier-mapping table is available, the
/// cell is treated as a native id in the namespace named by `id_col`
/// (the same namespace-keyed lookup the parsers use for node
/// candidates) and every canonical id it maps to receives the row's
/// evidence. With no mapping table, a non-canonical cell is still used
/// verbatim as a best-effort key, matching the no-`--id-map` behavior.
fn row_keys(table: &Table, row: usize, id_col: &str, mapping: Option<&MappingTable>) -> Vec<String> {
    let cell = table.cell(row, id_col);
    let Some((exact, _base)) = normalize_uniprot_cell(cell) else {
        return Vec::new();
    };
    if looks_like_canonical_id(&exact) {
        return vec![exact];
    }
    match mapping {
        Some(m) => m.map(id_col, &exact),
        None => vec![exact],
    }
}

#[derive(Default)]
struct Accum {
    prot_sig: f64,
    prot_eff: f64,
    phospho_sig: f64,
    phospho_eff: f64,
    reg_sites: Vec<RegSite>,
    ptm_contributions: Vec<f64>,
}

/// Build per-protein evidence from the protein table (required) and an
/// optional site table. Missing columns degrade to a zero contribution
/// for the affected term and a warning, rather than an error.
pub fn aggregate(
    protein_table: &Table,
    site_table: Option<&Table>,
    mapping: &ColumnMapping,
    weights: &Weights,
    id_map: Option<&MappingTable>,
) -> (EvidenceTable, Vec<String>) {
    let mut warnings = Vec::new();
    let mut accum: BTreeMap<String, Accum> = BTreeMap::new();

    if !protein_table.has_column(&mapping.protein_id_col) {
        warnings.push(format!(
            "protein table missing id column '{}'; no protein evidence produced",
            mapping.protein_id_col
        ));
    } else {
        for col in [&mapping.p_col_prot, &mapping.fc_col_prot, &mapping.p_col_phospho, &mapping.fc_col_phospho] {
            if !protein_table.has_column(col) {
                warnings.push(format!("protein table missing column '{col}'; contributes 0"));
            }
        }
        for row in protein_table.rows() {
            let keys = row_keys(protein_table, row, &mapping.protein_id_col, id_map);
            if keys.is_empty() {
                continue;
            }
            let prot_sig = sig_cell(protein_table, row, &mapping.p_col_prot, weights.sig_scale);
            let prot_eff = eff_cell(protein_table, row, &mapping.fc_col_prot, weights.eff_scale);
            let phospho_sig = sig_cell(protein_table, row, &mapping.p_col_phospho, weights.sig_scale);
            let phospho_eff = eff_cell(protein_table, row, &mapping.fc_col_phospho, weights.eff_scale);
            for key in keys {
                let entry = accum.entry(key).or_default();
                entry.prot_sig = entry.prot_sig.max(prot_sig);
                entry.prot_eff = entry.prot_eff.max(prot_eff);
                entry.phospho_sig = entry.phospho_sig.max(phospho_sig);
                entry.phospho_eff = entry.phospho_eff.max(phospho_eff);
            }
        }
    }

    if let Some(sites) = site_table {
        if !sites.has_column(&mapping.site_uniprot_col) {
            warnings.push(format!(
                "site table missing id column '{}'; no site evidence produced",
                mapping.site_uniprot_col
            ));
        } else {
            for row in sites.rows() {
                if let Some(locprob_col) = &mapping.locprob_col {
                    if sites.has_column(locprob_col) {
                        if let Some(p) = parse_numeric(sites.cell(row, locprob_col)) {
                            if p < weights.locprob_min {
                                continue;
                            }
                        }
                    }
                }
                let keys = row_keys(sites, row, &mapping.site_uniprot_col, id_map);
                if keys.is_empty() {
                    continue;
                }
                let sig_site = sig_cell(sites, row, &mapping.p_col_site, weights.sig_scale);
                let eff_site = eff_cell(sites, row, &mapping.fc_col_site, weights.eff_scale);
                let combined = 0.8 * sig_site + 0.2 * eff_site;

                let site_key = match (&mapping.site_key_col, &mapping.site_key_cols) {
                    (Some(col), _) if sites.has_column(col) => sites.cell(row, col).to_string(),
                    (_, Some(cols)) => cols.iter().map(|c| sites.cell(row, c)).collect::<Vec<_>>().join(":"),
                    _ => format!("row{row}"),
                };
                let is_reg = parse_truthy(sites.cell(row, &mapping.reg_annot_col));

                for key in keys {
                    let entry = accum.entry(key).or_default();
                    if is_reg {
                        entry.reg_sites.push(RegSite {
                            site_key: site_key.clone(),
                            contribution: weights.w_ann * combined,
                        });
                    } else {
                        entry.ptm_contributions.push(weights.ptm_site_scale * combined);
                    }
                }
            }
        }
    }

    let mut by_accession = BTreeMap::new();
    for (canonical_id, mut entry) in accum {
        entry.reg_sites.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap()
                .then_with(|| a.site_key.cmp(&b.site_key))
        });
        entry.reg_sites.truncate(weights.site_top_k);
        let reg_evidence: f64 = entry.reg_sites.iter().map(|s| s.contribution).sum();

        entry
            .ptm_contributions
            .sort_by(|a, b| b.partial_cmp(a).unwrap());
        entry.ptm_contributions.truncate(weights.site_top_k);
        let ptm_evidence: f64 = entry.ptm_contributions.iter().sum();

        let ab_evidence = 0.5 * entry.prot_sig + 0.5 * entry.phospho_sig;
        let single_score = reg_evidence + weights.ptm_weight * ptm_evidence + weights.epsilon * ab_evidence;

        by_accession.insert(
            canonical_id.clone(),
            ProteinEvidence {
                canonical_id,
                single_score,
                reg_evidence,
                ptm_evidence,
                ab_evidence,
                has_regulatory_evidence: reg_evidence >= weights.reg_gate,
                top_reg_sites: entry.reg_sites,
            },
        );
    }

    (EvidenceTable { by_accession }, warnings)
}

fn base_of(token: &str) -> &str {
    token.split_once('-').map(|(base, _)| base).unwrap_or(token)
}

/// Pick the highest-`single_score` entry, ties broken by the
/// lexicographically smallest accession — the tie-break policy named
/// throughout §4.G/§4.H.
pub(crate) fn pick_best<'a>(candidates: impl Iterator<Item = &'a ProteinEvidence>) -> Option<&'a ProteinEvidence> {
    candidates.fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            if candidate.single_score > current.single_score
                || (candidate.single_score == current.single_score && candidate.canonical_id < current.canonical_id)
            {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    })
}

/// The resolved evidence table, keyed by exact normalized accession,
/// with the isoform-fallback lookup rule from §4.G.
#[derive(Debug, Clone, Default)]
pub struct EvidenceTable {
    by_accession: BTreeMap<String, ProteinEvidence>,
}

impl EvidenceTable {
    pub fn len(&self) -> usize {
        self.by_accession.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_accession.is_empty()
    }

    /// Exact lookup first; on miss, fall back to the base accession
    /// (isoform suffix stripped) and pick the highest-scoring record
    /// among all entries sharing that base.
    pub fn get(&self, token: &str) -> Option<&ProteinEvidence> {
        let upper = token.to_ascii_uppercase();
        if let Some(exact) = self.by_accession.get(&upper) {
            return Some(exact);
        }
        let base = base_of(&upper);
        pick_best(self.by_accession.values().filter(|e| base_of(&e.canonical_id) == base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sig_and_eff_idempotent_and_clamped() {
        assert_eq!(sig(0.0, 5.0), clamp01(sig(0.0, 5.0)));
        assert!(sig(1e-300, 5.0) <= 1.0);
        assert_eq!(eff(0.0, 2.0), 0.0);
        assert!(eff(-8.0, 2.0) >= 0.0 && eff(-8.0, 2.0) <= 1.0);
    }

    #[test]
    fn aggregates_protein_and_site_rows() {
        let protein_tsv = "Uniprot\tpvalue\tlog2fc\tphospho_pvalue\tphospho_log2fc\n\
P01234\t0.001\t2.0\t0.01\t1.0\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();

        let site_tsv = "Uniprot\tsite\tpvalue\tlog2fc\tregulatory\tlocalization_prob\n\
P01234\tS100\t0.0001\t3.0\ttrue\t0.9\n\
P01234\tS200\t0.5\t0.1\tfalse\t0.9\n";
        let site_table = Table::from_reader(site_tsv.as_bytes(), b'\t').unwrap();

        let mapping = ColumnMapping::default();
        let weights = Weights::default();
        let (evidence, warnings) = aggregate(&protein_table, Some(&site_table), &mapping, &weights, None);
        assert!(warnings.is_empty());

        let e = evidence.get("P01234").unwrap();
        assert!(e.reg_evidence > 0.0);
        assert!(e.ptm_evidence > 0.0);
        assert!(e.single_score > 0.0);
        assert!(e.has_regulatory_evidence);
        assert_eq!(e.top_reg_sites.len(), 1);
        assert_eq!(e.top_reg_sites[0].site_key, "S100");
    }

    #[test]
    fn locprob_filter_discards_low_confidence_sites() {
        let protein_tsv = "Uniprot\tpvalue\tlog2fc\tphospho_pvalue\tphospho_log2fc\nP1\t0.5\t0\t0.5\t0\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();
        let site_tsv = "Uniprot\tsite\tpvalue\tlog2fc\tregulatory\tlocalization_prob\nP1\tS1\t0.0001\t3\ttrue\t0.1\n";
        let site_table = Table::from_reader(site_tsv.as_bytes(), b'\t').unwrap();
        let mapping = ColumnMapping::default();
        let weights = Weights::default();
        let (evidence, _) = aggregate(&protein_table, Some(&site_table), &mapping, &weights, None);
        let e = evidence.get("P1").unwrap();
        assert_eq!(e.reg_evidence, 0.0);
    }

    #[test]
    fn isoform_fallback_picks_best_scoring_base_match() {
        let protein_tsv = "Uniprot\tpvalue\tlog2fc\tphospho_pvalue\tphospho_log2fc\n\
P01234-1\t0.5\t0\t0.5\t0\n\
P01234-2\t0.0001\t3\t0.5\t0\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();
        let mapping = ColumnMapping::default();
        let weights = Weights::default();
        let (evidence, _) = aggregate(&protein_table, None, &mapping, &weights, None);
        let best = evidence.get("P01234").unwrap();
        assert_eq!(best.canonical_id, "P01234-2");
    }

    #[test]
    fn missing_column_warns_and_zeroes() {
        let protein_tsv = "Uniprot\n P1\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();
        let mapping = ColumnMapping::default();
        let weights = Weights::default();
        let (_, warnings) = aggregate(&protein_table, None, &mapping, &weights, None);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn native_id_resolves_through_id_map() {
        let protein_tsv = "Uniprot\tpvalue\tlog2fc\tphospho_pvalue\tphospho_log2fc\n\
hsa:207\t0.0001\t3\t0.5\t0\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();
        let id_map = MappingTable::from_reader("canonical\tUniprot\nP01234\thsa:207\n".as_bytes()).unwrap();
        let mapping = ColumnMapping::default();
        let weights = Weights::default();

        let (without_map, _) = aggregate(&protein_table, None, &mapping, &weights, None);
        assert!(without_map.get("P01234").is_none());

        let (with_map, _) = aggregate(&protein_table, None, &mapping, &weights, Some(&id_map));
        let e = with_map.get("P01234").unwrap();
        assert!(e.single_score > 0.0);
    }
}
