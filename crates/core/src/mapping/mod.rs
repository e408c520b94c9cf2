//! Organism identifier-mapping table: `(database-namespace, native-id) ->
//! set of canonical protein identifiers`.
//!
//! This is the sole surface parsers and scorers use to resolve
//! source-native identifiers; no hard-coded knowledge of column names
//! leaks into the parsers (§9, "Identifier resolver abstraction").

use crate::error::{CoreError, Result};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Cell tokenizer: splits on any of `,` `;` `|` `+` or whitespace.
fn split_cell(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(|c: char| matches!(c, ',' | ';' | '|' | '+') || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

/// Case-insensitive, whitespace-/punctuation-normalized namespace key
/// used to line up differently-spelled headers (`"Entrez Gene"`,
/// `"entrez_gene"`, `"EntrezGene"`) to the same column.
fn normalize_namespace_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A token `X.n` is indexed both as `X.n` and as `X` (its unversioned
/// base), so a lookup for either form succeeds.
fn versioned_bases(token: &str) -> Vec<String> {
    let mut out = vec![token.to_string()];
    if let Some((base, suffix)) = token.rsplit_once('.') {
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            out.push(base.to_string());
        }
    }
    out
}

/// One namespace column's index: exact-case keys and a case-folded
/// fallback, per §4.B ("stored case-folded and also in original case;
/// case-folded lookup is tried last").
#[derive(Debug, Default, Clone)]
struct ColumnIndex {
    exact: HashMap<String, BTreeSet<String>>,
    folded: HashMap<String, BTreeSet<String>>,
}

impl ColumnIndex {
    fn insert(&mut self, token: &str, canonical_id: &str) {
        for form in versioned_bases(token) {
            self.exact
                .entry(form.clone())
                .or_default()
                .insert(canonical_id.to_string());
            self.folded
                .entry(form.to_lowercase())
                .or_default()
                .insert(canonical_id.to_string());
        }
    }

    fn lookup(&self, token: &str) -> BTreeSet<String> {
        if let Some(set) = self.exact.get(token) {
            return set.clone();
        }
        self.folded.get(&token.to_lowercase()).cloned().unwrap_or_default()
    }
}

/// The three Ensembl-family columns, addressed individually for
/// source-B files (which carry them as separate namespaces) and jointly
/// for source-A files (which carry a single combined `Ensembl` column).
const ENSEMBL_GENE: &str = "ensemblgene";
const ENSEMBL_TRANSCRIPT: &str = "ensembltranscript";
const ENSEMBL_PROTEIN: &str = "ensemblprotein";
const ENSEMBL_GENERIC: &str = "ensembl";

fn ensembl_lookup_order(native_id: &str) -> [&'static str; 3] {
    if native_id.starts_with("ENST") {
        [ENSEMBL_TRANSCRIPT, ENSEMBL_GENE, ENSEMBL_PROTEIN]
    } else if native_id.starts_with("ENSP") {
        [ENSEMBL_PROTEIN, ENSEMBL_GENE, ENSEMBL_TRANSCRIPT]
    } else {
        // ENSG, or an unrecognized Ensembl-family token: gene first,
        // falling back across the other two.
        [ENSEMBL_GENE, ENSEMBL_TRANSCRIPT, ENSEMBL_PROTEIN]
    }
}

/// `(namespace, native-id) -> sorted set<canonical-id>` lookup table,
/// built once per process from an organism's mapping TSV.
#[derive(Debug, Default, Clone)]
pub struct MappingTable {
    columns: HashMap<String, ColumnIndex>,
}

impl MappingTable {
    /// Parse a mapping table from any reader. Column 1 is the canonical
    /// protein id; later columns are namespaces named by the header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.len() < 2 {
            return Err(CoreError::BadInput(
                "mapping table must have a canonical-id column plus at least one namespace column"
                    .to_string(),
            ));
        }
        let namespace_keys: Vec<String> = headers
            .iter()
            .skip(1)
            .map(normalize_namespace_key)
            .collect();

        let mut table = MappingTable::default();
        for result in rdr.records() {
            let record = result?;
            let canonical_id = match record.get(0) {
                Some(id) if !id.trim().is_empty() => id.trim(),
                _ => continue,
            };
            for (i, ns_key) in namespace_keys.iter().enumerate() {
                let Some(cell) = record.get(i + 1) else { continue };
                let column = table.columns.entry(ns_key.clone()).or_default();
                for token in split_cell(cell) {
                    column.insert(token, canonical_id);
                }
            }
        }
        Ok(table)
    }

    /// Parse a mapping table from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(CoreError::Io)?;
        Self::from_reader(file)
    }

    /// Whether this table has a column for the given namespace (after
    /// normalization). An unknown namespace is not an error — `map`
    /// simply returns the empty set for it — but this lets callers
    /// distinguish "no column" from "column with no match" if desired.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        let key = normalize_namespace_key(namespace);
        if key == ENSEMBL_GENERIC {
            return self.columns.contains_key(ENSEMBL_GENE)
                || self.columns.contains_key(ENSEMBL_TRANSCRIPT)
                || self.columns.contains_key(ENSEMBL_PROTEIN)
                || self.columns.contains_key(ENSEMBL_GENERIC);
        }
        self.columns.contains_key(&key)
    }

    /// Total, deterministic, side-effect-free lookup. Returns the empty
    /// list for an unknown namespace rather than an error.
    pub fn map(&self, namespace: &str, native_id: &str) -> Vec<String> {
        let key = normalize_namespace_key(namespace);
        let mut result: BTreeSet<String> = BTreeSet::new();

        if key == ENSEMBL_GENERIC {
            if let Some(col) = self.columns.get(ENSEMBL_GENERIC) {
                result.extend(col.lookup(native_id));
            }
            for col_key in ensembl_lookup_order(native_id) {
                if let Some(col) = self.columns.get(col_key) {
                    result.extend(col.lookup(native_id));
                }
            }
        } else if let Some(col) = self.columns.get(&key) {
            result.extend(col.lookup(native_id));
        }

        result.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> MappingTable {
        let tsv = "canonical\tKEGG_Gene_ID\tEnsembl_Gene\tEnsembl_Transcript\tEnsembl_Protein\tHGNC\n\
P01234\thsa:207\tENSG00000181163\tENST00000998877\tENSP00000998877\tHGNC:391\n\
P05678\thsa:208;hsa:209\tENSG00000181163.12\t\t\t\n";
        MappingTable::from_reader(tsv.as_bytes()).unwrap()
    }

    #[test]
    fn direct_namespace_lookup() {
        let t = sample_table();
        assert_eq!(t.map("KEGG_Gene_ID", "hsa:207"), vec!["P01234".to_string()]);
    }

    #[test]
    fn multi_token_cell() {
        let t = sample_table();
        assert_eq!(t.map("KEGG_Gene_ID", "hsa:208"), vec!["P05678".to_string()]);
        assert_eq!(t.map("KEGG_Gene_ID", "hsa:209"), vec!["P05678".to_string()]);
    }

    #[test]
    fn versioned_identifier_both_forms() {
        let t = sample_table();
        let with_version = t.map("Ensembl_Gene", "ENSG00000181163.12");
        let without_version = t.map("Ensembl_Gene", "ENSG00000181163");
        assert!(with_version.contains(&"P05678".to_string()));
        assert!(without_version.contains(&"P05678".to_string()));
        // Base form also resolves P01234, which was indexed unversioned.
        assert!(without_version.contains(&"P01234".to_string()));
    }

    #[test]
    fn ensembl_routed_by_prefix() {
        let t = sample_table();
        assert_eq!(
            t.map("Ensembl", "ENST00000998877"),
            vec!["P01234".to_string()]
        );
        assert_eq!(
            t.map("Ensembl", "ENSP00000998877"),
            vec!["P01234".to_string()]
        );
    }

    #[test]
    fn unknown_namespace_is_empty_not_error() {
        let t = sample_table();
        assert!(t.map("NotARealNamespace", "whatever").is_empty());
    }

    #[test]
    fn lookup_order_independent_of_insertion() {
        let tsv_a = "canonical\tKEGG_Gene_ID\nP1\thsa:1\nP2\thsa:2\n";
        let tsv_b = "canonical\tKEGG_Gene_ID\nP2\thsa:2\nP1\thsa:1\n";
        let a = MappingTable::from_reader(tsv_a.as_bytes()).unwrap();
        let b = MappingTable::from_reader(tsv_b.as_bytes()).unwrap();
        assert_eq!(a.map("KEGG_Gene_ID", "hsa:1"), b.map("KEGG_Gene_ID", "hsa:1"));
    }
}
