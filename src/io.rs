use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{info, warn};

use crate::error::{QuintetError, Result};
use crate::ranking::RootingReport;
use crate::snapshot::{TreeSnapshot, parse_phylo};
use crate::taxa::{QUINTET_TAXA, TaxonNamespace};

/// Read a whole text file. If `path` ends with `.gz`, it is decompressed.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let p = path.as_ref();
    let file = File::open(p).map_err(|e| QuintetError::io(p, "open", e))?;

    let mut reader: Box<dyn Read> = if p.to_string_lossy().ends_with(".gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| QuintetError::io(p, "read", e))?;
    Ok(content)
}

/// Strip bracketed newick comments such as `[&R]`, `[&U]` or `[&rate=0.1]`.
fn strip_comments(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut depth = 0usize;

    for ch in newick.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Split a tree collection into `;`-terminated newick strings, comments removed.
fn split_trees(content: &str) -> Vec<String> {
    strip_comments(content)
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s};"))
        .collect()
}

/// Parse every tree of a collection against `namespace`; the first bad tree is
/// an error.
pub fn parse_tree_list(content: &str, namespace: &TaxonNamespace) -> Result<Vec<TreeSnapshot>> {
    split_trees(content)
        .iter()
        .enumerate()
        .map(|(idx, newick)| {
            TreeSnapshot::from_newick(newick, namespace).map_err(|e| {
                QuintetError::InvalidInput(format!("tree {idx}: {e}"))
            })
        })
        .collect()
}

/// Read the species tree and derive the run's namespace from its leaf labels.
///
/// Only the first tree of the file is used.
///
/// # Errors
/// `InvalidInput` if the file holds no tree, the tree does not parse, or it is
/// not on exactly five distinct named leaves.
pub fn read_species_tree<P: AsRef<Path>>(path: P) -> Result<(TaxonNamespace, TreeSnapshot)> {
    let p = path.as_ref();
    let content = read_text(p)?;
    let trees = split_trees(&content);
    let newick = trees.first().ok_or_else(|| {
        QuintetError::InvalidInput(format!("no tree found in {}", p.display()))
    })?;
    if trees.len() > 1 {
        warn!("{} holds {} trees, using the first", p.display(), trees.len());
    }

    let phylo = parse_phylo(newick)?;
    let mut labels = Vec::new();
    for leaf_id in phylo.get_leaves() {
        let node = phylo
            .get(&leaf_id)
            .map_err(|e| QuintetError::InvalidInput(format!("malformed species tree: {e}")))?;
        let name = node.name.as_deref().map(str::trim).unwrap_or_default();
        labels.push(name.to_string());
    }
    if labels.len() != QUINTET_TAXA {
        return Err(QuintetError::InvalidInput(format!(
            "species tree has {} leaves, expected {QUINTET_TAXA}",
            labels.len()
        )));
    }

    let namespace = TaxonNamespace::from_sorted_labels(labels)?;
    let tree = TreeSnapshot::from_phylo(&phylo, &namespace)?;
    Ok((namespace, tree))
}

/// Read gene trees over `namespace`, skipping any that fail to parse.
pub fn read_gene_trees<P: AsRef<Path>>(
    path: P,
    namespace: &TaxonNamespace,
) -> Result<Vec<TreeSnapshot>> {
    let p = path.as_ref();
    let content = read_text(p)?;
    let newicks = split_trees(&content);

    let trees: Vec<TreeSnapshot> = newicks
        .iter()
        .enumerate()
        .filter_map(|(idx, newick)| match TreeSnapshot::from_newick(newick, namespace) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Skipping gene tree {idx} of {}: {e}", p.display());
                None
            }
        })
        .collect();

    info!(
        "Read {} of {} gene trees from {}",
        trees.len(),
        newicks.len(),
        p.display()
    );
    Ok(trees)
}

/// Newick text as the report prints it: labels only, no terminating `;`.
fn report_newick(tree: &TreeSnapshot, namespace: &TaxonNamespace) -> String {
    let mut s = tree.to_newick(namespace);
    s.pop();
    s
}

/// Write the line-oriented rooting report.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &RootingReport,
    namespace: &TaxonNamespace,
) -> io::Result<()> {
    let best = report.best();

    writeln!(out, "estimated gene tree distribution")?;
    writeln!(out, "{}", report.distribution)?;
    writeln!(out, "best rooted tree {}", report_newick(&best.tree, namespace))?;
    writeln!(
        out,
        "true species tree: {}",
        report_newick(&report.species_tree, namespace)
    )?;

    for c in &report.candidates {
        writeln!(
            out,
            "{} {} {} {}",
            report_newick(&c.tree, namespace),
            c.score,
            c.rooted_rf,
            c.family
        )?;
    }

    writeln!(out, "{}", report.unrooted_rf)?;
    writeln!(out, "{}", best.family)?;
    writeln!(out, "{}", u8::from(report.true_in_top_k))?;
    writeln!(out, "{}", u8::from(report.best_equals_true))?;
    writeln!(out, "{}", u8::from(report.topology_equals_true))?;
    writeln!(out, "{}", report.rooted_rf)?;

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NUM_QUINTETS, QuintetCatalog};
    use crate::distribution::{GeneDistribution, UnmatchedPolicy};
    use crate::ranking::{CANDIDATE_SIZE, infer_rooting};
    use crate::scoring::ScoringRules;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::path::PathBuf;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("quintet_rooting_{}_{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("[&R] ((1,2),3);"), " ((1,2),3);");
        assert_eq!(strip_comments("(1:[&rate=0.1]0.5,2);"), "(1:0.5,2);");
        assert_eq!(strip_comments("(1,2)[a[b]c];"), "(1,2);");
    }

    #[test]
    fn test_split_trees() {
        let trees = split_trees("[&U] ((1,2),3,(4,5));\n\n((1,3),2,(4,5))\n;  ");
        assert_eq!(trees, vec!["((1,2),3,(4,5));", "((1,3),2,(4,5));"]);
    }

    #[test]
    fn test_species_tree_namespace_is_sorted() {
        let path = temp_file("species.tre", b"[&R] ((((Pan,Homo),Gorilla),Pongo),Hylobates);\n");
        let (ns, tree) = read_species_tree(&path).unwrap();
        assert_eq!(ns.labels(), &["Gorilla", "Homo", "Hylobates", "Pan", "Pongo"]);
        assert!(tree.is_rooted());
        assert_eq!(tree.to_newick(&ns), "((((Pan,Homo),Gorilla),Pongo),Hylobates);");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_species_tree_must_have_five_taxa() {
        let path = temp_file("four.tre", b"((1,2),(3,4));\n");
        assert!(matches!(
            read_species_tree(&path),
            Err(QuintetError::InvalidInput(_))
        ));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_gene_trees_skip_malformed() {
        let ns = TaxonNamespace::quintet();
        let path = temp_file(
            "genes.tre",
            b"((1,2),3,(4,5));\n((1,2),3,(4,6));\n((1,2),3,(4,5);\n(1,2,3,4,5);\n",
        );
        let trees = read_gene_trees(&path, &ns).unwrap();
        // The foreign taxon and the unbalanced parentheses are dropped; the star
        // tree parses and is kept.
        assert_eq!(trees.len(), 2);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_gzipped_gene_trees() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"((1,2),3,(4,5));\n((1,3),2,(4,5));\n").unwrap();
        let path = temp_file("genes.tre.gz", &enc.finish().unwrap());

        let trees = read_gene_trees(&path, &TaxonNamespace::quintet()).unwrap();
        assert_eq!(trees.len(), 2);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_text("/nonexistent/genes.tre");
        assert!(matches!(result, Err(QuintetError::Io { .. })));
    }

    #[test]
    fn test_report_layout() {
        let catalog = QuintetCatalog::embedded().unwrap();
        let ns = catalog.namespace().clone();
        let mut counts = [0usize; NUM_QUINTETS];
        counts[0] = 10;
        let u = GeneDistribution::from_counts(counts, 10, UnmatchedPolicy::Deflate);
        let species = catalog.rooted(0).unwrap().clone();
        let report =
            infer_rooting(&catalog, &ScoringRules::default(), &species, &u, CANDIDATE_SIZE).unwrap();

        let mut buf = Vec::new();
        write_report(&mut buf, &report, &ns).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4 + CANDIDATE_SIZE + 6);
        assert_eq!(lines[0], "estimated gene tree distribution");
        assert_eq!(lines[1], "[1 0 0 0 0 0 0 0 0 0 0 0 0 0 0]");
        assert!(lines[2].starts_with("best rooted tree ("));
        assert_eq!(lines[3], "true species tree: ((((1,2),3),4),5)");
        for line in &lines[4..4 + CANDIDATE_SIZE] {
            assert_eq!(line.split(' ').count(), 4);
        }
        let flags = &lines[4 + CANDIDATE_SIZE..];
        assert_eq!(flags[0], "0");
        assert!(["c", "p", "b"].contains(&flags[1]));
        assert_eq!(flags[4], "1");
    }
}
