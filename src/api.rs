//! Python binding layer for quintet rooting.
//!
//! Provides Python functions that run the rooting pipeline on a species tree
//! file and a gene tree file.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::catalog::QuintetCatalog;
use crate::distribution::{GeneDistribution, UnmatchedPolicy, estimate_distribution};
use crate::error::QuintetError;
use crate::io::{read_gene_trees, read_species_tree};
use crate::ranking::{CANDIDATE_SIZE, infer_rooting};
use crate::scoring::ScoringRules;
use crate::snapshot::TreeSnapshot;
use crate::taxa::TaxonNamespace;

/// One ranked candidate: (newick, score, rooted RF to the species tree, family tag).
type CandidateRow = (String, f64, usize, String);

/// Validation of the best candidate: (unrooted RF, family tag, true tree in
/// top-k, best equals true tree, best topology equals true topology, rooted RF).
type Summary = (usize, String, bool, bool, bool, usize);

fn to_py_err(e: QuintetError) -> PyErr {
    match e {
        QuintetError::Io { .. } => PyIOError::new_err(e.to_string()),
        _ => PyValueError::new_err(format!("{}: {e}", e.kind())),
    }
}

/// Read both files and estimate the gene tree distribution.
fn load(
    species_path: &str,
    genes_path: &str,
    policy: UnmatchedPolicy,
) -> Result<(QuintetCatalog, TaxonNamespace, TreeSnapshot, GeneDistribution), QuintetError> {
    let catalog = QuintetCatalog::embedded()?;
    let (namespace, species_tree) = read_species_tree(species_path)?;
    let gene_trees = read_gene_trees(genes_path, &namespace)?;
    let distribution = estimate_distribution(&gene_trees, &catalog, policy)?;
    Ok((catalog, namespace, species_tree, distribution))
}

fn newick(tree: &TreeSnapshot, namespace: &TaxonNamespace) -> String {
    tree.to_newick(namespace).trim_end_matches(';').to_string()
}

/// Rank the rooted quintets for a species tree given its gene trees.
///
/// Args:
///     species_path: Rooted newick species tree on 5 taxa
///     genes_path: Newick gene trees on the same taxa (optionally .gz)
///     top_k: Number of ranked candidates to return (default: 7)
///     renormalize: Divide by classified gene trees instead of all gene trees (default: False)
///
/// Returns:
///     A tuple of (distribution, candidates, summary) where:
///     - distribution is the list of 15 quintet frequencies
///     - candidates is a list of (newick, score, rooted_rf, family) best first
///     - summary is (unrooted_rf, family, true_in_top_k, best_is_true, topology_is_true, rooted_rf)
///
/// Raises:
///     ValueError: If a tree is malformed or the species tree is not a rooted quintet
///     IOError: If a file cannot be read
#[pyfunction]
#[pyo3(signature = (species_path, genes_path, top_k=CANDIDATE_SIZE, renormalize=false))]
fn root_quintet(
    species_path: &str,
    genes_path: &str,
    top_k: usize,
    renormalize: bool,
) -> PyResult<(Vec<f64>, Vec<CandidateRow>, Summary)> {
    let policy = if renormalize {
        UnmatchedPolicy::Renormalize
    } else {
        UnmatchedPolicy::Deflate
    };
    let (catalog, namespace, species_tree, distribution) =
        load(species_path, genes_path, policy).map_err(to_py_err)?;

    let report = infer_rooting(
        &catalog,
        &ScoringRules::default(),
        &species_tree,
        &distribution,
        top_k,
    )
    .map_err(to_py_err)?;

    let candidates = report
        .candidates
        .iter()
        .map(|c| {
            (
                newick(&c.tree, &namespace),
                c.score,
                c.rooted_rf,
                c.family.tag().to_string(),
            )
        })
        .collect();

    let summary = (
        report.unrooted_rf,
        report.best().family.tag().to_string(),
        report.true_in_top_k,
        report.best_equals_true,
        report.topology_equals_true,
        report.rooted_rf,
    );

    Ok((report.distribution.frequencies().to_vec(), candidates, summary))
}

/// Estimate the frequencies of the 15 unrooted quintets among the gene trees.
///
/// Args:
///     species_path: Newick species tree, used for its taxon labels
///     genes_path: Newick gene trees on the same taxa (optionally .gz)
///
/// Returns:
///     A list of 15 frequencies in canonical quintet order
#[pyfunction]
fn gene_tree_distribution(species_path: &str, genes_path: &str) -> PyResult<Vec<f64>> {
    let (_, _, _, distribution) =
        load(species_path, genes_path, UnmatchedPolicy::Deflate).map_err(to_py_err)?;
    Ok(distribution.frequencies().to_vec())
}

/// Python module definition
#[pymodule]
fn quintet_rooting(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(root_quintet, m)?)?;
    m.add_function(wrap_pyfunction!(gene_tree_distribution, m)?)?;
    Ok(())
}
