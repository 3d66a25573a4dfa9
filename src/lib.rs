//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `bitset`: compact bitset representation for clades and splits.
//! - `snapshot`: index-based tree snapshot with split/clade encoding.
//! - `taxa`: taxon namespaces and structural taxon maps.
//! - `distances`: Robinson-Foulds distance and topology equality.
//! - `catalog`: the 15 unrooted and 105 rooted quintet topologies.
//! - `mapper`: carrying a taxon map over to the canonical quintet indices.
//! - `distribution`: gene-tree frequencies over the canonical quintets.
//! - `scoring`: family class tables and the candidate cost.
//! - `ranking`: scoring all candidates, ranking and validation.
//! - `io`: newick reading (plain or gzip) and report writing.
//! - `logging`: `env_logger` setup for the binary.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod catalog;
pub mod distances;
pub mod distribution;
pub mod error;
pub mod io;
pub mod logging;
pub mod mapper;
pub mod ranking;
pub mod scoring;
pub mod snapshot;
pub mod taxa;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use catalog::{Family, QuintetCatalog};
pub use distances::{equal_topology, rf_distance};
pub use distribution::{GeneDistribution, UnmatchedPolicy, estimate_distribution};
pub use error::{QuintetError, Result};
pub use io::{read_gene_trees, read_species_tree, write_report};
pub use ranking::{RootingReport, infer_rooting};
pub use scoring::ScoringRules;
pub use snapshot::TreeSnapshot;
pub use taxa::{TaxonMap, TaxonNamespace, build_taxon_map};
