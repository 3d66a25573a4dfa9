//! Immutable, index-based tree snapshots.
//!
//! # Overview
//! A `TreeSnapshot` is a tree whose leaves are addressed by their position in a
//! [`TaxonNamespace`] rather than by name. Parsing goes through `phylotree`; the
//! snapshot keeps only the topology in a small node arena, and derives the
//! bipartition encoding from it on demand.
//!
//! # What is a bipartition?
//! Each edge of a tree divides the leaves into two groups:
//! ```text
//!   1         4
//!    \       /
//!     *--3--*        edges give {1,2}|{3,4,5} and {1,2,3}|{4,5}
//!    /       \
//!   2         5
//! ```
//! Splits are stored by one side only: the side that does NOT contain taxon 0.
//! Rooted trees additionally expose their clades (the leaf set under each node),
//! which is what distinguishes two rootings of the same unrooted tree.
//!
//! # Why taxon indices and not node ids
//! Node ids depend on how the newick text was laid out. Namespace indices are
//! shared by every tree of a run, so identical taxon sets give identical bitsets.

use std::collections::HashSet;
use std::sync::OnceLock;

use phylotree::tree::Tree as PhyloTree;

use crate::bitset::Bitset;
use crate::error::{QuintetError, Result};
use crate::taxa::{TaxonMap, TaxonNamespace};

/// Parse newick text with `phylotree`.
///
/// # Errors
/// `InvalidInput` if the text is not a parenthesised, `;`-terminated tree or
/// does not parse.
pub fn parse_phylo(newick: &str) -> Result<PhyloTree> {
    let newick = newick.trim();
    // phylotree only accepts a parenthesised tree; bare labels abort its parser.
    if !newick.starts_with('(') || !newick.ends_with(';') {
        return Err(QuintetError::InvalidInput(format!(
            "'{newick}' is not a parenthesised newick tree"
        )));
    }
    PhyloTree::from_newick(newick).map_err(|e| {
        QuintetError::InvalidInput(format!("could not parse newick '{newick}': {e}"))
    })
}

#[derive(Debug, Clone)]
struct SnapNode {
    taxon: Option<usize>,
    children: Vec<usize>,
}

/// An immutable snapshot of a tree topology over a taxon namespace.
///
/// # Invariants
/// - every namespace taxon labels exactly one leaf
/// - nodes are stored children-first, so every child index is smaller than its
///   parent's and the root is the last node
/// - no node has exactly one child
///
/// The split and clade sets are computed at most once and cached; `OnceLock`
/// keeps snapshots `Sync` so the catalog can be shared across rayon workers.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    nodes: Vec<SnapNode>,
    rooted: bool,
    num_taxa: usize,
    splits: OnceLock<HashSet<Bitset>>,
    clades: OnceLock<HashSet<Bitset>>,
}

impl TreeSnapshot {
    /// Parse a newick string against a namespace.
    ///
    /// # Errors
    /// `InvalidInput` if the text does not parse, or if its leaves are not exactly
    /// the taxa of `namespace`.
    pub fn from_newick(newick: &str, namespace: &TaxonNamespace) -> Result<Self> {
        Self::from_phylo(&parse_phylo(newick)?, namespace)
    }

    /// Extract a snapshot from a parsed `phylotree` tree.
    ///
    /// A root with two children makes the snapshot rooted; a root with three or
    /// more children is the virtual root of an unrooted tree. Unifurcations are
    /// suppressed.
    pub fn from_phylo(tree: &PhyloTree, namespace: &TaxonNamespace) -> Result<Self> {
        let root_id = tree
            .get_root()
            .map_err(|e| QuintetError::InvalidInput(format!("tree has no root: {e}")))?;

        let mut nodes = Vec::with_capacity(tree.size());
        let mut seen = Bitset::empty();
        let root = Self::convert_node(root_id, tree, namespace, &mut nodes, &mut seen)?;

        if seen != Bitset::full(namespace.len()) {
            let missing: Vec<&str> = seen
                .complement(namespace.len())
                .iter_ones()
                .filter_map(|i| namespace.label(i))
                .collect();
            return Err(QuintetError::InvalidInput(format!(
                "tree is missing taxa {missing:?}"
            )));
        }
        // A suppressed unifurcation at the top leaves the real root last already;
        // anything else would break the children-first layout.
        debug_assert_eq!(root, nodes.len() - 1);

        let rooted = nodes[root].children.len() == 2;
        Ok(Self::from_nodes(nodes, rooted, namespace.len()))
    }

    /// Recursively copy `node_id` and its subtree into the arena, children first.
    fn convert_node(
        node_id: usize,
        tree: &PhyloTree,
        namespace: &TaxonNamespace,
        nodes: &mut Vec<SnapNode>,
        seen: &mut Bitset,
    ) -> Result<usize> {
        let node = tree
            .get(&node_id)
            .map_err(|e| QuintetError::InvalidInput(format!("malformed tree: {e}")))?;

        if node.children.is_empty() {
            let name = node
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| QuintetError::InvalidInput("tree has an unnamed leaf".into()))?;
            let taxon = namespace.index_of(name).ok_or_else(|| {
                QuintetError::InvalidInput(format!("taxon '{name}' is not in the namespace"))
            })?;
            if seen.contains(taxon) {
                return Err(QuintetError::InvalidInput(format!(
                    "taxon '{name}' labels more than one leaf"
                )));
            }
            seen.set(taxon);
            nodes.push(SnapNode {
                taxon: Some(taxon),
                children: Vec::new(),
            });
            return Ok(nodes.len() - 1);
        }

        let mut children = Vec::with_capacity(node.children.len());
        for &child_id in &node.children {
            children.push(Self::convert_node(child_id, tree, namespace, nodes, seen)?);
        }
        if children.len() == 1 {
            return Ok(children[0]);
        }
        nodes.push(SnapNode {
            taxon: None,
            children,
        });
        Ok(nodes.len() - 1)
    }

    fn from_nodes(nodes: Vec<SnapNode>, rooted: bool, num_taxa: usize) -> Self {
        TreeSnapshot {
            nodes,
            rooted,
            num_taxa,
            splits: OnceLock::new(),
            clades: OnceLock::new(),
        }
    }

    /// The unrooted reduction of this tree: same topology, compared by splits only.
    pub fn unrooted(&self) -> TreeSnapshot {
        let mut copy = self.clone();
        copy.rooted = false;
        copy
    }

    /// Structural copy with every leaf taxon `i` replaced by `map.apply(i)`.
    ///
    /// # Errors
    /// `InvalidInput` if the map does not cover this tree's namespace.
    pub fn relabel(&self, map: &TaxonMap) -> Result<TreeSnapshot> {
        if map.len() != self.num_taxa {
            return Err(QuintetError::InvalidInput(format!(
                "taxon map covers {} taxa, tree has {}",
                map.len(),
                self.num_taxa
            )));
        }
        let nodes = self
            .nodes
            .iter()
            .map(|node| SnapNode {
                taxon: node.taxon.map(|t| map.apply(t)),
                children: node.children.clone(),
            })
            .collect();
        Ok(Self::from_nodes(nodes, self.rooted, self.num_taxa))
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn children(&self, node: usize) -> &[usize] {
        &self.nodes[node].children
    }

    /// Taxon index of a leaf node, `None` for internal nodes.
    pub fn taxon(&self, node: usize) -> Option<usize> {
        self.nodes[node].taxon
    }

    /// Leaf set below every node, indexed like the arena.
    fn leaf_sets(&self) -> Vec<Bitset> {
        let mut sets: Vec<Bitset> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let set = match node.taxon {
                Some(t) => Bitset::singleton(t),
                None => {
                    let mut acc = Bitset::empty();
                    for &c in &node.children {
                        acc.or_assign(&sets[c]);
                    }
                    acc
                }
            };
            sets.push(set);
        }
        sets
    }

    /// Nontrivial bipartitions, each stored as the side without taxon 0.
    ///
    /// Trivial splits (a single leaf against the rest) are shared by every tree on
    /// the namespace and are left out.
    pub fn splits(&self) -> &HashSet<Bitset> {
        self.splits.get_or_init(|| {
            let n = self.num_taxa;
            let root = self.root();
            self.leaf_sets()
                .into_iter()
                .enumerate()
                .filter(|&(id, _)| id != root)
                .map(|(_, set)| if set.contains(0) { set.complement(n) } else { set })
                .filter(|set| set.count_ones() >= 2 && set.count_ones() + 2 <= n)
                .collect()
        })
    }

    /// Nontrivial clades: leaf sets of non-root nodes with at least two leaves.
    pub fn clades(&self) -> &HashSet<Bitset> {
        self.clades.get_or_init(|| {
            let root = self.root();
            self.leaf_sets()
                .into_iter()
                .enumerate()
                .filter(|&(id, set)| id != root && set.count_ones() >= 2)
                .map(|(_, set)| set)
                .collect()
        })
    }

    /// True when the unrooted topology is fully resolved (`n - 3` splits).
    pub fn is_resolved(&self) -> bool {
        self.num_taxa >= 3 && self.splits().len() == self.num_taxa - 3
    }

    /// Label-free shape signature of the subtree below `node`.
    ///
    /// Leaves are `x`; an internal node lists its children's keys in sorted order,
    /// so two subtrees have the same key iff they are isomorphic as unlabelled
    /// rooted trees.
    pub fn shape_key_of(&self, node: usize) -> String {
        match self.nodes[node].taxon {
            Some(_) => "x".to_string(),
            None => {
                let mut keys: Vec<String> = self.nodes[node]
                    .children
                    .iter()
                    .map(|&c| self.shape_key_of(c))
                    .collect();
                keys.sort();
                format!("({})", keys.join(","))
            }
        }
    }

    pub fn shape_key(&self) -> String {
        self.shape_key_of(self.root())
    }

    /// Newick text with namespace labels and no branch lengths.
    pub fn to_newick(&self, namespace: &TaxonNamespace) -> String {
        let mut out = String::new();
        self.write_newick(self.root(), namespace, &mut out);
        out.push(';');
        out
    }

    fn write_newick(&self, node: usize, namespace: &TaxonNamespace, out: &mut String) {
        match self.nodes[node].taxon {
            Some(t) => out.push_str(namespace.label(t).unwrap_or("?")),
            None => {
                out.push('(');
                for (k, &c) in self.nodes[node].children.iter().enumerate() {
                    if k > 0 {
                        out.push(',');
                    }
                    self.write_newick(c, namespace, out);
                }
                out.push(')');
            }
        }
    }
}
