//! The fixed library of quintet topologies.
//!
//! # Layout
//! - 15 unrooted quintets, `((a,b),c,(d,e))`, indexed 0..15
//! - 105 rooted quintets, indexed globally:
//!
//! | family             | shape               | global range | base |
//! |--------------------|---------------------|--------------|------|
//! | caterpillar        | `((((a,b),c),d),e)` | 0..60        | 0    |
//! | pseudo-caterpillar | `(((a,b),(c,d)),e)` | 60..75       | 6    |
//! | balanced           | `(((a,b),c),(d,e))` | 75..105      | 0    |
//!
//! The base entry of a family is the labelling the family's scoring classes are
//! written against (see `scoring`). All entries are written over the namespace
//! `{1,2,3,4,5}`.
//!
//! The topology files under `topologies/` are compiled into the binary; a
//! directory holding the same four files can be loaded instead.

use std::fmt;
use std::path::Path;

use log::debug;

use crate::distances::equal_topology;
use crate::error::{QuintetError, Result};
use crate::io::{parse_tree_list, read_text};
use crate::snapshot::TreeSnapshot;
use crate::taxa::TaxonNamespace;

/// Number of unrooted quintet topologies.
pub const NUM_QUINTETS: usize = 15;
/// Number of rooted quintet topologies.
pub const NUM_ROOTED: usize = 105;

pub const QUINTETS_FILE: &str = "quintets.tre";

const EMBEDDED_QUINTETS: &str = include_str!("../topologies/quintets.tre");
const EMBEDDED_CATERPILLAR: &str = include_str!("../topologies/caterpillar.tre");
const EMBEDDED_PSEUDO_CATERPILLAR: &str = include_str!("../topologies/pseudo_caterpillar.tre");
const EMBEDDED_BALANCED: &str = include_str!("../topologies/balanced.tre");

/// Structural family of a rooted quintet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Caterpillar,
    PseudoCaterpillar,
    Balanced,
}

impl Family {
    /// Families in global catalog order.
    pub const ALL: [Family; 3] = [
        Family::Caterpillar,
        Family::PseudoCaterpillar,
        Family::Balanced,
    ];

    /// One-letter tag used in reports.
    pub fn tag(self) -> char {
        match self {
            Family::Caterpillar => 'c',
            Family::PseudoCaterpillar => 'p',
            Family::Balanced => 'b',
        }
    }

    pub fn size(self) -> usize {
        match self {
            Family::Caterpillar => 60,
            Family::PseudoCaterpillar => 15,
            Family::Balanced => 30,
        }
    }

    /// First global index of the family.
    pub fn offset(self) -> usize {
        match self {
            Family::Caterpillar => 0,
            Family::PseudoCaterpillar => 60,
            Family::Balanced => 75,
        }
    }

    /// Family-local index of the base tree.
    pub fn base_index(self) -> usize {
        match self {
            Family::Caterpillar => 0,
            Family::PseudoCaterpillar => 6,
            Family::Balanced => 0,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Family::Caterpillar => "caterpillar.tre",
            Family::PseudoCaterpillar => "pseudo_caterpillar.tre",
            Family::Balanced => "balanced.tre",
        }
    }

    /// Classify a rooted quintet by shape, `None` for anything else.
    pub fn of_shape(tree: &TreeSnapshot) -> Option<Family> {
        if !tree.is_rooted() || tree.num_taxa() != 5 {
            return None;
        }
        match tree.shape_key().as_str() {
            "((((x,x),x),x),x)" => Some(Family::Caterpillar),
            "(((x,x),(x,x)),x)" => Some(Family::PseudoCaterpillar),
            "(((x,x),x),(x,x))" => Some(Family::Balanced),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The 15 unrooted and 105 rooted quintet topologies. Read-only after load.
#[derive(Debug, Clone)]
pub struct QuintetCatalog {
    namespace: TaxonNamespace,
    unrooted: Vec<TreeSnapshot>,
    caterpillar: Vec<TreeSnapshot>,
    pseudo_caterpillar: Vec<TreeSnapshot>,
    balanced: Vec<TreeSnapshot>,
}

impl QuintetCatalog {
    /// The catalog compiled into the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_sources(
            EMBEDDED_QUINTETS,
            EMBEDDED_CATERPILLAR,
            EMBEDDED_PSEUDO_CATERPILLAR,
            EMBEDDED_BALANCED,
        )
    }

    /// Load `quintets.tre`, `caterpillar.tre`, `pseudo_caterpillar.tre` and
    /// `balanced.tre` from a directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let load = |name: &str| {
            read_text(dir.join(name)).map_err(|e| {
                QuintetError::CatalogLoad(format!("{}: {e}", dir.join(name).display()))
            })
        };
        Self::from_sources(
            &load(QUINTETS_FILE)?,
            &load(Family::Caterpillar.file_name())?,
            &load(Family::PseudoCaterpillar.file_name())?,
            &load(Family::Balanced.file_name())?,
        )
    }

    /// Build and validate a catalog from the text of the four topology files.
    pub fn from_sources(
        quintets: &str,
        caterpillar: &str,
        pseudo_caterpillar: &str,
        balanced: &str,
    ) -> Result<Self> {
        let namespace = TaxonNamespace::quintet();
        let parse = |text: &str, what: &str| {
            parse_tree_list(text, &namespace)
                .map_err(|e| QuintetError::CatalogLoad(format!("{what}: {e}")))
        };

        let catalog = QuintetCatalog {
            unrooted: parse(quintets, QUINTETS_FILE)?,
            caterpillar: parse(caterpillar, Family::Caterpillar.file_name())?,
            pseudo_caterpillar: parse(
                pseudo_caterpillar,
                Family::PseudoCaterpillar.file_name(),
            )?,
            balanced: parse(balanced, Family::Balanced.file_name())?,
            namespace,
        };
        catalog.validate()?;
        debug!(
            "Loaded quintet catalog: {} unrooted, {} rooted topologies",
            catalog.unrooted.len(),
            NUM_ROOTED
        );
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.unrooted.len() != NUM_QUINTETS {
            return Err(QuintetError::CatalogLoad(format!(
                "expected {NUM_QUINTETS} unrooted quintets, found {}",
                self.unrooted.len()
            )));
        }
        for (i, q) in self.unrooted.iter().enumerate() {
            if q.is_rooted() || !q.is_resolved() {
                return Err(QuintetError::CatalogLoad(format!(
                    "unrooted quintet {i} is not a resolved unrooted tree"
                )));
            }
        }
        check_distinct(&self.unrooted, QUINTETS_FILE)?;

        for family in Family::ALL {
            let trees = self.rooted_family(family);
            if trees.len() != family.size() {
                return Err(QuintetError::CatalogLoad(format!(
                    "expected {} trees in {}, found {}",
                    family.size(),
                    family.file_name(),
                    trees.len()
                )));
            }
            for (i, t) in trees.iter().enumerate() {
                if Family::of_shape(t) != Some(family) {
                    return Err(QuintetError::CatalogLoad(format!(
                        "entry {i} of {} is not a {family:?} tree",
                        family.file_name()
                    )));
                }
            }
            check_distinct(trees, family.file_name())?;
        }
        Ok(())
    }

    pub fn namespace(&self) -> &TaxonNamespace {
        &self.namespace
    }

    pub fn unrooted_quintets(&self) -> &[TreeSnapshot] {
        &self.unrooted
    }

    pub fn rooted_family(&self, family: Family) -> &[TreeSnapshot] {
        match family {
            Family::Caterpillar => &self.caterpillar,
            Family::PseudoCaterpillar => &self.pseudo_caterpillar,
            Family::Balanced => &self.balanced,
        }
    }

    pub fn family_base(&self, family: Family) -> &TreeSnapshot {
        &self.rooted_family(family)[family.base_index()]
    }

    /// Family and family-local index of a global rooted index.
    pub fn locate(&self, global: usize) -> Option<(Family, usize)> {
        Family::ALL
            .into_iter()
            .find(|f| (f.offset()..f.offset() + f.size()).contains(&global))
            .map(|f| (f, global - f.offset()))
    }

    pub fn rooted(&self, global: usize) -> Option<&TreeSnapshot> {
        self.locate(global)
            .map(|(family, local)| &self.rooted_family(family)[local])
    }

    /// All rooted candidates as `(global index, family, tree)` in catalog order.
    pub fn candidates(&self) -> impl Iterator<Item = (usize, Family, &TreeSnapshot)> + '_ {
        Family::ALL.into_iter().flat_map(move |family| {
            self.rooted_family(family)
                .iter()
                .enumerate()
                .map(move |(local, tree)| (family.offset() + local, family, tree))
        })
    }
}

/// Fails if two trees of one list are the same topology.
fn check_distinct(trees: &[TreeSnapshot], what: &str) -> Result<()> {
    for (i, a) in trees.iter().enumerate() {
        for (j, b) in trees.iter().enumerate().skip(i + 1) {
            if equal_topology(a, b)? {
                return Err(QuintetError::CatalogLoad(format!(
                    "entries {i} and {j} of {what} are the same topology"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distances::rf_distance;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = QuintetCatalog::embedded().unwrap();
        assert_eq!(catalog.unrooted_quintets().len(), NUM_QUINTETS);
        assert_eq!(catalog.candidates().count(), NUM_ROOTED);
        for family in Family::ALL {
            assert_eq!(catalog.rooted_family(family).len(), family.size());
        }
    }

    #[test]
    fn test_family_bases() {
        let catalog = QuintetCatalog::embedded().unwrap();
        let ns = catalog.namespace();
        assert_eq!(
            catalog.family_base(Family::Caterpillar).to_newick(ns),
            "((((1,2),3),4),5);"
        );
        assert_eq!(
            catalog.family_base(Family::PseudoCaterpillar).to_newick(ns),
            "(((1,2),(4,5)),3);"
        );
        assert_eq!(
            catalog.family_base(Family::Balanced).to_newick(ns),
            "(((1,2),3),(4,5));"
        );
        // All three bases are rootings of the first unrooted quintet.
        for family in Family::ALL {
            let base = catalog.family_base(family);
            assert_eq!(rf_distance(base, &catalog.unrooted_quintets()[0]).unwrap(), 0);
        }
    }

    #[test]
    fn test_locate_and_offsets() {
        let catalog = QuintetCatalog::embedded().unwrap();
        assert_eq!(catalog.locate(0), Some((Family::Caterpillar, 0)));
        assert_eq!(catalog.locate(59), Some((Family::Caterpillar, 59)));
        assert_eq!(catalog.locate(66), Some((Family::PseudoCaterpillar, 6)));
        assert_eq!(catalog.locate(75), Some((Family::Balanced, 0)));
        assert_eq!(catalog.locate(104), Some((Family::Balanced, 29)));
        assert_eq!(catalog.locate(105), None);

        for (global, family, tree) in catalog.candidates() {
            assert_eq!(Family::of_shape(tree), Some(family));
            assert!(std::ptr::eq(catalog.rooted(global).unwrap(), tree));
        }
    }

    #[test]
    fn test_all_rooted_topologies_are_distinct() {
        let catalog = QuintetCatalog::embedded().unwrap();
        let all: Vec<&TreeSnapshot> = catalog.candidates().map(|(_, _, t)| t).collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(rf_distance(a, b).unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_every_unrooted_quintet_has_seven_rootings() {
        let catalog = QuintetCatalog::embedded().unwrap();
        for q in catalog.unrooted_quintets() {
            let rootings = catalog
                .candidates()
                .filter(|(_, _, t)| rf_distance(t, q).unwrap() == 0)
                .count();
            assert_eq!(rootings, 7);
        }
    }

    #[test]
    fn test_rejects_short_catalog() {
        let result = QuintetCatalog::from_sources(
            "((1,2),3,(4,5));\n",
            EMBEDDED_CATERPILLAR,
            EMBEDDED_PSEUDO_CATERPILLAR,
            EMBEDDED_BALANCED,
        );
        assert!(matches!(result, Err(QuintetError::CatalogLoad(_))));
    }

    #[test]
    fn test_rejects_wrong_family_shape() {
        let swapped = EMBEDDED_CATERPILLAR.replacen("((((1,2),3),4),5);", "(((1,2),3),(4,5));", 1);
        let result = QuintetCatalog::from_sources(
            EMBEDDED_QUINTETS,
            &swapped,
            EMBEDDED_PSEUDO_CATERPILLAR,
            EMBEDDED_BALANCED,
        );
        assert!(matches!(result, Err(QuintetError::CatalogLoad(_))));
    }

    #[test]
    fn test_rejects_duplicate_quintets() {
        let duplicated = EMBEDDED_QUINTETS.replacen("((1,2),4,(3,5));", "((1,2),3,(4,5));", 1);
        let result = QuintetCatalog::from_sources(
            &duplicated,
            EMBEDDED_CATERPILLAR,
            EMBEDDED_PSEUDO_CATERPILLAR,
            EMBEDDED_BALANCED,
        );
        assert!(matches!(result, Err(QuintetError::CatalogLoad(_))));
    }

    #[test]
    fn test_missing_directory_is_a_load_error() {
        let result = QuintetCatalog::from_dir("/nonexistent/topologies");
        assert!(matches!(result, Err(QuintetError::CatalogLoad(_))));
    }

    #[test]
    fn test_family_tags() {
        assert_eq!(Family::Caterpillar.tag(), 'c');
        assert_eq!(Family::PseudoCaterpillar.to_string(), "p");
        assert_eq!(Family::Balanced.tag(), 'b');
    }
}
