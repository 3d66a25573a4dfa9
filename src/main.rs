use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use quintet_rooting::catalog::QuintetCatalog;
use quintet_rooting::distribution::{UnmatchedPolicy, estimate_distribution};
use quintet_rooting::error::QuintetError;
use quintet_rooting::io::{read_gene_trees, read_species_tree, write_report};
use quintet_rooting::logging::{init_logger, level_for};
use quintet_rooting::ranking::{CANDIDATE_SIZE, infer_rooting};
use quintet_rooting::scoring::ScoringRules;
use std::path::PathBuf;
use std::time::Instant;

/// Root a five-taxon species tree from the frequencies of its unrooted gene trees,
/// and report how the best rooted candidates compare to the true rooted tree.
#[derive(Parser, Debug)]
#[command(name = "quintet-rooting", version, about = "Quintet rooting from gene-tree frequencies")]
struct Args {
    /// Rooted species tree (newick, 5 taxa)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Gene trees (newick, one or more trees, optionally .gz)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Scoring mode: n (naive) | c (clustering)
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = ModeArg::C)]
    mode: ModeArg,

    /// Directory holding the topology files instead of the built-in catalog
    #[arg(long = "topologies")]
    topologies: Option<PathBuf>,

    /// Number of ranked candidates to report
    #[arg(short = 'k', long = "top-k", default_value_t = CANDIDATE_SIZE)]
    top_k: usize,

    /// How to normalise when gene trees match no quintet
    #[arg(long = "unmatched", value_enum, default_value_t = UnmatchedArg::Deflate)]
    unmatched: UnmatchedArg,

    /// Quiet mode: only warnings and errors on stderr
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,

    /// Verbose mode: debug messages on stderr
    #[arg(short = 'v', long = "verbose", default_value_t = false, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    N,
    C,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UnmatchedArg {
    Deflate,
    Renormalize,
}

impl From<UnmatchedArg> for UnmatchedPolicy {
    fn from(arg: UnmatchedArg) -> Self {
        match arg {
            UnmatchedArg::Deflate => UnmatchedPolicy::Deflate,
            UnmatchedArg::Renormalize => UnmatchedPolicy::Renormalize,
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logger(level_for(args.quiet, args.verbose));

    if let Err(e) = run(&args) {
        error!("{}: {e}", e.kind());
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &QuintetError) -> i32 {
    match e {
        QuintetError::InvalidInput(_) | QuintetError::Io { .. } => 2,
        QuintetError::CatalogLoad(_) => 3,
        QuintetError::TopologyMismatch(_)
        | QuintetError::MappingError(_)
        | QuintetError::UnmappableQuintet(_) => 4,
    }
}

fn run(args: &Args) -> Result<(), QuintetError> {
    if let ModeArg::N = args.mode {
        warn!("Naive scoring is not available, using clustering");
    }

    let t0 = Instant::now();
    let catalog = match &args.topologies {
        Some(dir) => QuintetCatalog::from_dir(dir)?,
        None => QuintetCatalog::embedded()?,
    };
    let rules = ScoringRules::default();
    rules.validate()?;
    info!("Loading quintet catalog {:.3}s", t0.elapsed().as_secs_f64());

    let t1 = Instant::now();
    let (namespace, species_tree) = read_species_tree(&args.input)?;
    let gene_trees = read_gene_trees(&args.output, &namespace)?;
    info!("Reading trees {:.3}s", t1.elapsed().as_secs_f64());
    if gene_trees.is_empty() {
        warn!("No gene trees parsed from {:?}", args.output);
    }

    let t2 = Instant::now();
    let distribution = estimate_distribution(&gene_trees, &catalog, args.unmatched.into())?;
    info!(
        "Estimated distribution from {} gene trees ({} classified) {:.3}s",
        distribution.total(),
        distribution.classified(),
        t2.elapsed().as_secs_f64()
    );

    let t3 = Instant::now();
    let report = infer_rooting(&catalog, &rules, &species_tree, &distribution, args.top_k)?;
    info!("Scoring candidates {:.3}s", t3.elapsed().as_secs_f64());

    let stdout = std::io::stdout();
    write_report(&mut stdout.lock(), &report, &namespace)
        .map_err(|e| QuintetError::io("-", "write report", e))?;
    Ok(())
}
