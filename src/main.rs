//! Graph-based Topic Detection and Tracking
//!
//! Command-line front end: runs a topic analysis against a corpus.db and
//! writes the similarity matrix and clusters.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tdt_graph::analysis::analyze;
use tdt_graph::corpus::{Corpus, CorpusView};
use tdt_graph::db::{load_corpus, load_corpus_stats};
use tdt_graph::models::{TdtParams, TopicRequest};
use tdt_graph::output::{
    print_clusters, print_summary, write_clusters_csv_file, write_json_file, write_matrix_csv_file,
};

#[derive(Parser)]
#[command(name = "tdt-graph")]
#[command(about = "Topic detection and tracking over token co-occurrence graphs")]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for analysis results
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Full result as JSON
    Json,
    /// Matrix cells as CSV, clusters in a sibling `.clusters.csv`
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a topic from a prototype document and query vertices
    ///
    /// All parameters default to TdtParams::default(), optionally replaced by
    /// a JSON parameter file. Explicit flags override both.
    Analyze {
        /// Path to corpus.db
        #[arg(long)]
        corpus_db: PathBuf,

        /// Prototype document ID
        #[arg(long)]
        prototype: u32,

        /// Query vertex IDs, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        query: Vec<u32>,

        /// Candidate document IDs, comma-separated [default: every document]
        #[arg(long, value_delimiter = ',')]
        candidates: Option<Vec<u32>>,

        /// Output file path
        #[arg(long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// JSON file with pipeline parameters
        #[arg(long)]
        params: Option<PathBuf>,

        // === Overrides, all Option<T> to tell "unset" from "set explicitly" ===

        /// Flanking arcs per selected arc, plus one [default: 2]
        #[arg(long)]
        extra_arcs: Option<usize>,

        /// Selection budget per document [default: 350]
        #[arg(long)]
        arc_budget: Option<usize>,

        /// Minimum arcs per walk [default: 3]
        #[arg(long)]
        min_walk_len: Option<usize>,

        /// Shared vertices a candidate needs with the prototype, exclusive [default: 3]
        #[arg(long)]
        vertex_shared: Option<usize>,

        /// Shared vertices a document pair needs, exclusive [default: 1]
        #[arg(long)]
        pair_shared: Option<usize>,

        /// Core number for cluster extraction [default: 2]
        #[arg(long)]
        cluster_core_number: Option<usize>,

        /// Print first N clusters to console
        #[arg(long)]
        show_clusters: Option<usize>,
    },

    /// Show corpus statistics
    Stats {
        /// Path to corpus.db
        #[arg(long)]
        corpus_db: PathBuf,
    },

    /// Show document information
    Info {
        /// Path to corpus.db
        #[arg(long)]
        corpus_db: PathBuf,

        /// Document ID
        #[arg(long)]
        doc_id: u32,
    },

    /// Benchmark the pipeline on a synthetic corpus
    Benchmark {
        /// Number of documents
        #[arg(long, default_value = "200")]
        documents: u32,

        /// Tokens per document
        #[arg(long, default_value = "400")]
        length: usize,
    },
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Analyze {
            corpus_db,
            prototype,
            query,
            candidates,
            output,
            format,
            params,
            extra_arcs,
            arc_budget,
            min_walk_len,
            vertex_shared,
            pair_shared,
            cluster_core_number,
            show_clusters,
        } => {
            // Start with library defaults or the parameter file
            let base = match params {
                Some(path) => TdtParams::from_json_file(&path)?,
                None => TdtParams::default(),
            };

            // Overlay user-specified values
            let params = TdtParams {
                extra_arcs: extra_arcs.unwrap_or(base.extra_arcs),
                arc_budget: arc_budget.unwrap_or(base.arc_budget),
                min_walk_len: min_walk_len.unwrap_or(base.min_walk_len),
                vertex_shared: vertex_shared.unwrap_or(base.vertex_shared),
                pair_shared: pair_shared.unwrap_or(base.pair_shared),
                cluster_core_number: cluster_core_number.unwrap_or(base.cluster_core_number),
                ..base
            };

            let corpus = load_corpus(&corpus_db)?;
            let request = TopicRequest {
                prototype,
                query: query.into_iter().collect::<BTreeSet<_>>(),
                candidates: candidates.unwrap_or_else(|| corpus.document_ids()),
            };

            let result = analyze(&corpus, &request, &params, !quiet)?;

            match format {
                OutputFormat::Json => {
                    write_json_file(&result, &output)?;
                }
                OutputFormat::Csv => {
                    write_matrix_csv_file(&result.matrix, &output)?;
                    let clusters_path = output.with_extension("clusters.csv");
                    write_clusters_csv_file(&result.clusters, &result.retained, &clusters_path)?;
                    if !quiet {
                        eprintln!("Clusters output: {}", clusters_path.display());
                    }
                }
            }

            // Print summary
            if !quiet {
                print_summary(&result);
                eprintln!("\nOutput: {}", output.display());
            }

            if let Some(limit) = show_clusters {
                println!("\n=== Clusters ===");
                print_clusters(&result, Some(limit));
            }
        }

        Commands::Stats { corpus_db } => {
            let stats = load_corpus_stats(&corpus_db)?;

            println!("=== Corpus Statistics ===");
            println!("Total documents: {}", stats.total_documents);
            println!("Total collections: {}", stats.total_collections);
            println!("Total tokens: {}", stats.total_tokens);
            println!("Weighted vertices: {}", stats.weighted_vertices);
        }

        Commands::Info { corpus_db, doc_id } => {
            let corpus = load_corpus(&corpus_db)?;
            let info = corpus.document(doc_id)?.info();

            println!("=== Document {} ===", info.doc_id);
            println!("Collection: {}", info.collection);
            println!("Tokens: {}", info.token_count);
            println!("Arcs: {}", info.arc_count);
            println!("Vertices: {}", info.vertex_count);
            println!("Mean arc weight: {:.3}", info.mean_arc_weight);
        }

        Commands::Benchmark { documents, length } => {
            run_benchmark(documents, length)?;
        }
    }

    Ok(())
}

/// Run the full pipeline on a synthetic corpus to measure performance.
fn run_benchmark(documents: u32, length: usize) -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Instant;

    println!("=== Pipeline Benchmark ===");
    println!("Documents: {}", documents);
    println!("Tokens per document: {}", length);

    let start = Instant::now();
    let corpus = Corpus::synthetic(documents, length, 400)?;
    println!("\nCorpus build: {:.3}s", start.elapsed().as_secs_f64());

    let prototype = 4.min(documents);
    let query = corpus.document(prototype)?.vertices().into_iter().take(6).collect();
    let request = TopicRequest {
        prototype,
        query,
        candidates: corpus.document_ids(),
    };
    let params = TdtParams::default();

    let start = Instant::now();
    let result = analyze(&corpus, &request, &params, false)?;
    let elapsed = start.elapsed();

    info!(status = result.status.message(), "Benchmark run finished");
    println!("Analysis: {:.3}s", elapsed.as_secs_f64());
    println!("  Retained: {}", result.summary.candidate_count);
    println!("  Matrix cells: {}", result.matrix.len());
    println!("  Clusters: {}", result.clusters.len());
    println!(
        "  Pairs/sec: {:.0}",
        result.summary.cell_count as f64 / elapsed.as_secs_f64().max(1e-9)
    );

    Ok(())
}
