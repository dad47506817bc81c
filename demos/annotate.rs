use clap::Parser;
use geo_crossing_points::input::store_from_geojson;
use geo_crossing_points::{AnnotatorConfig, CrossingAnnotator, LogProgress, PairQuery};
use geojson::GeoJson;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (LineStrings / MultiLineStrings)
    #[arg(short, long)]
    input: PathBuf,

    /// Worker threads (defaults to available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Candidate pairs per dispatched batch
    #[arg(long, default_value_t = geo_crossing_points::annotator::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Query the index one geometry at a time instead of in bulk
    #[arg(long, default_value_t = false)]
    per_geometry: bool,

    /// Print every geometry's crossing points
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("Reading input from {:?}", args.input);
    let file = File::open(&args.input)?;
    let geojson: GeoJson = serde_json::from_reader(BufReader::new(file))?;
    let mut store = store_from_geojson(geojson)?;
    println!("Loaded {} features.", store.len());

    let mut config = AnnotatorConfig::default().with_chunk_size(args.chunk_size);
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if args.per_geometry {
        config = config.with_pair_query(PairQuery::PerGeometry);
    }

    let report = CrossingAnnotator::with_config(config).run(&mut store, &mut LogProgress)?;

    println!(
        "{} geometries indexed, {} skipped, {} candidate pairs, {} crossing pairs, {} failed pairs.",
        report.indexed,
        report.skipped.len(),
        report.candidate_pairs,
        report.crossing_pairs,
        report.failures.len()
    );

    if args.verbose {
        for record in store.iter() {
            let points: Vec<String> = record
                .crossing_points()
                .iter()
                .map(|c| format!("({}, {})", c.x, c.y))
                .collect();
            println!("{}: {}", record.key(), points.join(" "));
        }
    }

    Ok(())
}
