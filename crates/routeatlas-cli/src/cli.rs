use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RouteAtlas - route network ETL pipeline
#[derive(Parser, Debug)]
#[command(name = "routeatlas")]
#[command(about = "Process, store, and render route network data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a routeatlas.toml configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "memory")]
    pub storage: StorageBackend,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory storage (default, for development)
    Memory,
    /// PostgreSQL/PostGIS persistent storage
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a vector file: measure routes, normalize CRS, write output
    Process(ProcessArgs),

    /// Load processed GeoJSON files into the feature store
    Push(PushArgs),

    /// Render stored features to a static HTML map
    Render(RenderArgs),

    /// Compute raster statistics for polygon zones
    Zonal(ZonalArgs),

    /// Show datasets, feature counts, and configuration
    Status,

    /// Run health checks and diagnostics
    Doctor(DoctorArgs),

    /// Check or pin a requirements.in dependency manifest
    Manifest(ManifestArgs),
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Input vector file (GeoJSON, Shapefile, or CSV with WKT geometry)
    pub input: PathBuf,

    /// Directory to write processed output into
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// EPSG code of the source data, overriding file metadata and config
    #[arg(long)]
    pub source_crs: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value = "geojson")]
    pub format: ProcessFormat,
}

/// Output format for processed data
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProcessFormat {
    /// GeoJSON FeatureCollection
    Geojson,
    /// CSV with a WKT geometry column
    Csv,
}

#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Processed GeoJSON file to load
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Directory containing processed GeoJSON files
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// File pattern to match when using --input-dir
    #[arg(long, default_value = "*.geojson")]
    pub pattern: String,

    /// Features per insert batch (overrides config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Clear stored data before loading the first file
    #[arg(long)]
    pub drop_existing: bool,

    /// Dataset name (defaults to the file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// Reproject and load files whose CRS differs from the workspace CRS
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Output HTML file
    #[arg(long, default_value = "map.html")]
    pub output: PathBuf,

    /// Only render features from this dataset
    #[arg(long)]
    pub dataset: Option<String>,

    /// Filter features by property equality (repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    pub filter: Vec<String>,

    /// Maximum features to fetch (overrides config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Map title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ZonalArgs {
    /// ESRI ASCII grid raster file
    pub raster: PathBuf,

    /// Vector file containing polygon zones
    pub zones: PathBuf,

    /// Property that names each zone in the output
    #[arg(long)]
    pub property: Option<String>,

    /// EPSG code of the raster grid (defaults to the configured ingest CRS)
    #[arg(long)]
    pub raster_crs: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Show detailed check information
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct ManifestArgs {
    #[command(subcommand)]
    pub command: ManifestCommands,
}

#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// Parse a manifest and report lint findings
    Check(ManifestCheckArgs),

    /// Resolve a manifest into pinned version constraints
    Lock(ManifestLockArgs),
}

#[derive(Parser, Debug)]
pub struct ManifestCheckArgs {
    /// Path to the requirements.in file
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ManifestLockArgs {
    /// Path to the requirements.in file
    pub path: PathBuf,

    /// Write pinned output to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from([
            "routeatlas",
            "process",
            "routes.geojson",
            "--format",
            "csv",
            "--source-crs",
            "27700",
        ]);
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.input, PathBuf::from("routes.geojson"));
                assert_eq!(args.format, ProcessFormat::Csv);
                assert_eq!(args.source_crs, Some(27700));
            }
            other => panic!("expected process command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["routeatlas", "status", "--json", "--storage", "postgres"]);
        assert!(cli.json);
        assert!(matches!(cli.storage, StorageBackend::Postgres));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_parse_manifest_lock() {
        let cli = Cli::parse_from([
            "routeatlas",
            "manifest",
            "lock",
            "requirements.in",
            "--output",
            "requirements.txt",
        ]);
        match cli.command {
            Commands::Manifest(args) => match args.command {
                ManifestCommands::Lock(lock) => {
                    assert_eq!(lock.path, PathBuf::from("requirements.in"));
                    assert_eq!(lock.output, Some(PathBuf::from("requirements.txt")));
                }
                other => panic!("expected lock subcommand, got {:?}", other),
            },
            other => panic!("expected manifest command, got {:?}", other),
        }
    }
}
