//! Command-line interface for the dashed-ring marker detector.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashring::{DetectConfig, Detector, MatchOutcome, ProductTable};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    name = "dashring",
    version,
    about = "Detect dashed-color-ring product markers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the marker in an image and resolve its product.
    Detect {
        /// Input image (any format the image crate reads).
        image: PathBuf,
        /// Product table JSON file (code → product name).
        #[arg(long)]
        products: PathBuf,
        /// Detector config JSON; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the detection JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve an already-extracted color code against the table.
    Resolve {
        /// Color code, two characters per dash.
        code: String,
        #[arg(long)]
        products: PathBuf,
    },
    /// Summarize the product table.
    ProductsInfo {
        #[arg(long)]
        products: PathBuf,
    },
}

fn main() -> CliResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Detect {
            image,
            products,
            config,
            out,
        } => run_detect(&image, &products, config.as_deref(), out.as_deref()),
        Command::Resolve { code, products } => run_resolve(&code, &products),
        Command::ProductsInfo { products } => run_products_info(&products),
    }
}

fn load_table(path: &std::path::Path) -> Result<ProductTable, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let table = ProductTable::from_json(&text)?;
    info!(products = table.len(), path = %path.display(), "loaded product table");
    Ok(table)
}

fn run_detect(
    image_path: &std::path::Path,
    products: &std::path::Path,
    config: Option<&std::path::Path>,
    out: Option<&std::path::Path>,
) -> CliResult {
    let table = load_table(products)?;
    let image = image::open(image_path)?.to_rgb8();

    let config = match config {
        Some(path) => serde_json::from_str::<DetectConfig>(&fs::read_to_string(path)?)?,
        None => DetectConfig::default(),
    };
    let detector = Detector::with_config(config);
    let detection = detector.detect(&image, &table)?;

    let report = serde_json::json!({
        "product": detection.product,
        "key": detection.key,
        "code": detection.code,
        "tier": detection.tier.to_string(),
        "center": detection.center,
        "radius": detection.radius,
        "attempts": detection.attempts,
        "points": detection.sequence.points(),
    });
    let rendered = serde_json::to_string_pretty(&report)?;
    match out {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn run_resolve(code: &str, products: &std::path::Path) -> CliResult {
    let table = load_table(products)?;
    match table.resolve(code) {
        MatchOutcome::Match { key, product, tier } => {
            println!("{product} (key {key}, {tier} tier)");
            Ok(())
        }
        MatchOutcome::NoMatch(similar) => Err(format!(
            "no product matched `{code}` (best similarity {:.2})",
            similar.ratio
        )
        .into()),
    }
}

fn run_products_info(products: &std::path::Path) -> CliResult {
    let table = load_table(products)?;
    println!("{} registered products", table.len());
    for (code, product) in table.iter() {
        println!("  {code}  {product}");
    }
    Ok(())
}
