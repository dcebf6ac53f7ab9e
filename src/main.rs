use clap::Parser;
use closure_energy_figure::{generate_figure, logging, FigureConfig};

/// Takes no options: the figure parameters are fixed.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Render the closure-energy vs time figure to closure_energy_vs_time.pdf"
)]
struct Cli {}

fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();
    logging::init_tracing();

    let summary = generate_figure(&FigureConfig::default())?;
    println!("Wrote: {}", summary.output_path.display());

    Ok(())
}
