mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mateline_core::PositionSampler;
use mateline_export::FileExporter;
use mateline_gen::PuzzleGenerator;
use mateline_uci::EngineSession;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    info!("mateline starting");

    let session = EngineSession::open(cli.engine_config())
        .with_context(|| format!("failed to start engine {}", cli.engine.display()))?;
    let engine_name = session.engine_name().unwrap_or("unknown engine").to_string();

    let stop = session.stop_handle();
    let on_interrupt = stop.clone();
    ctrlc::set_handler(move || {
        warn!("interrupted, cancelling the current search");
        on_interrupt.stop();
    })
    .context("failed to set Ctrl-C handler")?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(engine = %engine_name, seed, out = %cli.out.display(), "configured");

    let sampler = PositionSampler::new(cli.sampler_config(), ChaCha8Rng::seed_from_u64(seed));
    let mut exporter = FileExporter::create(cli.export_config(engine_name))
        .with_context(|| format!("failed to prepare {}", cli.out.display()))?;

    let mut generator =
        PuzzleGenerator::new(cli.generator_config(), sampler, session).with_stop_handle(stop);
    let result = generator.run(&mut exporter);
    generator.into_analyzer().close();

    let summary = result.context("puzzle generation failed")?;
    exporter
        .finish(&summary)
        .context("failed to write the run summary")?;

    if summary.is_partial() {
        warn!(
            accepted = summary.accepted,
            target = summary.target,
            trials = summary.trials,
            reason = %summary.stop_reason,
            "generated fewer puzzles than requested"
        );
    }
    info!(
        accepted = summary.accepted,
        written = exporter.written(),
        out = %exporter.output_dir().display(),
        "done"
    );
    Ok(())
}
