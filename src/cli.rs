//! Command-line arguments and their mapping onto the library configs.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use mateline_core::{SamplerConfig, WalkPolicy};
use mateline_export::ExportConfig;
use mateline_gen::GeneratorConfig;
use mateline_uci::{EngineConfig, SearchBudget};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate verified mate-in-N chess puzzles with an external UCI engine"
)]
pub struct Cli {
    /// Path to the UCI engine binary
    #[arg(long, default_value = "stockfish")]
    pub engine: PathBuf,

    /// Extra arguments passed to the engine process
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Number of puzzles to generate
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: u32,

    /// Maximum positions to try before giving up
    #[arg(long, default_value_t = 1000)]
    pub max_trials: u32,

    /// Longest mate accepted, in moves
    #[arg(long, default_value_t = 3)]
    pub max_mate: u32,

    /// Search depth in plies
    #[arg(long, default_value_t = 10)]
    pub depth: u32,

    /// Wall-clock limit per search in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub time_ms: u64,

    /// Node limit per search
    #[arg(long)]
    pub nodes: Option<u64>,

    /// Engine threads
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Engine hash size in MiB
    #[arg(long, default_value_t = 16)]
    pub hash_mb: u32,

    /// Engine skill level, if supported
    #[arg(long)]
    pub skill_level: Option<u8>,

    /// Additional engine option as NAME=VALUE (repeatable)
    #[arg(long = "option", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Shortest random walk, in plies
    #[arg(long, default_value_t = 8)]
    pub plies_min: u32,

    /// Longest random walk, in plies
    #[arg(long, default_value_t = 15)]
    pub plies_max: u32,

    /// Favor captures and central moves during the walk
    #[arg(long, default_value_t = false)]
    pub weighted: bool,

    /// Seed for the position sampler (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Engine restarts tolerated before the run fails
    #[arg(long, default_value_t = 2)]
    pub max_restarts: u32,

    /// Output directory
    #[arg(short, long, default_value = "generated_puzzles")]
    pub out: PathBuf,

    /// Board size of the diagrams in pixels
    #[arg(long, default_value_t = 400)]
    pub board_size: u32,

    /// Also render every diagram as PNG (`--png false` for SVG only)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub png: bool,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            path: self.engine.clone(),
            args: self.engine_args.clone(),
            threads: self.threads,
            hash_mb: self.hash_mb,
            skill_level: self.skill_level,
            extra_options: self.options.clone(),
            ..EngineConfig::default()
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            plies_min: self.plies_min,
            plies_max: self.plies_max,
            policy: if self.weighted {
                WalkPolicy::Weighted
            } else {
                WalkPolicy::Uniform
            },
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            target: self.count,
            max_trials: self.max_trials,
            max_mate: self.max_mate,
            budget: SearchBudget {
                depth: self.depth,
                nodes: self.nodes,
                time: Duration::from_millis(self.time_ms),
            },
            max_engine_restarts: self.max_restarts,
            ..GeneratorConfig::default()
        }
    }

    pub fn export_config(&self, engine_name: String) -> ExportConfig {
        ExportConfig {
            output_dir: self.out.clone(),
            engine_name,
            board_size: self.board_size,
            png: self.png,
        }
    }
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty option name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["mateline"]).unwrap();
        let generator = cli.generator_config();
        assert_eq!(generator.target, 10);
        assert_eq!(generator.max_mate, 3);
        assert_eq!(generator.budget, SearchBudget::default());
        assert_eq!(generator.max_engine_restarts, 2);
        assert_eq!(cli.sampler_config(), SamplerConfig::default());
        assert_eq!(cli.engine_config().path, PathBuf::from("stockfish"));
        assert!(cli.export_config("x".to_string()).png);
    }

    #[test]
    fn png_can_be_turned_off() {
        let cli = Cli::try_parse_from(["mateline", "--png", "false"]).unwrap();
        assert!(!cli.export_config("x".to_string()).png);
    }

    #[test]
    fn search_and_sampler_flags() {
        let cli = Cli::try_parse_from([
            "mateline",
            "-n",
            "3",
            "--max-trials",
            "5",
            "--depth",
            "30",
            "--time-ms",
            "100",
            "--nodes",
            "50000",
            "--weighted",
            "--plies-min",
            "15",
            "--plies-max",
            "35",
        ])
        .unwrap();

        let generator = cli.generator_config();
        assert_eq!(generator.target, 3);
        assert_eq!(generator.max_trials, 5);
        assert_eq!(generator.budget.depth, 30);
        assert_eq!(generator.budget.nodes, Some(50_000));
        assert_eq!(generator.budget.time, Duration::from_millis(100));

        let sampler = cli.sampler_config();
        assert_eq!(sampler.policy, WalkPolicy::Weighted);
        assert_eq!((sampler.plies_min, sampler.plies_max), (15, 35));
    }

    #[test]
    fn engine_options() {
        let cli = Cli::try_parse_from([
            "mateline",
            "--engine",
            "/opt/sf/stockfish",
            "--option",
            "UCI_ShowWDL=true",
            "--option",
            "Move Overhead = 50",
            "--skill-level",
            "20",
        ])
        .unwrap();
        let engine = cli.engine_config();
        assert_eq!(engine.path, PathBuf::from("/opt/sf/stockfish"));
        assert_eq!(engine.skill_level, Some(20));
        assert_eq!(
            engine.extra_options,
            vec![
                ("UCI_ShowWDL".to_string(), "true".to_string()),
                ("Move Overhead".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_option_is_rejected() {
        assert!(Cli::try_parse_from(["mateline", "--option", "Hash"]).is_err());
        assert!(parse_option("=5").is_err());
    }
}
