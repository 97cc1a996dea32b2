use chatveil_core::ModelKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatveil-demo")]
#[command(author, version, about = "Replay a simulated live chat through the chatveil pipeline")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulated live-chat feed
    Run {
        /// Comments per second
        #[arg(short, long, default_value = "4")]
        rate: u32,

        /// Feed duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Share of negative comments, 0.0-1.0
        #[arg(long, default_value = "0.3")]
        negative_share: f64,

        /// Model kind: generative or classifier
        #[arg(short, long, default_value = "generative", value_parser = parse_model)]
        model: ModelKind,

        /// Data directory for settings and history files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Inspect the persisted comment history
    History {
        /// Data directory for settings and history files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Export to a JSON file instead of printing
        #[arg(long)]
        export: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

fn parse_model(s: &str) -> Result<ModelKind, String> {
    match s {
        "generative" => Ok(ModelKind::Generative),
        "classifier" => Ok(ModelKind::Classifier),
        other => Err(format!(
            "unknown model kind '{other}', expected 'generative' or 'classifier'"
        )),
    }
}
