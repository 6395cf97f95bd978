use std::path::PathBuf;

use clap::Parser;

/// View a Reactlyve reaction: moderation state, video, and replies.
#[derive(Debug, Parser)]
#[command(name = "reaction-viewer", version, about)]
struct Cli {
    /// Reaction to show
    reaction_id: String,

    /// Save the reaction video under its synthesized filename
    #[arg(long)]
    download: bool,

    /// Directory for downloads (defaults to media.download_dir)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Ask for a manual review of a rejected reaction
    #[arg(long)]
    request_review: bool,

    /// Open the video in the configured player
    #[arg(long)]
    play: bool,

    /// Config file to load instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let options = reaction_viewer::app::Options {
        reaction_id: cli.reaction_id,
        config_file: cli.config,
        download: cli.download,
        output: cli.output,
        request_review: cli.request_review,
        play: cli.play,
    };

    if let Err(err) = reaction_viewer::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
