#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "bitform", about = "Declarative binary-format decoding tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// List the built-in primitive transforms.
	Primitives(cmd::primitives::Args),
	/// Decode a file with a transform and print the tree.
	Decode(cmd::decode::Args),
}

fn main() {
	// stdout carries decoded output; logs go to stderr
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.init();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> bitform::engine::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Primitives(args) => cmd::primitives::run(args),
		Commands::Decode(args) => cmd::decode::run(args),
	}
}
