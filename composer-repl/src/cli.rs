use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// JSON file holding `composer` settings and the filter `schema`.
    #[clap(long)]
    pub config: PathBuf,
    /// Serve static option lists through an async loader answering after
    /// this many milliseconds.
    #[clap(long)]
    pub latency_ms: Option<u64>,
}
