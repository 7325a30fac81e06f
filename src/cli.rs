use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ytqa",
    about = "Ask questions about a YouTube video, answered from its transcript",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL or video ID
    pub url: String,

    /// Question to ask (repeatable); questions are read from stdin if none given
    #[arg(short = 'q', long = "ask")]
    pub questions: Vec<String>,

    /// Summarize the video in a few bullet points
    #[arg(short, long)]
    pub summarize: bool,

    /// Print the transcript and exit without building an index
    #[arg(short, long)]
    pub transcript: bool,

    /// Transcript output format: text (default), json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the transcript to file instead of stdout (with --transcript)
    #[arg(short, long, requires = "transcript")]
    pub output: Option<PathBuf>,

    /// Caption language priority, comma separated [default: en,en-US,hi,hi-IN]
    #[arg(short, long, value_delimiter = ',')]
    pub lang: Vec<String>,

    /// LLM model for answers [default: gemini-2.0-flash]
    #[arg(long)]
    pub model: Option<String>,

    /// Embedding model for the index [default: gemini-embedding-001]
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Number of transcript chunks retrieved per question [default: 3]
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Show extraction progress and metadata
    #[arg(short, long)]
    pub verbose: bool,
}
