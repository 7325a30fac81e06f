use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use eyre::{Result, WrapErr};
use log::{debug, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

mod cli;

use cli::{Cli, OutputFormat};
use ytqa::chain::RagChain;
use ytqa::config::Config;
use ytqa::diagnostics::LogDiagnostics;
use ytqa::embed::{DEFAULT_EMBEDDING_MODEL, embedder_for};
use ytqa::fetch::CaptionClient;
use ytqa::llm::{DEFAULT_MODEL, LlmClient};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytqa.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytqa")
        .join("logs")
}

fn tool_version(name: &str) -> Option<String> {
    Command::new(name)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let yt_dlp = tool_version("yt-dlp");

    let yt_dlp_line = match &yt_dlp {
        Some(v) => format!("  \x1b[32m✅\x1b[0m yt-dlp     {v}"),
        None => "  \x1b[31m❌\x1b[0m yt-dlp     (not found — needed for the captions fallback)".to_string(),
    };

    let log_path = log_dir().join("ytqa.log");

    format!(
        "\nOPTIONAL TOOLS:\n{yt_dlp_line}\n\n\
         API KEYS:\n  GOOGLE_API_KEY     Gemini models and embeddings (default)\n  OPENAI_API_KEY     OpenAI models and embeddings\n  \
         ANTHROPIC_API_KEY  Claude models\n\nLogs are written to: {}",
        log_path.display()
    )
}

/// Answer one question and print it under a heading.
async fn answer(chain: &RagChain<'_>, question: &str, summarize: bool) -> Result<()> {
    let response = if summarize {
        chain.summarize().await
    } else {
        chain.ask(question).await
    }
    .wrap_err("failed to generate an answer")?;

    println!("\n### {question}\n{response}");
    Ok(())
}

/// Next non-blank question from the session input, trimmed; `None` at EOF.
async fn next_question<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> io::Result<Option<String>> {
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if !question.is_empty() {
            return Ok(Some(question.to_string()));
        }
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    if cli.verbose {
        let config_path = ytqa::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    // CLI flags take priority over config values
    let languages = if cli.lang.is_empty() {
        config.languages.clone().unwrap_or_default()
    } else {
        cli.lang.clone()
    };
    let model = cli.model.clone().or_else(|| config.model.clone()).unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let embedding_model = cli
        .embedding_model
        .clone()
        .or_else(|| config.embedding_model.clone())
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let mut index_options = config.index_options();
    if let Some(k) = cli.top_k {
        index_options.top_k = k;
    }
    debug!("Languages: {languages:?}, model: {model}, embedding model: {embedding_model}, options: {index_options:?}");

    let client = reqwest::Client::new();
    let diagnostics = LogDiagnostics::new(cli.verbose);
    let captions = CaptionClient::new(client.clone()).languages(languages);

    let video_id = ytqa::extract_video_id(&cli.url);
    let transcript = captions.fetch(&video_id, &diagnostics).await?;

    if cli.verbose {
        eprintln!(
            "Video: {} ({})\nSource: {}\nLanguage: {}\nSegments: {}\nThumbnail: {}",
            transcript.title,
            transcript.video_id,
            transcript.source,
            transcript.language,
            transcript.segments.len(),
            ytqa::output::thumbnail_url(&transcript.video_id),
        );
    }

    if cli.transcript {
        let rendered = match cli.format {
            OutputFormat::Text => ytqa::output::render_text(&transcript),
            OutputFormat::Json => ytqa::output::render_json(&transcript)?,
        };

        if let Some(ref path) = cli.output {
            std::fs::write(path, &rendered)?;
            if cli.verbose {
                eprintln!("Output written to: {}", path.display());
            }
        } else {
            println!("{rendered}");
        }
        return Ok(());
    }

    eprintln!("{}", ytqa::output::render_summary_line(&transcript));

    let embedder = embedder_for(&client, &embedding_model);
    let retriever = ytqa::index::build_index(&transcript.text(), embedder, index_options)
        .await
        .wrap_err("failed to build the knowledge base")?;
    eprintln!("Knowledge base built: {} chunks", retriever.len());

    let generator = LlmClient::new(client.clone(), &model);
    if cli.verbose {
        eprintln!(
            "Model: {} via {} (embeddings: {embedding_model} via {})",
            generator.model(),
            ytqa::llm::api_key_var(generator.model()),
            ytqa::embed::api_key_var(&embedding_model),
        );
    }
    let chain = RagChain::new(&retriever, &generator);

    if cli.summarize {
        answer(&chain, ytqa::chain::SUMMARY_QUESTION, true).await?;
    }
    for question in &cli.questions {
        answer(&chain, question, false).await?;
    }
    if cli.summarize || !cli.questions.is_empty() {
        return Ok(());
    }

    // Interactive session: one question per line until EOF
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("\nQuestion> ");
        io::stderr().flush()?;

        let Some(question) = next_question(&mut lines).await? else {
            break;
        };
        if let Err(e) = answer(&chain, &question, false).await {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}
