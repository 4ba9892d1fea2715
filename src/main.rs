mod corpus;
mod detect;
mod embedding;
mod pipeline;
mod translate;

pub const USER_AGENT: &str = concat!("faqling/", env!("CARGO_PKG_VERSION"));

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::info;

use corpus::FaqStore;
use detect::HeuristicDetector;
use embedding::OllamaEmbedder;
use pipeline::Pipeline;
use translate::LibreClient;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(90);

/// Multilingual FAQ assistant: detects the question's language, pivots
/// through English, searches the FAQ corpus by embedding similarity, and
/// answers in the user's language.
///
/// External services via environment variables: `FAQ_TRANSLATE_URL`
/// (LibreTranslate-compatible) and `FAQ_EMBED_URL` / `FAQ_EMBED_MODEL`
/// (Ollama-compatible).
#[derive(Parser)]
#[command(name = "faqling", version)]
struct Cli {
    /// Path to the FAQ data file (CSV with `question` and `answer` columns)
    #[arg(long, default_value = "data/faqs.csv")]
    faq: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question and exit
    Ask {
        /// The question, in any supported language
        question: String,
    },
    /// Interactive chat loop (empty line or EOF to quit)
    Chat,
}

type FaqPipeline = Pipeline<HeuristicDetector, LibreClient, OllamaEmbedder>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("faqling=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let pipeline = Pipeline::new(
        HeuristicDetector,
        LibreClient::from_env(http.clone()),
        OllamaEmbedder::from_env(http),
        FaqStore::new(&cli.faq),
    );

    match cli.command {
        Command::Ask { question } => run_ask(&pipeline, &question).await,
        Command::Chat => run_chat(&pipeline).await?,
    }

    Ok(())
}

async fn run_ask(pipeline: &FaqPipeline, question: &str) {
    let reply = pipeline.answer(question).await;
    println!("{}", reply.text);
    if let (Some(matched), Some(score)) = (&reply.matched_question, reply.score) {
        println!(
            "  [matched: {matched} | lang: {} | score: {score:.4}]",
            reply.lang
        );
    }
}

/// Read-eval-print chat loop. Shows a typing placeholder while the
/// pipeline runs, then replaces it with the reply.
async fn run_chat(pipeline: &FaqPipeline) -> std::io::Result<()> {
    info!("starting chat session");
    println!("Hello! Ask me anything from the FAQ (empty line to quit).");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        print!("bot> …");
        std::io::stdout().flush()?;
        let reply = pipeline.answer(question).await;
        println!("\rbot> {}", reply.text);
    }

    info!("chat session ended");
    Ok(())
}
