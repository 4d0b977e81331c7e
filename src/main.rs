use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};

use portfolio_extract_lib::config;
use portfolio_extract_lib::models::JobResponse;
use portfolio_extract_lib::pipeline::extraction::{OcrPipeline, PdftoppmRasterizer, TesseractCli};
use portfolio_extract_lib::pipeline::normalize::{BackendOutput, JobContext, ResultNormalizer};
use portfolio_extract_lib::pipeline::processor::{JobPayload, StatementProcessor, DEFAULT_FILENAME};
use portfolio_extract_lib::pipeline::recognition::RecognitionBackend;
use portfolio_extract_lib::pipeline::structuring::OllamaVisionClient;
use portfolio_extract_lib::pipeline_config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "portfolio-extract")]
#[command(version, about = "Bank portfolio statement extraction with review-gating confidence", long_about = None)]
struct Cli {
    /// Pipeline config JSON (default: $PORTFOLIO_EXTRACT_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the result
    #[arg(short, long, global = true)]
    pretty: bool,

    /// Send rasterized pages to Tesseract without binarization
    #[arg(long, global = true)]
    no_preprocess: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a PDF statement
    Pdf {
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Backend::Ocr)]
        backend: Backend,
    },

    /// Run a job payload (`{"input": {"pdf_base64": …, "filename": …}}`), `-` for stdin
    Job {
        payload: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Backend::Ocr)]
        backend: Backend,
    },

    /// Run the rule-based extraction over already recognized page text files
    Text {
        /// One file per page, in page order
        #[arg(required = true)]
        pages: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Tesseract OCR + rule-based extraction
    Ocr,
    /// Local Ollama vision model
    Model,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    portfolio_extract_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let pipeline_config = match &cli.config {
        Some(path) => PipelineConfig::load(path),
        None => PipelineConfig::from_env(),
    }
    .context("loading pipeline config")?;

    let response = match cli.command {
        Commands::Pdf { input, backend } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let payload = JobPayload {
                pdf_base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                filename: input.file_name().map(|n| n.to_string_lossy().into_owned()),
            };
            processor(backend, cli.no_preprocess, &pipeline_config)?.handle(&payload)
        }
        Commands::Job { payload, backend } => {
            let raw = read_input(&payload)?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("job payload is not JSON")?;
            processor(backend, cli.no_preprocess, &pipeline_config)?.handle_value(&value)
        }
        Commands::Text { pages } => analyze_text_files(&pages, &pipeline_config)?,
    };

    let out = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{out}");

    if !response.is_success() {
        return Ok(ExitCode::FAILURE);
    }
    if response.requires_review() {
        tracing::warn!("Result flagged for manual review");
    }
    Ok(ExitCode::SUCCESS)
}

fn processor(
    backend: Backend,
    no_preprocess: bool,
    pipeline_config: &PipelineConfig,
) -> Result<StatementProcessor> {
    let recognition = match backend {
        Backend::Ocr => {
            let tesseract = TesseractCli::default();
            let tesseract = if no_preprocess {
                tesseract.without_preprocessing()
            } else {
                tesseract
            };
            RecognitionBackend::Ocr(Arc::new(tesseract))
        }
        Backend::Model => RecognitionBackend::Model(Arc::new(
            OllamaVisionClient::from_env().context("creating Ollama client")?,
        )),
    };
    StatementProcessor::new(Arc::new(PdftoppmRasterizer::default()), recognition, pipeline_config)
        .context("building statement processor")
}

fn analyze_text_files(pages: &[PathBuf], pipeline_config: &PipelineConfig) -> Result<JobResponse> {
    let started = std::time::Instant::now();
    let texts = pages
        .iter()
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let analysis = OcrPipeline::new(pipeline_config)?.analyze_pages(&texts);
    let filename = pages
        .first()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let job = JobContext {
        pdf_filename: &filename,
        pdf_base64: "",
        pages_processed: texts.len(),
        processing_time_seconds: started.elapsed().as_secs_f64(),
    };
    let result = ResultNormalizer::from_config(pipeline_config).normalize(BackendOutput::Ocr(analysis), &job);
    Ok(JobResponse::Success(Box::new(result)))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}
