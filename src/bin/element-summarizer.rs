use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use element_summarizer::ai::OpenAiProviderFactory;
use element_summarizer::ai::models::{ensure_model_selected, load_model_list};
use element_summarizer::api::surface::{html_to_text, normalize_text};
use element_summarizer::api::{PickSurface, Reply, Router, SummarizeHost, serve};
use element_summarizer::core::config::AppConfig;
use element_summarizer::core::settings::{
    EnvSettingsStore, FileSettingsStore, LayeredSettingsStore, SettingsRecord, SettingsStore,
    save_api_key, set_custom_prompt, set_font_size, set_model, set_sentences,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "element-summarizer",
    about = "Summarize picked page text with OpenAI chat completions"
)]
struct Cli {
    /// Settings file (defaults to SUMMARIZER_SETTINGS or the user config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a file, or stdin when no file is given
    Summarize {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Treat the input as HTML and summarize its text content
        #[arg(long)]
        html: bool,
    },
    /// Answer newline-delimited JSON requests on stdin until it closes
    Serve,
    /// List chat models available to the stored key
    Models {
        /// Store this model as the one to summarize with
        #[arg(long)]
        select: Option<String>,
    },
    /// Update stored summary settings and print the result
    Config {
        #[arg(long)]
        sentences: Option<String>,
        #[arg(long)]
        font_size: Option<String>,
        /// Custom system prompt; `{nSent}` becomes the sentence budget
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Check the shape of an API key and store it
    ValidateKey { key: String },
}

type Store = LayeredSettingsStore<FileSettingsStore, EnvSettingsStore>;

fn settings_store(app: &AppConfig) -> Store {
    LayeredSettingsStore::new(
        FileSettingsStore::new(&app.settings_path),
        EnvSettingsStore::new(),
    )
}

async fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

async fn run_summarize(app: &AppConfig, file: Option<PathBuf>, html: bool) -> anyhow::Result<bool> {
    let raw = read_input(file).await?;
    let text = if html {
        html_to_text(&raw)
    } else {
        raw.trim().to_string()
    };
    tracing::info!(chars = text.chars().count(), html, "Summarizing input");

    let factory = OpenAiProviderFactory::new(&app.openai_base_url, app.request_timeout)?;
    let host = SummarizeHost::from_app_config(settings_store(app), factory, app);

    let reply = match host.summarize(text).await {
        Ok(summary) => Reply::summary(summary),
        Err(e) => {
            tracing::error!(error = %e, "Summarization failed");
            Reply::failure(e.user_message())
        }
    };
    if reply.ok {
        println!("{}", reply.display_text());
    } else {
        eprintln!("{}", reply.display_text());
    }
    Ok(reply.ok)
}

async fn run_serve(app: &AppConfig) -> anyhow::Result<()> {
    let factory = OpenAiProviderFactory::new(&app.openai_base_url, app.request_timeout)?;
    let host = SummarizeHost::from_app_config(settings_store(app), factory, app);
    let router = Router::new(host, Arc::new(PickSurface::new()));

    tracing::info!("Serving requests on stdin");
    let replies = serve(&router, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    tracing::info!(replies, "Server stopped");
    Ok(())
}

async fn run_models(app: &AppConfig, select: Option<String>) -> anyhow::Result<()> {
    let factory = OpenAiProviderFactory::new(&app.openai_base_url, app.request_timeout)?;
    let store = settings_store(app);
    let now_ms = chrono::Utc::now().timestamp_millis();

    let models = load_model_list(&store, factory.client(), factory.base_url(), now_ms).await;
    if let Some(model) = select {
        if !models.contains(&model) {
            anyhow::bail!("{model} is not in the available model list");
        }
        set_model(&store, &model)?;
    }
    let selected = ensure_model_selected(&store, &models)?;

    for model in &models {
        let marker = if selected.as_deref() == Some(model.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {model}");
    }
    Ok(())
}

fn run_config(
    app: &AppConfig,
    sentences: Option<String>,
    font_size: Option<String>,
    prompt: Option<String>,
) -> anyhow::Result<()> {
    let store = FileSettingsStore::new(&app.settings_path);
    if let Some(raw) = sentences {
        set_sentences(&store, &Value::String(raw))?;
    }
    if let Some(raw) = font_size {
        set_font_size(&store, &Value::String(raw))?;
    }
    if let Some(prompt) = prompt {
        set_custom_prompt(&store, &prompt)?;
    }

    let record = settings_store(app).load()?;
    let shown = SettingsRecord {
        api_key: record.api_key.map(|_| "<set>".to_string()),
        model_list: None,
        model_list_ts: None,
        ..record
    };
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

fn run_validate_key(app: &AppConfig, key: &str) -> anyhow::Result<bool> {
    let store = FileSettingsStore::new(&app.settings_path);
    match save_api_key(&store, key) {
        Ok(()) => {
            println!("Key saved to {}", store.path().display());
            Ok(true)
        }
        Err(e) => {
            eprintln!("{}", Reply::failure(e.to_string()).display_text());
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    element_summarizer::setup_logging();

    let cli = Cli::parse();
    let mut app = AppConfig::from_env()?;
    if let Some(path) = cli.settings {
        app.settings_path = path;
    }

    let ok = match cli.command {
        Command::Summarize { file, html } => run_summarize(&app, file, html).await?,
        Command::Serve => {
            run_serve(&app).await?;
            true
        }
        Command::Models { select } => {
            run_models(&app, select).await?;
            true
        }
        Command::Config {
            sentences,
            font_size,
            prompt,
        } => {
            run_config(&app, sentences, font_size, prompt)?;
            true
        }
        Command::ValidateKey { key } => run_validate_key(&app, &normalize_text(&key))?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
