use std::io::{BufReader, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use sdlc_crew::io::{build_project_context, parse_stage_list};
use sdlc_crew::server::{self, AppState};
use sdlc_crew::{
    ConsoleGate, EngineConfig, LlmClient, LlmConfig, LlmEngine, LlmProvider, OutputStore,
    Pipeline, PipelineConfig, ProjectConfig, StageInputs, default_stages, normalize_raw,
};

#[derive(Parser)]
#[command(name = "sdlc-crew")]
#[command(author, version, about = "Multi-stage LLM software design pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// LLM provider (anthropic, openrouter, gemini); SDLC_LLM_PROVIDER when omitted
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Model name; defaults to the provider's default
    #[arg(long)]
    model: Option<String>,

    /// Extra attempts per task when a response holds no JSON
    #[arg(long, default_value = "0")]
    reprompts: u32,

    /// Root directory for stage outputs
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one project
    Run {
        /// Project config file (YAML)
        #[arg(short, long, conflicts_with_all = ["requirements", "domain", "tech_stack"])]
        config: Option<PathBuf>,

        /// What should be built
        #[arg(short, long)]
        requirements: Option<String>,

        /// Project domain
        #[arg(long, default_value = "")]
        domain: String,

        /// Preferred tech stack
        #[arg(long, default_value = "")]
        tech_stack: String,

        /// Directory name for this project's outputs
        #[arg(short, long)]
        title: Option<String>,

        /// Comma-separated stages to execute, e.g. "1,2" or "architecture"
        #[arg(long)]
        stages: Option<String>,

        /// Review every task output on the terminal
        #[arg(short, long)]
        interactive: bool,

        #[command(flatten)]
        model: ModelArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Serve the stages over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8000")]
        addr: SocketAddr,

        #[command(flatten)]
        model: ModelArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decode JSON embedded in a response and print it
    Normalize {
        /// Input file; stdin when omitted
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            requirements,
            domain,
            tech_stack,
            title,
            stages,
            interactive,
            model,
            verbose,
        } => {
            setup_logging(verbose);
            let project = match config {
                Some(path) => ProjectConfig::from_file(&path)?,
                None => ProjectConfig {
                    domain,
                    objective: requirements.unwrap_or_default(),
                    tech_stack,
                    ..Default::default()
                },
            };
            run_pipeline(project, title, stages, interactive, model).await
        }
        Commands::Serve {
            addr,
            model,
            verbose,
        } => {
            setup_logging(verbose);
            let engine = build_engine(&model)?;
            let state = AppState::new(engine, OutputStore::new(&model.output_dir));
            server::serve(addr, state).await
        }
        Commands::Normalize { input } => normalize_file(input),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn build_engine(args: &ModelArgs) -> Result<Arc<LlmEngine<LlmClient>>> {
    let mut config = match args.provider {
        Some(provider) => LlmConfig::from_env_for(provider)?,
        None => LlmConfig::from_env()?,
    };
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    info!("Using {} model {}", config.provider, config.model);

    let engine_config = EngineConfig {
        max_reprompts: args.reprompts,
    };
    Ok(Arc::new(LlmEngine::new(LlmClient::new(config), engine_config)))
}

async fn run_pipeline(
    project: ProjectConfig,
    title: Option<String>,
    stages: Option<String>,
    interactive: bool,
    model: ModelArgs,
) -> Result<()> {
    project.validate()?;

    let title = match title.or_else(|| project.title.clone()) {
        Some(title) => title,
        None => bail!("A title is required (--title or `title` in the config file)"),
    };
    let selected = match stages {
        Some(list) => Some(parse_stage_list(&list)?),
        None => project.selected_stages()?,
    };

    let mut config = PipelineConfig::new(title);
    if let Some(selected) = selected {
        config = config.with_selection(selected);
    }
    config.validate()?;

    let inputs: StageInputs = project.stage_inputs();
    info!(
        "Project context: {}",
        build_project_context(&project.domain, &project.tech_stack)
    );

    let engine = build_engine(&model)?;
    let store = OutputStore::new(&model.output_dir);
    let mut pipeline = Pipeline::new(engine, store, config);
    if interactive {
        let stdin = BufReader::new(std::io::stdin());
        pipeline = pipeline.with_gate(ConsoleGate::new(stdin, std::io::stdout()));
    }

    let context = pipeline
        .run(&default_stages(), &inputs)
        .await
        .context("Pipeline failed")?;

    let completed: Vec<String> = context.stages().map(|s| s.to_string()).collect();
    info!("Complete: {}", completed.join(", "));
    Ok(())
}

fn normalize_file(input: Option<PathBuf>) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            raw
        }
    };

    let value = normalize_raw(&raw);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
