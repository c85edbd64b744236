mod api;
mod config;
mod error;
mod mcp;
mod store;
mod tools;

use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;

use config::Config;
use store::{Prompt, PromptPatch, PromptStore};
use tools::ToolRegistry;

#[derive(Parser)]
#[command(
    name = "prompt-vault",
    version,
    about = "Personal library of reusable prompt snippets"
)]
struct Cli {
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
    /// Directory holding prompts.json (overrides the config file)
    #[arg(long, env = "PROMPT_VAULT_DIR", global = true)]
    storage_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the prompt library
    Init,
    /// List saved prompts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show every field of a prompt
    Show { id: String },
    /// Print only the prompt text, for piping into an editor or clipboard
    Cat { id: String },
    /// Save a new prompt; missing fields are asked for on stdin
    Add {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Change fields of an existing prompt
    Edit {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a prompt
    Delete {
        id: String,
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
    /// Run the MCP server on stdio
    Mcp,
    /// Run the HTTP server (REST API and /mcp)
    Serve {
        /// Address to listen on (defaults to server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Args, Default)]
struct FieldArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,
    /// Read the prompt text from a file ("-" for stdin)
    #[arg(long)]
    prompt_file: Option<PathBuf>,
}

impl FieldArgs {
    fn prompt_text(&self) -> Result<Option<String>> {
        match (&self.prompt, &self.prompt_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(Some(buf))
            }
            (None, Some(path)) => std::fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, None) => Ok(None),
        }
    }

    fn into_patch(self) -> Result<PromptPatch> {
        let prompt = self.prompt_text()?;
        Ok(PromptPatch {
            title: self.title,
            description: self.description,
            prompt,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(&cli.config)?;
    if let Some(dir) = cli.storage_dir {
        cfg.storage.dir = dir;
    }

    match cli.command.unwrap_or(Commands::List { json: false }) {
        Commands::Init => init(&cli.config, &cfg).await?,
        Commands::List { json } => {
            let store = open_store(&cfg).await?;
            let prompts = store.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&prompts)?);
            } else {
                print!("{}", format_list(&prompts));
            }
        }
        Commands::Show { id } => {
            let store = open_store(&cfg).await?;
            let prompt = find(&store, &id)?;
            println!("id:          {}", prompt.id);
            println!("title:       {}", prompt.title);
            println!("description: {}", prompt.description);
            println!("prompt:\n{}", prompt.prompt);
        }
        Commands::Cat { id } => {
            let store = open_store(&cfg).await?;
            print!("{}", find(&store, &id)?.prompt);
            std::io::stdout().flush()?;
        }
        Commands::Add { id, fields } => {
            let mut store = open_store(&cfg).await?;
            if store.get_by_id(&id).is_some() {
                anyhow::bail!("A prompt with id '{id}' already exists");
            }
            let prompt = complete_prompt(id, fields)?;
            let id = prompt.id.clone();
            store.add(prompt).await?;
            println!("Added {id}");
        }
        Commands::Edit { id, fields } => {
            let mut store = open_store(&cfg).await?;
            let patch = fields.into_patch()?;
            if patch.is_empty() {
                anyhow::bail!("Nothing to change: pass --title, --description, --prompt, or --prompt-file");
            }
            let updated = store.update(&id, patch).await?;
            println!("Updated {} ({})", updated.id, updated.title);
        }
        Commands::Delete { id, yes } => {
            let mut store = open_store(&cfg).await?;
            let title = find(&store, &id)?.title.clone();
            if !yes && !confirm(&format!("Delete '{title}' ({id})?"))? {
                println!("Cancelled");
                return Ok(());
            }
            store.delete(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Mcp => {
            let store = open_store(&cfg).await?.into_shared();
            let state = mcp::McpState {
                registry: Arc::new(ToolRegistry::with_prompt_tools(store)),
                name: cfg.mcp.name.clone(),
            };
            mcp::serve_stdio(state).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            serve(&cfg, &bind).await?;
        }
    }
    Ok(())
}

async fn open_store(cfg: &Config) -> Result<PromptStore> {
    PromptStore::initialize(cfg.storage.file_path())
        .await
        .context("Failed to open prompt library")
}

fn find<'a>(store: &'a PromptStore, id: &str) -> Result<&'a Prompt> {
    store
        .get_by_id(id)
        .ok_or_else(|| error::StoreError::NotFound(id.to_string()).into())
}

async fn init(config_path: &str, cfg: &Config) -> Result<()> {
    if config::write_default_config(config_path).await? {
        println!("Wrote {}", config_path);
    }
    let store = open_store(cfg).await?;
    println!(
        "{} prompts in {}",
        store.len(),
        config::display_path(store.path())
    );
    Ok(())
}

async fn serve(cfg: &Config, bind: &str) -> Result<()> {
    if cfg.server.api_key.is_none() {
        if api::is_localhost(bind) {
            tracing::warn!("API authentication disabled (localhost-only)");
        } else {
            anyhow::bail!(
                "Authentication required for non-localhost binding '{bind}'. Set [server] api_key."
            );
        }
    }

    let store = open_store(cfg).await?.into_shared();
    let mcp_state = mcp::McpState {
        registry: Arc::new(ToolRegistry::with_prompt_tools(store.clone())),
        name: cfg.mcp.name.clone(),
    };
    let api_state = api::AppState {
        store,
        name: cfg.mcp.name.clone(),
    };
    let app = api::app(api_state, mcp_state, cfg.server.api_key.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("{} listening on {bind}", cfg.mcp.name);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}

fn format_list(prompts: &[Prompt]) -> String {
    if prompts.is_empty() {
        return "No prompts saved. Add one with `prompt-vault add <id>`.\n".to_string();
    }
    let width = prompts.iter().map(|p| p.id.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for p in prompts {
        out.push_str(&format!("{:<width$}  {}\n", p.id, p.title));
        out.push_str(&format!("{:<width$}  {}\n", "", p.description));
    }
    out
}

/// Fill in fields not given on the command line by asking on stdin.
fn complete_prompt(id: String, fields: FieldArgs) -> Result<Prompt> {
    let prompt_text = fields.prompt_text()?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut get = |value: Option<String>, label: &str| -> Result<String> {
        match value {
            Some(v) => Ok(v),
            None => ask(&mut input, label),
        }
    };
    let title = get(fields.title, "Title")?;
    let description = get(fields.description, "Description")?;
    let prompt = get(prompt_text, "Prompt")?;
    Ok(Prompt::new(id, title, description, prompt))
}

/// Ask until a non-empty line is given.
fn ask(input: &mut impl BufRead, label: &str) -> Result<String> {
    loop {
        eprint!("{label}> ");
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("{label} is required");
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.trim().is_empty() {
            return Ok(line.to_string());
        }
        eprintln!("{label} cannot be empty");
    }
}

fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N] ");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(parse_yes(&line))
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
