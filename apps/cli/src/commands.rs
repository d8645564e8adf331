//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use aitutor_core::chat::{ChatRequest, answer_question};
use aitutor_core::context::assemble_context;
use aitutor_core::llm::OpenRouterClient;
use aitutor_core::questionnaire::{ResponseSheet, score_sheet, submit};
use aitutor_core::retrieval::search_context;
use aitutor_shared::{AppConfig, ContextConfig, Response, expand_home, init_config, load_config};
use aitutor_storage::{ContentBundle, Storage};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AI tutor: grounded answers from platform content and questionnaire scoring.
#[derive(Parser)]
#[command(
    name = "aitutor",
    version,
    about = "Search platform content, ask the AI tutor, and score proficiency questionnaires.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database file (overrides `defaults.database_path`).
    #[arg(long, global = true, env = "AITUTOR_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the ranked context records for a query as JSON.
    Search {
        /// Free-text query.
        query: String,
    },

    /// Print the assembled prompt context for a query.
    Context {
        /// Free-text query.
        query: String,
    },

    /// Ask the tutor a question.
    Ask {
        /// The learner's question.
        question: String,

        /// File with tone guidance or example answers.
        #[arg(long)]
        style: Option<PathBuf>,

        /// Print the answer and its sources as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load content and questions from a JSON bundle.
    Import {
        /// Path to the bundle file.
        bundle: PathBuf,
    },

    /// Questionnaire operations.
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Questionnaire subcommands.
#[derive(Subcommand)]
pub(crate) enum QuizAction {
    /// Score a set of responses for a role.
    Score {
        /// Role whose question bank is used.
        #[arg(long)]
        role: String,

        /// JSON array of `{question_id, answer}` objects.
        #[arg(long)]
        responses: PathBuf,

        /// Persist the scored submission.
        #[arg(long)]
        save: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "aitutor=info",
        1 => "aitutor=debug",
        _ => "aitutor=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so stdout stays machine-readable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Search { query } => cmd_search(db, &query).await,
        Command::Context { query } => cmd_context(db, &query).await,
        Command::Ask {
            question,
            style,
            json,
        } => cmd_ask(db, &question, style.as_deref(), json).await,
        Command::Import { bundle } => cmd_import(db, &bundle).await,
        Command::Quiz { action } => match action {
            QuizAction::Score {
                role,
                responses,
                save,
            } => cmd_quiz_score(db, &role, &responses, save).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// `--db` wins over the configured path.
fn resolve_db_path(config: &AppConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => Ok(expand_home(&config.defaults.database_path)?),
    }
}

async fn open_readonly(config: &AppConfig, flag: Option<PathBuf>) -> Result<Storage> {
    let path = resolve_db_path(config, flag)?;
    Ok(Storage::open_readonly(&path).await?)
}

async fn open_writable(config: &AppConfig, flag: Option<PathBuf>) -> Result<Storage> {
    let path = resolve_db_path(config, flag)?;
    Ok(Storage::open(&path).await?)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_search(db: Option<PathBuf>, query: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_readonly(&config, db).await?;

    let records = search_context(&storage, query).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_context(db: Option<PathBuf>, query: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_readonly(&config, db).await?;

    let records = search_context(&storage, query).await?;
    let context = assemble_context(&records, &ContextConfig::from(&config));
    println!("{context}");
    Ok(())
}

async fn cmd_ask(
    db: Option<PathBuf>,
    question: &str,
    style: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    // Fail on a missing key before touching the database.
    let llm = OpenRouterClient::from_config(&config)?;
    let storage = open_readonly(&config, db).await?;

    let request = ChatRequest {
        question: question.to_string(),
        history: Vec::new(),
        style: style.map(read_file).transpose()?,
    };

    info!(model = llm.model(), "asking tutor");
    let answer = answer_question(&storage, &llm, &ContextConfig::from(&config), &request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", answer.answer);
        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for record in &answer.sources {
                println!("  [{}] {}", record.source(), record.id);
            }
        }
    }
    Ok(())
}

async fn cmd_import(db: Option<PathBuf>, bundle_path: &Path) -> Result<()> {
    let config = load_config()?;
    let content = read_file(bundle_path)?;
    let bundle: ContentBundle = serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid bundle {}", bundle_path.display()))?;

    let storage = open_writable(&config, db).await?;
    let stats = storage.import_bundle(&bundle).await?;

    println!("Imported {} content rows and {} questions.", stats.content_rows, stats.questions);
    Ok(())
}

async fn cmd_quiz_score(
    db: Option<PathBuf>,
    role: &str,
    responses_path: &Path,
    save: bool,
) -> Result<()> {
    let config = load_config()?;
    let content = read_file(responses_path)?;
    let responses: Vec<Response> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid responses file {}", responses_path.display()))?;
    let sheet: ResponseSheet = responses.into_iter().collect();
    let policy = config.scoring.unknown_question;

    if save {
        let storage = open_writable(&config, db).await?;
        let outcome = submit(&storage, &storage, role, &sheet, policy).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let storage = open_readonly(&config, db).await?;
        let score = score_sheet(&storage, role, &sheet, policy).await?;
        println!("{}", serde_json::to_string_pretty(&score)?);
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_quiz_score() {
        let cli = Cli::try_parse_from([
            "aitutor",
            "--db",
            "/tmp/t.db",
            "quiz",
            "score",
            "--role",
            "instructor",
            "--responses",
            "answers.json",
            "--save",
        ])
        .expect("parse");
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.db")));
        match cli.command {
            Command::Quiz {
                action: QuizAction::Score { role, save, .. },
            } => {
                assert_eq!(role, "instructor");
                assert!(save);
            }
            _ => panic!("expected quiz score"),
        }
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["aitutor", "search", "tokens", "-vv"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn db_flag_overrides_config() {
        let config = AppConfig::default();
        let path = resolve_db_path(&config, Some(PathBuf::from("/tmp/x.db"))).expect("resolve");
        assert_eq!(path, PathBuf::from("/tmp/x.db"));
    }
}
