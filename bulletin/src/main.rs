use bulletin::app_state::AppState;
use bulletin::config::{self, Config};
use bulletin::orchestrator::{FeedPhase, SearchPhase, SubmitOutcome};
use clap::{Parser, Subcommand};
use shared_types::{EnrichedItem, RecordId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "bulletin", about = "Knowledge-base search and personalized feed")]
struct Cli {
    /// Print the published session as JSON
    #[arg(long, global = true)]
    json: bool,
    // `feed` for the configured user when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Ask the QA service and list the enriched sources
    Search {
        /// Everything after the first word belongs to the query
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Personalized feed for a user (default: DEFAULT_USER_ID)
    Feed { user_id: Option<String> },
    /// Record that a user opened an item
    View {
        record_id: String,
        user_id: Option<String>,
    },
    /// Show which endpoints are configured
    Status,
}

/// List previews show this many characters of content.
const EXCERPT_CHARS: usize = 80;

fn print_items(items: &[EnrichedItem]) {
    for (rank, item) in items.iter().enumerate() {
        println!("{:>2}. [{}] {}", rank + 1, item.id, item.topic);
        match item.excerpt(EXCERPT_CHARS) {
            Some(preview) => println!("    {preview}"),
            None => {
                if let Some(department) = &item.department {
                    println!("    department: {department}");
                }
                println!("    score: {:.4}", item.score);
            }
        }
        if let Some(url) = &item.url {
            println!("    {url}");
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_search(state: &AppState, query: &str, json: bool) -> anyhow::Result<()> {
    let outcome = state.search().submit(query).await;
    if outcome == SubmitOutcome::Rejected {
        anyhow::bail!("query must not be blank");
    }

    let session = state.search().snapshot();
    if json {
        print_json(&serde_json::json!({ "session": session, "items": session.items() }))?;
    } else {
        if let Some(answer) = session.answer.as_deref().filter(|a| !a.is_empty()) {
            println!("{answer}\n");
        }
        let items = session.items();
        if items.is_empty() && session.phase == SearchPhase::Ready {
            println!("no matching sources");
        }
        print_items(&items);
        if let Some(lookup_error) = &session.lookup_error {
            eprintln!("note: showing unenriched results ({lookup_error})");
        }
    }

    match (session.phase, session.error) {
        (SearchPhase::Failed, Some(error)) => anyhow::bail!("search failed: {error}"),
        _ => Ok(()),
    }
}

async fn run_feed(state: &AppState, user_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let session = match user_id {
        Some(user_id) => {
            let feed = state.feed_for(user_id);
            feed.ensure_loaded().await;
            feed.snapshot()
        }
        None => {
            let outcome = state.feed().ensure_loaded().await;
            tracing::debug!(?outcome, "default feed loaded");
            state.feed().snapshot()
        }
    };

    if json {
        print_json(&serde_json::json!({ "session": session, "items": session.items() }))?;
    } else {
        print_items(&session.items());
        if let Some(lookup_error) = &session.lookup_error {
            eprintln!("note: showing unenriched feed ({lookup_error})");
        }
    }

    match (session.phase, session.error) {
        (FeedPhase::Failed, Some(error)) => anyhow::bail!("feed failed: {error}"),
        _ => Ok(()),
    }
}

async fn run_view(state: &AppState, record_id: &str, user_id: Option<&str>) -> anyhow::Result<()> {
    let user_id = user_id
        .map(ToString::to_string)
        .or_else(|| state.config().default_user_id.clone())
        .ok_or_else(|| anyhow::anyhow!("no user id given and {} is not set", config::DEFAULT_USER_ID))?;
    let record_id: RecordId = record_id.parse()?;

    state
        .browse_recorder()
        .record_browse(&user_id, &record_id)
        .await?;
    println!("recorded view of {record_id} for {user_id}");
    Ok(())
}

fn run_status(state: &AppState) {
    let config = state.config();
    println!("backend api:   {}", if state.backend_configured() { "configured" } else { "missing" });
    println!("record store:  {}", if state.record_store_configured() { "configured" } else { "missing" });
    println!(
        "default user:  {}",
        config.default_user_id.as_deref().unwrap_or("missing")
    );
    println!(
        "search:        top_k={} min_score={}",
        config.search.top_k, config.search.min_score
    );
    println!(
        "feed:          lambda={} alpha={} top_k={}",
        config.recommend.lambda, config.recommend.alpha, config.recommend.top_k
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "bulletin=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    config::load_env_file();
    let config = Config::from_env()?;
    config.log_degraded();

    let state = AppState::from_config(config)?;

    match cli.command.unwrap_or(Command::Feed { user_id: None }) {
        Command::Search { query } => run_search(&state, &query.join(" "), cli.json).await,
        Command::Feed { user_id } => run_feed(&state, user_id.as_deref(), cli.json).await,
        Command::View { record_id, user_id } => {
            run_view(&state, &record_id, user_id.as_deref()).await
        }
        Command::Status => {
            run_status(&state);
            Ok(())
        }
    }
}
