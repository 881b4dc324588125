//! Barovia CLI: run campaign events and propagate world changes.
//!
//! Usage:
//!   barovia event run <location> <event-id> [--player-at <location>]
//!   barovia propagate <entity> [--change-type npc_death] [--cascade N]
//!   barovia graph <show|init|affected> [--data-dir path]
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use barovia::{
    CampaignApi, ChangeType, EngineConfig, GameState, PropagationRules, StateChange,
    TriggeredEvent,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barovia",
    version,
    about = "Event execution and world-state propagation for tabletop campaigns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Campaign directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scheduled events
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
    /// Propagate a world change through the relationship graph
    Propagate {
        /// Entity the change happened to
        entity: String,
        #[arg(long, default_value = "npc_death")]
        change_type: String,
        /// Location the change originated from
        #[arg(long)]
        from: Option<String>,
        /// How many hops to cascade
        #[arg(long, default_value_t = 1)]
        cascade: usize,
        /// Only affect entities at these locations
        #[arg(long = "location")]
        locations: Vec<String>,
        #[arg(long)]
        no_relationships: bool,
        #[arg(long)]
        no_quests: bool,
        #[arg(long)]
        no_factions: bool,
    },
    /// Inspect the relationship graph
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
}

#[derive(Subcommand)]
enum EventAction {
    /// Execute an event and propagate the changes it causes
    Run {
        location: String,
        event_id: String,
        /// In-game date of the event
        #[arg(long)]
        date: Option<String>,
        /// In-game time of the event
        #[arg(long)]
        time: Option<String>,
        /// Where the party currently is
        #[arg(long)]
        player_at: Option<String>,
        /// Only execute; do not propagate resulting changes
        #[arg(long)]
        no_propagate: bool,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Print the relationship graph
    Show,
    /// Create the default graph document if missing
    Init,
    /// List the first-order entities a change would affect
    Affected {
        entity: String,
        #[arg(long, default_value = "npc_death")]
        change_type: String,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig, String> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    Ok(match &cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn exit_code(success: bool, printed: i32) -> i32 {
    if success {
        printed
    } else {
        1
    }
}

async fn cmd_event_run(api: &CampaignApi, action: EventAction) -> i32 {
    let EventAction::Run {
        location,
        event_id,
        date,
        time,
        player_at,
        no_propagate,
    } = action;

    let mut event = TriggeredEvent::new(event_id, location);
    event.date = date.clone();
    event.time = time.clone();
    let game_state = GameState {
        current_date: date,
        current_time: time,
        player_location: player_at,
    };

    if no_propagate {
        let result = api.execute_event(&event, &game_state).await;
        exit_code(result.success, print_json(&result))
    } else {
        let result = api.trigger_event(&event, &game_state).await;
        exit_code(result.success, print_json(&result))
    }
}

async fn cmd_propagate(api: &CampaignApi, change: StateChange) -> i32 {
    let result = api.propagate_change(&change).await;
    let code = exit_code(result.success, print_json(&result));
    api.invalidate_graph_cache().await;
    code
}

async fn cmd_graph(api: &CampaignApi, action: GraphAction) -> i32 {
    match action {
        GraphAction::Show => match api.relationship_graph().await {
            Ok(graph) => print_json(graph.as_ref()),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        GraphAction::Init => match api.init_graph().await {
            Ok(graph) => {
                eprintln!(
                    "Relationship graph ready ({} entities, {} edges)",
                    graph.relationships.len(),
                    graph.edge_count()
                );
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        GraphAction::Affected {
            entity,
            change_type,
        } => {
            let change = StateChange::new(ChangeType::from(change_type), entity);
            let result = api.find_affected_entities(&change).await;
            exit_code(result.success, print_json(&result))
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let api = match CampaignApi::open(&config).await {
        Ok(api) => api,
        Err(e) => {
            eprintln!(
                "Error: failed to open campaign at {}: {}",
                config.data_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Event { action } => cmd_event_run(&api, action).await,
        Commands::Propagate {
            entity,
            change_type,
            from,
            cascade,
            locations,
            no_relationships,
            no_quests,
            no_factions,
        } => {
            let mut rules = PropagationRules::default()
                .relationships(!no_relationships)
                .quests(!no_quests)
                .factions(!no_factions)
                .cascade_levels(cascade);
            if !locations.is_empty() {
                rules = rules.only_locations(locations);
            }
            let mut change = StateChange::new(ChangeType::from(change_type), entity).with_rules(rules);
            if let Some(location) = from {
                change = change.from_location(location);
            }
            cmd_propagate(&api, change).await
        }
        Commands::Graph { action } => cmd_graph(&api, action).await,
    };

    std::process::exit(code);
}
