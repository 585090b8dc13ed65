#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `emotion-engine` -- a persistent affective state engine for
//! conversational agents.
//!
//! ```sh
//! emotion-engine status
//! emotion-engine stimulus happy --intensity 0.7 --reason "user praised the agent"
//! emotion-engine decay
//! emotion-engine preset mandela
//! emotion-engine serve --port 3000
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use emotion_engine::classifier::{Classifier, ClassifierOptions, HttpClassifier};
use emotion_engine::config::EngineConfig;
use emotion_engine::mapping::Taxonomy;
use emotion_engine::peek;
use emotion_engine::persistence;
use emotion_engine::presets::PresetCatalogue;
use emotion_engine::state::{self, EngineState, Role};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to the persisted state file.
    #[arg(long, default_value = "emotion-engine.json")]
    state: PathBuf,

    /// Path to an optional config file; falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory of sibling agent state files, for cross-agent peek.
    #[arg(long)]
    agents_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current affective state.
    Status,
    /// Classify free text and apply the resulting stimulus.
    Classify {
        text: String,
        /// Who produced `text`: "user" or "agent".
        #[arg(long, default_value = "user")]
        role: String,
        /// Id of the user/agent `text` came from, for the per-actor bucket.
        #[arg(long)]
        actor_id: Option<String>,
        #[arg(long, env = "ANTHROPIC_API_KEY")]
        anthropic_api_key: Option<String>,
        #[arg(long, default_value = "claude-haiku-4-5-20251001")]
        model: String,
    },
    /// Apply a labeled stimulus directly.
    Stimulus {
        label: String,
        #[arg(long, default_value_t = 0.5)]
        intensity: f64,
        #[arg(long, default_value = "manual")]
        reason: String,
        #[arg(long, default_value_t = 1.0)]
        confidence: f64,
        /// Who the stimulus is attributed to: "user" or "agent".
        #[arg(long, default_value = "user")]
        role: String,
        /// Id of the user/agent the stimulus came from, for the per-actor bucket.
        #[arg(long)]
        actor_id: Option<String>,
    },
    /// Apply decay for elapsed time since the last tick, then exit.
    Decay,
    /// Advance the rumination lifecycle by one stage.
    Rumination,
    /// Reset dimensions, emotions, rumination, and history to defaults.
    Reset,
    /// Set a single OCEAN personality trait.
    Personality { trait_name: String, value: f64 },
    /// Switch to a named personality preset.
    Preset { id: String },
    /// List available personality presets.
    Presets,
    /// Peek at sibling agents' affective state.
    Peek {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Serve the read-only observation API.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn print_state(state: &EngineState) {
    let snapshot = state::observe_at(state, Utc::now());
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to serialize snapshot"),
    }
}

fn parse_role(role: &str) -> Role {
    match role {
        "agent" => Role::Agent,
        _ => Role::User,
    }
}

fn agent_id_from_state_path(state_path: &std::path::Path) -> String {
    state_path
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "self".to_string())
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("config error: {e}");
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    runtime.block_on(async { run(&cli, &config).await });
}

async fn run(cli: &Cli, config: &EngineConfig) {
    let taxonomy = match &config.custom_mappings_path {
        Some(path) => match emotion_engine::mapping::load_custom(path) {
            Ok(custom) => Taxonomy::with_custom(custom),
            Err(e) => {
                eprintln!("failed to load custom mappings: {e}");
                std::process::exit(1);
            }
        },
        None => Taxonomy::new(),
    };
    let now = Utc::now();
    let current = persistence::load(&cli.state, config.half_life_hours);

    match &cli.command {
        Command::Status => print_state(&current),

        Command::Classify {
            text,
            role,
            actor_id,
            anthropic_api_key,
            model,
        } => {
            let Some(api_key) = anthropic_api_key else {
                eprintln!("--anthropic-api-key (or $ANTHROPIC_API_KEY) is required for classify");
                std::process::exit(1);
            };
            let options = ClassifierOptions {
                api_key: Some(api_key.clone()),
                model: model.clone(),
                confidence_min: config.confidence_min,
                timeout_ms: config.classifier_timeout_ms,
                ..ClassifierOptions::default()
            };
            let classifier = match HttpClassifier::new(options) {
                Ok(classifier) => classifier,
                Err(e) => {
                    eprintln!("failed to build classifier: {e}");
                    std::process::exit(1);
                }
            };
            let classification = classifier.classify(text, role).await;
            info!(label = %classification.label, intensity = classification.intensity, "classified stimulus");
            let decayed = state::apply_decay(&current, now);
            let applied = state::apply_stimulus(
                &decayed,
                &taxonomy,
                &classification.label,
                classification.intensity,
                &classification.reason,
                classification.confidence,
                config,
                now,
            );
            let applied = record_actor_bucket(
                &applied,
                parse_role(role),
                actor_id.as_deref(),
                &classification.label,
                classification.intensity,
                &classification.reason,
                classification.confidence,
                config,
                now,
            );
            save_and_print(&cli.state, &applied, config);
        }

        Command::Stimulus {
            label,
            intensity,
            reason,
            confidence,
            role,
            actor_id,
        } => {
            let decayed = state::apply_decay(&current, now);
            let applied = state::apply_stimulus(&decayed, &taxonomy, label, *intensity, reason, *confidence, config, now);
            let applied = record_actor_bucket(
                &applied,
                parse_role(role),
                actor_id.as_deref(),
                label,
                *intensity,
                reason,
                *confidence,
                config,
                now,
            );
            save_and_print(&cli.state, &applied, config);
        }

        Command::Decay => {
            let decayed = state::apply_decay(&current, now);
            save_and_print(&cli.state, &decayed, config);
        }

        Command::Rumination => {
            let advanced = state::advance_rumination(&current, &taxonomy, config, now);
            save_and_print(&cli.state, &advanced, config);
        }

        Command::Reset => {
            let reset_state = state::reset(&current, now);
            save_and_print(&cli.state, &reset_state, config);
        }

        Command::Personality { trait_name, value } => match state::set_personality_trait(&current, trait_name, *value, config) {
            Ok(updated) => save_and_print(&cli.state, &updated, config),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },

        Command::Preset { id } => {
            let catalogue = PresetCatalogue;
            match state::apply_preset(&current, id, &catalogue, config) {
                Ok(updated) => save_and_print(&cli.state, &updated, config),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }

        Command::Presets => {
            let catalogue = PresetCatalogue;
            for preset in catalogue.all() {
                println!("{:<10} {}", preset.id, preset.description);
            }
        }

        Command::Peek { limit } => {
            let Some(agents_root) = &cli.agents_root else {
                eprintln!("--agents-root is required for peek");
                std::process::exit(1);
            };
            let id = agent_id_from_state_path(&cli.state);
            let peeked = peek::peek_siblings(agents_root, &id, *limit);
            match serde_json::to_string_pretty(&peeked) {
                Ok(json) => println!("{json}"),
                Err(e) => error!(error = %e, "failed to serialize peek result"),
            }
        }

        Command::Serve { port } => {
            spawn_decay_tick(cli.state.clone(), config.clone());

            let app_state = emotion_engine::api::AppState {
                state_path: cli.state.clone(),
                agents_root: cli.agents_root.clone(),
                config: Arc::new(config.clone()),
            };
            let app = emotion_engine::api::router(app_state);
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], *port));

            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!(%addr, "observation api listening");
                    if let Err(e) = axum::serve(listener, app).await {
                        error!(error = %e, "api server error");
                    }
                }
                Err(e) => {
                    error!(error = %e, %addr, "failed to bind api server");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Record the same stimulus into the caller-supplied actor's per-role
/// bucket, if `actor_id` was given. `apply_stimulus` itself carries no
/// actor id (§4.6), so this is a distinct call the CLI makes only when it
/// knows which user/agent produced the stimulus.
#[allow(clippy::too_many_arguments)]
fn record_actor_bucket(
    state: &EngineState,
    role: Role,
    actor_id: Option<&str>,
    label: &str,
    intensity: f64,
    reason: &str,
    confidence: f64,
    config: &EngineConfig,
    now: chrono::DateTime<Utc>,
) -> EngineState {
    let Some(actor_id) = actor_id else {
        return state.clone();
    };
    let stimulus = emotion_engine::stimulus::Stimulus::new(label, intensity, reason, confidence, now);
    state::record_actor_stimulus(state, role, actor_id, stimulus, config)
}

fn save_and_print(path: &std::path::Path, state: &EngineState, config: &EngineConfig) {
    match persistence::save(path, state, Duration::from_secs(config.lock_stale_after_seconds)) {
        Ok(saved) => print_state(&saved),
        Err(e) => {
            eprintln!("failed to save state: {e}");
            std::process::exit(1);
        }
    }
}

/// Background decay tick: every `decay_service_interval_minutes`, load the
/// state, apply decay for elapsed time, and persist it back -- so a long
/// idle period between CLI invocations or API reads still relaxes
/// dimensions/emotions toward baseline, rather than only decaying at the
/// instant something happens to read or write the file.
fn spawn_decay_tick(state_path: PathBuf, config: EngineConfig) {
    let interval = Duration::from_secs(config.decay_service_interval_minutes * 60);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let current = persistence::load(&state_path, config.half_life_hours);
            let decayed = state::apply_decay(&current, Utc::now());
            match persistence::save(&state_path, &decayed, Duration::from_secs(config.lock_stale_after_seconds)) {
                Ok(_) => info!("decay service tick applied"),
                Err(e) => error!(error = %e, "decay service tick failed to save"),
            }
        }
    });
}
