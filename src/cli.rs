use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::Text;

use crate::config::Settings;
use crate::models::principal::Principal;
use crate::models::turn::TurnResponse;
use crate::runtime::{RuntimeResult, build_orchestrator};
use crate::service::date_resolver;

const CLI_USER: &str = "cli";

#[derive(Parser)]
#[command(name = "calendarBot", about = "Natural-language calendar assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one chat turn and print the response JSON.
    Chat { text: String },
    /// Ask for the utterance interactively.
    Prompt {},
    /// Resolve a date expression offline.
    Resolve { expression: String },
}

pub async fn cli(settings: Settings) -> RuntimeResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Chat { text } => run_turn(&settings, &text).await,
        Commands::Prompt {} => {
            let text = specify_prompt()?;
            run_turn(&settings, &text).await
        }
        Commands::Resolve { expression } => {
            let now = Utc::now().with_timezone(&settings.timezone);
            let resolved = date_resolver::resolve(&expression, now);
            let (window_start, window_end) = date_resolver::day_window(resolved.at);
            let output = serde_json::json!({
                "at": resolved.at.to_rfc3339(),
                "keyword": resolved.keyword,
                "explicit": resolved.explicit,
                "window": [window_start.to_rfc3339(), window_end.to_rfc3339()],
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

async fn run_turn(settings: &Settings, text: &str) -> RuntimeResult<()> {
    let google_token = Settings::require(&settings.google_access_token, "GOOGLE_ACCESS_TOKEN")?;
    let orchestrator = build_orchestrator(settings)?;
    let principal = Principal::new(CLI_USER, google_token);

    let response: TurnResponse = orchestrator.handle_turn(text, &principal).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn specify_prompt() -> RuntimeResult<String> {
    let text = Text::new("무엇을 도와드릴까요?").prompt()?;
    if text.trim().is_empty() {
        return Err("No user prompt provided".into());
    }
    Ok(text)
}
