use answer_evals::app::{self, OutputFormat, RunOptions};
use answer_evals::config::HarnessConfig;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "run-evals", about = "Run the test commands recorded in answer receipts")]
struct Cli {
    /// Only evaluate the answer with this id
    answer_id: Option<String>,

    /// Directory the test commands run in (contains `answers/`)
    #[arg(long)]
    repo_root: Option<PathBuf>,

    /// Per-answer time budget in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        RunOptions {
            answer_id: cli.answer_id,
            repo_root: cli.repo_root,
            timeout_secs: cli.timeout_secs,
            format: cli.format,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment may already carry the settings
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let options = RunOptions::from(Cli::parse());
    let mut stdout = std::io::stdout().lock();

    let outcome = match HarnessConfig::from_env() {
        Ok(config) => app::run(config, &options, &mut stdout).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        eprintln!("❌ {}", e);
    }

    ExitCode::from(app::exit_status(&outcome))
}
