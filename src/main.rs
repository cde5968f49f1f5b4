use std::sync::Arc;

use scholar_outreach::agent::{Orchestrator, OrchestratorDeps, RunOutcome};
use scholar_outreach::browser::ChromeBrowser;
use scholar_outreach::channels::{SmtpMailer, StdConsole};
use scholar_outreach::config::AppConfig;
use scholar_outreach::llm::{LlmConfig, create_provider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Error: Failed to install rustls crypto provider");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Set them in the environment or a .env file.");
        std::process::exit(1);
    });

    eprintln!("📧 Scholar Outreach v{}", env!("CARGO_PKG_VERSION"));

    let llm = create_provider(&LlmConfig {
        api_key: config.openai_api_key.clone(),
        model: config.model.clone(),
    })?;

    let deps = OrchestratorDeps {
        browser: Arc::new(ChromeBrowser::new(config.research.chrome_bin.clone())),
        llm,
        mailer: Arc::new(SmtpMailer::new()),
    };

    let orchestrator = Orchestrator::new(config, deps);
    let mut console = StdConsole::new();
    match orchestrator.run(&mut console).await {
        RunOutcome::Completed(report) => tracing::info!("{}", report.summary()),
        RunOutcome::Cancelled => tracing::info!("Run cancelled before start"),
        RunOutcome::Aborted(e) => tracing::info!(error = %e, "Run aborted"),
    }

    Ok(())
}
