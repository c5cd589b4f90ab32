use clap::Parser;

use model_bootstrap::{health, Args, Orchestrator, Result, Shutdown};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    args.init_logging();

    let code = match run(args).await {
        Ok(code) => {
            tracing::info!(code, "Daemon exited, stopping container");
            code
        }
        Err(err) => {
            tracing::error!(error = %err, "Model bootstrap failed");
            err.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(args: Args) -> Result<i32> {
    let parameters = args.parameters()?;
    let settings = args.settings()?;

    tracing::info!(
        base_model = %parameters.base_model,
        context_size = parameters.context_size,
        temperature = parameters.temperature,
        model = %settings.model_name,
        daemon = %settings.daemon.program.display(),
        control = ?settings.control,
        "Model bootstrap starting"
    );

    let shutdown = Shutdown::new();
    if let Err(err) = shutdown.listen() {
        tracing::warn!(error = %err, "Could not install signal handlers; daemon will not receive forwarded signals");
    }

    let health_addr = settings.health_addr;
    let orchestrator = Orchestrator::new(parameters, settings, shutdown);
    if let Some(addr) = health_addr {
        let _health = health::spawn(addr, orchestrator.status_board()).await?;
    }

    orchestrator.run().await
}
