use std::process::ExitCode;

use agora_infra::Configuration;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Configuration::from_env();

    let provider = match agora_host::bootstrap(&config) {
        Ok(provider) => provider,
        Err(err) => {
            // The subscriber may not be installed if the failure was in its own config.
            tracing::error!(error = ?err, "startup failed");
            eprintln!("startup failed: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(participants = ?provider.participant_names(), "platform ready; press Ctrl-C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return ExitCode::FAILURE;
    }

    tracing::info!("shutting down");
    ExitCode::SUCCESS
}
