use std::sync::Arc;

use tracing::{error, info};

use gtb_core::{config::Config, logging};
use gtb_openai::OpenAiClient;
use gtb_telegram::{runtime::BotRuntime, webhook};

#[tokio::main]
async fn main() -> Result<(), gtb_core::Error> {
    let cfg = Arc::new(Config::load()?);
    logging::init("gtb", cfg.log_format);

    let openai = Arc::new(OpenAiClient::new(
        cfg.openai_api_key.clone(),
        cfg.system_prompt.clone(),
    ));
    let runtime = Arc::new(BotRuntime::new(cfg.clone(), openai));

    match std::env::args().nth(1).as_deref() {
        // Push-mode: updates arrive over HTTP one at a time.
        Some("serve") => webhook::serve(runtime, cfg.bind_addr).await,

        // Default: long polling with a cooperative shutdown on signal.
        _ => {
            let stopper = runtime.clone();
            tokio::spawn(async move {
                wait_for_termination().await;
                info!("termination signal received");
                stopper.stop().await;
            });

            runtime.start().await
        }
    }
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
