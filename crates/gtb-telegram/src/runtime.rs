//! Bot runtime adapter: connection lifecycle and update dispatch.
//!
//! Updates can arrive by long polling (`start`) or be pushed one at a time
//! (`update`); both paths go through the same handler tree with the same
//! dependency set, so routing behavior is identical for either delivery mode.

use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex},
};

use teloxide::{
    dispatching::{Dispatcher, ShutdownToken, UpdateHandler},
    dptree,
    prelude::*,
    types::{Me, UpdateKind},
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use gtb_core::{config::Config, Error, Result};
use gtb_openai::OpenAiClient;

use crate::handlers;
use crate::middleware::{AccessControl, Flow, Middleware, UpdateLogger};

/// Connection lifecycle phase, logged on every transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Shared, read-only state handed to every handler invocation.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub openai: Arc<OpenAiClient>,
    pub middlewares: Vec<Box<dyn Middleware>>,
}

pub struct BotRuntime {
    bot: Bot,
    state: Arc<AppState>,
    /// Resolved once, on first use, for either delivery mode.
    me: OnceCell<Me>,
    shutdown: Mutex<Option<ShutdownToken>>,
    phase: Mutex<Phase>,
}

impl BotRuntime {
    pub fn new(cfg: Arc<Config>, openai: Arc<OpenAiClient>) -> Self {
        let bot = Bot::new(cfg.telegram_bot_token.clone());
        let middlewares: Vec<Box<dyn Middleware>> = vec![
            Box::new(AccessControl::new(cfg.allowed_chat_ids.clone())),
            Box::new(UpdateLogger),
        ];
        let state = Arc::new(AppState {
            cfg,
            openai,
            middlewares,
        });

        Self {
            bot,
            state,
            me: OnceCell::new(),
            shutdown: Mutex::new(None),
            phase: Mutex::new(Phase::Stopped),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_phase(&self, phase: Phase) {
        let mut guard = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        debug!(from = ?*guard, to = ?phase, "runtime phase");
        *guard = phase;
    }

    async fn identity(&self) -> Result<Me> {
        self.me
            .get_or_try_init(|| async {
                self.bot
                    .get_me()
                    .await
                    .map_err(|e| Error::External(format!("telegram error: {e}")))
            })
            .await
            .cloned()
    }

    /// Begins long polling and blocks until shutdown is requested.
    pub async fn start(&self) -> Result<()> {
        info!("bot is starting");
        self.set_phase(Phase::Starting);

        let me = self.identity().await?;
        info!(
            username = me.username(),
            id = me.user.id.0,
            "bot is running"
        );
        info!(
            allowed_chat_ids = ?self.state.cfg.allowed_chat_ids,
            "supported chats"
        );

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), schema())
            .dependencies(dptree::deps![self.state.clone(), me])
            .build();

        {
            let mut guard = self.shutdown.lock().unwrap_or_else(|p| p.into_inner());
            *guard = Some(dispatcher.shutdown_token());
        }

        self.set_phase(Phase::Running);
        dispatcher.dispatch().await;
        self.set_phase(Phase::Stopped);

        Ok(())
    }

    /// Requests graceful shutdown and resolves only once polling has stopped.
    pub async fn stop(&self) {
        info!("bot is stopping");
        self.set_phase(Phase::Stopping);

        let token = {
            let mut guard = self.shutdown.lock().unwrap_or_else(|p| p.into_inner());
            guard.take()
        };

        if let Some(token) = token {
            if let Ok(done) = token.shutdown() {
                done.await;
            }
        }

        self.set_phase(Phase::Stopped);
        info!("bot stopped");
    }

    /// Push-style delivery: one externally supplied update, dispatched exactly
    /// as a polled update would be.
    pub async fn update(&self, update: Update) -> Result<()> {
        let me = self.identity().await?;
        let deps = dptree::deps![self.bot.clone(), update, me, self.state.clone()];

        match schema().dispatch(deps).await {
            ControlFlow::Break(Ok(())) => Ok(()),
            ControlFlow::Break(Err(e)) => Err(Error::External(format!("telegram error: {e}"))),
            ControlFlow::Continue(_) => Ok(()),
        }
    }
}

fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().endpoint(handle_update)
}

async fn handle_update(
    bot: Bot,
    update: Update,
    me: Me,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    for stage in &state.middlewares {
        match stage.handle(&bot, &update).await {
            Flow::Continue => {}
            Flow::Stop => return Ok(()),
        }
    }

    match update.kind {
        UpdateKind::Message(msg) => handlers::handle_message(bot, msg, me, state).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtb_core::logging::LogFormat;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            telegram_bot_token: "123:testtoken".to_string(),
            allowed_chat_ids: vec![1],
            openai_api_key: "sk-test".to_string(),
            system_prompt: "be helpful".to_string(),
            log_format: LogFormat::Plain,
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
        })
    }

    #[test]
    fn runtime_starts_out_stopped() {
        let cfg = test_config();
        let openai = Arc::new(OpenAiClient::new(
            cfg.openai_api_key.clone(),
            cfg.system_prompt.clone(),
        ));
        let runtime = BotRuntime::new(cfg, openai);
        assert_eq!(runtime.phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn stop_without_start_settles_in_stopped() {
        let cfg = test_config();
        let openai = Arc::new(OpenAiClient::new(
            cfg.openai_api_key.clone(),
            cfg.system_prompt.clone(),
        ));
        let runtime = BotRuntime::new(cfg, openai);
        runtime.stop().await;
        assert_eq!(runtime.phase(), Phase::Stopped);
    }
}
