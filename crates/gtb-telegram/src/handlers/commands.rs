use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatAction, InputFile},
};
use tracing::{error, warn};
use url::Url;

use crate::runtime::AppState;

/// `/pic <prompt>`: generates one image and replies with it by URL, threaded
/// to the originating message. An empty prompt is a no-op.
pub(crate) async fn handle_pic(
    bot: Bot,
    msg: Message,
    prompt: String,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Ok(());
    }

    if let Err(e) = bot
        .send_chat_action(msg.chat.id, ChatAction::UploadPhoto)
        .await
    {
        warn!(error = %e, chat_id = msg.chat.id.0, "upload photo action failed");
    }

    let url = match state.openai.generate_image(prompt, None).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, chat_id = msg.chat.id.0, "image generation failed");
            return Ok(());
        }
    };

    let url = match Url::parse(&url) {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, url, "image url is not parseable");
            return Ok(());
        }
    };

    if let Err(e) = bot
        .send_photo(msg.chat.id, InputFile::url(url))
        .reply_to_message_id(msg.id)
        .await
    {
        error!(error = %e, chat_id = msg.chat.id.0, "sending photo failed");
    }

    Ok(())
}
