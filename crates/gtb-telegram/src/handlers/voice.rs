//! Voice pipeline: download, transcode, transcribe, then answer as text.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
};

use teloxide::{
    net::Download,
    prelude::*,
    types::{ChatAction, Me, Voice},
};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{error, warn};

use gtb_core::routing::classify;

use crate::runtime::AppState;
use crate::{bot_identity, incoming_message};

const MAX_VOICE_SECONDS: u32 = 30;
const VOICE_LIMIT_NOTICE: &str =
    "🚫 Voice message duration limit exceeded. The maximum duration is 30 seconds.";

static VOICE_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn exceeds_duration_limit(duration: u32) -> bool {
    duration > MAX_VOICE_SECONDS
}

pub(crate) async fn handle_voice(
    bot: Bot,
    msg: Message,
    me: Me,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(voice) = msg.voice() else {
        return Ok(());
    };

    let reaction = classify(&incoming_message(&msg), &bot_identity(&me));
    if !reaction.need_reaction {
        return Ok(());
    }

    // Hard synchronous guard: nothing is downloaded or transcribed past here.
    if exceeds_duration_limit(voice.duration) {
        bot.send_message(msg.chat.id, VOICE_LIMIT_NOTICE).await?;
        return Ok(());
    }

    let transcript = match fetch_transcript(&bot, &state, voice).await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, chat_id = msg.chat.id.0, "voice transcription failed");
            return Ok(());
        }
    };

    if transcript.trim().is_empty() {
        return Ok(());
    }

    // Echo the recognized text so the user can verify it.
    if let Err(e) = bot
        .send_message(
            msg.chat.id,
            format!("Request: {transcript}\n\n⌛ Processing a request..."),
        )
        .await
    {
        error!(error = %e, chat_id = msg.chat.id.0, "sending transcript echo failed");
    }

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        warn!(error = %e, chat_id = msg.chat.id.0, "typing action failed");
    }

    let response = match state
        .openai
        .chat_completion(&transcript, reaction.prev_turn.as_ref())
        .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, chat_id = msg.chat.id.0, "chat completion failed");
            return Ok(());
        }
    };

    let mut reply = bot.send_message(msg.chat.id, response);
    if reaction.is_group {
        reply = reply.reply_to_message_id(msg.id);
    }
    if let Err(e) = reply.await {
        error!(error = %e, chat_id = msg.chat.id.0, "sending reply failed");
    }

    Ok(())
}

async fn fetch_transcript(bot: &Bot, state: &AppState, voice: &Voice) -> anyhow::Result<String> {
    let path = download_voice(bot, voice).await?;
    let transcoded = transcode_ogg_to_mp3(&path).await;
    let _ = tokio::fs::remove_file(&path).await;

    let audio = transcoded?;
    Ok(state.openai.transcribe(audio).await?)
}

async fn download_voice(bot: &Bot, voice: &Voice) -> anyhow::Result<PathBuf> {
    let file = bot.get_file(voice.file.id.clone()).await?;

    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let n = VOICE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!("gtb_voice_{ts}_{n}.ogg"));

    let mut dst = tokio::fs::File::create(&path).await?;
    bot.download_file(&file.path, &mut dst).await?;
    dst.flush().await?;
    Ok(path)
}

/// Converts the Telegram ogg container to the mp3 the transcription endpoint
/// accepts, capturing the transcoded bytes from ffmpeg's stdout.
async fn transcode_ogg_to_mp3(path: &Path) -> anyhow::Result<Vec<u8>> {
    let output = Command::new("ffmpeg")
        .args(["-f", "ogg", "-i"])
        .arg(path)
        .args(["-f", "mp3", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg exited with {}", output.status);
    }
    if output.stdout.is_empty() {
        anyhow::bail!("ffmpeg produced no output");
    }

    Ok(output.stdout)
}
