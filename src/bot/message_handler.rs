//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileMeta;
use tracing::{debug, error, info, warn};

use crate::estimator::MacroEstimator;
use crate::localization::{t_args_lang, t_lang};
use crate::service_errors::ServiceError;

use super::ui_builder::format_food_report;

/// Language code of the message author, if Telegram reports one
fn language_code(msg: &Message) -> Option<&str> {
    msg.from
        .as_ref()
        .and_then(|user| user.language_code.as_ref())
        .map(|s| s.as_str())
}

/// Download a Telegram file into memory
pub async fn download_file(bot: &Bot, file: &FileMeta) -> Result<Vec<u8>> {
    let file = bot.get_file(file.id.clone()).await?;
    let mut bytes = Vec::with_capacity(file.meta.size as usize);
    bot.download_file(&file.path, &mut bytes).await?;
    Ok(bytes)
}

/// Message key answering a text message: `/start`, `/help` or the photo hint
pub fn text_reply_key(text: &str) -> &'static str {
    let command = text.split_whitespace().next().unwrap_or_default();
    // Commands in groups arrive as /start@BotName
    match command.split('@').next().unwrap_or_default() {
        "/start" => "welcome-message",
        "/help" => "help-message",
        _ => "text-hint",
    }
}

/// Reply text for an estimation failure
pub fn error_message_for(error: &ServiceError, language_code: Option<&str>) -> String {
    match error {
        ServiceError::ImageRejected(_) => t_lang("error-unsupported-format", language_code),
        ServiceError::CircuitOpen(_) => t_lang("error-service-busy", language_code),
        _ => t_lang("error-processing", language_code),
    }
}

/// Download an image, estimate its macros and reply with the result
pub async fn download_and_process_image(
    bot: &Bot,
    file: &FileMeta,
    chat_id: ChatId,
    language_code: Option<&str>,
    estimator: &MacroEstimator,
) -> Result<()> {
    let max_bytes = estimator.max_image_bytes();
    if file.size as usize > max_bytes {
        warn!(user_id = %chat_id, size = file.size, "Image exceeds size limit");
        let limit = (max_bytes / (1024 * 1024)).to_string();
        bot.send_message(
            chat_id,
            t_args_lang("error-image-too-large", &[("limit", limit.as_str())], language_code),
        )
        .await?;
        return Ok(());
    }

    bot.send_message(chat_id, t_lang("processing-photo", language_code))
        .await?;

    let bytes = match download_file(bot, file).await {
        Ok(bytes) => {
            debug!(user_id = %chat_id, bytes = bytes.len(), "Image downloaded successfully");
            bytes
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Failed to download image for user");
            bot.send_message(chat_id, t_lang("error-download-failed", language_code))
                .await?;
            return Ok(());
        }
    };

    let reply = match estimator.estimate(&bytes).await {
        Ok(Some(report)) => {
            info!(user_id = %chat_id, food = %report.food, "Sending nutrition report");
            format_food_report(&report, language_code)
        }
        Ok(None) => {
            info!(user_id = %chat_id, "No food identified");
            t_lang("error-not-identified", language_code)
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Macro estimation failed");
            error_message_for(&e, language_code)
        }
    };

    bot.send_message(chat_id, reply).await?;
    Ok(())
}

async fn handle_text_message(bot: &Bot, msg: &Message) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    debug!(user_id = %msg.chat.id, message_length = text.len(), "Received text message from user");

    let reply = t_lang(text_reply_key(text), language_code(msg));
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_photo_message(bot: &Bot, msg: &Message, estimator: &MacroEstimator) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received photo message from user");

    // Telegram lists sizes smallest first
    if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        download_and_process_image(
            bot,
            &largest_photo.file,
            msg.chat.id,
            language_code(msg),
            estimator,
        )
        .await?;
    }
    Ok(())
}

async fn handle_document_message(
    bot: &Bot,
    msg: &Message,
    estimator: &MacroEstimator,
) -> Result<()> {
    let language_code = language_code(msg);

    let Some(doc) = msg.document() else {
        return Ok(());
    };

    match &doc.mime_type {
        Some(mime_type) if mime_type.type_() == "image" => {
            debug!(user_id = %msg.chat.id, mime_type = %mime_type, "Received image document from user");
            download_and_process_image(bot, &doc.file, msg.chat.id, language_code, estimator)
                .await?;
        }
        other => {
            debug!(user_id = %msg.chat.id, mime_type = ?other, "Received non-image document from user");
            bot.send_message(
                msg.chat.id,
                t_lang("error-unsupported-format", language_code),
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
    bot.send_message(
        msg.chat.id,
        t_lang("unsupported-message", language_code(msg)),
    )
    .await?;
    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    estimator: Arc<MacroEstimator>,
) -> Result<()> {
    if msg.text().is_some() {
        handle_text_message(&bot, &msg).await?;
    } else if msg.photo().is_some() {
        handle_photo_message(&bot, &msg, &estimator).await?;
    } else if msg.document().is_some() {
        handle_document_message(&bot, &msg, &estimator).await?;
    } else {
        handle_unsupported_message(&bot, &msg).await?;
    }

    Ok(())
}
