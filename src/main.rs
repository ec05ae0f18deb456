use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use macrocalbot::bot;
use macrocalbot::config::credential_gate;
use macrocalbot::estimator::MacroEstimator;
use macrocalbot::nutrition::NutritionixClient;
use macrocalbot::settings::{BotSettings, RunMode};
use macrocalbot::vision::VisionClient;

const HTTP_TIMEOUT_SECS: u64 = 30;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = BotSettings::from_env();
    init_tracing(settings.as_ref().is_ok_and(|s| s.json_logs));

    info!("Starting MacroCalBot");
    let settings = settings.map_err(|e| {
        error!(error = %e, "Invalid runtime settings");
        e
    })?;

    run(settings).await
}

async fn run(settings: BotSettings) -> Result<()> {
    // Nothing below runs until every credential is in place
    let credentials = credential_gate(&settings.config_path).map_err(|e| {
        error!(path = %settings.config_path.display(), error = %e, "Credential gate failed");
        e
    })?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let vision = VisionClient::from_credentials_file(http.clone(), credentials.vision_credentials_file())
        .context("Failed to initialize Vision client")?;
    let nutrition = NutritionixClient::new(http, credentials.nutritionix().clone());
    let estimator = Arc::new(MacroEstimator::new(
        Arc::new(vision),
        Arc::new(nutrition),
        &settings,
    ));

    let bot = Bot::new(credentials.telegram_bot_token());

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let estimator = Arc::clone(&estimator);
        move |bot: Bot, msg: Message| {
            let estimator = Arc::clone(&estimator);
            async move { bot::message_handler(bot, msg, estimator).await }
        }
    }));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .enable_ctrlc_handler()
        .build();

    match settings.run_mode {
        RunMode::Polling => {
            info!("Receiving updates by long polling");
            dispatcher.dispatch().await;
        }
        RunMode::Webhook {
            listen,
            url,
            secret_token,
        } => {
            info!(%listen, %url, "Receiving updates by webhook");
            let mut options = webhooks::Options::new(listen, url);
            if let Some(secret) = secret_token {
                options = options.secret_token(secret);
            }
            let listener = webhooks::axum(bot, options)
                .await
                .context("Failed to register webhook")?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    info!("Dispatcher stopped");
    Ok(())
}
