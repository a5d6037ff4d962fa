use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use hubbot::commands::{
    register_global_commands, register_guild_commands, CommandContext, CommandHandler,
};
use hubbot::core::Config;
use hubbot::database::Database;
use hubbot::features::courses::{CatalogueVerifier, CourseVerifier, FormatOnly};
use hubbot::features::reminders::{ReminderScheduler, SerenityDelivery};

struct Handler {
    command_handler: Arc<CommandHandler>,
    guild_id: Option<GuildId>,
}

impl Handler {
    fn new(command_handler: CommandHandler, guild_id: Option<GuildId>) -> Self {
        Handler {
            command_handler: Arc::new(command_handler),
            guild_id,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        // Counting failures stay in the log; the channel is a scream channel, not a console
        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!(
                "Error counting message {} from {} in channel {}: {e}",
                msg.id, msg.author.id, msg.channel_id
            );
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(shard) = ready.shard {
            info!("⚡ Shard: {}/{}", shard[0] + 1, shard[1]);
        }

        // Register slash commands - use guild commands for development (instant), global for production
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: Registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands for guild {guild_id} (instant update)");
            }
        } else {
            info!("🌍 Production mode: Registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("❌ Failed to register global slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands globally (may take up to 1 hour to propagate)");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        if let Err(e) = self
            .command_handler
            .handle_slash_command(&ctx, &command)
            .await
        {
            error!(
                "Error handling slash command '{}': {}",
                command.data.name, e
            );

            let error_message =
                "❌ Sorry, I encountered an error processing your command. Please try again.";

            // The handler may already have answered; edit that answer, otherwise send a new one
            #[allow(clippy::redundant_pattern_matching)]
            if let Err(_) = command
                .edit_original_interaction_response(&ctx.http, |response| {
                    response.content(error_message)
                })
                .await
            {
                if let Err(why) = command
                    .create_interaction_response(&ctx.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| {
                                message.content(error_message).ephemeral(true)
                            })
                    })
                    .await
                {
                    warn!("Failed to send error reply for '{}': {why}", command.data.name);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Arc::new(Config::from_env()?);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Hubbot...");

    let database = Database::new(&config.database_path).await?;

    // Deliveries need an HTTP client before the gateway client exists
    let http = Arc::new(Http::new(&config.discord_token));
    let delivery = Arc::new(SerenityDelivery::new(http));
    let scheduler = ReminderScheduler::new(database.clone(), delivery, &config);

    // Refuse to start with reminders that could not be loaded
    let scheduled = scheduler.rehydrate().await.map_err(|e| {
        error!("❌ Failed to load stored reminders: {e}");
        e
    })?;
    info!("⏰ Rehydrated {scheduled} stored reminder(s)");

    let guild_id = config
        .discord_guild_id
        .as_deref()
        .and_then(|id| match id.parse::<u64>() {
            Ok(id) => Some(GuildId(id)),
            Err(e) => {
                warn!("Ignoring invalid DISCORD_GUILD_ID '{id}': {e}");
                None
            }
        });

    let verifier: Arc<dyn CourseVerifier> = match config.course_catalogue_url.as_deref() {
        Some(url) => Arc::new(CatalogueVerifier::new(url, config.course_cache_days)?),
        None => {
            warn!("⚠️ No course catalogue configured, accepting every well-formed course code");
            Arc::new(FormatOnly)
        }
    };

    let context = CommandContext::new(database, scheduler, verifier, Arc::clone(&config));
    let handler = Handler::new(CommandHandler::new(context), guild_id);

    // GUILD_MEMBERS keeps member roles cached for the course admin checks
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Build the Discord client with proper gateway configuration
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Establishing WebSocket connection to Discord gateway...");
    info!("Gateway intents: {intents:?}");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
