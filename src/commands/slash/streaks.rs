//! Streak slash commands: /stats, /didiscream, /leaderboard, /save_streak

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

/// Creates streak commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        CreateApplicationCommand::default()
            .name("stats")
            .description("Your scream count and streaks")
            .to_owned(),
        CreateApplicationCommand::default()
            .name("didiscream")
            .description("Check whether someone has screamed today")
            .create_option(|option| {
                option
                    .name("user")
                    .description("Who to check (defaults to you)")
                    .kind(CommandOptionType::User)
                    .required(false)
            })
            .to_owned(),
        CreateApplicationCommand::default()
            .name("leaderboard")
            .description("Top screamers by total, current streak and best streak")
            .to_owned(),
        CreateApplicationCommand::default()
            .name("save_streak")
            .description("Spend 30 days of streak to rescue a streak with missed days")
            .to_owned(),
    ]
}
