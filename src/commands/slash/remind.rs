//! Reminder slash commands: /remind, /reminders, /all_reminders

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::permissions::Permissions;

/// Creates reminder commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_remind_command(),
        create_reminders_command(),
        create_all_reminders_command(),
    ]
}

fn create_remind_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("remind")
        .description("Set a reminder in this channel")
        .create_option(|option| {
            option
                .name("time")
                .description("When to remind you, e.g. 30m, 2h, 1d, 1h30m, 1w3d")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("message")
                .description("What to remind you about")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("repeat")
                .description("Repeat at this interval until cancelled")
                .kind(CommandOptionType::Boolean)
                .required(false)
        })
        .to_owned()
}

fn create_reminders_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("reminders")
        .description("List or cancel your reminders")
        .create_option(|option| {
            option
                .name("action")
                .description("What to do (defaults to list)")
                .kind(CommandOptionType::String)
                .required(false)
                .add_string_choice("list", "list")
                .add_string_choice("cancel", "cancel")
        })
        .create_option(|option| {
            option
                .name("id")
                .description("Reminder ID to cancel")
                .kind(CommandOptionType::Integer)
                .required(false)
        })
        .to_owned()
}

fn create_all_reminders_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("all_reminders")
        .description("List every pending reminder (Admin)")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .dm_permission(false)
        .to_owned()
}
