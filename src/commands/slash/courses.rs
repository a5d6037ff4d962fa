//! Course slash commands: /course, /enrollment

use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::model::application::command::CommandOptionType;
use serenity::model::channel::ChannelType;
use serenity::model::permissions::Permissions;

/// Creates course commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_course_command(), create_enrollment_command()]
}

fn code_option(option: &mut CreateApplicationCommandOption) -> &mut CreateApplicationCommandOption {
    option
        .name("course_code")
        .description("Course code, e.g. CSSE1001")
        .kind(CommandOptionType::String)
        .required(true)
}

fn channel_option(option: &mut CreateApplicationCommandOption) -> &mut CreateApplicationCommandOption {
    option
        .name("channel")
        .description("Course channel")
        .kind(CommandOptionType::Channel)
        .channel_types(&[ChannelType::Text, ChannelType::Category])
        .required(true)
}

/// Member subcommands take a course code; the rest are checked for Manage Server
fn create_course_command() -> CreateApplicationCommand {
    let mut cmd = CreateApplicationCommand::default();
    cmd.name("course")
        .description("Join, leave and manage course chats")
        .dm_permission(false);

    for (name, description) in [
        ("enrol", "Join a course chat"),
        ("drop", "Leave a course chat"),
        ("show", "How many people are in a course chat"),
    ] {
        cmd.create_option(|sub| {
            sub.name(name)
                .description(description)
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(code_option)
        });
    }

    cmd.create_option(|sub| {
        sub.name("reset")
            .description("Clear a course chat's history (Admin)")
            .kind(CommandOptionType::SubCommand)
            .create_sub_option(channel_option)
    })
    .create_option(|sub| {
        sub.name("reset_exception")
            .description("Keep a course chat out of reset_all (Admin)")
            .kind(CommandOptionType::SubCommand)
            .create_sub_option(channel_option)
            .create_sub_option(|o| {
                o.name("exception")
                    .description("Skip this chat when resetting everything")
                    .kind(CommandOptionType::Boolean)
                    .required(true)
            })
    })
    .create_option(|sub| {
        sub.name("delete")
            .description("Delete a course chat or category (Admin)")
            .kind(CommandOptionType::SubCommand)
            .create_sub_option(channel_option)
    });

    for (name, description) in [
        ("reset_all", "Clear the history of every course chat (Admin)"),
        ("sync", "Rebuild the course records from the server (Admin)"),
        ("clean", "Delete course chats nobody is enrolled in (Admin)"),
    ] {
        cmd.create_option(|sub| {
            sub.name(name)
                .description(description)
                .kind(CommandOptionType::SubCommand)
        });
    }

    cmd
}

fn create_enrollment_command() -> CreateApplicationCommand {
    let mut cmd = CreateApplicationCommand::default();
    cmd.name("enrollment")
        .description("Inspect course enrollments (Admin)")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .dm_permission(false);

    for (name, description) in [
        ("list", "List the course chats someone is enrolled in"),
        ("purge", "Forget every enrollment of someone"),
    ] {
        cmd.create_option(|sub| {
            sub.name(name)
                .description(description)
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|o| {
                    o.name("user")
                        .description("Member to look at (defaults to you)")
                        .kind(CommandOptionType::User)
                        .required(false)
                })
        });
    }

    cmd
}
