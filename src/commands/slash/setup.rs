//! Setup slash commands: /setup_statistics, /setup_course

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::channel::ChannelType;
use serenity::model::permissions::Permissions;

/// Creates setup commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_setup_statistics_command(), create_setup_course_command()]
}

/// Every option is optional; omitted ones keep their current value
fn create_setup_statistics_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("setup_statistics")
        .description("Configure scream tracking for this server (Admin)")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("channel")
                .description("Channel where screams are counted")
                .kind(CommandOptionType::Channel)
                .channel_types(&[ChannelType::Text])
                .required(false)
        })
        .create_option(|option| {
            option
                .name("primary_pattern")
                .description("Regex for a qualifying scream")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("secondary_pattern")
                .description("Regex that only counts toward the total")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("minor_threshold")
                .description("Streak length that earns the minor role")
                .kind(CommandOptionType::Integer)
                .min_int_value(0)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("major_threshold")
                .description("Streak length that earns the major role")
                .kind(CommandOptionType::Integer)
                .min_int_value(0)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("minor_role")
                .description("Role granted at the minor threshold")
                .kind(CommandOptionType::Role)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("major_role")
                .description("Role granted at the major threshold")
                .kind(CommandOptionType::Role)
                .required(false)
        })
        .to_owned()
}

fn create_setup_course_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("setup_course")
        .description("Configure course chats for this server (Admin)")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("auto_delete")
                .description("Delete a course chat when its last member leaves")
                .kind(CommandOptionType::Boolean)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("auto_delete_ignore_admins")
                .description("Administrators do not keep a course chat alive")
                .kind(CommandOptionType::Boolean)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("codes")
                .description("Course descriptors members may join, e.g. CSSE,COMP,MATH")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .to_owned()
}
