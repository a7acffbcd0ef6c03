//! Server-side notification handlers.

use tabled::Tabled;

use autouni_api::rest::models::{NotificationType, ServerNotification};
use autouni_core::NoticeLevel;

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "Time")]
    created_at: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Read")]
    read: &'static str,
}

fn level_of(kind: NotificationType) -> NoticeLevel {
    match kind {
        NotificationType::Info => NoticeLevel::Info,
        NotificationType::Success => NoticeLevel::Success,
        NotificationType::Warning => NoticeLevel::Warning,
        NotificationType::Error => NoticeLevel::Error,
    }
}

pub async fn handle(
    args: NotificationsArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let controller = util::controller(resolved)?;
    util::ensure_session(&controller)?;

    match args.command {
        NotificationsCommand::List { unread } => {
            let api = controller.api();
            let mut list = if unread {
                api.unread_notifications().await?
            } else {
                api.list_notifications().await?
            };
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let out = output::render_list(
                &global.output,
                &list,
                |n: &ServerNotification| NotificationRow {
                    created_at: n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    level: output::paint_level(level_of(n.notification_type), color),
                    title: n.title.clone(),
                    message: n.message.clone(),
                    read: if n.read { "yes" } else { "no" },
                },
                |n| n.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
