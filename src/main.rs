//! Command-line interface over the chat ledger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use chat_ledger::config::AppConfig;
use chat_ledger::db::establish_connection;
use chat_ledger::logging::{init_logging, OperationTimer};
use chat_ledger::metrics::MetricsCollector;
use chat_ledger::models::{NewMessage, User};
use chat_ledger::service::MessageService;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user reference
    AddUser {
        /// Username to register
        #[arg(short, long)]
        username: String,
    },
    /// Send a message from one user to another
    Send {
        /// Username of the sender
        #[arg(short, long)]
        sender: String,

        /// Username of the receiver
        #[arg(short, long)]
        receiver: String,

        /// Message content
        #[arg(short, long)]
        content: String,

        /// Message id this message replies to
        #[arg(short, long)]
        parent: Option<i64>,
    },
    /// Edit a message's content, recording the prior version
    Edit {
        /// Id of the message to edit
        #[arg(short, long)]
        message_id: i64,

        /// New content
        #[arg(short, long)]
        content: String,

        /// Username of the editor (defaults to the message's sender)
        #[arg(short, long)]
        editor: Option<String>,
    },
    /// Show the edit history of a message
    History {
        /// Id of the message
        #[arg(short, long)]
        message_id: i64,
    },
    /// Reconstruct and print the thread containing a message
    Thread {
        /// Id of any message in the thread
        #[arg(short, long)]
        message_id: i64,

        /// Username of the viewing user (must be sender or receiver)
        #[arg(short, long)]
        actor: String,
    },
    /// List unread messages for a user
    Unread {
        /// Username of the receiver
        #[arg(short, long)]
        user: String,

        /// Print only the count
        #[arg(long)]
        count_only: bool,
    },
    /// Mark unread messages as read
    MarkRead {
        /// Username of the receiver
        #[arg(short, long)]
        user: String,

        /// Specific message ids (all unread when omitted)
        #[arg(short, long)]
        ids: Vec<i64>,
    },
    /// List notifications for a user
    Notifications {
        /// Username of the notified user
        #[arg(short, long)]
        user: String,

        /// Mark all notifications read instead of listing
        #[arg(long)]
        mark_all_read: bool,
    },
    /// Delete a message (sender or receiver only)
    DeleteMessage {
        /// Id of the message to delete
        #[arg(short, long)]
        message_id: i64,

        /// Username of the acting user
        #[arg(short, long)]
        actor: String,
    },
    /// Delete a user and everything referencing them
    DeleteUser {
        /// Username of the user to delete
        #[arg(short, long)]
        username: String,
    },
    /// Show how many rows deleting a user would remove
    Stats {
        /// Username of the user
        #[arg(short, long)]
        username: String,
    },
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let config = AppConfig::load()?;

    let _log_guard = init_logging(Some(&config.get_log_level()), None)?;

    if let Err(e) = MetricsCollector::init() {
        warn!("Metrics disabled: {e}");
    }

    info!("Starting chat-ledger");

    let cli = Cli::parse();

    let db = establish_connection(&config.get_database_path())?;
    let service = MessageService::new(db);

    let timer = OperationTimer::new("command");

    match cli.command {
        Commands::AddUser { username } => {
            let user = service.register_user(&username)?;
            println!("Registered user {} (id {})", user.username, user.id);
        }
        Commands::Send {
            sender,
            receiver,
            content,
            parent,
        } => {
            let sender = resolve_user(&service, &sender)?;
            let receiver = resolve_user(&service, &receiver)?;
            let mut new_message = NewMessage::new(sender.id, receiver.id, content);
            if let Some(parent_id) = parent {
                new_message = new_message.reply_to(parent_id);
            }
            let message = service.send_message(new_message)?;
            println!("Sent message {} at {}", message.id, message.timestamp);
        }
        Commands::Edit {
            message_id,
            content,
            editor,
        } => {
            let editor_id = match editor {
                Some(name) => Some(resolve_user(&service, &name)?.id),
                None => None,
            };
            let message = service.edit_message(message_id, &content, editor_id)?;
            if message.edited {
                println!("Edited message {message_id}");
            } else {
                println!("Message {message_id} unchanged");
            }
        }
        Commands::History { message_id } => {
            let history = service.message_history(message_id)?;
            if history.is_empty() {
                println!("Message {message_id} has never been edited");
            }
            for entry in history {
                println!(
                    "v{} at {} by user {}: {}",
                    entry.version, entry.edited_at, entry.edited_by_id, entry.old_content
                );
            }
        }
        Commands::Thread { message_id, actor } => {
            let actor = resolve_user(&service, &actor)?;
            let thread = service.fetch_thread(message_id, actor.id)?;
            println!("{}", serde_json::to_string_pretty(&thread)?);
        }
        Commands::Unread { user, count_only } => {
            let user = resolve_user(&service, &user)?;
            if count_only {
                println!("{}", service.unread_count(user.id)?);
            } else {
                for unread in service.unread_for(user.id)? {
                    println!(
                        "[{}] from {}: {}",
                        unread.message.id, unread.sender_username, unread.message.content
                    );
                }
            }
        }
        Commands::MarkRead { user, ids } => {
            let user = resolve_user(&service, &user)?;
            let ids = if ids.is_empty() { None } else { Some(ids.as_slice()) };
            let updated = service.mark_read(user.id, ids)?;
            println!("Marked {updated} messages read");
        }
        Commands::Notifications {
            user,
            mark_all_read,
        } => {
            let user = resolve_user(&service, &user)?;
            if mark_all_read {
                let updated = service.mark_all_notifications_read(user.id)?;
                println!("Marked {updated} notifications read");
            } else {
                for notification in service.notifications_for(user.id)? {
                    let read_marker = if notification.is_read { " " } else { "*" };
                    println!(
                        "{read_marker} [{}] {}: {}",
                        notification.id, notification.title, notification.content
                    );
                }
            }
        }
        Commands::DeleteMessage { message_id, actor } => {
            let actor = resolve_user(&service, &actor)?;
            service.delete_message(message_id, actor.id)?;
            println!("Deleted message {message_id}");
        }
        Commands::DeleteUser { username } => {
            let user = resolve_user(&service, &username)?;
            let stats = service.deletion_stats(user.id)?;
            service.delete_user(user.id)?;
            println!(
                "Deleted user {} and {} dependent rows",
                username,
                stats.total()
            );
        }
        Commands::Stats { username } => {
            let user = resolve_user(&service, &username)?;
            let stats = service.deletion_stats(user.id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    timer.finish();

    Ok(())
}

/// Resolve a username to its user row.
fn resolve_user(service: &MessageService, username: &str) -> Result<User> {
    service
        .database()
        .get_user_by_username(username)?
        .with_context(|| format!("No such user: {username}"))
}
