use clap::{Parser, Subcommand};
use mucu_portal::{
    AppConfig, AppState, Attachment, Content, ContentForm, ContentKind, Env, GuardDecision,
    error::{ApiError, StorageError, ValidationError},
    models::{Department, Event, Media, Resource},
    views::{BroadcastView, ListView, LoginView, SignupView},
};
use serde::Serialize;
use std::{path::PathBuf, process::ExitCode};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line front-end for the MUCU website backend.
#[derive(Parser)]
#[command(name = "mucu-portal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new account. Log in afterwards.
    Signup {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Forget the persisted session.
    Logout,
    /// Show the current identity and role.
    Whoami,
    /// List departments, media, resources or events.
    List { kind: ContentKind },
    /// Fetch one item by id (events: by name).
    Get { kind: ContentKind, key: String },
    /// Create an item (admin).
    Create {
        kind: ContentKind,
        /// Text field as name=value; repeatable.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Thumbnail file to upload.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Update an item (admin).
    Update {
        kind: ContentKind,
        id: i64,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete an item (admin).
    Delete { kind: ContentKind, id: i64 },
    /// List every registered user (admin).
    Users,
    /// Change a user's role (admin).
    AssignRole { email: String, role: String },
    /// Email every verified user (admin).
    Broadcast {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Change the account email.
    UpdateEmail { email: String, new_email: String },
    /// Delete an account by user id.
    DeleteAccount { user_id: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("admin access required (redirected to {0})")]
    Denied(&'static str),

    /// A view already produced the user-facing message.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not render output: {0}")]
    Output(#[from] serde_json::Error),
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

/// Runs `$body` with `$t` bound to the model type for `$kind`.
macro_rules! with_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            ContentKind::Department => {
                type $t = Department;
                $body
            }
            ContentKind::Media => {
                type $t = Media;
                $body
            }
            ContentKind::Resource => {
                type $t = Resource;
                $body
            }
            ContentKind::Event => {
                type $t = Event;
                $body
            }
        }
    };
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Configuration
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 2. Logging: pretty locally, JSON in production, always on stderr.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mucu_portal=info".into());
    match config.env {
        Env::Local => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        Env::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
    tracing::debug!("client starting in {:?} mode", config.env);

    // 3. State assembly and session restore
    let mut state = match AppState::bootstrap(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &mut state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, state: &mut AppState) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let mut view = LoginView::new();
            view.email = email;
            view.password = password;
            if !view.submit(&mut state.session).await {
                return Err(failed(view.error()));
            }
            let role = state.session.user().map(|u| u.role.as_str()).unwrap_or_default();
            println!("Logged in as {} ({role})", view.email);
        }
        Command::Signup {
            email,
            password,
            confirm,
        } => {
            let mut view = SignupView::new();
            view.email = email;
            view.password = password;
            view.confirm_password = confirm;
            if !view.submit(&state.session).await {
                return Err(failed(view.error()));
            }
            println!("Account created. Log in to continue.");
        }
        Command::Logout => {
            state.session.logout().await?;
            println!("Logged out.");
        }
        Command::Whoami => match state.session.user() {
            Some(user) => println!(
                "{} ({}{})",
                user.email,
                user.role,
                if state.session.is_admin() { ", admin" } else { "" }
            ),
            None => println!("Not logged in."),
        },
        Command::List { kind } => with_kind!(kind, T => list::<T>(state).await?),
        Command::Get { kind, key } => with_kind!(kind, T => {
            let item = state.client.get::<T>(&key, state.session.token()).await?;
            print_json(&item)?;
        }),
        Command::Create { kind, fields, file } => {
            require_admin(state, "/admin")?;
            let form = build_form(kind, fields, file).await?;
            with_kind!(kind, T => save::<T>(state, None, form).await?)
        }
        Command::Update {
            kind,
            id,
            fields,
            file,
        } => {
            require_admin(state, "/admin")?;
            let form = build_form(kind, fields, file).await?;
            with_kind!(kind, T => save::<T>(state, Some(id), form).await?)
        }
        Command::Delete { kind, id } => {
            require_admin(state, "/admin")?;
            with_kind!(kind, T => {
                let mut view = ListView::<T>::admin();
                if !view.delete(&state.client, &state.session, id).await {
                    return Err(failed(view.error()));
                }
                println!("Deleted {kind} {id}.");
            })
        }
        Command::Users => {
            require_admin(state, "/admin")?;
            for email in state.client.get_all_users(state.session.token()).await? {
                println!("{email}");
            }
        }
        Command::AssignRole { email, role } => {
            require_admin(state, "/admin")?;
            let reply = state
                .client
                .assign_role(&email, &role, state.session.token())
                .await?;
            println!("{}", non_blank(reply, "Role updated."));
        }
        Command::Broadcast { subject, body } => {
            require_admin(state, "/admin/broadcast")?;
            let mut view = BroadcastView::new();
            view.subject = subject;
            view.body = body;
            if !view.submit(&state.client, &state.session).await {
                return Err(failed(view.error()));
            }
            println!("{}", view.success().unwrap_or("Broadcast queued."));
        }
        Command::UpdateEmail { email, new_email } => {
            let reply = state
                .client
                .update_email(&email, &new_email, state.session.token())
                .await?;
            println!("{}", non_blank(reply, "Email updated."));
        }
        Command::DeleteAccount { user_id } => {
            let reply = state
                .client
                .delete_account(&user_id, state.session.token())
                .await?;
            println!("{}", non_blank(reply, "Account deleted."));
        }
    }
    Ok(())
}

fn require_admin(state: &AppState, path: &str) -> Result<(), CliError> {
    match state.guard(path) {
        GuardDecision::Allow => Ok(()),
        GuardDecision::Redirect(to) => Err(CliError::Denied(to)),
    }
}

async fn build_form(
    kind: ContentKind,
    fields: Vec<(String, String)>,
    file: Option<PathBuf>,
) -> Result<ContentForm, CliError> {
    let mut form = ContentForm::new(kind);
    for (name, value) in fields {
        form = form.set(&name, value)?;
    }
    if let Some(path) = file {
        form = form.attach(Attachment::read(path).await?);
    }
    Ok(form)
}

async fn list<T: Content + Serialize>(state: &AppState) -> Result<(), CliError> {
    let mut view = ListView::<T>::public();
    view.refresh(&state.client, &state.session).await;
    if let Some(message) = view.error() {
        return Err(CliError::Failed(message.to_string()));
    }
    print_json(view.items())
}

async fn save<T: Content>(state: &AppState, editing: Option<i64>, form: ContentForm) -> Result<(), CliError> {
    let mut view = ListView::<T>::admin();
    if !view.save(&state.client, &state.session, editing, form).await {
        return Err(failed(view.error()));
    }
    println!("Saved. {} {} now listed.", view.items().len(), T::KIND.plural());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn failed(message: Option<&str>) -> CliError {
    CliError::Failed(message.unwrap_or("Request failed").to_string())
}

fn non_blank(reply: String, fallback: &str) -> String {
    if reply.trim().is_empty() {
        fallback.to_string()
    } else {
        reply
    }
}
