use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use crate::api::{HttpTransport, Transport};
use crate::auth::{Session, SessionStore};
use crate::cache::EntityCache;
use crate::config::Config;
use crate::models::EntityType;

pub mod delete;
pub mod edit;
pub mod leads;
pub mod list;
pub mod login;
pub mod shell;
pub mod ui;

pub use delete::run_delete;
pub use edit::{run_create, run_update};
pub use leads::{run_sync_mail, run_threads};
pub use list::run_list;
pub use login::{run_login, run_logout, run_signup, run_whoami};
pub use shell::run_shell;

#[derive(Parser)]
#[command(name = "crmdesk")]
#[command(about = "Terminal client for the CRM")]
#[command(version)]
pub struct Cli {
    /// Backend base URL, overrides CRM_API_URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in with email and password, or with a federated ID token
    Login(LoginArgs),
    /// Create an account
    Signup(SignupArgs),
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List records of one type
    List(ListArgs),
    /// Create a record
    Create(CreateArgs),
    /// Change fields of a record
    Update(UpdateArgs),
    /// Delete a record
    Delete(DeleteArgs),
    /// Fetch a lead's mail on the server
    SyncMail(LeadArgs),
    /// Show a lead's mail threads
    Threads(LeadArgs),
    /// Interactive shell sharing one cache
    Shell,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: String,
    /// Prompted for when omitted
    #[arg(short, long)]
    pub password: Option<String>,
    /// ID token from a federated sign-in
    #[arg(long, conflicts_with = "password")]
    pub id_token: Option<String>,
    /// Display name that came with the ID token
    #[arg(long, requires = "id_token")]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SignupArgs {
    #[arg(short, long)]
    pub email: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// company, person, deal, product, task, note or lead
    pub entity: EntityType,
    /// Only records attached to this kind (company or person)
    #[arg(long, requires = "related_id")]
    pub related_type: Option<String>,
    #[arg(long, requires = "related_type")]
    pub related_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    pub entity: EntityType,
    /// Field value, repeatable: --set name="Acme Corp"
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// Company, picked by name
    #[arg(long)]
    pub company: Option<String>,
    /// Person, picked by name
    #[arg(long)]
    pub person: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    pub entity: EntityType,
    pub id: String,
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub person: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub entity: EntityType,
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LeadArgs {
    pub lead_id: String,
}

/// Everything a command needs. One per process, so every page shares the
/// same cache.
pub struct App {
    pub config: Config,
    pub session: Session,
    pub cache: EntityCache,
    transport: Arc<dyn Transport>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let session = Session::restore(SessionStore::default_location()?);
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config, session.handle())?);
        Ok(Self::from_parts(config, session, transport))
    }

    pub fn from_parts(config: Config, session: Session, transport: Arc<dyn Transport>) -> Self {
        Self {
            cache: EntityCache::new(Arc::clone(&transport)),
            config,
            session,
            transport,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

/// Run one command from the command line.
pub async fn run_command(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Shell => run_shell(app).await,
        other => run_page(app, other).await,
    }
}

/// Run one command inside or outside the shell.
pub(crate) async fn run_page(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Login(args) => run_login(app, &args).await,
        Commands::Signup(args) => run_signup(app, &args).await,
        Commands::Logout => run_logout(app),
        Commands::Whoami => run_whoami(app),
        Commands::List(args) => run_list(app, &args).await,
        Commands::Create(args) => run_create(app, &args).await,
        Commands::Update(args) => run_update(app, &args).await,
        Commands::Delete(args) => run_delete(app, &args).await,
        Commands::SyncMail(args) => run_sync_mail(app, &args.lead_id).await,
        Commands::Threads(args) => run_threads(app, &args.lead_id).await,
        Commands::Shell => {
            ui::status("Already in the shell.");
            Ok(())
        }
    }
}
