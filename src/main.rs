use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use opsgate::approval::{PlanSnapshot, PlanStatus, PlanWorkflow};
use opsgate::models::plan::PlanFilters;
use opsgate::models::Role;
use opsgate::session::SqliteSessionStorage;
use opsgate::{db, ApiClient, AppConfig, AppError, AppResult, Decision, Guard, RouteTable, SessionStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "role-gated navigation and plan approvals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and keep the session for later commands
    Login {
        #[arg(long)]
        user_id: String,
        #[arg(long, env = "OPSGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check whether the current session may open a path
    Navigate { path: String },
    /// List the menu sections visible to the current session
    Menu,
    /// Work with PEM operation plans
    #[command(subcommand)]
    Plans(PlanCommands),
}

#[derive(Subcommand, Debug)]
enum PlanCommands {
    List {
        #[arg(long)]
        status: Option<PlanStatus>,
        #[arg(long)]
        schedule: Option<i64>,
    },
    Show { id: i64 },
    Submit { id: i64 },
    Approve(DecisionArgs),
    Reject(DecisionArgs),
    /// Plans waiting on the signed-in user
    Pending,
}

#[derive(Args, Debug)]
struct DecisionArgs {
    id: i64,
    /// Approver slot to act for; defaults to the signed-in user's role
    #[arg(long)]
    role: Option<Role>,
    #[arg(long, default_value = "")]
    comment: String,
}

struct Context {
    config: AppConfig,
    session: Arc<SessionStore>,
    client: ApiClient,
    guard: Guard,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let navigation = config.navigation.clone();

    let ctx = match open_context(config).await {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "failed to start");
            return Err(err.into());
        }
    };

    match run(&ctx, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            if err.requires_login() {
                // Rejected credentials are cleared before returning to login.
                if let Err(clear_err) = ctx.session.clear().await {
                    tracing::warn!(error = %clear_err, "failed to clear session");
                }
            }
            print_decision(&err.recovery(&navigation));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn open_context(config: AppConfig) -> AppResult<Context> {
    let pool = db::connect(&config.session_database_url).await?;
    let session = Arc::new(SessionStore::open(Arc::new(SqliteSessionStorage::new(pool))).await?);
    let client = ApiClient::new(&config.api, session.clone())?;
    let guard = Guard::new(RouteTable::standard(), config.navigation.clone());

    Ok(Context {
        config,
        session,
        client,
        guard,
    })
}

async fn run(ctx: &Context, command: Commands) -> AppResult<()> {
    match command {
        Commands::Login { user_id, password } => {
            let user = ctx.client.login(&user_id, &password).await?;
            println!("signed in as {} ({})", user.user_id, user.role);
            print_decision(&ctx.guard.navigate(&ctx.config.navigation.login, &ctx.session.snapshot()));
        }
        Commands::Logout => {
            ctx.client.logout().await?;
            println!("signed out");
        }
        Commands::Whoami => match ctx.session.current_user() {
            Some(user) if user.username.is_empty() => println!("{} ({})", user.user_id, user.role),
            Some(user) => println!("{} {} ({})", user.user_id, user.username, user.role),
            None => println!("not signed in"),
        },
        Commands::Navigate { path } => {
            let decision = ctx.guard.navigate(&path, &ctx.session.snapshot());
            if decision.is_proceed() {
                println!("proceed {}", ctx.guard.table().resolve(&path).path);
            } else {
                print_decision(&decision);
            }
        }
        Commands::Menu => {
            let role = ctx
                .session
                .snapshot()
                .role()
                .ok_or_else(|| AppError::unauthenticated("sign in to see the menu"))?;
            for entry in ctx.guard.table().menu_for(role) {
                println!("{:<14} {}", entry.title, entry.path);
            }
        }
        Commands::Plans(command) => run_plans(ctx, command).await?,
    }

    Ok(())
}

async fn run_plans(ctx: &Context, command: PlanCommands) -> AppResult<()> {
    let workflow = PlanWorkflow::new(ctx.client.clone());

    match command {
        PlanCommands::List { status, schedule } => {
            let filters = PlanFilters {
                status,
                ppic_schedule_id: schedule,
            };
            for plan in ctx.client.list_plans(&filters).await? {
                println!(
                    "{:>5}  {:<16} {:<18} {}",
                    plan.id, plan.form_number, plan.status, plan.part_name
                );
            }
        }
        PlanCommands::Show { id } => print_snapshot(&workflow.fetch(id).await?),
        PlanCommands::Submit { id } => print_snapshot(&workflow.submit(id).await?),
        PlanCommands::Approve(args) => {
            let role = acting_role(ctx, args.role)?;
            print_snapshot(&workflow.approve(args.id, role, &args.comment).await?);
        }
        PlanCommands::Reject(args) => {
            let role = acting_role(ctx, args.role)?;
            print_snapshot(&workflow.reject(args.id, role, &args.comment).await?);
        }
        PlanCommands::Pending => {
            for snapshot in workflow.pending_for_me().await? {
                print_snapshot(&snapshot);
            }
        }
    }

    Ok(())
}

fn acting_role(ctx: &Context, requested: Option<Role>) -> AppResult<Role> {
    match requested {
        Some(role) => Ok(role),
        None => ctx
            .session
            .snapshot()
            .role()
            .ok_or_else(|| AppError::unauthenticated("no session user")),
    }
}

fn print_snapshot(snapshot: &PlanSnapshot) {
    let record = &snapshot.record;
    println!("plan {} {} [{}]", record.id, record.form_number, snapshot.status());
    println!("  part: {}", record.part_name);
    for approval in &record.approvals {
        let status = approval.status.as_str();
        if approval.comments.is_empty() {
            println!("  {:<12} {}", approval.approver_role, status);
        } else {
            println!("  {:<12} {} ({})", approval.approver_role, status, approval.comments);
        }
    }
}

fn print_decision(decision: &Decision) {
    match decision {
        Decision::Proceed => println!("proceed"),
        Decision::RedirectTo(path) => println!("redirect {}", path),
        Decision::Deny {
            message,
            redirect_to,
        } => {
            eprintln!("{}", message);
            println!("redirect {}", redirect_to);
        }
    }
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
