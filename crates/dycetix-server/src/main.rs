use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dycetix_core::{AdminRole, AdminUserId, NewAdminUser, PrivilegeFlags};
use dycetix_server::{logging, AppState, ServerConfig};
use std::path::PathBuf;

fn cli() -> Command {
    let email = Arg::new("email")
        .long("email")
        .required(true)
        .help("Login email of the account");
    let first_name = Arg::new("first-name")
        .long("first-name")
        .default_value("")
        .help("Given name");
    let last_name = Arg::new("last-name")
        .long("last-name")
        .default_value("")
        .help("Family name");

    Command::new("dycetix")
        .version(dycetix_server::VERSION)
        .about("Client intake and admin triage back-office")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("SQLite database file (overrides config)"),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP server")
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .help("Listen address, host:port"),
                )
                .arg(
                    Arg::new("media-root")
                        .long("media-root")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for uploaded files"),
                )
                .arg(
                    Arg::new("json-logs")
                        .long("json-logs")
                        .action(ArgAction::SetTrue)
                        .help("Log as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("create-admin")
                .about("Create a staff admin account")
                .arg(email.clone())
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("operations")
                        .value_parser(["operations", "content", "finance"])
                        .help("Admin role"),
                )
                .arg(first_name.clone())
                .arg(last_name.clone())
                .arg(
                    Arg::new("created-by")
                        .long("created-by")
                        .value_parser(value_parser!(i64))
                        .help("Id of the admin creating this account"),
                ),
        )
        .subcommand(
            Command::new("create-superuser")
                .about("Create a superuser account")
                .arg(email.clone())
                .arg(first_name)
                .arg(last_name),
        )
        .subcommand(
            Command::new("issue-session")
                .about("Issue a bearer session key for an admin")
                .arg(email)
                .arg(
                    Arg::new("ip")
                        .long("ip")
                        .help("Address recorded as the login origin"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ServerConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = ServerConfig::load(path.map(PathBuf::as_path)).context("loading configuration")?;
    if let Some(database) = matches.get_one::<PathBuf>("database") {
        config = config.with_sqlite(database.clone());
    }
    Ok(config)
}

fn text(args: &ArgMatches, name: &str) -> String {
    args.get_one::<String>(name).cloned().unwrap_or_default()
}

fn persistent_state(config: ServerConfig) -> anyhow::Result<AppState> {
    if !config.database.backend.is_persistent() {
        bail!("admin commands need a persistent database; pass --database or set DYCETIX_DATABASE_PATH");
    }
    AppState::from_config(config).context("opening database")
}

async fn serve(mut config: ServerConfig, args: &ArgMatches) -> anyhow::Result<()> {
    if let Some(bind) = args.get_one::<String>("bind") {
        config = config.with_bind(bind.clone());
    }
    if let Some(root) = args.get_one::<PathBuf>("media-root") {
        config = config.with_media_root(root.clone());
    }
    if args.get_flag("json-logs") {
        config.logging.json = true;
    }
    config.validate()?;
    logging::init(&config.logging)?;

    let addr = config.socket_addr()?;
    tracing::info!(
        database = ?config.database.backend,
        media = ?config.media.root,
        "Initializing state"
    );
    let state = AppState::from_config(config).context("opening stores")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    dycetix_server::serve(listener, state).await?;
    Ok(())
}

async fn create_admin(config: ServerConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let role: AdminRole = text(args, "role").parse()?;
    let mut draft = NewAdminUser::staff(&text(args, "email"), role)?
        .with_name(&text(args, "first-name"), &text(args, "last-name"));
    if let Some(creator) = args.get_one::<i64>("created-by") {
        draft = draft.created_by(AdminUserId(*creator));
    }
    let admin = persistent_state(config)?.directory.register(draft).await?;
    println!("Created admin {} ({}) with id {}", admin.email, admin.role.code(), admin.id);
    Ok(())
}

async fn create_superuser(config: ServerConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let draft = NewAdminUser::superuser(&text(args, "email"), PrivilegeFlags::default())?
        .with_name(&text(args, "first-name"), &text(args, "last-name"));
    let admin = persistent_state(config)?.directory.register(draft).await?;
    println!("Created superuser {} with id {}", admin.email, admin.id);
    Ok(())
}

async fn issue_session(config: ServerConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let state = persistent_state(config)?;
    let email = text(args, "email");
    let Some(admin) = state.directory.find_by_email(&email).await? else {
        bail!("no admin registered as {email}");
    };
    let session = state
        .directory
        .open_session(admin.id, args.get_one::<String>("ip").cloned())
        .await?;
    println!("{}", session.session_key);
    eprintln!("expires at {}", session.expires_at.to_rfc3339());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let Some((command, args)) = matches.subcommand() else {
        bail!("no command given; see --help");
    };
    let config = load_config(args)?;

    match command {
        "serve" => serve(config, args).await,
        "create-admin" => create_admin(config, args).await,
        "create-superuser" => create_superuser(config, args).await,
        "issue-session" => issue_session(config, args).await,
        other => bail!("unknown command {other}"),
    }
}
