use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use backoffice::{
    AuthClient, CatalogApi, Category, FileStorage, Gateway, GatewayConfig, GatewayError, Origin, Product,
    ProductForm, ProtectedView, Route, SessionError, SessionStore, ViewState,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

const EXIT_FAILURE: u8 = 1;
const EXIT_REDIRECT: u8 = 2;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("login required")]
    Redirect(Route),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Navigation implied by this error, if any.
    fn redirect(&self) -> Option<Route> {
        match self {
            Self::Redirect(route) => Some(*route),
            Self::Gateway(err) => err.redirect(),
            Self::Session(_) | Self::Json(_) => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Redirect(_) => "E_UNAUTHENTICATED",
            Self::Gateway(err) => err.error_code(),
            Self::Session(_) => "E_SESSION_STORAGE",
            Self::Json(_) => "E_OUTPUT",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "backoffice", about = "Electronics store back office console")]
struct Cli {
    /// Auth service base address (overrides `API_AUTH`).
    #[arg(long)]
    auth_url: Option<String>,

    /// Category service base address (overrides `API_CATEGORY`).
    #[arg(long)]
    category_url: Option<String>,

    /// Product service base address (overrides `API_PRODUCT`).
    #[arg(long)]
    product_url: Option<String>,

    /// Session file (overrides `BACKOFFICE_SESSION_FILE`).
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log requests to stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Check whether protected views are accessible.
    Status,
    Categories(CategoriesCommand),
    Products(ProductsCommand),
}

#[derive(Args, Debug)]
struct CategoriesCommand {
    #[command(subcommand)]
    command: CategoriesSubcommand,
}

#[derive(Subcommand, Debug)]
enum CategoriesSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProductsSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        stock: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        category_id: String,
    },
}

struct Context {
    gateway: Gateway,
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &CliError) -> ExitCode {
    if let Some(route) = err.redirect() {
        eprintln!("{err}");
        println!("redirect: {route}");
        return ExitCode::from(EXIT_REDIRECT);
    }
    eprintln!("error [{}]: {err}", err.code());
    ExitCode::from(EXIT_FAILURE)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = GatewayConfig::from_env();
    for (origin, url) in [
        (Origin::Auth, cli.auth_url),
        (Origin::Category, cli.category_url),
        (Origin::Product, cli.product_url),
    ] {
        if let Some(url) = url {
            config.origins = config.origins.with(origin, url);
        }
    }
    if let Some(path) = cli.session_file {
        config.session_file = Some(path);
    }

    let storage = match &config.session_file {
        Some(path) => FileStorage::with_path(path),
        None => FileStorage::new()?,
    };
    tracing::debug!(path = %storage.path().display(), "using session file");
    let session = SessionStore::open(storage)?;
    let ctx = Context { gateway: Gateway::from_config(&config, session)?, json: cli.json };

    match cli.command {
        Command::Login { email, password } => run_login(&ctx, &email, &password).await,
        Command::Register { name, email, password } => run_register(&ctx, &name, &email, &password).await,
        Command::Logout => {
            let next = AuthClient::new(ctx.gateway.clone()).logout()?;
            println!("redirect: {next}");
            Ok(())
        }
        Command::Status => {
            enter(Route::Dashboard, ctx.gateway.session())?;
            println!("authorized");
            Ok(())
        }
        Command::Categories(categories) => run_categories(&ctx, categories).await,
        Command::Products(products) => run_products(&ctx, products).await,
    }
}

/// Mount a protected view. Nothing is rendered or fetched unless authorized.
fn enter(route: Route, session: &SessionStore) -> Result<(), CliError> {
    let mut view = ProtectedView::new(route);
    match view.check(session) {
        ViewState::Authorized => Ok(()),
        ViewState::Unchecked | ViewState::Redirecting => Err(CliError::Redirect(Route::Login)),
    }
}

async fn run_login(ctx: &Context, email: &str, password: &str) -> Result<(), CliError> {
    AuthClient::new(ctx.gateway.clone()).login(email, password).await?;
    println!("logged in");
    println!("redirect: {}", Route::Dashboard);
    Ok(())
}

async fn run_register(ctx: &Context, name: &str, email: &str, password: &str) -> Result<(), CliError> {
    AuthClient::new(ctx.gateway.clone()).register(name, email, password).await?;
    println!("registered, please log in");
    println!("redirect: {}", Route::Login);
    Ok(())
}

async fn run_categories(ctx: &Context, categories: CategoriesCommand) -> Result<(), CliError> {
    enter(Route::Categories, ctx.gateway.session())?;
    let api = CatalogApi::new(ctx.gateway.clone());

    match categories.command {
        CategoriesSubcommand::List => {
            let list = api.list_categories().await?;
            if ctx.json {
                return print_json(&serde_json::to_value(&list)?);
            }
            if list.is_empty() {
                println!("no categories yet");
            }
            for category in &list {
                println!("{}", render_category(category));
            }
            Ok(())
        }
        CategoriesSubcommand::Create { name } => {
            let created = api.create_category(&name).await?;
            if ctx.json {
                return print_json(&created);
            }
            println!("category created: {}", name.trim());
            Ok(())
        }
        CategoriesSubcommand::Delete { id } => {
            api.delete_category(&id).await?;
            println!("category deleted: {id}");
            Ok(())
        }
    }
}

async fn run_products(ctx: &Context, products: ProductsCommand) -> Result<(), CliError> {
    enter(Route::Products, ctx.gateway.session())?;
    let api = CatalogApi::new(ctx.gateway.clone());

    match products.command {
        ProductsSubcommand::List => {
            let (products, categories) = tokio::join!(api.list_products(), api.list_categories());
            let products = products?;

            // Category names are decoration; a failed lookup falls back to ids.
            let categories = match categories {
                Ok(categories) => categories,
                Err(err) if err.is_session_signal() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to fetch categories for product list");
                    Vec::new()
                }
            };

            if ctx.json {
                return print_json(&serde_json::to_value(&products)?);
            }
            if products.is_empty() {
                println!("no products yet");
            }
            let names = category_names(&categories);
            for product in &products {
                println!("{}", render_product(product, &names));
            }
            Ok(())
        }
        ProductsSubcommand::Create { name, price, stock, description, category_id } => {
            let form = ProductForm { name, price, stock, description, category_id };
            let created = api.create_product(&form).await?;
            if ctx.json {
                return print_json(&created);
            }
            println!("product created: {}", form.name.trim());
            Ok(())
        }
    }
}

fn category_names(categories: &[Category]) -> HashMap<&str, &str> {
    categories.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect()
}

fn render_category(category: &Category) -> String {
    format!("{}\t{}", category.id, category.name)
}

fn render_product(product: &Product, names: &HashMap<&str, &str>) -> String {
    let category = product
        .category_id()
        .map(|id| names.get(id).copied().unwrap_or(id))
        .unwrap_or("-");
    format!("{}\t{}\tRp {}\tstock {}\t{}", product.id, product.name, product.price, product.stock, category)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
