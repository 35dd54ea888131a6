use clap::{Parser, Subcommand};
use graphinator::error::Result;

mod cli;

#[derive(Parser)]
#[command(name = "graphinator")]
#[command(version = "0.1.0")]
#[command(about = "Turn property graphs into GraphQL APIs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a Neo4j configuration or set up the example movie graph
    Init {
        /// Generate the example movie graph (no database needed!)
        #[arg(long)]
        example: bool,

        /// Neo4j HTTP endpoint (required unless --example is used)
        #[arg(long, required_unless_present = "example")]
        url: Option<String>,

        /// Neo4j database name
        #[arg(long)]
        database: Option<String>,

        /// Neo4j user; the password is read from NEO4J_PASSWORD
        #[arg(long)]
        user: Option<String>,

        /// Output config file path (if not specified, outputs to stdout)
        #[arg(long)]
        output: Option<String>,
    },

    /// Print the inferred types, or the generated GraphQL SDL
    Scan {
        /// Config file path
        #[arg(long, default_value = "graphinator.toml")]
        config: String,

        /// Print the GraphQL SDL instead of the inferred types
        #[arg(long)]
        sdl: bool,
    },

    /// Run one GraphQL query and print the response
    Query {
        /// Config file path
        #[arg(long, default_value = "graphinator.toml")]
        config: String,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// GraphQL query text
        query: String,
    },

    /// Start GraphQL server
    Serve {
        /// Config file path
        #[arg(long, default_value = "graphinator.toml")]
        config: String,

        /// Server port (defaults to the config file's)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { example, url, database, user, output } => {
            cli::init::run(example, url, database, user, output).await?;
        }
        Commands::Scan { config, sdl } => {
            cli::scan::run(config, sdl).await?;
        }
        Commands::Query { config, variables, query } => {
            cli::query::run(config, query, variables).await?;
        }
        Commands::Serve { config, port } => {
            cli::serve::run(config, port).await?;
        }
    }

    Ok(())
}
