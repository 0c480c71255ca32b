use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Command-line client for the movie catalog API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4000")]
    url: String,

    /// Authentication token from `login`
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Health,
    /// Register a new account
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Activate an account with its activation token
    Activate { activation_token: String },
    /// Exchange credentials for an authentication token
    Login { email: String, password: String },
    /// List all movies
    Movies,
    /// Show a single movie
    Movie { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    }

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/v1/healthcheck", cli.url)),
        Commands::Register {
            name,
            email,
            password,
        } => client
            .post(format!("{}/v1/users", cli.url))
            .json(&json!({ "name": name, "email": email, "password": password })),
        Commands::Activate { activation_token } => client
            .put(format!("{}/v1/users/activated", cli.url))
            .json(&json!({ "token": activation_token })),
        Commands::Login { email, password } => client
            .post(format!("{}/v1/tokens/authentication", cli.url))
            .json(&json!({ "email": email, "password": password })),
        Commands::Movies => client.get(format!("{}/v1/movies", cli.url)),
        Commands::Movie { id } => client.get(format!("{}/v1/movies/{}", cli.url, id)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: API returned status {}", status);
        eprintln!("{}", body);
        std::process::exit(1);
    }
    Ok(())
}
