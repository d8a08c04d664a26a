use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "secure-api-cli")]
#[command(about = "Command-line client for a running secure-api instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000", env = "SECURE_API_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the security self-check report
    Status,
    /// Show detailed service health
    Health,
    /// Submit a value for classification and sanitization
    Validate {
        data: String,
        #[arg(short, long, value_enum, default_value_t = Kind::Text)]
        kind: Kind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Text,
    Email,
    Url,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Text => "text",
            Kind::Email => "email",
            Kind::Url => "url",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/api/security", base)).send().await?,
        Commands::Health => client.get(format!("{}/health/detailed", base)).send().await?,
        Commands::Validate { data, kind } => {
            client
                .post(format!("{}/api/validate", base))
                .json(&json!({ "data": data, "type": kind.as_str() }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(format!("request failed with status {}", status).into())
    }
}
