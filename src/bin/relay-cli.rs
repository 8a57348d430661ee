use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the API relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Bearer token issued by the auth service
    #[arg(short, long, env = "RELAY_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay a request through the server
    Send {
        method: String,
        target: String,
        /// Header as `Name: value`, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body; parsed as JSON when possible
        #[arg(short, long)]
        data: Option<String>,
    },
    /// List recent history
    History,
    /// Delete all history
    ClearHistory,
    /// List collections
    Collections,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    let res = match cli.command {
        Commands::Send {
            method,
            target,
            headers: raw_headers,
            data,
        } => {
            let descriptor = build_descriptor(&method, &target, &raw_headers, data)?;
            client
                .post(format!("{}/api/proxy", cli.url))
                .headers(headers)
                .json(&descriptor)
                .send()
                .await?
        }
        Commands::History => {
            client
                .get(format!("{}/api/history", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::ClearHistory => {
            client
                .delete(format!("{}/api/history", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Collections => {
            client
                .get(format!("{}/api/collections", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

fn build_descriptor(
    method: &str,
    target: &str,
    raw_headers: &[String],
    data: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut headers = Map::new();
    for raw in raw_headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid header '{}', expected 'Name: value'", raw))?;
        headers.insert(name.trim().to_string(), Value::String(value.trim().to_string()));
    }

    let mut descriptor = Map::new();
    descriptor.insert("url".into(), Value::String(target.to_string()));
    descriptor.insert("method".into(), Value::String(method.to_string()));
    if !headers.is_empty() {
        descriptor.insert("headers".into(), Value::Object(headers));
    }
    if let Some(data) = data {
        let body = serde_json::from_str(&data).unwrap_or(Value::String(data));
        descriptor.insert("body".into(), body);
    }
    Ok(Value::Object(descriptor))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Status: {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
