use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "natctl")]
#[command(about = "Management CLI for the NAT web console", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[arg(long, env = "NATCTL_USER", default_value = "admin")]
    user: String,

    #[arg(long, env = "NATCTL_PASSWORD")]
    password: String,

    /// Accept self-signed certificates.
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List rules held by the console
    List,
    /// Show rules as they would be written to the rule file
    Preview,
    /// Edit the rule at INDEX (in memory until `save`)
    Edit {
        index: i64,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        start: Option<u16>,
        #[arg(long)]
        end: Option<u16>,
        #[arg(long)]
        destination: Option<String>,
        /// Use an empty string to clear
        #[arg(long)]
        protocol: Option<String>,
        /// ipv4, ipv6 or all; an empty string clears it
        #[arg(long)]
        ip_version: Option<String>,
    },
    /// Delete the rule at INDEX (in memory until `save`)
    Delete { index: i64 },
    /// Write the console's current rules to the rule file
    Save,
    /// Discard unsaved changes and re-read the rule file
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;

    let login = client
        .post(format!("{}/login", cli.url))
        .form(&[("username", cli.user.as_str()), ("password", cli.password.as_str())])
        .send()
        .await?;
    if !login_succeeded(login.status()) {
        if login.status() == reqwest::StatusCode::UNAUTHORIZED {
            eprintln!("Error: login rejected for user {}", cli.user);
        } else {
            eprintln!("Error: login returned status {}", login.status());
        }
        std::process::exit(1);
    }

    match cli.command {
        Commands::List => {
            let res = client.get(format!("{}/api/rules", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Preview => {
            let res = client.get(format!("{}/api/rules/preview", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Edit {
            index,
            kind,
            start,
            end,
            destination,
            protocol,
            ip_version,
        } => {
            let mut body = Map::new();
            body.insert("index".into(), json!(index));
            if let Some(kind) = kind {
                body.insert("type".into(), json!(kind.to_uppercase()));
            }
            if let Some(start) = start {
                body.insert("startPort".into(), json!(start));
            }
            if let Some(end) = end {
                body.insert("endPort".into(), json!(end));
            }
            if let Some(destination) = destination {
                body.insert("destination".into(), json!(destination));
            }
            if let Some(protocol) = protocol {
                body.insert("protocol".into(), json!(protocol));
            }
            if let Some(ip_version) = ip_version {
                body.insert("ipVersion".into(), json!(ip_version));
            }
            let res = client
                .post(format!("{}/edit-rule", cli.url))
                .json(&Value::Object(body))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { index } => {
            let res = client
                .post(format!("{}/delete-rule", cli.url))
                .json(&json!({ "index": index }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Save => {
            let rules: Value = client
                .get(format!("{}/api/rules", cli.url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let res = client
                .post(format!("{}/save-rules", cli.url))
                .json(&json!({ "rules": rules }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Reload => {
            let res = client.post(format!("{}/reload-rules", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// The console answers a good login with a redirect to the editor.
fn login_succeeded(status: reqwest::StatusCode) -> bool {
    status.is_redirection()
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: console returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_only_redirect_counts_as_login() {
        assert!(login_succeeded(StatusCode::SEE_OTHER));
        assert!(!login_succeeded(StatusCode::UNAUTHORIZED));
        assert!(!login_succeeded(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!login_succeeded(StatusCode::OK));
    }
}
