mod commands;

use std::path::PathBuf;

use awsutils_auth::{Session, SessionConfig};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awsutils", about = "Convenience commands for S3, SSM and ECS")]
struct Cli {
    /// Overrides the region from the environment or profile.
    #[arg(long, global = true)]
    region: Option<String>,

    /// Overrides AWS_ENDPOINT_URL for every service.
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Maximum attempts per remote call, retries included.
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Emit log lines as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List objects under s3://bucket/prefix.
    Ls {
        url: String,
        #[command(flatten)]
        window: TimeWindow,
        /// Print each object as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Count objects and bytes under s3://bucket/prefix.
    Du { url: String },
    /// Show the metadata of one object, or of the object named by an event file.
    Stat {
        #[arg(required_unless_present = "event")]
        url: Option<String>,
        #[arg(long, conflicts_with = "url")]
        event: Option<PathBuf>,
    },
    /// Copy an object, choosing same-region or cross-region transfer automatically.
    Cp {
        source: String,
        target: String,
        #[command(flatten)]
        copy: CopyFlags,
        /// Use a single copy call instead of a multipart upload.
        #[arg(long, default_value_t = false)]
        direct: bool,
    },
    /// Rename an object within its bucket.
    Mv {
        url: String,
        new_key: String,
        #[command(flatten)]
        copy: CopyFlags,
    },
    /// Rename an object whose key has unsafe characters.
    Sanitize {
        url: String,
        /// Only print the sanitized key.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[command(flatten)]
        copy: CopyFlags,
    },
    /// Stream an object into a local file.
    Get { url: String, path: PathBuf },
    /// Stream a local file into an object.
    Put {
        path: PathBuf,
        url: String,
        /// Canned ACL for the new object.
        #[arg(long)]
        acl: Option<String>,
    },
    /// Delete every object under s3://bucket/prefix.
    RmPrefix { url: String },
    /// Parameter store commands.
    Param {
        #[command(subcommand)]
        command: ParamCommand,
    },
    /// Container task commands.
    Ecs {
        #[command(subcommand)]
        command: EcsCommand,
    },
}

#[derive(Args)]
struct TimeWindow {
    /// Only objects modified strictly after this RFC 3339 time.
    #[arg(long)]
    after: Option<DateTime<Utc>>,
    /// Only objects modified strictly before this RFC 3339 time.
    #[arg(long)]
    before: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct CopyFlags {
    /// Canned ACL for the new object.
    #[arg(long)]
    acl: Option<String>,
    /// Abort the multipart upload if the copy fails.
    #[arg(long, default_value_t = false)]
    abort_on_failure: bool,
}

#[derive(Subcommand)]
enum ParamCommand {
    /// Print decrypted values as key=value lines.
    Get {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Subcommand)]
enum EcsCommand {
    /// Run one Fargate task with a public IP.
    Run {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        task_definition: String,
        #[arg(long = "subnet", required = true)]
        subnets: Vec<String>,
        #[arg(long, default_value = "")]
        security_group: String,
        #[arg(long, default_value = "")]
        vpc: String,
        /// NAME=VALUE, repeatable.
        #[arg(long = "env", value_parser = parse_env_pair)]
        environment: Vec<(String, String)>,
        #[arg(long, default_value = "")]
        command: String,
    },
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {value:?}"))
}

/// Credentials always come from the default provider chain.
fn session_config(cli: &Cli) -> SessionConfig {
    let mut config = SessionConfig {
        region: cli.region.clone(),
        ..SessionConfig::default()
    };
    if let Some(endpoint) = cli.endpoint_url.as_deref() {
        config = config.with_endpoint(endpoint);
    }
    if let Some(max_attempts) = cli.max_attempts {
        config = config.with_max_attempts(max_attempts);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::from_default_env().add_directive("awsutils=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let session = Session::load(session_config(&cli)).await;
    commands::run(session, cli.command).await
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, EcsCommand, parse_env_pair, session_config};

    #[test]
    fn env_pairs_need_a_name() {
        assert_eq!(
            parse_env_pair("STAGE=prod=1").unwrap(),
            ("STAGE".to_string(), "prod=1".to_string())
        );
        assert!(parse_env_pair("=x").is_err());
        assert!(parse_env_pair("novalue").is_err());
    }

    #[test]
    fn parses_ls_window_and_global_flags() {
        let cli = Cli::try_parse_from([
            "awsutils",
            "ls",
            "s3://logs/app/",
            "--after",
            "2024-01-01T00:00:00Z",
            "--region",
            "eu-west-1",
        ])
        .unwrap();
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        match cli.command {
            Command::Ls { url, window, json } => {
                assert_eq!(url, "s3://logs/app/");
                assert!(window.after.is_some());
                assert!(window.before.is_none());
                assert!(!json);
            }
            _ => panic!("expected ls"),
        }
    }

    #[test]
    fn parses_ecs_run() {
        let cli = Cli::try_parse_from([
            "awsutils",
            "ecs",
            "run",
            "--cluster",
            "media",
            "--task-definition",
            "transcoder",
            "--subnet",
            "subnet-a",
            "--subnet",
            "subnet-b",
            "--env",
            "STAGE=prod",
        ])
        .unwrap();
        match cli.command {
            Command::Ecs {
                command: EcsCommand::Run {
                    subnets,
                    environment,
                    ..
                },
            } => {
                assert_eq!(subnets, ["subnet-a", "subnet-b"]);
                assert_eq!(environment, [("STAGE".to_string(), "prod".to_string())]);
            }
            _ => panic!("expected ecs run"),
        }
    }

    #[test]
    fn global_flags_become_session_overrides() {
        let cli = Cli::try_parse_from([
            "awsutils",
            "--endpoint-url",
            "localhost:9000",
            "--max-attempts",
            "2",
            "put",
            "clip.mp4",
            "s3://media/in/clip.mp4",
            "--acl",
            "private",
        ])
        .unwrap();
        let config = session_config(&cli);
        assert!(config.region.is_none());
        assert_eq!(config.endpoint.as_deref(), Some("https://localhost:9000"));
        assert_eq!(config.max_attempts, Some(2));
        assert!(config.credentials.is_none());
        assert!(matches!(cli.command, Command::Put { acl: Some(_), .. }));
    }

    #[test]
    fn stat_needs_url_or_event() {
        assert!(Cli::try_parse_from(["awsutils", "stat"]).is_err());
        assert!(Cli::try_parse_from(["awsutils", "stat", "--event", "event.json"]).is_ok());
    }
}
