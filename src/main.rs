use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod ingest;
mod models;
mod pipeline;
mod services;

use config::Config;
use pipeline::Pipeline;

const USAGE: &str = "Usage: article-pipeline [--db <path>] <command>

Commands:
  --urls <csv> [url_column]                  scrape and store unseen urls
  --labels <csv> [url_column] [label_column] store labels for unlabeled urls
  --export <json>                            write joined training data
  --stats                                    print store counts";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Urls {
        csv: PathBuf,
        url_column: Option<String>,
    },
    Labels {
        csv: PathBuf,
        url_column: Option<String>,
        label_column: Option<String>,
    },
    Export {
        path: PathBuf,
    },
    Stats,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    db_path: Option<String>,
    command: Command,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut rest = args;
    let mut db_path = None;
    if rest.first().map(String::as_str) == Some("--db") {
        db_path = Some(rest.get(1)?.clone());
        rest = &rest[2..];
    }

    let arg = |i: usize| rest.get(i).cloned();

    let command = match rest.first()?.as_str() {
        "--urls" => Command::Urls {
            csv: PathBuf::from(arg(1)?),
            url_column: arg(2),
        },
        "--labels" => Command::Labels {
            csv: PathBuf::from(arg(1)?),
            url_column: arg(2),
            label_column: arg(3),
        },
        "--export" => Command::Export {
            path: PathBuf::from(arg(1)?),
        },
        "--stats" => Command::Stats,
        _ => return None,
    };

    Some(Args { db_path, command })
}

/// `RUST_LOG` directives when present and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (info unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&raw) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    // Load configuration, --db wins over the configured store
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    // Open the store and build the fetcher
    let pipeline = Pipeline::from_config(&config).await?;

    match args.command {
        Command::Urls { csv, url_column } => {
            let url_column = url_column.unwrap_or_else(|| config.url_column.clone());
            pipeline
                .process_urls(&csv, &url_column)
                .await
                .with_context(|| format!("Failed to process urls from {:?}", csv))?;
            println!(
                "{} articles stored in {}",
                pipeline.article_count().await?,
                config.db_path
            );
        }
        Command::Labels {
            csv,
            url_column,
            label_column,
        } => {
            let url_column = url_column.unwrap_or_else(|| config.url_column.clone());
            let label_column = label_column.unwrap_or_else(|| config.label_column.clone());
            pipeline
                .process_labeled_data(&csv, &url_column, &label_column)
                .await
                .with_context(|| format!("Failed to process labels from {:?}", csv))?;
            println!(
                "{} labels stored in {}",
                pipeline.label_count().await?,
                config.db_path
            );
        }
        Command::Export { path } => {
            let data = pipeline.training_data().await?;
            if data.is_empty() {
                tracing::warn!("No article has a label yet, exporting an empty dataset");
            }
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &data)?;
            println!("Exported {} training pairs to {:?}", data.len(), path);
        }
        Command::Stats => {
            let data = pipeline.training_data().await?;
            println!("articles:       {}", pipeline.article_count().await?);
            println!("labels:         {}", pipeline.label_count().await?);
            println!("training pairs: {}", data.len());

            // Breakdown of training pairs per category
            let mut by_label: BTreeMap<&str, usize> = BTreeMap::new();
            for (_, label) in data.pairs() {
                *by_label.entry(label).or_default() += 1;
            }
            for (label, count) in by_label {
                println!("  {:<14}{}", label, count);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_each_command() {
        assert_eq!(
            parse_args(&args(&["--urls", "in.csv"])),
            Some(Args {
                db_path: None,
                command: Command::Urls {
                    csv: PathBuf::from("in.csv"),
                    url_column: None,
                },
            })
        );
        assert_eq!(
            parse_args(&args(&["--db", "x.db", "--labels", "l.csv", "Link", "Category"])),
            Some(Args {
                db_path: Some("x.db".to_string()),
                command: Command::Labels {
                    csv: PathBuf::from("l.csv"),
                    url_column: Some("Link".to_string()),
                    label_column: Some("Category".to_string()),
                },
            })
        );
        assert_eq!(
            parse_args(&args(&["--stats"])).map(|a| a.command),
            Some(Command::Stats)
        );
    }

    #[test]
    fn log_level_follows_rust_log() {
        use tracing::level_filters::LevelFilter;

        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("debug".to_string())).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("warn".to_string())).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn rejects_incomplete_arguments() {
        assert_eq!(parse_args(&args(&[])), None);
        assert_eq!(parse_args(&args(&["--urls"])), None);
        assert_eq!(parse_args(&args(&["--db"])), None);
        assert_eq!(parse_args(&args(&["--db", "x.db"])), None);
        assert_eq!(parse_args(&args(&["--refresh"])), None);
    }
}
