//! Command-line interface for QDA corpora.
//! Runs the six view queries over a workspace and prints the normalized
//! shapes as JSON, the same shapes the editor explorers consume.
//!
//! Usage:
//!   qda references --root <dir>            - References with item counts
//!   qda codes --root <dir>                 - Codes with their usages
//!   qda relations --root <dir>             - Relation triplets by label
//!   qda graph --root <dir> [--bibref <@k>] - Mermaid relation diagram
//!   qda topics --root <dir>                - Ontology topic tree
//!   qda annotations --root <dir> [--file <path>] - Codes through the ontology

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use qda_analysis::graph::Direction;
use qda_config::{GraphDirection, Loader, QdaConfig};
use qda_views::{DataProvider, LocalProvider};

fn cli() -> Command {
    let root = Arg::new("root")
        .long("root")
        .help("Workspace root directory")
        .default_value(".");
    let config = Arg::new("config")
        .long("config")
        .short('c')
        .help("Configuration file layered over the built-in defaults");

    Command::new("qda")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Query QDA annotation corpora")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(root.global(true))
        .arg(config.global(true))
        .subcommand(Command::new("references").about("References with item counts"))
        .subcommand(Command::new("codes").about("Codes with their usages"))
        .subcommand(Command::new("relations").about("Relation triplets grouped by label"))
        .subcommand(
            Command::new("graph")
                .about("Mermaid relation diagram")
                .arg(
                    Arg::new("bibref")
                        .long("bibref")
                        .help("Limit the diagram to one reference"),
                )
                .arg(
                    Arg::new("left-right")
                        .long("left-right")
                        .help("Lay the diagram out left to right")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("topics").about("Ontology topic tree"))
        .subcommand(
            Command::new("annotations")
                .about("Codes viewed through the ontology")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .help("Limit occurrences to one annotation file"),
                ),
        )
}

fn load_config(path: Option<&String>) -> QdaConfig {
    let loader = match path {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new(),
    };
    loader.build().unwrap_or_else(|err| {
        eprintln!("Configuration error: {}", err);
        std::process::exit(1);
    })
}

fn provider_for(root: &str, config: &QdaConfig, left_right: bool) -> LocalProvider {
    let direction = if left_right || config.graph.direction == GraphDirection::Lr {
        Direction::LeftRight
    } else {
        Direction::TopDown
    };
    LocalProvider::new(PathBuf::from(root))
        .with_extensions(
            config.scan.annotation_extensions.clone(),
            config.scan.ontology_extensions.clone(),
        )
        .with_direction(direction)
}

fn print_json<T: serde::Serialize>(value: &T) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        eprintln!("Error rendering output: {}", err);
        std::process::exit(1);
    });
    println!("{}", rendered);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let Some((name, sub)) = matches.subcommand() else {
        return;
    };
    let root = sub
        .get_one::<String>("root")
        .map(String::as_str)
        .unwrap_or(".");
    let config = load_config(sub.get_one::<String>("config"));
    let left_right = name == "graph" && sub.get_flag("left-right");
    let mut provider = provider_for(root, &config, left_right);

    match name {
        "references" => print_json(&provider.references().await),
        "codes" => print_json(&provider.codes().await),
        "relations" => print_json(&provider.relations().await),
        "graph" => {
            let bibref = sub.get_one::<String>("bibref").map(String::as_str);
            match provider.relation_graph(bibref).await {
                Some(graph) => println!("{}", graph.diagram_source),
                None => eprintln!("No relations to draw."),
            }
        }
        "topics" => print_json(&provider.ontology_topics().await),
        "annotations" => {
            let active = sub.get_one::<String>("file").map(PathBuf::from);
            print_json(&provider.ontology_annotations(active.as_deref()).await);
        }
        _ => unreachable!("subcommand_required guarantees a known subcommand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_definitions_are_consistent() {
        cli().debug_assert();
    }
}
