//! CLI entry point for the knowledge graph repository.

mod settings;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use knowledge_core::{
    NewNode, NewRelationship, NodeId, NodeType, NodeUpdate, RelationshipId, RelationshipType,
};
use knowledge_graph::{GraphClient, NodeRepository};

#[derive(Parser)]
#[command(name = "km")]
#[command(about = "Manage nodes, tags and relationships in the knowledge graph")]
struct Cli {
    /// Config file prefix (default: knowledge).
    #[arg(short, long, default_value = "knowledge")]
    config: String,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Node operations.
    #[command(subcommand)]
    Node(NodeCommand),

    /// Relationship operations.
    #[command(subcommand)]
    Rel(RelCommand),
}

#[derive(Subcommand)]
enum NodeCommand {
    /// Create a node and print its id.
    Create(NodeFields),
    /// Print a node as JSON.
    Get { id: String },
    /// Replace a node's fields and tag set.
    Update {
        id: String,
        #[command(flatten)]
        fields: NodeFields,
    },
    /// Delete a node and all attached edges.
    Delete { id: String },
}

#[derive(Args)]
struct NodeFields {
    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    content: String,

    /// Node type: Concept, Idea, Note, Question, Resource, Person, Project.
    #[arg(long = "type")]
    node_type: String,

    /// Tag name; repeat for several.
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum RelCommand {
    /// Create one edge from the source to each existing target.
    Create {
        #[arg(long)]
        source: String,

        /// Target node id; repeat for several.
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Relationship type, e.g. DEPENDS_ON.
        #[arg(long = "type")]
        rel_type: String,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete an edge by id.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let app_config = settings::load(&cli.config)?;
    tracing::debug!(prefix = %cli.config, uri = %app_config.neo4j.uri, "Loaded configuration");
    let client = GraphClient::connect(&app_config.neo4j).await?;
    let mut repo = NodeRepository::new(client);
    if let Some(limit) = app_config.repository.operation_timeout() {
        repo = repo.with_timeout(limit);
    }

    match cli.command {
        Command::Node(cmd) => run_node(&repo, cmd).await,
        Command::Rel(cmd) => run_rel(&repo, cmd).await,
    }
}

async fn run_node(repo: &NodeRepository<GraphClient>, cmd: NodeCommand) -> anyhow::Result<()> {
    match cmd {
        NodeCommand::Create(fields) => {
            let new = NewNode {
                title: fields.title,
                content: fields.content,
                node_type: fields.node_type.parse::<NodeType>()?,
                tags: fields.tags,
            };
            let id = repo.create_node(&new).await?;
            print_json(&serde_json::json!({ "id": id }))
        }
        NodeCommand::Get { id } => {
            let node = repo.get_node_by_id(&NodeId(id)).await?;
            print_json(&node)
        }
        NodeCommand::Update { id, fields } => {
            let update = NodeUpdate {
                id: NodeId(id),
                title: fields.title,
                content: fields.content,
                node_type: fields.node_type.parse::<NodeType>()?,
                tags: fields.tags,
            };
            repo.update_node(&update).await?;
            print_json(&serde_json::json!({ "updated": update.id }))
        }
        NodeCommand::Delete { id } => {
            let id = NodeId(id);
            repo.delete_node(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_rel(repo: &NodeRepository<GraphClient>, cmd: RelCommand) -> anyhow::Result<()> {
    match cmd {
        RelCommand::Create {
            source,
            targets,
            rel_type,
            description,
        } => {
            let rel = NewRelationship {
                source_id: NodeId(source),
                target_ids: targets.into_iter().map(NodeId).collect(),
                description,
                rel_type: rel_type.parse::<RelationshipType>()?,
            };
            let ids = repo.create_relationship(&rel).await?;
            print_json(&serde_json::json!({ "ids": ids }))
        }
        RelCommand::Delete { id } => {
            let id = RelationshipId(id);
            repo.delete_relationship(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
