use clap::{Parser, ValueEnum};
use keiro::backend::{Acknowledgement, ExecutionBackend};
use keiro::error::{BackendError, ConversionError};
use keiro::pipeline::{Diagnostic, KindDefinition, Rejection, SocketRef};
use keiro::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;

// --- JSON Deserialization Structs (Canvas Format Specific) ---
// These structs match the editor's saved canvas and are only used here for conversion.

#[derive(Deserialize)]
struct RawCanvas {
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    data: NodeData,
}

#[derive(Deserialize)]
struct RawEdge {
    source: String,
    #[serde(alias = "sourceHandle", default)]
    source_handle: Option<String>,
    target: String,
    #[serde(alias = "targetHandle", default)]
    target_handle: Option<String>,
}

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeCli {
    Global,
    Paths,
}

// --- Converter Implementation ---
// Canvas handles look like "output-0" / "input-2"; a missing handle means socket 0.

fn parse_handle_index(handle: Option<&str>) -> std::result::Result<usize, ConversionError> {
    let Some(handle) = handle else {
        return Ok(0);
    };
    handle
        .rsplit('-')
        .next()
        .and_then(|index| index.parse().ok())
        .ok_or_else(|| ConversionError::ValidationError(format!("Invalid socket handle '{}'", handle)))
}

impl IntoPipeline for RawCanvas {
    fn into_pipeline(self) -> std::result::Result<PipelineDefinition, ConversionError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|raw| NodeDefinition {
                id: NodeId(raw.id),
                kind: raw.kind,
                data: raw.data,
            })
            .collect();

        let edges = self
            .edges
            .into_iter()
            .map(|raw| {
                Ok(EdgeDefinition {
                    source_socket: parse_handle_index(raw.source_handle.as_deref())?,
                    target_socket: parse_handle_index(raw.target_handle.as_deref())?,
                    source: NodeId(raw.source),
                    target: NodeId(raw.target),
                })
            })
            .collect::<std::result::Result<Vec<_>, ConversionError>>()?;

        Ok(PipelineDefinition { nodes, edges })
    }
}

// --- Backend ---

/// Prints the plan as JSON instead of running it.
struct JsonBackend {
    pretty: bool,
}

impl ExecutionBackend for JsonBackend {
    fn submit(&self, plan: &ExecutionPlan) -> std::result::Result<Acknowledgement, BackendError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(plan)
        } else {
            serde_json::to_string(plan)
        }
        .map_err(|e| BackendError::Generic(e.to_string()))?;
        println!("{}", json);
        Ok(Acknowledgement::for_plan("json", plan))
    }
}

// --- Report ---

#[derive(Serialize)]
struct NodeReport {
    id: NodeId,
    kind: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

#[derive(Serialize)]
struct DiagnosticReport {
    node: NodeId,
    socket: SocketRef,
    message: String,
}

impl From<&Diagnostic> for DiagnosticReport {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            node: diagnostic.node.clone(),
            socket: diagnostic.socket,
            message: diagnostic.error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    nodes: Vec<NodeReport>,
    rejected: Vec<Rejection>,
    diagnostics: Vec<DiagnosticReport>,
}

/// Type-checks a pipeline canvas and prints its socket types and execution plan
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the node kinds JSON file
    kinds_path: String,
    /// Path to the pipeline canvas JSON file
    pipeline_path: String,

    /// Optional definition source (struct, enum, def, let) layered over the prelude
    #[arg(short, long)]
    definitions: Option<String>,

    /// Optional graph configuration JSON file
    #[arg(short, long)]
    config: Option<String>,

    /// Map a canvas node type onto a registered kind, as `canvasType=kind`
    #[arg(short, long = "alias")]
    aliases: Vec<String>,

    /// The shape of the execution plan
    #[arg(short, long, value_enum, default_value = "global")]
    mode: ModeCli,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // --- 1. Scope ---
    let prelude = prelude().unwrap_or_else(|e| exit_with_error(&format!("Prelude failed: {}", e)));
    let mut builder = ScopeBuilder::new("user").with_parent(prelude);
    if let Some(path) = &cli.definitions {
        let source = read_file(path, "definitions");
        builder
            .add_source(&source)
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid definitions: {}", e)));
    }
    let scope = builder
        .create_scope()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid definitions: {}", e)));

    // --- 2. Graph ---
    let config = match &cli.config {
        Some(path) => GraphConfig::from_json(&read_file(path, "config"))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse config JSON: {}", e))),
        None => GraphConfig::default(),
    };
    let kinds: Vec<KindDefinition> = serde_json::from_str(&read_file(&cli.kinds_path, "kinds"))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse kinds JSON: {}", e)));

    let mut graph_builder = GraphBuilder::new(scope).with_config(config);
    for definition in kinds {
        let kind = NodeKind::try_from(definition)
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid node kind: {}", e)));
        graph_builder = graph_builder.with_kind(kind);
    }
    for alias in &cli.aliases {
        let Some((canvas_type, kind)) = alias.split_once('=') else {
            exit_with_error(&format!("Alias '{}' must look like canvasType=kind", alias));
        };
        graph_builder = graph_builder.with_kind_alias(canvas_type, kind);
    }
    let mut graph = graph_builder
        .build()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid node kinds: {}", e)));

    // --- 3. Load ---
    let canvas: RawCanvas = serde_json::from_str(&read_file(&cli.pipeline_path, "pipeline"))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse pipeline JSON: {}", e)));
    let load = graph
        .load_from(canvas)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load pipeline: {}", e)));
    info!("{} edge(s) committed", load.committed.len());

    // --- 4. Report ---
    let nodes = graph
        .nodes()
        .iter()
        .map(|node| {
            let types = |count: usize, socket: &dyn Fn(usize) -> std::result::Result<Type, GraphError>| {
                (0..count)
                    .map(|i| socket(i).map_or_else(|e| e.to_string(), |t| t.to_string()))
                    .collect()
            };
            NodeReport {
                id: node.id.clone(),
                kind: node.kind.clone(),
                inputs: types(node.inputs.len(), &|i| graph.input_type(&node.id, i)),
                outputs: types(node.outputs.len(), &|i| graph.output_type(&node.id, i)),
            }
        })
        .collect();
    let report = Report {
        nodes,
        rejected: load.rejected.iter().map(Rejection::from).collect(),
        diagnostics: graph.diagnostics().iter().map(DiagnosticReport::from).collect(),
    };
    print_json(&report, cli.pretty);

    // --- 5. Plan ---
    let mode = match cli.mode {
        ModeCli::Global => ScheduleMode::Global,
        ModeCli::Paths => ScheduleMode::Paths,
    };
    let backend = JsonBackend { pretty: cli.pretty };
    let acknowledgement = backend
        .submit(&graph.plan(mode))
        .unwrap_or_else(|e| exit_with_error(&format!("Plan submission failed: {}", e)));
    info!(
        "Plan accepted by '{}' with {} scheduled node(s)",
        acknowledgement.backend, acknowledgement.scheduled
    );
}

fn read_file(path: &str, what: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read {} file '{}': {}", what, path, e)))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(&format!("Failed to serialize report: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
