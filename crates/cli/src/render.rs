//! Text rendering of events, snapshots and graphs.

use colored::{ColoredString, Colorize};
use cr_core::graph::{build_dependency_map, topological_order};
use cr_protocol::ipc::Event;
use cr_protocol::pipeline_models::PipelineDefinition;
use cr_protocol::process_models::{NodeOutput, NodeSnapshot, NodeStatus};
use tokio::sync::mpsc::Receiver;

/// Outputs longer than this are cut when printed inline.
const OUTPUT_PREVIEW_CHARS: usize = 160;

pub fn paint_status(status: NodeStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        NodeStatus::Idle => text.dimmed(),
        NodeStatus::Running => text.cyan(),
        NodeStatus::Completed => text.green(),
        NodeStatus::Failed => text.red().bold(),
        NodeStatus::Stopped => text.yellow(),
        NodeStatus::Standby => text.magenta(),
    }
}

fn preview(output: &NodeOutput) -> String {
    let compact = output.to_string();
    if compact.chars().count() <= OUTPUT_PREVIEW_CHARS {
        compact
    } else {
        let cut: String = compact.chars().take(OUTPUT_PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

/// One line (or block) per event.
pub fn render_event(event: &Event) -> String {
    match event {
        Event::NodeStatusUpdate { node_id, status } => {
            format!("{} {}", node_id.bold(), paint_status(*status))
        }
        Event::NodeSubmitted {
            node_id,
            process_id,
            attempt,
        } => format!("{node_id} submitted as {process_id} (attempt {attempt})"),
        Event::NodeOutputReady { node_id, output } => {
            format!("{node_id} output: {}", preview(output))
        }
        Event::NodeLog { node_id, content } => format!("{node_id}: {}", content.dimmed()),
        Event::NodeError { node_id, error } => {
            format!("{} {node_id}: {error}", "error".red().bold())
        }
        Event::PipelineError { error } => format!("{} {error}", "error".red().bold()),
        Event::ParametersApplied => "Parameters applied".green().to_string(),
        Event::DashboardState { nodes } => render_snapshot(nodes),
    }
}

/// Whether `event` reports a failure.
pub fn is_error(event: &Event) -> bool {
    matches!(event, Event::NodeError { .. } | Event::PipelineError { .. })
}

/// Print events until every sender is gone. Returns the number of errors.
pub async fn print_events(mut events_rx: Receiver<Event>) -> usize {
    let mut errors = 0;
    while let Some(event) = events_rx.recv().await {
        if is_error(&event) {
            errors += 1;
        }
        println!("{}", render_event(&event));
    }
    errors
}

/// Table of node states.
pub fn render_snapshot(nodes: &[NodeSnapshot]) -> String {
    let width = nodes
        .iter()
        .map(|n| n.node_id.len())
        .max()
        .unwrap_or(0)
        .max("NODE".len());

    let mut lines = vec![format!(
        "{:<width$}  {:<10}  {:>8}  {:<6}  {}",
        "NODE", "STATUS", "ATTEMPTS", "OUTPUT", "DETAIL"
    )];
    for node in nodes {
        let detail = match (&node.last_error, &node.process_id) {
            (Some(error), _) => error.red().to_string(),
            (None, Some(process_id)) => format!("process {process_id}"),
            (None, None) => String::new(),
        };
        // Pad outside the paint, ANSI codes would break the alignment.
        let pad = " ".repeat(10usize.saturating_sub(node.status.to_string().len()));
        lines.push(format!(
            "{:<width$}  {}{pad}  {:>8}  {:<6}  {}",
            node.node_id,
            paint_status(node.status),
            node.attempts,
            if node.has_output { "yes" } else { "-" },
            detail
        ));
    }
    lines.join("\n")
}

/// Stages, their direct dependencies and the run-all order.
pub fn render_graph(pipeline: &PipelineDefinition) -> String {
    let dependencies = build_dependency_map(&pipeline.edges);
    let mut lines = vec![if pipeline.description.is_empty() {
        pipeline.name.bold().to_string()
    } else {
        format!("{} - {}", pipeline.name.bold(), pipeline.description)
    }];

    for stage in &pipeline.nodes {
        let label = if stage.label.is_empty() {
            String::new()
        } else {
            format!("  {}", stage.label.dimmed())
        };
        lines.push(format!("  {}{label}", stage.id));
        if let Some(deps) = dependencies.get(&stage.id).filter(|deps| !deps.is_empty()) {
            lines.push(format!("      after: {}", deps.join(", ")));
        }
    }

    match topological_order(&pipeline.node_ids(), &dependencies) {
        Ok(order) => lines.push(format!("Run order: {}", order.join(" -> "))),
        Err(stuck) => lines.push(format!(
            "{} cycle among: {}",
            "warning".yellow().bold(),
            stuck.join(", ")
        )),
    }
    lines.join("\n")
}
