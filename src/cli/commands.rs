use crate::{
    cli::args::{BuildArgs, ExplainArgs, ExplainFormat, GraphArgs, ProjectArgs, ValidateArgs},
    core::pipeline::{
        build_plan, execute_plan,
        explain::{build_explain_output, unscheduled_steps, ExplainOutput},
        load_pipeline, ExecutionSummary, PipelineSource,
    },
    core::types::StepStatus,
    Result,
};
use anyhow::Context;
use std::fs;

fn pipeline_source(args: &ProjectArgs) -> PipelineSource {
    PipelineSource {
        project_root: args.path.clone(),
        pipeline_file: args.pipeline.clone(),
        config_file: args.config.clone(),
    }
}

/// Runs a task alias (or single step) of the project's pipeline.
pub async fn build(args: BuildArgs) -> Result<()> {
    let source = pipeline_source(&args.project);
    let loaded = load_pipeline(&source)?;
    let plan = build_plan(&loaded.resolved, &args.task)?;
    tracing::info!(task = %plan.target, steps = plan.steps.len(), "plan ready");

    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, &source.project_root).await;
    print_summary(&summary);

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write run summary {}", path.display()))?;
    }

    summary.into_result()?;
    Ok(())
}

fn print_summary(summary: &ExecutionSummary) {
    for record in &summary.records {
        let marker = match record.status {
            StepStatus::Success => "ok",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
        };
        println!(
            "  {:<8} {:<36} {}",
            marker,
            record.step_id,
            humantime::format_duration(record.duration())
        );
    }
    let outcome = if summary.succeeded() { "finished" } else { "failed" };
    println!(
        "Task '{}' {} in {} (run {})",
        summary.target,
        outcome,
        humantime::format_duration(summary.total_duration()),
        summary.run_id
    );
}

/// Loads and checks the pipeline without touching any file.
pub async fn validate(args: ValidateArgs) -> Result<()> {
    let loaded = load_pipeline(&pipeline_source(&args.project))?;
    let plan = build_plan(&loaded.resolved, &args.task)?;

    println!(
        "Pipeline is valid: {} steps, {} tasks, {} reference slots",
        loaded.resolved.steps.len(),
        loaded.resolved.tasks.len(),
        loaded.graph.node_count()
    );
    println!("Task '{}' runs {} steps", plan.target, plan.steps.len());
    for step in unscheduled_steps(&loaded.resolved) {
        tracing::warn!(step = %step, "step is not part of any task");
        println!("warning: step {} is not part of any task", step);
    }
    Ok(())
}

/// Renders the placeholder reference graph as Graphviz DOT.
pub async fn graph(args: GraphArgs) -> Result<()> {
    let loaded = load_pipeline(&pipeline_source(&args.project))?;
    let dot = loaded.graph.to_dot();
    match &args.output {
        Some(path) => {
            fs::write(path, &dot)
                .with_context(|| format!("failed to write graph {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", dot),
    }
    Ok(())
}

/// Prints the resolved steps a task would run.
pub async fn explain(args: ExplainArgs) -> Result<()> {
    let loaded = load_pipeline(&pipeline_source(&args.project))?;
    let output = build_explain_output(&loaded.resolved, &loaded.graph, &args.task)?;
    match args.format {
        ExplainFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        ExplainFormat::Text => print_explain_text(&output),
    }
    Ok(())
}

fn print_explain_text(output: &ExplainOutput) {
    println!("Task: {}", output.target);
    for (position, step) in output.steps.iter().enumerate() {
        println!("{:>3}. {}", position + 1, step.id);
        if let Some(description) = &step.description {
            println!("       {}", description);
        }
        for read in &step.reads {
            println!("       reads {}", read);
        }
        for pending in &step.runtime {
            println!("       waits for {}", pending);
        }
    }
    if !output.unscheduled.is_empty() {
        println!("Unscheduled: {}", output.unscheduled.join(", "));
    }
}
