//! Command dispatch and handlers

use std::collections::HashSet;
use std::io::{self, IsTerminal};
use std::path::Path;

use chrono::Local;
use clap::CommandFactory;
use itertools::Itertools;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::report;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    classify, DebugFeature, EntryPoint, Node, NodeKind, NodeMap, Symptom, SystemHistory, CATALOG,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::SelectionItem;
use crate::infrastructure::InfraError;

/// Load settings, wire services and run the selected command.
pub fn execute(cli: &Cli) -> CliResult<()> {
    let cwd = std::env::current_dir().ok();
    let settings = Settings::load(cwd.as_deref())?;
    debug!("execute: settings={:?}", settings);
    let container = ServiceContainer::new(settings);
    let tree = cli.tree.as_deref();

    match &cli.command {
        None => cmd_run(&container, tree, None),
        Some(Commands::Run { entry }) => cmd_run(&container, tree, entry.as_deref()),
        Some(Commands::Resume {
            code,
            file,
            replace_checklist,
        }) => cmd_resume(
            &container,
            tree,
            code.as_deref(),
            file.as_deref(),
            *replace_checklist,
        ),
        Some(Commands::Classify {
            symptom,
            debug_feature,
            history,
        }) => {
            let symptoms: Vec<Symptom> = symptom.iter().copied().map(Symptom::from).collect();
            cmd_classify(
                &symptoms,
                debug_feature.map(DebugFeature::from),
                history.map(SystemHistory::from),
            )
        }
        Some(Commands::Inspect { code, file }) => {
            cmd_inspect(&container, tree, code.as_deref(), file.as_deref())
        }
        Some(Commands::Validate) => cmd_validate(&container, tree),
        Some(Commands::Tree { from }) => cmd_tree(&container, tree, from.as_deref()),
        Some(Commands::Show { id }) => cmd_show(&container, tree, id.as_deref()),
        Some(Commands::Checklist) => cmd_checklist(),
        Some(Commands::Config { command }) => cmd_config(&container, command),
        Some(Commands::Completion { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "postwiz", &mut io::stdout());
            Ok(())
        }
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_run(container: &ServiceContainer, tree: Option<&Path>, entry: Option<&str>) -> CliResult<()> {
    let wizard = container.wizard_service();
    match wizard.start(tree, entry)? {
        Some(mut session) => wizard.run(&mut session)?,
        None => output::info("Intake cancelled."),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container, code))]
fn cmd_resume(
    container: &ServiceContainer,
    tree: Option<&Path>,
    code: Option<&str>,
    file: Option<&Path>,
    replace_checklist: bool,
) -> CliResult<()> {
    let input = read_resume_input(container, code, file)?;
    let wizard = container.wizard_service();
    let mut session = wizard.resume(tree, &input, replace_checklist)?;
    if let Some(current) = session.engine.current_id() {
        output::success(&format!(
            "Resumed at {} ({} steps back, {} checklist steps done)",
            current,
            session.engine.history().len(),
            session.checklist.len()
        ));
    }
    wizard.run(&mut session)?;
    Ok(())
}

fn cmd_classify(
    symptoms: &[Symptom],
    debug: Option<DebugFeature>,
    history: Option<SystemHistory>,
) -> CliResult<()> {
    let entry = classify(symptoms, history, debug);
    debug!("cmd_classify: {:?}", entry);
    output::info(entry.node_id());
    Ok(())
}

fn cmd_inspect(
    container: &ServiceContainer,
    tree: Option<&Path>,
    code: Option<&str>,
    file: Option<&Path>,
) -> CliResult<()> {
    let input = read_resume_input(container, code, file)?;
    let state = container.session_service().decode(&input)?;
    let code = state.encode()?;
    output::info(&report::render(&state, &code, &Local::now()));

    // ids in the code that the current tree does not know
    let nodes = container.tree_service().load(tree)?;
    let unknown: Vec<&String> = state
        .path
        .iter()
        .chain(state.current.as_ref())
        .filter(|id| !nodes.contains(id))
        .unique()
        .collect();
    for id in unknown {
        output::warning(&format!("node {} is not in the decision tree", id));
    }
    Ok(())
}

fn cmd_validate(container: &ServiceContainer, tree: Option<&Path>) -> CliResult<()> {
    let trees = container.tree_service();
    let name = trees.source_name(tree);
    let nodes = trees.load(tree)?;
    let issues = nodes.validate();
    if issues.is_empty() {
        output::success(&format!("{}: {} nodes, no problems", name, nodes.len()));
        return Ok(());
    }
    output::header(&format!("{}: {} problem(s)", name, issues.len()));
    for issue in &issues {
        output::failure(issue);
    }
    Err(CliError::TreeIssues(issues.len()))
}

fn cmd_tree(container: &ServiceContainer, tree: Option<&Path>, from: Option<&str>) -> CliResult<()> {
    let nodes = container.tree_service().load(tree)?;
    let roots: Vec<&str> = match from {
        Some(id) => {
            nodes.get(id)?;
            vec![id]
        }
        None => EntryPoint::ALL
            .iter()
            .map(|e| e.node_id())
            .filter(|id| nodes.contains(id))
            .collect(),
    };
    let mut seen = HashSet::new();
    for root in roots {
        output::info(&decision_tree(&nodes, root, None, &mut seen));
    }
    Ok(())
}

/// Render the graph below `id`; nodes already printed are marked, not expanded.
fn decision_tree(
    nodes: &NodeMap,
    id: &str,
    edge: Option<String>,
    seen: &mut HashSet<String>,
) -> Tree<String> {
    let prefix = edge.map(|e| format!("{} → ", e)).unwrap_or_default();
    let Ok(node) = nodes.get(id) else {
        return Tree::new(format!("{}{} (missing)", prefix, id));
    };
    if !seen.insert(node.id.clone()) {
        return Tree::new(format!("{}{} ↺", prefix, id));
    }

    let mut tree = Tree::new(format!("{}{}", prefix, describe(node)));
    for (label, option) in node.options.iter() {
        let edge = match option.requires_gpu {
            Some(kind) => format!("{} [{}]", label, kind.tag()),
            None => label.to_string(),
        };
        tree.push(decision_tree(nodes, &option.next, Some(edge), seen));
    }
    if let Some(skip) = &node.next_if_skipped {
        tree.push(decision_tree(nodes, skip, Some("(gated)".to_string()), seen));
    }
    tree
}

fn describe(node: &Node) -> String {
    match node.kind() {
        Ok(NodeKind::Decision { question, .. }) => format!("{}: {}", node.id, question),
        Ok(NodeKind::Result(result)) => format!("{} ⇒ {}", node.id, result),
        Err(_) => format!("{} (invalid)", node.id),
    }
}

fn cmd_show(container: &ServiceContainer, tree: Option<&Path>, id: Option<&str>) -> CliResult<()> {
    let nodes = container.tree_service().load(tree)?;
    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let items: Vec<SelectionItem> = nodes
                .iter()
                .map(|n| SelectionItem::new(describe(n), n.id.clone()))
                .collect();
            match container
                .selector
                .select_one(&items, "node> ")
                .map_err(|message| ApplicationError::Prompt { message })?
            {
                Some(item) => item.value,
                None => return Ok(()),
            }
        }
    };

    let node = nodes.get(&id)?;
    let options: Vec<_> = node.options.iter().collect();
    container.renderer.display_node(node, &options);
    if !node.requires_done.is_empty() {
        output::detail(&format!("requires done: {}", node.requires_done.join(", ")));
    }
    if !node.requires_not_done.is_empty() {
        output::detail(&format!(
            "requires not done: {}",
            node.requires_not_done.join(", ")
        ));
    }
    if let Some(skip) = &node.next_if_skipped {
        output::detail(&format!("when gated: {}", skip));
    }
    for (label, option) in node.options.iter() {
        let marks = option.marked_ids();
        if !marks.is_empty() {
            output::detail(&format!("'{}' marks: {}", label, marks.join(", ")));
        }
    }
    Ok(())
}

fn cmd_checklist() -> CliResult<()> {
    for (category, steps) in &CATALOG.iter().chunk_by(|s| s.category) {
        output::header(&category);
        for step in steps {
            output::detail(&format!("{:<26} {}", step.id, step.text));
        }
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path();
            let local = std::env::current_dir()
                .ok()
                .map(|dir| local_config_path(&dir));
            for (label, path) in [("global", global), ("local", local)] {
                match path {
                    Some(p) => output::action(label, &describe_path(&p)),
                    None => output::action(label, "(unavailable)"),
                }
            }
        }
    }
    Ok(())
}

fn describe_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

/// Resume input from the argument, a file, an interactive prompt, or
/// piped stdin (which may hold a whole report).
fn read_resume_input(
    container: &ServiceContainer,
    code: Option<&str>,
    file: Option<&Path>,
) -> CliResult<String> {
    if let Some(code) = code {
        return Ok(code.to_string());
    }
    if let Some(file) = file {
        return Ok(container.session_service().read_code_file(file)?);
    }
    if io::stdin().is_terminal() {
        let code = container
            .prompter
            .input("Paste resume code")
            .map_err(|message| ApplicationError::Prompt { message })?;
        return Ok(code);
    }
    let input = io::read_to_string(io::stdin())
        .map_err(|e| InfraError::io("read resume code from stdin", e))?;
    if input.trim().is_empty() {
        return Err(CliError::Usage(
            "no resume code given (pass CODE, --file, or pipe it on stdin)".into(),
        ));
    }
    Ok(input)
}
