use crate::context::Context;
use crate::{DocumentArgs, RuntimeArgs};
use anyhow::{bail, Context as _};
use exerciser_core::{Bindings, EvaluationOutcome, Origin};
use exerciser_dispatch::{fetch_shared_session, format_document, LiveEvaluator, Session};
use exerciser_libraries::{library_bindings, LibraryHandle, LibraryLoader};
use exerciser_runtime::fetch_versions;
use exerciser_serializer::{marker_range, serialize};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn eval(
    context: &Context,
    document: &DocumentArgs,
    runtime: &RuntimeArgs,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut session = read_session(document)?;
    session.backend = runtime.backend;

    let dispatcher = context.dispatcher(runtime).await?;
    let libraries = load_libraries(context, &session).await;

    let outcome = match session.request(&libraries) {
        Ok(request) => dispatcher.evaluate(&request).await,
        Err(err) => EvaluationOutcome::InputError(err),
    };
    print_outcome(&outcome, &session.document, json)?;
    Ok(exit_code(&outcome))
}

pub async fn watch(
    context: &Context,
    document: &DocumentArgs,
    runtime: &RuntimeArgs,
    version_file: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let paths = watched_paths(document);
    if paths.is_empty() && version_file.is_none() {
        bail!("nothing to watch: pass --input, --expr-file, --bindings or --version-file");
    }

    let mut session = read_session(document)?;
    session.backend = runtime.backend;
    let dispatcher = context.dispatcher(runtime).await?;
    let libraries = load_libraries(context, &session).await;

    let (mut live, mut outcomes) = LiveEvaluator::with_timing(dispatcher, &context.config.timing);
    let version_target = version_file.map(absolute);
    let watched: Vec<PathBuf> = paths
        .iter()
        .cloned()
        .chain(version_file.map(Path::to_path_buf))
        .collect();
    let (_watcher, mut changes) = start_watcher(&watched)?;
    info!(files = watched.len(), "watching for changes; Ctrl-C to stop");

    live.submit_after(Duration::ZERO, session.request(&libraries));
    loop {
        tokio::select! {
            Some(changed) = changes.recv() => {
                if Some(&changed) == version_target.as_ref() {
                    let current = live.dispatcher().registry().current_origin();
                    match read_version(&changed) {
                        Ok(Some(origin)) if origin != current => {
                            live.change_version(origin, session.request(&libraries));
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(error = %format!("{:#}", err), "could not read version file")
                        }
                    }
                    continue;
                }
                match read_session(document) {
                    Ok(mut edited) => {
                        edited.backend = runtime.backend;
                        live.submit(edited.request(&libraries));
                        session = edited;
                    }
                    Err(err) => {
                        warn!(error = %format!("{:#}", err), "could not re-read session files")
                    }
                }
            }
            Some(delivered) = outcomes.recv() => {
                if live.is_current(delivered.ticket) {
                    print_outcome(&delivered.outcome, &session.document, false)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                live.cancel();
                break;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// The runtime origin named by the first non-empty line of `path`
fn read_version(path: &Path) -> anyhow::Result<Option<Origin>> {
    let text = read_text(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| match line.strip_prefix("branch:") {
            Some(branch) => Origin::Branch(branch.trim().to_string()),
            None => Origin::parse(line),
        }))
}

pub async fn session(context: &Context, id: &str, runtime: &RuntimeArgs, json: bool) -> anyhow::Result<ExitCode> {
    let shared = fetch_shared_session(&context.client, &context.config.endpoints, id)
        .await
        .with_context(|| format!("could not load shared session {}", id))?;
    let mut session = Session::from_shared(shared);
    session.backend = runtime.backend;

    let dispatcher = context.dispatcher(runtime).await?;
    let libraries = load_libraries(context, &session).await;

    if !json {
        println!("{}\n", session.expression);
    }
    let outcome = match session.request(&libraries) {
        Ok(request) => dispatcher.evaluate(&request).await,
        Err(err) => EvaluationOutcome::InputError(err),
    };
    print_outcome(&outcome, &session.document, json)?;
    Ok(exit_code(&outcome))
}

pub async fn versions(context: &Context, include_local: bool) -> anyhow::Result<ExitCode> {
    let versions = fetch_versions(&context.client, &context.config.endpoints.manifest_url, include_local)
        .await
        .context("could not fetch runtime versions")?;
    for version in versions {
        println!("{}", version);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn format(file: &Path, write: bool) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(file).with_context(|| format!("could not read {}", file.display()))?;
    match format_document(&text) {
        Ok(formatted) if write => {
            std::fs::write(file, format!("{}\n", formatted))
                .with_context(|| format!("could not write {}", file.display()))?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(formatted) => {
            println!("{}", formatted);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_outcome(&EvaluationOutcome::InputError(err), &text, false)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Read the session texts named on the command line
///
/// Without `--input` the document is `{}`; `-` reads it from stdin.
fn read_session(args: &DocumentArgs) -> anyhow::Result<Session> {
    let document = match &args.input {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("could not read input from stdin")?;
            text
        }
        Some(path) => read_text(path)?,
        None => "{}".to_string(),
    };
    let expression = match (&args.expr, &args.expr_file) {
        (Some(expr), _) => expr.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => String::new(),
    };
    let bindings = match &args.bindings {
        Some(path) => read_text(path)?,
        None => String::new(),
    };
    Ok(Session {
        document,
        expression,
        bindings,
        libraries: args.libs.clone(),
        ..Session::default()
    })
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

async fn load_libraries(context: &Context, session: &Session) -> Bindings {
    if session.libraries.is_empty() {
        return Bindings::new();
    }
    let handles = LibraryLoader::new(context.client.clone())
        .load_libraries(&session.libraries)
        .await;
    report_library_errors(&handles);
    library_bindings(&handles)
}

fn report_library_errors(handles: &[LibraryHandle]) {
    for handle in handles {
        if let Some(err) = handle.load_error() {
            eprintln!("warning: library '{}' not loaded: {}", handle.module_name(), err);
        }
    }
}

fn print_outcome(outcome: &EvaluationOutcome, document: &str, json: bool) -> anyhow::Result<()> {
    let display = serialize(outcome);
    if json {
        println!("{}", serde_json::to_string_pretty(&display)?);
        return Ok(());
    }
    println!("{}", display.text);
    if let Some(offset) = display.error_offset {
        let (from, _) = marker_range(document, offset);
        println!("  at line {}, column {}", from.line, from.column);
    }
    Ok(())
}

fn exit_code(outcome: &EvaluationOutcome) -> ExitCode {
    if outcome.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn watched_paths(args: &DocumentArgs) -> Vec<PathBuf> {
    [args.input.as_ref(), args.expr_file.as_ref(), args.bindings.as_ref()]
        .into_iter()
        .flatten()
        .filter(|path| path.as_os_str() != "-")
        .cloned()
        .collect()
}

/// Watch the parent directories of `files` and report which of them changed
///
/// Directories are watched rather than the files, so editors that save by
/// replacing the file are still seen.
fn start_watcher(
    files: &[PathBuf],
) -> anyhow::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let targets: BTreeSet<PathBuf> = files.iter().map(|f| absolute(f)).collect();
    let directories: BTreeSet<PathBuf> = targets
        .iter()
        .filter_map(|f| f.parent().map(Path::to_path_buf))
        .collect();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in event.paths.iter().filter(|p| targets.contains(*p)) {
                let _ = tx.send(path.clone());
            }
        }
        Err(err) => warn!(error = %err, "file watcher error"),
    })
    .context("could not start file watcher")?;

    for directory in &directories {
        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("could not watch {}", directory.display()))?;
    }
    Ok((watcher, rx))
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    })
}
