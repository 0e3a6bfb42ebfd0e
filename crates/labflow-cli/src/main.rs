//! `labflow` command line
//!
//! Works on protocol and run documents stored as JSON files. Results go to
//! stdout (or `--output`); logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use labflow_core::{
    collect_sample_results, export_sample_results, ExportConfig, LabflowConfig, ProtocolSession,
    RunSession,
};
use labflow_engine::{derive_status, ensure_valid, refresh_status, validate_protocol};
use labflow_model::{Protocol, Run};
use labflow_plate::{
    cell_to_coordinate, default_mapping, remap_upload, ColumnSource, RawRow, Row, TableKind,
};
use labflow_store::{CachedStore, DocumentCache, InMemoryStore};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let config = match LabflowConfig::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.log_filter);

    if let Err(err) = run(&matches, &config).await {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    let output = Arg::new("output")
        .long("output")
        .short('o')
        .value_parser(value_parser!(PathBuf))
        .help("Write to this file instead of stdout");

    let upload = |name: &'static str, about: &'static str, document: &'static str| {
        Command::new(name)
            .about(about)
            .arg(
                Arg::new("document")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help(document),
            )
            .arg(Arg::new("section").long("section").required(true).help("Section id"))
            .arg(Arg::new("block").long("block").required(true).help("Block id"))
            .arg(
                Arg::new("rows")
                    .long("rows")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("JSON array of uploaded rows (objects or arrays)"),
            )
            .arg(
                Arg::new("map")
                    .long("map")
                    .action(ArgAction::Append)
                    .value_name("COLUMN=SOURCE")
                    .help("Read a column from another header, or a 1-based position"),
            )
            .arg(output.clone())
    };

    Command::new("labflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Protocol templates and run tracking for lab workflows")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("materialize")
                .about("Create a blank run from a protocol")
                .arg(
                    Arg::new("protocol")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Protocol JSON file"),
                )
                .arg(Arg::new("actor").long("actor").help("Recorded as the run's creator"))
                .arg(output.clone()),
        )
        .subcommand(
            Command::new("status")
                .about("Derive a run's status from its section sign-offs")
                .arg(
                    Arg::new("run")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Run JSON file"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Store the derived status back into the file"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check section and block ids of a protocol")
                .arg(
                    Arg::new("protocol")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Protocol JSON file"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve well labels such as A1 or AB12")
                .arg(
                    Arg::new("cells")
                        .required(true)
                        .num_args(1..)
                        .help("Well labels"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Apply an uploaded table to a document")
                .subcommand_required(true)
                .subcommand(upload(
                    "mapping",
                    "Plate mapping into a plate sampler block of a run",
                    "Run JSON file",
                ))
                .subcommand(upload(
                    "results",
                    "Sequencer results into an end-plate-sequencer block of a run",
                    "Run JSON file",
                ))
                .subcommand(upload(
                    "markers",
                    "Marker table into an end-plate-sequencer block of a protocol",
                    "Protocol JSON file",
                )),
        )
        .subcommand(
            Command::new("samples")
                .about("Export a run's sample results as CSV")
                .arg(
                    Arg::new("run")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Run JSON file"),
                )
                .arg(
                    Arg::new("no-header")
                        .long("no-header")
                        .action(ArgAction::SetTrue)
                        .help("Omit the header line"),
                )
                .arg(output.clone()),
        )
}

async fn run(matches: &ArgMatches, config: &LabflowConfig) -> Result<()> {
    match matches.subcommand() {
        Some(("materialize", args)) => materialize(args, config).await,
        Some(("status", args)) => status(args),
        Some(("validate", args)) => validate(args),
        Some(("resolve", args)) => resolve(args),
        Some(("import", args)) => import(args),
        Some(("samples", args)) => samples(args, config),
        _ => bail!("unknown command"),
    }
}

async fn materialize(args: &ArgMatches, config: &LabflowConfig) -> Result<()> {
    let protocol: Protocol = read_json(required_path(args, "protocol")?)?;
    ensure_valid(&protocol).context("protocol is not valid")?;

    let mut store = InMemoryStore::new();
    if let Some(actor) = args.get_one::<String>("actor") {
        store = store.with_actor(actor.as_str());
    }
    let store = Arc::new(CachedStore::new(store, DocumentCache::new(config.cache)));
    let session = RunSession::start_run(store, &protocol).await?;
    write_json(args.get_one::<PathBuf>("output"), session.run())
}

fn status(args: &ArgMatches) -> Result<()> {
    let path = required_path(args, "run")?;
    let mut run: Run = read_json(path)?;
    if args.get_flag("write") {
        if refresh_status(&mut run) {
            write_json(Some(&path.to_path_buf()), &run)?;
        }
        println!("{}", run.status);
    } else {
        println!("{}", derive_status(&run));
    }
    Ok(())
}

fn validate(args: &ArgMatches) -> Result<()> {
    let protocol: Protocol = read_json(required_path(args, "protocol")?)?;
    let issues = validate_protocol(&protocol);
    for issue in &issues {
        println!("{issue}");
    }
    if !issues.is_empty() {
        bail!("{} problem(s) found", issues.len());
    }
    println!("ok");
    Ok(())
}

fn resolve(args: &ArgMatches) -> Result<()> {
    for cell in args.get_many::<String>("cells").into_iter().flatten() {
        let coordinate = cell_to_coordinate(Some(cell.as_str()))
            .with_context(|| format!("cannot resolve '{cell}'"))?;
        println!("{cell}\t{}", serde_json::to_string(&coordinate)?);
    }
    Ok(())
}

fn import(args: &ArgMatches) -> Result<()> {
    let (kind, args) = match args.subcommand() {
        Some(("mapping", args)) => (TableKind::PlateMapping, args),
        Some(("results", args)) => (TableKind::SequencerResults, args),
        Some(("markers", args)) => (TableKind::PlateMarkers, args),
        _ => bail!("unknown import kind"),
    };
    let path = required_path(args, "document")?;
    let section = required_str(args, "section")?;
    let block = required_str(args, "block")?;
    let rows = load_rows(args, kind)?;
    let store = Arc::new(InMemoryStore::new());

    let applied = if kind == TableKind::PlateMarkers {
        let mut session = ProtocolSession::new(store, read_json(path)?);
        let applied = session.import_plate_markers(section, block, &rows)?;
        if applied {
            write_json(args.get_one::<PathBuf>("output"), session.protocol())?;
        }
        applied
    } else {
        let mut session = RunSession::new(store, read_json(path)?);
        let applied = if kind == TableKind::PlateMapping {
            session.import_plate_mapping(section, block, &rows)?
        } else {
            session.import_sequencer_results(section, block, &rows)?
        };
        if applied {
            write_json(args.get_one::<PathBuf>("output"), session.run())?;
        }
        applied
    };

    if !applied {
        eprintln!("warning: no usable rows in {kind} upload; nothing written");
    }
    Ok(())
}

fn samples(args: &ArgMatches, config: &LabflowConfig) -> Result<()> {
    let run: Run = read_json(required_path(args, "run")?)?;
    let export = ExportConfig {
        include_header: config.export.include_header && !args.get_flag("no-header"),
    };
    let csv = export_sample_results(&collect_sample_results(&run), &export);
    write_text(args.get_one::<PathBuf>("output"), &csv)
}

/// Rows for `kind`, with canonical columns read through any `--map` overrides
fn load_rows(args: &ArgMatches, kind: TableKind) -> Result<Vec<Row>> {
    let raw: Vec<RawRow> = read_json(required_path(args, "rows")?)?;
    let mut mapping = default_mapping(kind);
    for arg in args.get_many::<String>("map").into_iter().flatten() {
        let (column, source) = parse_column(arg)?;
        if !kind.columns().contains(&column.as_str()) {
            bail!("'{column}' is not a {kind} column");
        }
        mapping.insert(column, source);
    }
    Ok(remap_upload(kind, &raw, &mapping))
}

/// `plate=Barcode` reads a header, `cell=2` reads the second column
fn parse_column(arg: &str) -> Result<(String, ColumnSource)> {
    let (column, source) = arg
        .split_once('=')
        .with_context(|| format!("expected COLUMN=SOURCE, got '{arg}'"))?;
    let source = source.trim();
    let source = match source.parse::<usize>() {
        Ok(position) => ColumnSource::Position(position),
        Err(_) => ColumnSource::Header(source.to_string()),
    };
    Ok((column.trim().to_string(), source))
}

fn required_path<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{id}>"))
}

fn required_str<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing --{id}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(output: Option<&PathBuf>, value: &T) -> Result<()> {
    write_text(output, &serde_json::to_string_pretty(value)?)
}

fn write_text(output: Option<&PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_model::{Block, RunStatus};
    use labflow_test_utils::sample_protocol;
    use pretty_assertions::assert_eq;

    fn matches(args: &[&str]) -> ArgMatches {
        build_cli().try_get_matches_from(args).unwrap()
    }

    fn write(dir: &Path, name: &str, value: &impl Serialize) -> String {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn column_specs() {
        assert_eq!(
            parse_column("plate=Barcode").unwrap(),
            ("plate".to_string(), ColumnSource::Header("Barcode".to_string()))
        );
        assert_eq!(
            parse_column(" cell = 2 ").unwrap(),
            ("cell".to_string(), ColumnSource::Position(2))
        );
        assert!(parse_column("plate").is_err());
    }

    #[tokio::test]
    async fn materialize_then_import_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let protocol = write(dir.path(), "protocol.json", &sample_protocol());
        let run_path = dir.path().join("run.json").display().to_string();
        let config = LabflowConfig::default();

        run(
            &matches(&[
                "labflow",
                "materialize",
                protocol.as_str(),
                "--actor",
                "alice",
                "-o",
                run_path.as_str(),
            ]),
            &config,
        )
        .await
        .unwrap();
        let created: Run = read_json(Path::new(&run_path)).unwrap();
        assert!(created.id.is_some());
        assert_eq!(created.status, RunStatus::Todo);
        assert_eq!(created.audit.created_by.as_deref(), Some("alice"));

        let rows = write(
            dir.path(),
            "rows.json",
            &serde_json::json!([["P7", "B2", 501], ["P7", "B3", 502]]),
        );
        run(
            &matches(&[
                "labflow",
                "import",
                "mapping",
                run_path.as_str(),
                "--section",
                "sampling",
                "--block",
                "sampler",
                "--rows",
                rows.as_str(),
                "--map",
                "plate=1",
                "--map",
                "cell=2",
                "--map",
                "sample=3",
                "-o",
                run_path.as_str(),
            ]),
            &config,
        )
        .await
        .unwrap();

        let updated: Run = read_json(Path::new(&run_path)).unwrap();
        let Block::PlateSampler(sampler) = &updated.section("sampling").unwrap().blocks[0] else {
            panic!("expected sampler");
        };
        assert_eq!(sampler.plate_mappings["P7"].len(), 2);
        assert_eq!(sampler.plate_mappings["P7"][1].row, Some(1));
    }

    #[tokio::test]
    async fn import_results_keeps_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = write(
            dir.path(),
            "run.json",
            &labflow_engine::materialize(&sample_protocol()),
        );
        let rows = write(
            dir.path(),
            "rows.json",
            &serde_json::json!([
                {"Barcode": "P1", "plateCell": "A1", "classification": "positive", "reads": 1520}
            ]),
        );
        run(
            &matches(&[
                "labflow",
                "import",
                "results",
                run_path.as_str(),
                "--section",
                "sequencing",
                "--block",
                "seq-end",
                "--rows",
                rows.as_str(),
                "--map",
                "plateLabel=Barcode",
                "-o",
                run_path.as_str(),
            ]),
            &LabflowConfig::default(),
        )
        .await
        .unwrap();

        let updated: Run = read_json(Path::new(&run_path)).unwrap();
        let Block::EndPlateSequencer(sequencer) = &updated.section("sequencing").unwrap().blocks[1]
        else {
            panic!("expected end plate sequencer");
        };
        let result = &sequencer.plate_sequencing_results[0];
        assert!(result.is_at("P1", 0, 1));
        assert_eq!(result.extra["reads"], labflow_model::CellValue::Number(1520.0));
        assert!(!result.extra.contains_key("Barcode"));
    }

    #[tokio::test]
    async fn unknown_mapped_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = write(dir.path(), "run.json", &Run::default());
        let rows = write(dir.path(), "rows.json", &serde_json::json!([]));
        let err = run(
            &matches(&[
                "labflow",
                "import",
                "results",
                run_path.as_str(),
                "--section",
                "s",
                "--block",
                "b",
                "--rows",
                rows.as_str(),
                "--map",
                "barcode=1",
            ]),
            &LabflowConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not a sequencer result column"));
    }

    #[tokio::test]
    async fn validate_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        let mut protocol = sample_protocol();
        protocol.sections[2].id = "prep".into();
        let path = write(dir.path(), "protocol.json", &protocol);

        let err = run(&matches(&["labflow", "validate", path.as_str()]), &LabflowConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "1 problem(s) found");
    }

    #[tokio::test]
    async fn status_write_updates_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut run_doc = labflow_engine::materialize(&sample_protocol());
        run_doc.sections[0].signed_on = Some(labflow_test_utils::fixed_time());
        let path = write(dir.path(), "run.json", &run_doc);

        run(&matches(&["labflow", "status", path.as_str(), "--write"]), &LabflowConfig::default())
            .await
            .unwrap();
        let stored: Run = read_json(Path::new(&path)).unwrap();
        assert_eq!(stored.status, RunStatus::InProgress);
    }

    #[tokio::test]
    async fn resolve_rejects_malformed_labels() {
        let config = LabflowConfig::default();
        run(&matches(&["labflow", "resolve", "A1", "AA12"]), &config)
            .await
            .unwrap();
        assert!(run(&matches(&["labflow", "resolve", "1A"]), &config).await.is_err());
    }
}
