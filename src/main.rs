//! `earmark` command-line front end: index reference WAVs and identify clips.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use earmark::audio::load_wav_mono;
use earmark::app_dirs;
use earmark::config::{self, FingerprintConfig};
use earmark::index::{DatabaseBuilder, SourceId};
use earmark::pipeline::{Recognizer, ReferenceAudio, extend_database};
use earmark::{MatchOutcome, logging, store};
use serde::Serialize;

fn main() {
    let command = std::env::args().nth(1).unwrap_or_default();
    if !command.is_empty() && !command.starts_with('-') && logging::init(&command).is_err() {
        let _ = logging::init_console();
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(command) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    match command {
        Command::Index {
            db_path,
            config_path,
            wavs,
        } => run_index(&database_path(db_path)?, config_path.as_deref(), &wavs),
        Command::Identify {
            db_path,
            config_path,
            json,
            wav,
        } => run_identify(&database_path(db_path)?, config_path.as_deref(), json, &wav),
        Command::Config { write } => run_config(write.as_deref()),
    }
}

fn database_path(explicit: Option<PathBuf>) -> Result<PathBuf, String> {
    match explicit {
        Some(path) => Ok(path),
        None => app_dirs::default_database_path().map_err(|err| err.to_string()),
    }
}

fn active_config(path: Option<&Path>) -> Result<FingerprintConfig, String> {
    match path {
        Some(path) => config::load(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())
}

fn run_index(db_path: &Path, config_path: Option<&Path>, wavs: &[PathBuf]) -> Result<(), String> {
    let config = active_config(config_path)?;
    let existing = store::load_for(db_path, &config).map_err(|err| err.to_string())?;
    let mut builder = DatabaseBuilder::from_database(existing.database);
    let first_id = builder
        .catalog()
        .next_id()
        .ok_or_else(|| "Too many recordings for one database".to_string())?
        .get();

    let mut recordings = Vec::with_capacity(wavs.len());
    for (offset, path) in (0u32..).zip(wavs) {
        let audio = load_wav_mono(path).map_err(|err| err.to_string())?;
        let source_id = first_id
            .checked_add(offset)
            .map(SourceId::new)
            .ok_or_else(|| "Too many recordings for one database".to_string())?;
        recordings.push(ReferenceAudio {
            source_id,
            name: recording_name(path),
            samples: audio.samples,
            sample_rate: audio.sample_rate,
        });
    }
    let names: Vec<(SourceId, String)> = recordings
        .iter()
        .map(|recording| (recording.source_id, recording.name.clone()))
        .collect();

    extend_database(&mut builder, recordings, &config).map_err(|err| err.to_string())?;
    let database = builder.finish();
    store::save(db_path, &database, &config).map_err(|err| err.to_string())?;
    for (source_id, name) in names {
        let hashes = database
            .catalog()
            .get(source_id)
            .map(|entry| entry.hash_count)
            .unwrap_or(0);
        println!("{source_id}\t{name}\t{hashes} hashes");
    }
    Ok(())
}

fn recording_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Serialize)]
struct IdentifyReport {
    best: Option<String>,
    best_id: Option<SourceId>,
    query_hashes: usize,
    votes: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aligned_votes: Option<BTreeMap<String, usize>>,
}

fn run_identify(
    db_path: &Path,
    config_path: Option<&Path>,
    json: bool,
    wav: &Path,
) -> Result<(), String> {
    let requested = active_config(config_path)?;
    let stored = store::load_existing_for(db_path, &requested).map_err(|err| err.to_string())?;
    if stored.database.is_empty() {
        return Err(format!("{} holds no recordings", db_path.display()));
    }
    let recognizer =
        Recognizer::new(stored.database, requested).map_err(|err| err.to_string())?;
    let audio = load_wav_mono(wav).map_err(|err| err.to_string())?;
    let (fingerprint, outcome) = recognizer
        .identify_samples(&audio.samples, audio.sample_rate)
        .map_err(|err| err.to_string())?;
    let report = build_report(&recognizer, fingerprint.hashes.len(), &outcome);

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
        println!("{text}");
        return Ok(());
    }
    match &report.best {
        Some(name) => println!("Best match: {name}"),
        None => println!("No match"),
    }
    for (name, votes) in &report.votes {
        println!("  {name}: {votes}");
    }
    Ok(())
}

fn build_report(recognizer: &Recognizer, query_hashes: usize, outcome: &MatchOutcome) -> IdentifyReport {
    let catalog = recognizer.database().catalog();
    let named = |tally: &earmark::VoteTally| {
        tally
            .iter()
            .map(|(id, votes)| (catalog.name_of(id), votes))
            .collect::<BTreeMap<_, _>>()
    };
    IdentifyReport {
        best: outcome.best.map(|id| catalog.name_of(id)),
        best_id: outcome.best,
        query_hashes,
        votes: named(&outcome.votes),
        aligned_votes: outcome.aligned.as_ref().map(named),
    }
}

fn run_config(write: Option<&Path>) -> Result<(), String> {
    let config = FingerprintConfig::default();
    match write {
        Some(path) => {
            config::save(&config, path).map_err(|err| err.to_string())?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => {
            let text = toml::to_string_pretty(&config).map_err(|err| err.to_string())?;
            print!("{text}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Index {
        db_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
        wavs: Vec<PathBuf>,
    },
    Identify {
        db_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
        json: bool,
        wav: PathBuf,
    },
    Config {
        write: Option<PathBuf>,
    },
}

fn parse_args(args: Vec<String>) -> Result<Option<Command>, String> {
    let Some((command, rest)) = args.split_first() else {
        return Err(help_text());
    };
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut write: Option<PathBuf> = None;
    let mut json = false;
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut idx = 0usize;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--db" => {
                idx += 1;
                let value = rest.get(idx).ok_or_else(|| "--db requires a value".to_string())?;
                db_path = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--write" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--write requires a value".to_string())?;
                write = Some(PathBuf::from(value));
            }
            "--json" => json = true,
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            value => positional.push(PathBuf::from(value)),
        }
        idx += 1;
    }

    match command.as_str() {
        "-h" | "--help" => {
            println!("{}", help_text());
            Ok(None)
        }
        "index" => {
            if positional.is_empty() {
                return Err("index needs at least one WAV file".to_string());
            }
            Ok(Some(Command::Index {
                db_path,
                config_path,
                wavs: positional,
            }))
        }
        "identify" => {
            let [wav] = <[PathBuf; 1]>::try_from(positional)
                .map_err(|_| "identify needs exactly one WAV file".to_string())?;
            Ok(Some(Command::Identify {
                db_path,
                config_path,
                json,
                wav,
            }))
        }
        "config" => Ok(Some(Command::Config { write })),
        unknown => Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    }
}

fn help_text() -> String {
    [
        "earmark",
        "",
        "Usage:",
        "  earmark index [--db <file>] [--config <toml>] <wav>...",
        "  earmark identify [--db <file>] [--config <toml>] [--json] <wav>",
        "  earmark config [--write <toml>]",
        "",
        "Without --db the store lives in the application directory.",
    ]
    .join("\n")
}
