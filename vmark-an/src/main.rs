//! vmark-an - Video annotation workbench
//!
//! Command-line front end over the dataset progress tracker and annotation ledger:
//! - `scan` / `status`: folder list and progress against the ledger
//! - `show`: a folder (or ledger entry) with any saved annotation
//! - `generate` / `save`: draft reasoning with the LLM, write the ledger entry
//! - `history`: saved entries in id order
//! - `config`: API settings, output folder, diagnosis labels

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vmark_an::models::AnnotationDraft;
use vmark_an::services::{DatasetScanner, LlmClient};
use vmark_an::{LoadedFolder, Workbench};
use vmark_common::config::{
    resolve_config_dir, resolve_output_folder, ApiConfig, BootstrapConfig, ConfigStore,
    DiagnosisLabelsConfig, OutputFolderConfig, CONFIG_DIR_ENV, OUTPUT_FOLDER_ENV,
};
use vmark_common::segment::{parse_line, parse_segments};
use vmark_common::SegmentList;

/// Command-line arguments for vmark-an
#[derive(Parser, Debug)]
#[command(name = "vmark-an")]
#[command(about = "Video annotation workbench")]
#[command(version)]
struct Cli {
    /// Configuration directory
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,

    /// Output folder for ledgers and copied videos
    #[arg(long, global = true, env = OUTPUT_FOLDER_ENV)]
    output_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List dataset folders and whether each is annotated
    Scan { root: PathBuf },

    /// Show progress for a dataset
    Status { root: PathBuf },

    /// Show a folder (default: the first unprocessed one) or a ledger entry
    Show {
        root: PathBuf,
        #[arg(long, conflicts_with = "entry")]
        index: Option<usize>,
        #[arg(long)]
        entry: Option<u64>,
    },

    /// Draft reasoning and an answer with the LLM
    Generate {
        root: PathBuf,
        #[arg(long)]
        index: usize,
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Save the annotation for a folder into the ledger
    Save {
        root: PathBuf,
        #[arg(long)]
        index: usize,
        #[command(flatten)]
        draft: DraftArgs,
        /// Ask the LLM when no answer is given
        #[arg(long)]
        generate: bool,
        /// Re-saving an earlier entry: continue from the first open folder
        #[arg(long)]
        from_history: bool,
    },

    /// List saved ledger entries by id
    History { root: PathBuf },

    /// Inspect or change configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    SetOutput { folder: PathBuf },
    AddLabel { label: String },
    RenameLabel { current: String, new_label: String },
    RemoveLabel { label: String },
    ResetLabels,
    AddKey { key: String },
    ClearKeys,
    SetApi {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        system_prompt: Option<String>,
        #[arg(long)]
        user_prompt_template: Option<String>,
        #[arg(long)]
        human_prompt_template: Option<String>,
    },
    ResetApi,
}

/// Annotation input shared by `generate` and `save`
#[derive(Args, Debug)]
struct DraftArgs {
    #[arg(long, default_value = "")]
    description: String,
    /// Diagnosis label (repeatable)
    #[arg(long = "diagnosis")]
    diagnoses: Vec<String>,
    /// Segment as "start-end: label" (repeatable)
    #[arg(long = "segment")]
    segments: Vec<String>,
    /// File with one "start-end: label" segment per line
    #[arg(long)]
    segments_file: Option<PathBuf>,
    #[arg(long, default_value = "")]
    thinking: String,
    #[arg(long, default_value = "")]
    answer: String,
}

impl DraftArgs {
    fn into_draft(self) -> Result<AnnotationDraft> {
        let mut segments = SegmentList::new();
        if let Some(path) = &self.segments_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            segments.set(parse_segments(&text));
        }
        for line in &self.segments {
            let Some(segment) = parse_line(line) else {
                bail!("Invalid segment '{}': expected \"start-end: label\"", line);
            };
            segments.add(&segment.start_time, &segment.end_time, &segment.label)?;
        }

        Ok(AnnotationDraft {
            segments: segments.as_slice().to_vec(),
            description: self.description,
            diagnoses: self.diagnoses,
            reasoning: self.thinking,
            answer: self.answer,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = resolve_config_dir(cli.config_dir.as_deref());
    let bootstrap = BootstrapConfig::load(&config_dir);

    let level = bootstrap.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vmark_an={level},vmark_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "vmark-an v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Config directory: {}", config_dir.display());

    let store = ConfigStore::new(config_dir);

    match cli.command {
        Command::Config(cmd) => run_config(cmd, &store, cli.output_folder.as_deref(), &bootstrap),
        command => {
            let output_root =
                resolve_output_folder(cli.output_folder.as_deref(), &bootstrap, &store)
                    .context("Failed to resolve output folder")?;
            info!("Output folder: {}", output_root.display());
            run_dataset(command, &store, &output_root).await
        }
    }
}

async fn run_dataset(command: Command, store: &ConfigStore, output_root: &Path) -> Result<()> {
    let scanner = DatasetScanner::new();
    let open = |root: &Path| {
        Workbench::open(root, output_root, &scanner)
            .with_context(|| format!("Failed to open dataset {}", root.display()))
    };

    match command {
        Command::Scan { root } => {
            let bench = open(&root)?;
            let processed = bench.ledger().processed_videos();
            for (index, folder) in bench.folders().iter().enumerate() {
                let videos = folder.video_files();
                let done = videos.iter().all(|v| processed.contains(v));
                println!(
                    "{:>4}  [{}]  {}  ({})",
                    index,
                    if done { "x" } else { " " },
                    folder.name,
                    videos.join(", ")
                );
            }
        }
        Command::Status { root } => {
            let bench = open(&root)?;
            let summary = bench.summary();
            println!("Dataset:   {}", bench.ledger().dataset_name());
            println!("Ledger:    {}", bench.ledger().ledger_path().display());
            println!(
                "Progress:  {}/{} folders annotated",
                summary.completed_folders, summary.total_folders
            );
            if summary.is_done() {
                println!("Next:      all folders processed");
            } else {
                println!(
                    "Next:      #{} {}",
                    summary.start_index,
                    bench.folders()[summary.start_index].name
                );
            }
        }
        Command::Show { root, index, entry } => {
            let bench = open(&root)?;
            let index = match (index, entry) {
                (Some(index), _) => index,
                (None, Some(id)) => {
                    let item = bench.locate_entry(id)?;
                    match item.folder_index {
                        Some(index) => index,
                        None => bail!(
                            "Video {} of entry {} is not in any folder of this dataset",
                            item.entry.video,
                            id
                        ),
                    }
                }
                (None, None) => {
                    let start = bench.start_index();
                    if start >= bench.folders().len() {
                        println!("All folders processed");
                        return Ok(());
                    }
                    start
                }
            };
            print_folder(&bench.load_folder(index)?);
        }
        Command::Generate { root, index, draft } => {
            let bench = open(&root)?;
            bench.folder(index)?;
            let draft = draft.into_draft()?;
            warn_unknown_diagnoses(store, &draft);
            let client = LlmClient::new(store.load::<ApiConfig>())?;
            let answer = bench.generate(&draft, &client).await?;
            println!("Reasoning:\n{}\n", answer.reasoning);
            println!("Answer:\n{}", answer.answer);
        }
        Command::Save {
            root,
            index,
            draft,
            generate,
            from_history,
        } => {
            let bench = open(&root)?;
            let api = store.load::<ApiConfig>();
            let mut draft = draft.into_draft()?;
            warn_unknown_diagnoses(store, &draft);

            if generate && draft.answer.trim().is_empty() {
                let client = LlmClient::new(api.clone())?;
                let answer = bench.generate(&draft, &client).await?;
                if answer.failed {
                    bail!("LLM call failed: {}", answer.reasoning);
                }
                draft.reasoning = answer.reasoning;
                draft.answer = answer.answer;
            }

            let outcome = bench.save(index, &draft, &api, from_history).await?;
            println!(
                "{} entry {} (duration {:.3}s)",
                if outcome.replaced { "Updated" } else { "Saved" },
                outcome.id,
                outcome.duration
            );
            if outcome.copy.is_none() {
                println!("Warning: video could not be copied to the output folder");
            }
            if outcome.next_index >= bench.folders().len() {
                println!("All folders processed");
            } else {
                println!(
                    "Next folder: #{} {}",
                    outcome.next_index,
                    bench.folders()[outcome.next_index].name
                );
            }
        }
        Command::History { root } => {
            let bench = open(&root)?;
            for item in bench.history()? {
                let location = item
                    .folder_index
                    .map(|i| format!("folder #{}", i))
                    .unwrap_or_else(|| "not in dataset".to_string());
                println!(
                    "{:>4}  {}  {:.3}s  {}",
                    item.entry.id, item.entry.video, item.entry.duration, location
                );
            }
        }
        Command::Config(_) => bail!("config commands do not take a dataset"),
    }
    Ok(())
}

fn run_config(
    cmd: ConfigCommand,
    store: &ConfigStore,
    cli_output: Option<&Path>,
    bootstrap: &BootstrapConfig,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let api = store.load::<ApiConfig>();
            let labels = store.load::<DiagnosisLabelsConfig>();
            let output = resolve_output_folder(cli_output, bootstrap, store)?;
            println!("Config directory: {}", store.dir().display());
            println!("Output folder:    {}", output.display());
            println!("API base:         {}", api.api_base);
            println!("Model:            {}", api.model);
            println!("API keys:         {}", api.api_keys.len());
            println!("Diagnosis labels: {}", labels.diagnosis_labels.join(", "));
        }
        ConfigCommand::SetOutput { folder } => {
            if !folder.is_dir() {
                warn!(folder = %folder.display(), "Output folder does not exist yet; default will be used until it does");
            }
            store.save(&OutputFolderConfig {
                output_folder: Some(folder),
            })?;
        }
        ConfigCommand::AddLabel { label } => {
            update_labels(store, |labels| labels.add(&label))?;
        }
        ConfigCommand::RenameLabel { current, new_label } => {
            update_labels(store, |labels| labels.rename(&current, &new_label))?;
        }
        ConfigCommand::RemoveLabel { label } => {
            update_labels(store, |labels| labels.remove(&label))?;
        }
        ConfigCommand::ResetLabels => {
            update_labels(store, |labels| {
                labels.reset();
                Ok(())
            })?;
        }
        ConfigCommand::AddKey { key } => {
            let mut api = store.load::<ApiConfig>();
            api.add_key(&key)?;
            store.save(&api)?;
        }
        ConfigCommand::ClearKeys => {
            let mut api = store.load::<ApiConfig>();
            api.clear_keys();
            store.save(&api)?;
        }
        ConfigCommand::SetApi {
            api_base,
            model,
            system_prompt,
            user_prompt_template,
            human_prompt_template,
        } => {
            let mut api = store.load::<ApiConfig>();
            if let Some(v) = api_base {
                api.api_base = v;
            }
            if let Some(v) = model {
                api.model = v;
            }
            if let Some(v) = system_prompt {
                api.system_prompt = v;
            }
            if let Some(v) = user_prompt_template {
                api.user_prompt_template = v;
            }
            if let Some(v) = human_prompt_template {
                api.human_prompt_template = v;
            }
            api.validate()?;
            store.save(&api)?;
        }
        ConfigCommand::ResetApi => {
            store.save(&ApiConfig::default())?;
        }
    }
    Ok(())
}

fn update_labels(
    store: &ConfigStore,
    change: impl FnOnce(&mut DiagnosisLabelsConfig) -> vmark_common::Result<()>,
) -> Result<()> {
    let mut labels = store.load::<DiagnosisLabelsConfig>();
    change(&mut labels)?;
    store.save(&labels)?;
    println!("Diagnosis labels: {}", labels.diagnosis_labels.join(", "));
    Ok(())
}

fn warn_unknown_diagnoses(store: &ConfigStore, draft: &AnnotationDraft) {
    let labels = store.load::<DiagnosisLabelsConfig>();
    for diagnosis in &draft.diagnoses {
        if !diagnosis.trim().is_empty() && !labels.contains(diagnosis.trim()) {
            warn!(diagnosis = %diagnosis, "Diagnosis is not one of the configured labels");
        }
    }
}

fn print_folder(folder: &LoadedFolder) {
    println!("Folder #{}: {}", folder.index, folder.name);
    match &folder.video {
        Some(video) => println!("Video:  {}", video.display()),
        None => println!("Video:  (none)"),
    }
    for image in &folder.images {
        println!("Image:  {}", image.display());
    }
    match folder.saved_id {
        Some(id) => println!("Saved as entry {}", id),
        None => {
            println!("Not yet annotated");
            return;
        }
    }

    let draft = &folder.draft;
    println!("\nDescription:\n{}", draft.description);
    if !draft.segments.is_empty() {
        println!("\nSegments:");
        for segment in &draft.segments {
            println!("  {}", segment.to_line());
        }
    }
    println!("\nFinal diagnosis: {}", draft.final_diagnosis());
    println!("\nReasoning:\n{}", draft.reasoning);
    println!("\nAnswer:\n{}", draft.answer);
}
