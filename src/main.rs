use std::{
    path::PathBuf,
    process::ExitCode,
};

use clap::{
    Args,
    Parser,
    Subcommand,
};
use tracing::{
    debug,
    error,
};
use tracing_subscriber::EnvFilter;
use tunedeck::{
    anki::{
        CardLayoutConfig,
        SideLayout,
    },
    core::{
        settings::PipelineSettings,
        tasks::{
            TaskManager,
            TaskResult,
        },
    },
    persistence::{
        load_json_or_default,
        save_json,
        SETTINGS_FILE,
    },
};

/// Convert, organize and tag traditional tune recordings with thesession.org
/// metadata, then build an Anki deck from them.
#[derive(Parser, Debug)]
#[command(name = "tunedeck", version)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert audio files to mp3 using ffmpeg
    Convert {
        /// Directory containing audio files to convert
        input_dir: PathBuf,
        /// Output directory for mp3 files [default: mp3_files]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Encoder program to run
        #[arg(long, env = "TUNEDECK_ENCODER")]
        encoder: Option<String>,
    },

    /// Organize mp3 files into rhythm folders using thesession.org metadata
    Organize {
        /// Directory containing mp3 files to organize
        input_dir: PathBuf,
        /// Output directory [default: export]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate an Anki .apkg file from organized music files
    GenerateCards {
        /// Directory containing organized music files
        music_dir: PathBuf,
        #[command(flatten)]
        deck: DeckArgs,
    },

    /// Convert, organize and generate the deck in one go
    All {
        /// Directory containing audio files to process (falls back to the saved one)
        input_dir: Option<PathBuf>,
        /// Intermediate directory for mp3 files [default: mp3_files]
        #[arg(long)]
        mp3_dir: Option<PathBuf>,
        /// Directory for organized files [default: export]
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Don't create missing mp3/export directories up front
        #[arg(long)]
        skip_validation: bool,
        #[command(flatten)]
        deck: DeckArgs,
    },

    /// Print the effective settings as JSON
    Settings,
}

#[derive(Args, Debug)]
struct DeckArgs {
    /// Output .apkg file [default: irish_music.apkg]
    #[arg(long)]
    output: Option<PathBuf>,
    /// Deck name [default: Irish Traditional Music]
    #[arg(long)]
    deck_name: Option<String>,
    /// Keep cards in original order instead of randomizing
    #[arg(long)]
    no_randomize: bool,
    /// Fields on the card front, comma separated from name,audio,key,rhythm
    #[arg(long, value_name = "FIELDS")]
    front: Option<SideLayout>,
    /// Fields on the card back, comma separated from name,audio,key,rhythm
    #[arg(long, value_name = "FIELDS")]
    back: Option<SideLayout>,
    /// Remember these options for later runs
    #[arg(long)]
    save_settings: bool,
}

impl DeckArgs {
    fn apply(&self, settings: &mut PipelineSettings) {
        if let Some(ref output) = self.output {
            settings.output_file = output.clone();
        }
        if let Some(ref deck_name) = self.deck_name {
            settings.deck_name = deck_name.clone();
        }
        if self.no_randomize {
            settings.randomize = false;
        }
        let front = self.front.unwrap_or(settings.layout.front);
        let back = self.back.unwrap_or(settings.layout.back);
        settings.layout = CardLayoutConfig::new(front, back);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn persist(settings: &PipelineSettings) {
    match save_json(settings, SETTINGS_FILE) {
        Ok(()) => println!("Settings saved."),
        Err(e) => error!("Failed to save settings: {}", e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings: PipelineSettings = load_json_or_default(SETTINGS_FILE);
    debug!("Loaded settings: {:?}", settings);

    let manager = TaskManager::new();

    match cli.command {
        Command::Convert { input_dir, output, encoder } => {
            let output = output.unwrap_or_else(|| settings.mp3_dir.clone());
            let encoder = encoder.unwrap_or_else(|| settings.encoder.clone());
            manager.normalize(input_dir, output, encoder);
        }
        Command::Organize { input_dir, output } => {
            let output = output.unwrap_or_else(|| settings.export_dir.clone());
            manager.organize(input_dir, output);
        }
        Command::GenerateCards { music_dir, deck } => {
            deck.apply(&mut settings);
            if deck.save_settings {
                persist(&settings);
            }
            manager.generate_deck(
                music_dir,
                settings.output_file.clone(),
                settings.deck_name.clone(),
                settings.randomize,
                settings.layout,
            );
        }
        Command::All { input_dir, mp3_dir, export_dir, skip_validation, deck } => {
            if let Some(dir) = mp3_dir {
                settings.mp3_dir = dir;
            }
            if let Some(dir) = export_dir {
                settings.export_dir = dir;
            }
            if let Some(dir) = input_dir {
                settings.input_dir = Some(dir);
            }
            deck.apply(&mut settings);

            let Some(input_dir) = settings.input_dir.clone() else {
                error!("No input directory given and none saved");
                eprintln!("Error: an input directory is required");
                return ExitCode::FAILURE;
            };
            if deck.save_settings {
                persist(&settings);
            }
            manager.run_all(input_dir, settings, skip_validation);
        }
        Command::Settings => {
            return match serde_json::to_string_pretty(&settings) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Failed to serialize settings: {}", e);
                    ExitCode::FAILURE
                }
            };
        }
    }

    let Some(completion) = manager.wait_for_completion(|line| println!("{}", line)) else {
        return ExitCode::FAILURE;
    };

    match completion {
        TaskResult::Normalized(Err(ref e))
        | TaskResult::Organized(Err(ref e))
        | TaskResult::DeckGenerated(Err(ref e))
        | TaskResult::PipelineFinished(Err(ref e)) => eprintln!("Error: {}", e),
        _ => {}
    }

    if completion.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
