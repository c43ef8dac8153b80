use anyhow::{Context, Result};
use clap::Parser;
use rehearsal_core::runtime::RequestDispatcher;
use rehearsal_core::service::{ClientConfig, HttpInterviewClient, InterviewService};
use rehearsal_core::transcription::{SpeechSource, TranscriptEvent, TranscriptionAdapter, UnavailableSpeech};
use rehearsal_core::{DialogueController, SectionRecord};
use rehearsal_service::commands::{HELP, UserInput, parse_input};
use rehearsal_service::config::{Config, SpeechProvider};
use rehearsal_service::render::Renderer;
use rehearsal_service::review::{ReviewResult, spawn_review};
use rehearsal_service::sections;
use rehearsal_transcriber::RealtimeSpeech;
use rehearsal_types::CvSections;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(version, about = "Rehearse interview questions about your CV")]
struct Cli {
    /// JSON file of CV sections, as returned by the CV ingestion endpoint
    #[arg(long, conflicts_with = "cv", required_unless_present_any = ["cv", "list_devices"])]
    sections: Option<PathBuf>,
    /// PDF CV to upload to the interview service for section extraction
    #[arg(long)]
    cv: Option<PathBuf>,
    /// Section number to start with, skipping the picker
    #[arg(long)]
    section: Option<usize>,
    /// Print the available microphones and exit
    #[arg(long)]
    list_devices: bool,
}

enum SessionEnd {
    Back,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    if args.list_devices {
        println!("{}", rehearsal_native_utils::device::get_available_inputs()?);
        return Ok(());
    }

    // --- 3. Interview Service ---
    let client_config = ClientConfig::builder()
        .with_base_url(&config.interview_api_url)
        .with_timeout(config.request_timeout)
        .build();
    let client = Arc::new(HttpInterviewClient::new(client_config)?);
    if let Err(e) = client.health().await {
        tracing::warn!("Interview service at {} is not healthy: {}", client.base_url(), e);
    }

    // --- 4. Load Sections ---
    let cv_sections = match (&args.sections, &args.cv) {
        (Some(path), _) => sections::load_sections(path)?,
        (None, Some(cv)) => client.parse_cv(cv).await.context("Failed to parse CV")?,
        (None, None) => anyhow::bail!("either --sections or --cv is required"),
    };
    let available = cv_sections.flatten();
    tracing::info!("Loaded {} CV sections", available.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut preselected = args.section;

    // --- 5. Pick a section, interview, repeat ---
    loop {
        let section = match preselected.take() {
            Some(number) => sections::choose(&available, &number.to_string())
                .with_context(|| format!("There is no section number {number}"))?
                .clone(),
            None => match pick_section(&cv_sections, &mut lines).await? {
                Some(section) => section,
                None => break,
            },
        };

        match run_session(section, client.clone(), &config, &mut lines).await? {
            SessionEnd::Back => continue,
            SessionEnd::Quit => break,
        }
    }

    tracing::info!("Shutting down...");
    Ok(())
}

/// Prompts until the user picks a valid section. `None` means quit.
async fn pick_section(cv_sections: &CvSections, lines: &mut InputLines) -> Result<Option<SectionRecord>> {
    let available = cv_sections.flatten();
    println!("\n{}", sections::listing(cv_sections));
    loop {
        println!("Pick a section number (or /quit):");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        if parse_input(&line, false) == UserInput::Quit {
            return Ok(None);
        }
        match sections::choose(&available, &line) {
            Some(section) => return Ok(Some(section.clone())),
            None => println!("'{}' is not a section number.", line.trim()),
        }
    }
}

fn speech_source(config: &Config) -> Result<Box<dyn SpeechSource>> {
    match config.speech_provider {
        SpeechProvider::None => Ok(Box::new(UnavailableSpeech)),
        SpeechProvider::OpenAI => {
            let mut builder =
                rehearsal_transcriber::Config::builder().with_model(&config.transcription_model);
            if let Some(key) = &config.openai_api_key {
                builder = builder.with_api_key(key);
            }
            let speech = RealtimeSpeech::new(builder.build(), config.input_device.clone())?;
            Ok(Box::new(speech))
        }
    }
}

async fn run_session(
    section: SectionRecord,
    client: Arc<HttpInterviewClient>,
    config: &Config,
    lines: &mut InputLines,
) -> Result<SessionEnd> {
    println!("\n=== {} ===", section.title);
    println!("{HELP}\n");

    let (transcript_tx, mut transcript_rx) = mpsc::unbounded_channel::<TranscriptEvent>();
    let transcription = TranscriptionAdapter::new(speech_source(config)?, transcript_tx);
    let mut controller = DialogueController::new(section, transcription);
    let service: Arc<dyn InterviewService> = client.clone();
    let (dispatcher, mut replies) = RequestDispatcher::channel(service);
    let mut dispatcher = dispatcher.with_timeout(config.request_timeout);
    let (review_tx, mut reviews) = mpsc::unbounded_channel::<ReviewResult>();
    let mut review = None;
    let mut snapshots = controller.subscribe();
    let mut renderer = Renderer::default();

    dispatcher.dispatch(controller.start()?);

    let end = loop {
        flush(&mut snapshots, &mut renderer);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break SessionEnd::Quit;
                };
                let snapshot = controller.snapshot();
                let dictation = snapshot.capturing || !snapshot.pending_capture_text.is_empty();
                match parse_input(&line, dictation) {
                    UserInput::Answer(text) => match controller.submit_answer(&text) {
                        Ok(command) => dispatcher.dispatch(command),
                        Err(e) => println!("! {e}"),
                    },
                    UserInput::ToggleMic => {
                        // Failures to start are reported through the snapshot.
                        if let Err(e) = controller.toggle_capture() {
                            if !controller.snapshot().last_error.is_some_and(|last| last == e) {
                                println!("! {e}");
                            }
                        }
                    }
                    UserInput::Retry => match controller.retry() {
                        Ok(command) => dispatcher.dispatch(command),
                        Err(e) => println!("! {e}"),
                    },
                    UserInput::Review => {
                        println!("Fetching review points...");
                        let handle =
                            spawn_review(client.clone(), controller.section().clone(), review_tx.clone());
                        if let Some(previous) = review.replace(handle) {
                            previous.abort();
                        }
                    }
                    UserInput::Back => break SessionEnd::Back,
                    UserInput::Quit => break SessionEnd::Quit,
                    UserInput::Help => println!("{HELP}"),
                    UserInput::Unknown(command) => println!("Unknown command '/{command}'. Type /help."),
                    UserInput::Empty => {}
                }
            }
            Some(reply) = replies.recv() => {
                controller.handle_reply(reply.ticket, reply.result);
            }
            Some(event) = transcript_rx.recv() => {
                controller.handle_transcript(event);
            }
            Some(result) = reviews.recv() => {
                review = None;
                match result {
                    Ok(points) => {
                        for point in points {
                            println!("  - {point}");
                        }
                    }
                    Err(e) => println!("! {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break SessionEnd::Quit;
            }
        }
    };

    if let Some(handle) = review.take() {
        handle.abort();
    }
    if let Some(cancel) = controller.end() {
        dispatcher.dispatch(cancel);
    }
    flush(&mut snapshots, &mut renderer);
    Ok(end)
}

fn flush(
    snapshots: &mut tokio::sync::watch::Receiver<rehearsal_core::Snapshot>,
    renderer: &mut Renderer,
) {
    if !snapshots.has_changed().unwrap_or(false) {
        return;
    }
    let snapshot = snapshots.borrow_and_update().clone();
    for line in renderer.render(&snapshot) {
        println!("{line}");
    }
}
