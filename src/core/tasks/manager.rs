use std::{
    path::PathBuf,
    sync::mpsc,
    thread,
};

use tracing::error;

use super::TaskResult;
use crate::{
    anki::{
        generate_deck,
        CardLayoutConfig,
    },
    audio::{
        normalize,
        FfmpegEncoder,
    },
    core::{
        pipeline::run_all,
        settings::PipelineSettings,
        ProgressLog,
    },
    organizer::organize,
    thesession::TheSessionResolver,
};

/// Runs pipeline stages on a background thread, one thread per stage.
///
/// Progress arrives as [`TaskResult::Log`] lines, then one completion message.
pub struct TaskManager {
    receiver: mpsc::Receiver<TaskResult>,
    sender: mpsc::Sender<TaskResult>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();

        Self { receiver, sender }
    }

    pub fn poll_results(&mut self) -> Vec<TaskResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }

        results
    }

    /// Blocks until a stage completes, handing every log line to `on_log`.
    pub fn wait_for_completion(&self, mut on_log: impl FnMut(String)) -> Option<TaskResult> {
        while let Ok(result) = self.receiver.recv() {
            if result.is_completion() {
                return Some(result);
            }
            if let TaskResult::Log(line) = result {
                on_log(line);
            }
        }
        None
    }

    fn task_context(&self) -> (mpsc::Sender<TaskResult>, ProgressLog) {
        let sender = self.sender.clone();
        let log_sender = sender.clone();
        let log = ProgressLog::new(Box::new(move |line| {
            let _ = log_sender.send(TaskResult::Log(line));
        }));
        (sender, log)
    }

    pub fn normalize(&self, input_dir: PathBuf, output_dir: PathBuf, encoder_program: String) {
        let (sender, log) = self.task_context();

        thread::spawn(move || {
            let encoder = FfmpegEncoder::new(encoder_program);
            let result = normalize(&input_dir, &output_dir, &encoder, &log).map_err(|e| {
                error!("Conversion failed: {}", e);
                e.to_string()
            });

            let _ = sender.send(TaskResult::Normalized(result));
        });
    }

    pub fn organize(&self, input_dir: PathBuf, export_dir: PathBuf) {
        let (sender, log) = self.task_context();

        thread::spawn(move || {
            let result = TheSessionResolver::new()
                .and_then(|resolver| organize(&input_dir, &export_dir, &resolver, &log))
                .map_err(|e| {
                    error!("Organization failed: {}", e);
                    e.to_string()
                });

            let _ = sender.send(TaskResult::Organized(result));
        });
    }

    pub fn generate_deck(
        &self,
        export_dir: PathBuf,
        output_file: PathBuf,
        deck_name: String,
        randomize: bool,
        layout: CardLayoutConfig,
    ) {
        let (sender, log) = self.task_context();

        thread::spawn(move || {
            let result = generate_deck(&export_dir, &output_file, &deck_name, randomize, &layout, &log)
                .map_err(|e| {
                    error!("Deck generation failed: {}", e);
                    e.to_string()
                });

            let _ = sender.send(TaskResult::DeckGenerated(result));
        });
    }

    pub fn run_all(&self, input_dir: PathBuf, settings: PipelineSettings, skip_validation: bool) {
        let (sender, log) = self.task_context();

        thread::spawn(move || {
            let encoder = FfmpegEncoder::new(settings.encoder.clone());
            let result = TheSessionResolver::new()
                .and_then(|resolver| {
                    run_all(&input_dir, &settings, skip_validation, &encoder, &resolver, &log)
                })
                .map_err(|e| {
                    error!("Pipeline failed: {}", e);
                    e.to_string()
                });

            let _ = sender.send(TaskResult::PipelineFinished(result));
        });
    }
}
