//! Engine state model - manages UCI engine lifecycle and analysis output.
//!
//! Architecture:
//! - Engine I/O runs on OS threads (reader/writer)
//! - The reader forwards every stdout line into the application's event
//!   channel, so all state changes happen on the application thread
//! - `SearchTracker` attributes analysis output to the `go` request it
//!   belongs to, so stragglers from a stopped search can be discarded

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::domain::uci::{DepthInfo, SearchId, UciCommand, UciInfo, UciOutputKind};

/// Maximum number of output lines to keep in history
const MAX_OUTPUT_LINES: usize = 100;

/// Messages sent from the engine reader thread to the application loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A line of output from the engine
    Output(String),
    /// Engine process exited
    Exited,
    /// Error occurred
    Error(String),
}

/// What the analysis session needs from an engine.
pub trait EngineControl {
    fn new_game(&mut self);
    fn set_position(&mut self, fen: &str, moves: &[String]);
    fn set_num_threads(&mut self, threads: u32);
    fn set_num_lines(&mut self, lines: u32);
    fn search_with_depth(&mut self, depth: u32) -> SearchId;
    fn search_infinite(&mut self) -> SearchId;
    fn stop(&mut self);
    /// Interpret one line of engine output. Returns an analysis update
    /// attributed to its search, if the line carries one.
    fn handle_output(&mut self, line: &str) -> Option<DepthInfo>;
    /// Recent raw output, oldest first.
    fn recent_output(&self) -> Vec<String>;
}

/// Tracks which `go` requests are still producing output.
///
/// Engines answer every `go` with exactly one `bestmove`, also after `stop`,
/// so output always belongs to the oldest search that has not yet reported
/// its best move.
#[derive(Debug, Default)]
pub struct SearchTracker {
    last_issued: SearchId,
    outstanding: VecDeque<SearchId>,
}

impl SearchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `go` request and return its id.
    pub fn issue(&mut self) -> SearchId {
        self.last_issued += 1;
        self.outstanding.push_back(self.last_issued);
        self.last_issued
    }

    /// The search currently producing output.
    pub fn producing(&self) -> Option<SearchId> {
        self.outstanding.front().copied()
    }

    pub fn is_searching(&self) -> bool {
        !self.outstanding.is_empty()
    }

    pub fn last_issued(&self) -> SearchId {
        self.last_issued
    }

    /// Attribute an engine output line. Returns the analysis update, if any.
    pub fn observe(&mut self, line: &str) -> Option<DepthInfo> {
        match UciOutputKind::parse(line) {
            UciOutputKind::Info(rest) => {
                let Some(generation) = self.producing() else {
                    debug!(line, "analysis output with no search running");
                    return None;
                };
                DepthInfo::from_info(UciInfo::parse(&rest), generation)
            }
            UciOutputKind::BestMove(best) => {
                let finished = self.outstanding.pop_front();
                debug!(?finished, %best, "search finished");
                None
            }
            _ => None,
        }
    }

    /// Forget every outstanding search, e.g. after the engine exited.
    pub fn reset(&mut self) {
        self.outstanding.clear();
    }
}

/// The engine model - owns the engine process and its command channel
pub struct EngineModel {
    /// Whether the engine is currently running
    running: bool,
    /// Recent output lines from the engine (for display)
    output_lines: VecDeque<String>,
    search: SearchTracker,
    /// Channel sender for commands to engine writer thread
    command_sender: Option<Sender<String>>,
    /// Handle to the engine process
    process: Option<Child>,
}

impl EngineModel {
    pub fn new() -> Self {
        Self {
            running: false,
            output_lines: VecDeque::new(),
            search: SearchTracker::new(),
            command_sender: None,
            process: None,
        }
    }

    /// Check if the engine is currently running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Check if the engine is currently analyzing
    pub fn is_analyzing(&self) -> bool {
        self.search.is_searching()
    }

    /// Recent raw output, oldest first
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    /// Spawn the engine process and put it in UCI mode.
    ///
    /// Output lines are delivered to `events` from a reader thread.
    pub fn start<E>(&mut self, command: &str, args: &[String], events: Sender<E>) -> Result<()>
    where
        E: From<EngineEvent> + Send + 'static,
    {
        if self.running {
            return Ok(());
        }

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start engine `{}`", command))?;

        let stdin = child.stdin.take().context("failed to open engine stdin")?;
        let stdout = child.stdout.take().context("failed to open engine stdout")?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<String>();

        // Reader thread (OS thread for blocking I/O)
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(text) => {
                        if events.send(EngineEvent::Output(text).into()).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = events.send(EngineEvent::Error(e.to_string()).into());
                        break;
                    }
                }
            }
            let _ = events.send(EngineEvent::Exited.into());
        });

        // Writer thread (OS thread for blocking I/O)
        thread::spawn(move || {
            let mut writer = stdin;
            while let Ok(cmd) = cmd_rx.recv() {
                if writeln!(writer, "{}", cmd).and_then(|_| writer.flush()).is_err() {
                    break;
                }
            }
        });

        self.process = Some(child);
        self.command_sender = Some(cmd_tx);
        self.running = true;
        info!(command, "engine started");

        self.send_command(UciCommand::Uci);
        self.send_command(UciCommand::IsReady);
        Ok(())
    }

    /// Record an event from the reader thread. Returns an analysis update for
    /// output lines that carry one.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<DepthInfo> {
        match event {
            EngineEvent::Output(line) => self.handle_output(&line),
            EngineEvent::Exited => {
                warn!("engine exited");
                self.running = false;
                self.search.reset();
                self.push_output("[Engine exited]".to_string());
                None
            }
            EngineEvent::Error(e) => {
                error!(error = %e, "engine output error");
                self.push_output(format!("[Error: {}]", e));
                None
            }
        }
    }

    /// Stop the engine process
    pub fn close(&mut self) {
        if !self.running {
            return;
        }

        if self.search.is_searching() {
            self.send_command(UciCommand::Stop);
        }
        self.send_command(UciCommand::Quit);

        // Dropping the sender ends the writer thread
        self.command_sender = None;

        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }

        self.running = false;
        self.search.reset();
        info!("engine stopped");
    }

    /// Send a UCI command to the engine
    fn send_command(&self, cmd: UciCommand) {
        let cmd_str = cmd.to_uci_string();
        debug!(command = %cmd_str, "to engine");
        if let Some(tx) = &self.command_sender {
            let _ = tx.send(cmd_str);
        }
    }

    fn push_output(&mut self, line: String) {
        self.output_lines.push_back(line);
        while self.output_lines.len() > MAX_OUTPUT_LINES {
            self.output_lines.pop_front();
        }
    }
}

impl EngineControl for EngineModel {
    fn new_game(&mut self) {
        self.send_command(UciCommand::UciNewGame);
    }

    fn set_position(&mut self, fen: &str, moves: &[String]) {
        self.send_command(UciCommand::Position {
            fen: Some(fen.to_string()),
            moves: moves.to_vec(),
        });
    }

    fn set_num_threads(&mut self, threads: u32) {
        self.send_command(UciCommand::threads(threads));
    }

    fn set_num_lines(&mut self, lines: u32) {
        self.send_command(UciCommand::multi_pv(lines));
    }

    fn search_with_depth(&mut self, depth: u32) -> SearchId {
        self.send_command(UciCommand::GoDepth(depth));
        self.search.issue()
    }

    fn search_infinite(&mut self) -> SearchId {
        self.send_command(UciCommand::GoInfinite);
        self.search.issue()
    }

    fn stop(&mut self) {
        if self.search.is_searching() {
            self.send_command(UciCommand::Stop);
        }
    }

    fn handle_output(&mut self, line: &str) -> Option<DepthInfo> {
        self.push_output(line.to_string());
        self.search.observe(line)
    }

    fn recent_output(&self) -> Vec<String> {
        self.output_lines().map(str::to_string).collect()
    }
}

impl Default for EngineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EngineModel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::uci::Score;

    #[test]
    fn test_tracker_tags_output_with_producing_search() {
        let mut tracker = SearchTracker::new();
        let first = tracker.issue();
        let info = tracker
            .observe("info depth 3 multipv 2 score cp 12 pv e2e4")
            .unwrap();
        assert_eq!(info.generation, first);
        assert_eq!(info.line_id, 2);
        assert_eq!(info.score, Score::Centipawns(12));
    }

    #[test]
    fn test_tracker_stragglers_belong_to_stopped_search() {
        let mut tracker = SearchTracker::new();
        let first = tracker.issue();
        // stop + new go before the engine has answered the first one
        let second = tracker.issue();
        assert_ne!(first, second);

        let straggler = tracker.observe("info depth 9 score cp 1 pv d2d4").unwrap();
        assert_eq!(straggler.generation, first);

        assert!(tracker.observe("bestmove d2d4").is_none());
        let fresh = tracker.observe("info depth 1 score cp 5 pv e2e4").unwrap();
        assert_eq!(fresh.generation, second);
    }

    #[test]
    fn test_tracker_ignores_output_when_idle() {
        let mut tracker = SearchTracker::new();
        assert!(tracker.observe("info depth 1 score cp 5 pv e2e4").is_none());
        tracker.issue();
        tracker.observe("bestmove e2e4");
        assert!(!tracker.is_searching());
        assert!(tracker.observe("info depth 1 score cp 5 pv e2e4").is_none());
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = SearchTracker::new();
        tracker.issue();
        tracker.issue();
        tracker.reset();
        assert_eq!(tracker.producing(), None);
        assert_eq!(tracker.last_issued(), 2);
    }

    #[test]
    fn test_model_without_process() {
        let mut engine = EngineModel::new();
        assert!(!engine.is_running());
        let id = engine.search_with_depth(5);
        assert!(engine.is_analyzing());
        let update = engine.handle_event(EngineEvent::Output(
            "info depth 5 score mate 2 pv h5f7".to_string(),
        ));
        assert_eq!(update.map(|u| u.generation), Some(id));
        engine.handle_event(EngineEvent::Exited);
        assert!(!engine.is_analyzing());
        assert_eq!(engine.output_lines().last(), Some("[Engine exited]"));
    }

    #[test]
    fn test_output_history_is_bounded() {
        let mut engine = EngineModel::new();
        for i in 0..(MAX_OUTPUT_LINES + 10) {
            engine.handle_output(&format!("info string {}", i));
        }
        assert_eq!(engine.output_lines().count(), MAX_OUTPUT_LINES);
        assert_eq!(engine.output_lines().next(), Some("info string 10"));
        assert_eq!(engine.recent_output().len(), MAX_OUTPUT_LINES);
        assert_eq!(engine.recent_output()[0], "info string 10");
    }
}
