//! Analysis session - ties the game, the engine and the line aggregator
//! together and decides when a search has to be restarted.

use tracing::{debug, info};

use crate::domain::{DepthInfo, MoveError, PositionError, Square};
use crate::models::analysis::LineAggregator;
use crate::models::engine::EngineControl;
use crate::models::game::GameModel;
use crate::ui::display::render_analysis;
use crate::ui::view_models::AnalysisDisplay;

/// Search settings the user can change while analysing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSettings {
    pub depth: u32,
    pub lines: u32,
    pub threads: u32,
    pub infinite: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            depth: 20,
            lines: 1,
            threads: 1,
            infinite: false,
        }
    }
}

pub struct AnalysisSession<E: EngineControl> {
    game: GameModel,
    engine: E,
    lines: LineAggregator,
    settings: SearchSettings,
    engine_enabled: bool,
}

impl<E: EngineControl> AnalysisSession<E> {
    pub fn new(engine: E, settings: SearchSettings) -> Self {
        let mut session = Self {
            game: GameModel::new(),
            engine,
            lines: LineAggregator::new(settings.lines as usize),
            settings,
            engine_enabled: false,
        };
        session.engine.set_num_threads(session.settings.threads);
        session.engine.set_num_lines(session.settings.lines);
        session.send_position();
        session
    }

    pub fn game(&self) -> &GameModel {
        &self.game
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn engine_enabled(&self) -> bool {
        self.engine_enabled
    }

    pub fn lines(&self) -> &LineAggregator {
        &self.lines
    }

    /// Current analysis, rendered for the side to move of the current position.
    pub fn analysis(&self) -> AnalysisDisplay {
        render_analysis(
            &self.lines,
            self.game.current_half_move(),
            self.game.current_turn(),
            self.engine_enabled,
        )
    }

    pub fn new_game(&mut self) {
        self.game.new_game();
        self.lines.clear();
        self.engine.new_game();
        self.send_position();
        self.restart_search();
    }

    pub fn set_position(&mut self, text: &str) -> Result<(), PositionError> {
        self.game.set_position(text)?;
        self.lines.clear();
        self.send_position();
        self.restart_search();
        Ok(())
    }

    pub fn play_uci(&mut self, mv: &str) -> Result<(), MoveError> {
        self.game.play_uci(mv)?;
        self.position_changed();
        Ok(())
    }

    /// Click on a board square. Returns the move played, if any.
    pub fn click(&mut self, square: Square) -> Result<Option<String>, MoveError> {
        let played = self.game.click(square)?;
        if played.is_some() {
            self.position_changed();
        }
        Ok(played)
    }

    pub fn rotate_board(&mut self) {
        self.game.rotate();
    }

    pub fn set_num_lines(&mut self, lines: u32) {
        self.settings.lines = lines;
        self.lines.set_num_lines(lines as usize);
        self.engine.set_num_lines(lines);
        self.restart_search();
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.settings.depth = depth;
        self.restart_search();
    }

    pub fn set_threads(&mut self, threads: u32) {
        self.settings.threads = threads;
        self.engine.set_num_threads(threads);
    }

    pub fn set_infinite(&mut self, infinite: bool) {
        self.settings.infinite = infinite;
        if !infinite {
            self.engine.stop();
        }
        self.restart_search();
    }

    pub fn set_engine_enabled(&mut self, enabled: bool) {
        self.engine_enabled = enabled;
        if enabled {
            self.restart_search();
        } else {
            self.engine.stop();
            self.lines.clear();
            self.lines.end_search();
        }
        info!(enabled, "engine analysis toggled");
    }

    /// Stop the running search and start a new one with current settings.
    pub fn restart_search(&mut self) {
        if self.engine_enabled {
            self.engine.stop();
            self.start_search();
        }
    }

    /// Feed one line of engine output. Returns true if the analysis changed.
    pub fn handle_engine_output(&mut self, line: &str) -> bool {
        match self.engine.handle_output(line) {
            Some(info) => self.on_depth_info(info),
            None => false,
        }
    }

    pub fn on_depth_info(&mut self, info: DepthInfo) -> bool {
        match self.lines.on_line_update(info) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "dropped line update");
                false
            }
        }
    }

    fn start_search(&mut self) {
        let generation = if self.settings.infinite {
            self.engine.search_infinite()
        } else {
            self.engine.search_with_depth(self.settings.depth)
        };
        self.lines.begin_search(generation);
        debug!(generation, "search started");
    }

    fn send_position(&mut self) {
        self.engine
            .set_position(self.game.base_fen(), self.game.moves());
    }

    fn position_changed(&mut self) {
        self.lines.clear();
        self.send_position();
        self.restart_search();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::STARTPOS_FEN;
    use crate::domain::uci::SearchId;
    use crate::models::engine::SearchTracker;

    /// Records every request instead of talking to a process.
    #[derive(Default)]
    pub(crate) struct RecordingEngine {
        pub commands: Vec<String>,
        pub output: Vec<String>,
        tracker: SearchTracker,
    }

    impl EngineControl for RecordingEngine {
        fn new_game(&mut self) {
            self.commands.push("ucinewgame".to_string());
        }

        fn set_position(&mut self, fen: &str, moves: &[String]) {
            let mut cmd = format!("position fen {}", fen);
            if !moves.is_empty() {
                cmd.push_str(" moves ");
                cmd.push_str(&moves.join(" "));
            }
            self.commands.push(cmd);
        }

        fn set_num_threads(&mut self, threads: u32) {
            self.commands.push(format!("threads {}", threads));
        }

        fn set_num_lines(&mut self, lines: u32) {
            self.commands.push(format!("multipv {}", lines));
        }

        fn search_with_depth(&mut self, depth: u32) -> SearchId {
            self.commands.push(format!("go depth {}", depth));
            self.tracker.issue()
        }

        fn search_infinite(&mut self) -> SearchId {
            self.commands.push("go infinite".to_string());
            self.tracker.issue()
        }

        fn stop(&mut self) {
            if self.tracker.is_searching() {
                self.commands.push("stop".to_string());
            }
        }

        fn handle_output(&mut self, line: &str) -> Option<DepthInfo> {
            self.output.push(line.to_string());
            self.tracker.observe(line)
        }

        fn recent_output(&self) -> Vec<String> {
            self.output.clone()
        }
    }

    fn session(lines: u32) -> AnalysisSession<RecordingEngine> {
        let settings = SearchSettings {
            lines,
            ..SearchSettings::default()
        };
        AnalysisSession::new(RecordingEngine::default(), settings)
    }

    fn texts(session: &AnalysisSession<RecordingEngine>) -> Vec<String> {
        session.analysis().lines.into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_startup_configures_engine() {
        let s = session(2);
        assert_eq!(
            s.engine().commands,
            vec![
                "threads 1".to_string(),
                "multipv 2".to_string(),
                format!("position fen {}", STARTPOS_FEN),
            ]
        );
        assert!(!s.engine_enabled());
    }

    #[test]
    fn test_enable_starts_depth_search() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        assert_eq!(s.engine().commands.last().unwrap(), "go depth 20");
        assert!(s.handle_engine_output("info depth 20 score cp 31 pv e2e4 e7e5"));
        assert_eq!(texts(&s), vec!["[+0.31] 1. e2e4 e7e5"]);
    }

    #[test]
    fn test_out_of_order_lines() {
        let mut s = session(3);
        s.set_engine_enabled(true);
        s.handle_engine_output("info depth 8 multipv 2 score cp 20 pv d2d4");
        s.handle_engine_output("info depth 8 multipv 1 score cp 30 pv e2e4");
        s.handle_engine_output("info depth 8 multipv 3 score cp 10 pv c2c4");
        assert_eq!(
            texts(&s),
            vec!["[+0.30] 1. e2e4", "[+0.20] 1. d2d4", "[+0.10] 1. c2c4"]
        );
    }

    #[test]
    fn test_set_num_lines_restarts_and_drops_stragglers() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.handle_engine_output("info depth 8 score cp 30 pv e2e4");

        s.set_num_lines(2);
        let cmds = &s.engine().commands;
        let tail: Vec<&str> = cmds[cmds.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["multipv 2", "stop", "go depth 20"]);
        assert!(s.analysis().lines.is_empty());

        // still from the stopped search
        assert!(!s.handle_engine_output("info depth 9 score cp 33 pv e2e4"));
        assert!(!s.handle_engine_output("bestmove e2e4"));
        assert!(s.handle_engine_output("info depth 1 multipv 2 score cp 12 pv d2d4"));
        assert_eq!(texts(&s), vec!["[+0.12] 1. d2d4"]);
    }

    #[test]
    fn test_out_of_range_line_dropped() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        assert!(!s.handle_engine_output("info depth 4 multipv 2 score cp 12 pv d2d4"));
        assert_eq!(s.lines().num_received_lines(), 0);
    }

    #[test]
    fn test_play_move_sends_moves_and_restarts() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.play_uci("e2e4").unwrap();
        let cmds = &s.engine().commands;
        let tail: Vec<&str> = cmds[cmds.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                &format!("position fen {} moves e2e4", STARTPOS_FEN)[..],
                "stop",
                "go depth 20",
            ]
        );

        // black to move now: engine scores are flipped for display
        s.handle_engine_output("bestmove e2e4");
        s.handle_engine_output("info depth 10 score cp 25 pv e7e5 g1f3");
        assert_eq!(texts(&s), vec!["[-0.25] 1... e7e5 2. g1f3"]);
    }

    #[test]
    fn test_invalid_position_rejected() {
        let mut s = session(1);
        let before = s.engine().commands.len();
        assert!(s.set_position("8/8/8 w - - 0 1").is_err());
        assert_eq!(s.engine().commands.len(), before);
        assert_eq!(s.game().base_fen(), STARTPOS_FEN);
    }

    #[test]
    fn test_disabled_engine_does_not_search() {
        let mut s = session(1);
        s.set_depth(12);
        s.set_position("4k3/8/8/8/8/8/8/4K3 b - - 0 30").unwrap();
        assert!(!s.engine().commands.iter().any(|c| c.starts_with("go")));
        assert_eq!(s.settings().depth, 12);
    }

    #[test]
    fn test_infinite_search() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.set_infinite(true);
        assert_eq!(s.engine().commands.last().unwrap(), "go infinite");
        s.set_infinite(false);
        assert_eq!(s.engine().commands.last().unwrap(), "go depth 20");
    }

    #[test]
    fn test_disable_clears_lines() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.handle_engine_output("info depth 8 score cp 30 pv e2e4");
        s.set_engine_enabled(false);
        assert_eq!(s.engine().commands.last().unwrap(), "stop");
        let analysis = s.analysis();
        assert!(analysis.lines.is_empty());
        assert!(analysis.eval_bar.is_none());
    }

    #[test]
    fn test_straggler_after_disable_is_dropped() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.set_engine_enabled(false);
        s.play_uci("e2e4").unwrap();

        // the stopped search has not answered bestmove yet
        assert!(!s.handle_engine_output("info depth 20 score cp 30 pv d2d4 d7d5"));
        s.set_engine_enabled(true);
        assert!(s.analysis().lines.is_empty());

        assert!(!s.handle_engine_output("bestmove d2d4"));
        assert!(s.handle_engine_output("info depth 1 score cp -20 pv c7c5"));
        assert_eq!(texts(&s), vec!["[+0.20] 1... c7c5"]);
    }

    #[test]
    fn test_enable_twice_stops_before_second_go() {
        let mut s = session(1);
        s.set_engine_enabled(true);
        s.set_engine_enabled(true);
        let cmds = &s.engine().commands;
        let tail: Vec<&str> = cmds[cmds.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["go depth 20", "stop", "go depth 20"]);
        for pair in cmds.windows(2) {
            assert!(!(pair[0].starts_with("go") && pair[1].starts_with("go")));
        }
    }

    #[test]
    fn test_new_game() {
        let mut s = session(1);
        s.play_uci("d2d4").unwrap();
        s.new_game();
        assert!(s.game().moves().is_empty());
        assert!(s.engine().commands.contains(&"ucinewgame".to_string()));
        assert_eq!(
            s.engine().commands.last().unwrap(),
            &format!("position fen {}", STARTPOS_FEN)
        );
    }

    #[test]
    fn test_click_move_updates_engine() {
        let mut s = session(1);
        let e2: Square = "e2".parse().unwrap();
        let e4: Square = "e4".parse().unwrap();
        assert_eq!(s.click(e2), Ok(None));
        assert_eq!(s.click(e4), Ok(Some("e2e4".to_string())));
        assert_eq!(
            s.engine().commands.last().unwrap(),
            &format!("position fen {} moves e2e4", STARTPOS_FEN)
        );
    }
}
