//! Application loop: one thread owns all state and consumes events from the
//! engine reader and the stdin reader through a single channel.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::Square;
use crate::models::engine::{EngineControl, EngineEvent, EngineModel};
use crate::models::session::AnalysisSession;
use crate::ui::display::{move_list, render_board, render_eval_bar};

const EVAL_BAR_WIDTH: usize = 40;

const HELP: &str = "\
commands:
  fen <position>     set a position (six FEN fields)
  new                start a new game
  move <uci>         play a move, e.g. e2e4 or e7e8q
  click <square>     select a piece or its destination, e.g. click e2
  flip               rotate the board
  lines <n>          number of analysis lines
  depth <n>          search depth
  threads <n>        engine threads
  infinite on|off    search without a depth limit
  engine on|off      start or stop analysis
  board | moves | show | raw
  help | quit";

/// Everything the application thread reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Engine(EngineEvent),
    Input(String),
    InputClosed,
}

impl From<EngineEvent> for AppEvent {
    fn from(event: EngineEvent) -> Self {
        AppEvent::Engine(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fen(String),
    New,
    Move(String),
    Click(Square),
    Flip,
    Lines(u32),
    Depth(u32),
    Threads(u32),
    Infinite(bool),
    Engine(bool),
    Board,
    Moves,
    Show,
    Raw,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' expects a number of at least 1")]
    BadNumber(&'static str),
    #[error("'{0}' expects on or off")]
    BadSwitch(&'static str),
    #[error("'{0}' is not a square")]
    BadSquare(String),
}

fn positive(name: &'static str, arg: Option<&str>) -> Result<u32, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(name))?;
    match arg.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CommandError::BadNumber(name)),
    }
}

fn switch(name: &'static str, arg: Option<&str>) -> Result<bool, CommandError> {
    match arg.ok_or(CommandError::MissingArgument(name))? {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(CommandError::BadSwitch(name)),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        let command = match name {
            "fen" => Command::Fen(rest.ok_or(CommandError::MissingArgument("fen"))?.to_string()),
            "new" => Command::New,
            "move" => Command::Move(rest.ok_or(CommandError::MissingArgument("move"))?.to_string()),
            "click" => {
                let arg = rest.ok_or(CommandError::MissingArgument("click"))?;
                let square = arg
                    .parse()
                    .map_err(|_| CommandError::BadSquare(arg.to_string()))?;
                Command::Click(square)
            }
            "flip" => Command::Flip,
            "lines" => Command::Lines(positive("lines", rest)?),
            "depth" => Command::Depth(positive("depth", rest)?),
            "threads" => Command::Threads(positive("threads", rest)?),
            "infinite" => Command::Infinite(switch("infinite", rest)?),
            "engine" => Command::Engine(switch("engine", rest)?),
            "board" => Command::Board,
            "moves" => Command::Moves,
            "show" => Command::Show,
            "raw" => Command::Raw,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Command handling and printing on top of an analysis session.
pub struct App<E: EngineControl, W: Write> {
    session: AnalysisSession<E>,
    out: W,
    /// Print every analysis update instead of only finished searches
    follow: bool,
}

impl<E: EngineControl, W: Write> App<E, W> {
    pub fn new(session: AnalysisSession<E>, out: W, follow: bool) -> Self {
        Self {
            session,
            out,
            follow,
        }
    }

    pub fn session(&self) -> &AnalysisSession<E> {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run one input line. Errors in the input are reported, not returned.
    pub fn handle_input(&mut self, line: &str) -> Result<Flow> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }
        match line.parse::<Command>() {
            Ok(command) => self.execute(command),
            Err(e) => {
                writeln!(self.out, "error: {}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Fen(text) => match self.session.set_position(&text) {
                Ok(()) => self.print_board()?,
                Err(e) => writeln!(self.out, "Could not set position: {}", e)?,
            },
            Command::New => {
                self.session.new_game();
                self.print_board()?;
            }
            Command::Move(mv) => match self.session.play_uci(&mv) {
                Ok(()) => self.print_moves()?,
                Err(e) => writeln!(self.out, "error: {}", e)?,
            },
            Command::Click(square) => match self.session.click(square) {
                Ok(Some(_)) => {
                    self.print_board()?;
                    self.print_moves()?;
                }
                Ok(None) => self.print_board()?,
                Err(e) => writeln!(self.out, "error: {}", e)?,
            },
            Command::Flip => {
                self.session.rotate_board();
                self.print_board()?;
            }
            Command::Lines(n) => self.session.set_num_lines(n),
            Command::Depth(n) => self.session.set_depth(n),
            Command::Threads(n) => self.session.set_threads(n),
            Command::Infinite(on) => self.session.set_infinite(on),
            Command::Engine(on) => self.session.set_engine_enabled(on),
            Command::Board => self.print_board()?,
            Command::Moves => self.print_moves()?,
            Command::Show => self.print_analysis()?,
            Command::Raw => self.print_raw()?,
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Feed one engine output line, printing the analysis if it changed
    /// and updates are being followed.
    pub fn handle_engine_output(&mut self, line: &str) -> Result<()> {
        if self.session.handle_engine_output(line) && self.follow {
            self.print_analysis()?;
        }
        Ok(())
    }

    pub fn print_analysis(&mut self) -> Result<()> {
        let analysis = self.session.analysis();
        if let Some(bar) = &analysis.eval_bar {
            writeln!(self.out, "{}", render_eval_bar(bar, EVAL_BAR_WIDTH))?;
        }
        for line in &analysis.lines {
            match line.depth {
                Some(depth) => writeln!(self.out, "{:>2} d{:<2} {}", line.line_id, depth, line.text)?,
                None => writeln!(self.out, "{:>2}     {}", line.line_id, line.text)?,
            }
        }
        Ok(())
    }

    fn print_raw(&mut self) -> Result<()> {
        let lines = self.session.engine().recent_output();
        if lines.is_empty() {
            writeln!(self.out, "no engine output")?;
        }
        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn print_board(&mut self) -> Result<()> {
        writeln!(self.out, "{}", render_board(self.session.game()))?;
        Ok(())
    }

    fn print_moves(&mut self) -> Result<()> {
        writeln!(self.out, "{}", move_list(self.session.game()))?;
        Ok(())
    }
}

impl<W: Write> App<EngineModel, W> {
    fn handle_event(&mut self, event: EngineEvent) -> Result<()> {
        let was_analyzing = self.session.engine().is_analyzing();
        match event {
            EngineEvent::Output(line) => self.handle_engine_output(&line)?,
            other => {
                let exited = other == EngineEvent::Exited;
                self.session.engine_mut().handle_event(other);
                if exited {
                    self.session.set_engine_enabled(false);
                    writeln!(self.out, "engine exited")?;
                }
            }
        }
        if was_analyzing && !self.session.engine().is_analyzing() && !self.follow {
            self.print_analysis()?;
        }
        Ok(())
    }
}

/// Options the binary passes on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub fen: Option<String>,
    pub use_engine: bool,
    pub follow: bool,
}

/// Start the engine, then process engine output and stdin commands until
/// quit, or until stdin closes and the last search has finished.
pub fn run(config: &Config, options: RunOptions) -> Result<()> {
    let (tx, rx) = mpsc::channel::<AppEvent>();

    let mut engine = EngineModel::new();
    let mut engine_ok = false;
    if options.use_engine {
        match engine.start(&config.engine.command, &config.engine.args, tx.clone()) {
            Ok(()) => engine_ok = true,
            Err(e) => {
                error!(error = %e, "engine unavailable");
                eprintln!("{:#}", e);
            }
        }
    }

    let session = AnalysisSession::new(engine, config.search_settings());
    let stdout = io::stdout();
    let mut app = App::new(session, stdout.lock(), options.follow);

    if let Some(fen) = &options.fen {
        app.execute(Command::Fen(fen.clone()))?;
    }
    if engine_ok {
        app.execute(Command::Engine(true))?;
    }

    spawn_input_reader(tx);

    let mut input_closed = false;
    while let Ok(event) = rx.recv() {
        match event {
            AppEvent::Engine(event) => app.handle_event(event)?,
            AppEvent::Input(line) => {
                if app.handle_input(&line)? == Flow::Quit {
                    break;
                }
            }
            AppEvent::InputClosed => {
                info!("input closed");
                input_closed = true;
                if app.session().settings().infinite {
                    warn!("stopping infinite analysis at end of input");
                    break;
                }
            }
        }
        app.out.flush()?;
        let engine = app.session().engine();
        if input_closed && !(engine.is_running() && engine.is_analyzing()) {
            break;
        }
    }

    Ok(())
}

fn spawn_input_reader(tx: Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(AppEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(AppEvent::InputClosed);
    });
}
