//! UCI (Universal Chess Interface) protocol types and utilities.
//!
//! This module covers the text side of talking to an engine: the commands we
//! send, classification of what comes back, and parsing of `info` lines into
//! per-line analysis updates. Process handling lives in the models layer.

use std::str::SplitWhitespace;

/// Identifies one `go` request. Output is attributed to the search it came from.
pub type SearchId = u64;

/// UCI commands that can be sent to an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    /// Initialize UCI mode
    Uci,
    /// Check if engine is ready
    IsReady,
    /// Set a new game
    UciNewGame,
    /// Set an engine option
    SetOption { name: String, value: String },
    /// Set position (startpos or FEN, with optional moves)
    Position { fen: Option<String>, moves: Vec<String> },
    /// Start infinite analysis
    GoInfinite,
    /// Start analysis with depth limit
    GoDepth(u32),
    /// Stop analysis
    Stop,
    /// Quit the engine
    Quit,
}

impl UciCommand {
    pub fn threads(n: u32) -> Self {
        UciCommand::SetOption {
            name: "Threads".to_string(),
            value: n.to_string(),
        }
    }

    pub fn multi_pv(n: u32) -> Self {
        UciCommand::SetOption {
            name: "MultiPV".to_string(),
            value: n.to_string(),
        }
    }

    /// Convert command to UCI protocol string
    pub fn to_uci_string(&self) -> String {
        match self {
            UciCommand::Uci => "uci".to_string(),
            UciCommand::IsReady => "isready".to_string(),
            UciCommand::UciNewGame => "ucinewgame".to_string(),
            UciCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            UciCommand::Position { fen, moves } => {
                let mut cmd = String::from("position ");
                match fen {
                    Some(f) => {
                        cmd.push_str("fen ");
                        cmd.push_str(f);
                    }
                    None => cmd.push_str("startpos"),
                }
                if !moves.is_empty() {
                    cmd.push_str(" moves ");
                    cmd.push_str(&moves.join(" "));
                }
                cmd
            }
            UciCommand::GoInfinite => "go infinite".to_string(),
            UciCommand::GoDepth(d) => format!("go depth {}", d),
            UciCommand::Stop => "stop".to_string(),
            UciCommand::Quit => "quit".to_string(),
        }
    }
}

/// Categorized engine output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOutputKind {
    /// "uciok" - engine is ready for UCI
    UciOk,
    /// "readyok" - engine is ready
    ReadyOk,
    /// "info ..." - analysis information
    Info(String),
    /// "bestmove ..." - the search has finished
    BestMove(String),
    /// Engine identification
    Id(String),
    /// Option definition
    Option(String),
    /// Unknown/other output
    Other(String),
}

impl UciOutputKind {
    /// Parse a raw UCI output line into a categorized type
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line == "uciok" {
            UciOutputKind::UciOk
        } else if line == "readyok" {
            UciOutputKind::ReadyOk
        } else if let Some(rest) = line.strip_prefix("info ") {
            UciOutputKind::Info(rest.to_string())
        } else if let Some(rest) = line.strip_prefix("bestmove") {
            UciOutputKind::BestMove(rest.trim().to_string())
        } else if let Some(rest) = line.strip_prefix("id ") {
            UciOutputKind::Id(rest.to_string())
        } else if let Some(rest) = line.strip_prefix("option ") {
            UciOutputKind::Option(rest.to_string())
        } else {
            UciOutputKind::Other(line.to_string())
        }
    }
}

/// Engine evaluation score, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawn score
    Centipawns(i32),
    /// Mate in N moves (negative: side to move gets mated)
    Mate(i32),
}

impl Score {
    pub fn value(&self) -> i32 {
        match self {
            Score::Centipawns(v) | Score::Mate(v) => *v,
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Score::Mate(_))
    }

    /// Same kind of score, sign flipped.
    pub fn negated(&self) -> Self {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(-cp),
            Score::Mate(m) => Score::Mate(-m),
        }
    }

    pub fn balance(&self) -> f32 {
        crate::domain::score::balance(self.value(), self.is_mate())
    }
}

/// Parsed UCI info line containing analysis data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UciInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    /// Multi-PV line number (1-indexed)
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    /// Time spent in milliseconds
    pub time: Option<u64>,
    /// Principal variation as UCI moves
    pub pv: Vec<String>,
}

/// Keywords that end a `pv` token run.
const INFO_KEYWORDS: &[&str] = &[
    "depth",
    "seldepth",
    "multipv",
    "score",
    "nodes",
    "nps",
    "time",
    "hashfull",
    "tbhits",
    "currmove",
    "currmovenumber",
    "string",
    "refutation",
    "currline",
];

fn next_num<T: std::str::FromStr>(tokens: &mut SplitWhitespace<'_>) -> Option<T> {
    tokens.next().and_then(|t| t.parse().ok())
}

impl UciInfo {
    /// Parse a UCI info string (the part after "info ")
    pub fn parse(info_str: &str) -> Self {
        let mut info = UciInfo::default();
        let mut tokens = info_str.split_whitespace();
        let mut pending = tokens.next();

        while let Some(token) = pending.take() {
            match token {
                "depth" => info.depth = next_num(&mut tokens),
                "seldepth" => info.seldepth = next_num(&mut tokens),
                "multipv" => info.multipv = next_num(&mut tokens),
                "nodes" => info.nodes = next_num(&mut tokens),
                "nps" => info.nps = next_num(&mut tokens),
                "time" => info.time = next_num(&mut tokens),
                "score" => {
                    let kind = tokens.next();
                    let value = next_num::<i32>(&mut tokens);
                    info.score = match (kind, value) {
                        (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                        (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                        _ => info.score,
                    };
                }
                "pv" => {
                    for mv in tokens.by_ref() {
                        if INFO_KEYWORDS.contains(&mv) {
                            pending = Some(mv);
                            break;
                        }
                        info.pv.push(mv.to_string());
                    }
                    continue;
                }
                // free text runs to the end of the line
                "string" => break,
                _ => {}
            }
            pending = tokens.next();
        }

        info
    }

    /// Check if this info line has meaningful analysis data (depth + score + pv)
    pub fn has_analysis(&self) -> bool {
        self.depth.is_some() && self.score.is_some() && !self.pv.is_empty()
    }
}

/// One principal-variation update, attributed to a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthInfo {
    /// 1-based line slot
    pub line_id: u32,
    pub pv: Vec<String>,
    /// From the engine's side-to-move perspective
    pub score: Score,
    pub depth: Option<u32>,
    pub generation: SearchId,
}

impl DepthInfo {
    /// Lines without depth, score and pv carry nothing to display.
    pub fn from_info(info: UciInfo, generation: SearchId) -> Option<Self> {
        if !info.has_analysis() {
            return None;
        }
        Some(DepthInfo {
            line_id: info.multipv.unwrap_or(1),
            score: info.score?,
            depth: info.depth,
            pv: info.pv,
            generation,
        })
    }
}
