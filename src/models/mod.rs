pub mod analysis;
pub mod engine;
pub mod game;
pub mod interaction;
pub mod session;

pub use analysis::LineAggregator;
pub use engine::{EngineControl, EngineEvent, EngineModel, SearchTracker};
pub use game::GameModel;
pub use interaction::{BoardInteraction, ClickOutcome, InteractionState};
pub use session::{AnalysisSession, SearchSettings};
