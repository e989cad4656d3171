//! 游戏核心逻辑模块（状态机、规则引擎等）。

pub mod catalog;
pub mod rules;
pub mod state;

pub use catalog::{
    CardCatalog,
    CardIdentity,
    CatalogError,
    IdentityId,
};
pub use rules::{
    CompletionSummary,
    RuleEngine,
    RuleResolution,
    DEFAULT_RESOLVE_DELAY_MS,
};
pub use state::{
    BoardSnapshot,
    CardInstance,
    CardView,
    GameEvent,
    GameState,
    InstanceId,
    IntegrityError,
    PendingResolution,
    TurnPhase,
};
