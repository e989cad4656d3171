use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::catalog::{CardIdentity, IdentityId};

/// 卡牌实例标识（棋盘上每个格位唯一）。
pub type InstanceId = u32;

/// 回合状态机：空闲 → 选中一张 → 锁定等待判定 → 回到空闲；全部配对后进入终局。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    OneSelected,
    Locked,
    Complete,
}

impl Default for TurnPhase {
    fn default() -> Self {
        TurnPhase::Idle
    }
}

/// 棋盘上的一张牌：同一牌面恰好有两张实例。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInstance {
    pub instance_id: InstanceId,
    pub identity_id: IdentityId,
    pub image: String,
    #[serde(default)]
    pub flipped: bool,
    #[serde(default)]
    pub matched: bool,
}

impl CardInstance {
    pub fn new(instance_id: InstanceId, identity: &CardIdentity) -> Self {
        Self {
            instance_id,
            identity_id: identity.id,
            image: identity.image.clone(),
            flipped: false,
            matched: false,
        }
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    BoardDealt {
        card_count: usize,
    },
    CardFlipped {
        instance_id: InstanceId,
    },
    PairMatched {
        first: InstanceId,
        second: InstanceId,
        identity_id: IdentityId,
    },
    PairMissed {
        first: InstanceId,
        second: InstanceId,
    },
    BoardCompleted {
        move_count: u32,
        match_score: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DuplicateInstanceId { instance_id: InstanceId },
    UnpairedIdentity { identity_id: IdentityId, count: usize },
    SelectionOverflow { size: usize },
    SelectionDangling { instance_id: InstanceId },
    CompletionMismatch { complete: bool },
}

/// 已排定的延迟判定任务：记录排定时的两张牌与棋盘代数。
/// 判定回调触发时先校验代数，重开棋盘后残留的回调因此不会生效。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingResolution {
    pub generation: u64,
    pub first: InstanceId,
    pub second: InstanceId,
}

/// 渲染层每帧读取的快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardView {
    pub instance_id: InstanceId,
    pub image: String,
    pub flipped: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub cards: Vec<CardView>,
    pub move_count: u32,
    pub match_score: u32,
    pub is_complete: bool,
}

/// 游戏整体状态：棋盘、当前选择、计数器与事件日志。
/// 唯一的写入路径是规则引擎的操作，渲染层只读快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub cards: Vec<CardInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<InstanceId>,
    pub move_count: u32,
    pub match_score: u32,
    #[serde(default)]
    pub complete: bool,
    pub phase: TurnPhase,
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingResolution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default)]
    next_instance_id: InstanceId,
}

impl GameState {
    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn find_card(&self, instance_id: InstanceId) -> Option<&CardInstance> {
        self.cards
            .iter()
            .find(|card| card.instance_id == instance_id)
    }

    pub fn find_card_mut(&mut self, instance_id: InstanceId) -> Option<&mut CardInstance> {
        self.cards
            .iter_mut()
            .find(|card| card.instance_id == instance_id)
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.cards.iter().all(|card| card.matched)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_locked(&self) -> bool {
        self.phase == TurnPhase::Locked
    }

    /// 发放一个新的实例标识；跨越多次发牌也不会重复。
    pub(crate) fn alloc_instance_id(&mut self) -> InstanceId {
        self.next_instance_id += 1;
        self.next_instance_id
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cards: self
                .cards
                .iter()
                .map(|card| CardView {
                    instance_id: card.instance_id,
                    image: card.image.clone(),
                    flipped: card.flipped,
                    matched: card.matched,
                })
                .collect(),
            move_count: self.move_count,
            match_score: self.match_score,
            is_complete: self.complete,
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::new();
        let mut per_identity: HashMap<IdentityId, usize> = HashMap::new();
        for card in &self.cards {
            if !seen.insert(card.instance_id) {
                return Err(IntegrityError::DuplicateInstanceId {
                    instance_id: card.instance_id,
                });
            }
            *per_identity.entry(card.identity_id).or_insert(0) += 1;
        }

        for (identity_id, count) in per_identity {
            if count != 2 {
                return Err(IntegrityError::UnpairedIdentity { identity_id, count });
            }
        }

        if self.selection.len() > 2 {
            return Err(IntegrityError::SelectionOverflow {
                size: self.selection.len(),
            });
        }
        for instance_id in &self.selection {
            let valid = self
                .find_card(*instance_id)
                .map(|card| card.flipped && !card.matched)
                .unwrap_or(false);
            if !valid {
                return Err(IntegrityError::SelectionDangling {
                    instance_id: *instance_id,
                });
            }
        }

        if self.complete != self.all_matched() {
            return Err(IntegrityError::CompletionMismatch {
                complete: self.complete,
            });
        }

        Ok(())
    }

    /// 返回一个示例棋盘，方便前端调试或初始化。
    pub fn sample() -> Self {
        use super::catalog::CardCatalog;
        use super::rules::RuleEngine;
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let mut rng = SmallRng::seed_from_u64(0x5EED);
        RuleEngine::deal(&CardCatalog::sample(), &mut rng).unwrap_or_default()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            selection: Vec::new(),
            move_count: 0,
            match_score: 0,
            complete: false,
            phase: TurnPhase::default(),
            generation: 0,
            pending: None,
            event_log: Vec::new(),
            next_instance_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_board_passes_integrity_check() {
        let state = GameState::sample();
        assert!(!state.cards.is_empty(), "sample board should be dealt");
        state
            .integrity_check()
            .expect("freshly dealt board should be consistent");
    }

    #[test]
    fn snapshot_mirrors_board_and_counters() {
        let mut state = GameState::sample();
        state.move_count = 3;
        state.match_score = 2;

        let snapshot = state.snapshot();
        assert_eq!(snapshot.cards.len(), state.cards.len());
        assert_eq!(snapshot.move_count, 3);
        assert_eq!(snapshot.match_score, 2);
        assert!(!snapshot.is_complete);

        let first = &snapshot.cards[0];
        let card = state
            .find_card(first.instance_id)
            .expect("snapshot card should exist on the board");
        assert_eq!(first.image, card.image);
        assert_eq!(first.flipped, card.flipped);
    }

    #[test]
    fn integrity_check_flags_unpaired_identity() {
        let mut state = GameState::sample();
        state.cards.pop();

        match state.integrity_check() {
            Err(IntegrityError::UnpairedIdentity { count, .. }) => assert_eq!(count, 1),
            other => panic!("expected unpaired identity, got {:?}", other),
        }
    }

    #[test]
    fn integrity_check_flags_dangling_selection() {
        let mut state = GameState::sample();
        state.selection.push(9_999);

        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::SelectionDangling {
                instance_id: 9_999
            })
        );
    }

    #[test]
    fn integrity_check_flags_completion_mismatch() {
        let mut state = GameState::sample();
        state.complete = true;

        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::CompletionMismatch { complete: true })
        );
    }
}
