use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{
    catalog::{CardCatalog, CatalogError},
    state::{
        CardInstance, GameEvent, GameState, InstanceId, PendingResolution, TurnPhase,
    },
};

/// 第二张牌翻开到判定之间的固定延迟（毫秒）。
pub const DEFAULT_RESOLVE_DELAY_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionSummary {
    pub move_count: u32,
    pub match_score: u32,
}

/// 每次操作返回给调用方的信封：最新状态、本次事件、终局摘要与待判定标记。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletionSummary>,
    pub pending: bool,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let completed = if state.complete {
            Some(CompletionSummary {
                move_count: state.move_count,
                match_score: state.match_score,
            })
        } else {
            None
        };
        let pending = state.pending.is_some();

        Self {
            state,
            events,
            completed,
            pending,
        }
    }
}

pub struct RuleEngine;

impl RuleEngine {
    /// 根据牌面目录发一副新棋盘。
    pub fn deal(catalog: &CardCatalog, rng: &mut SmallRng) -> Result<GameState, CatalogError> {
        let mut state = GameState::default();
        Self::redeal(&mut state, catalog, rng)?;
        Ok(state)
    }

    /// 重开棋盘：每种牌面生成两张实例，洗匀后重置所有计数器。
    /// 代数自增，之前排定的判定任务从此全部失效。
    pub fn redeal(
        state: &mut GameState,
        catalog: &CardCatalog,
        rng: &mut SmallRng,
    ) -> Result<Vec<GameEvent>, CatalogError> {
        catalog.validate()?;

        let mut cards = Vec::with_capacity(catalog.len() * 2);
        for identity in &catalog.identities {
            for _ in 0..2 {
                let instance_id = state.alloc_instance_id();
                cards.push(CardInstance::new(instance_id, identity));
            }
        }
        cards.shuffle(rng);

        state.cards = cards;
        state.selection.clear();
        state.move_count = 0;
        state.match_score = 0;
        state.complete = false;
        state.phase = TurnPhase::Idle;
        state.pending = None;
        state.generation += 1;
        state.event_log.clear();

        let event = GameEvent::BoardDealt {
            card_count: state.cards.len(),
        };
        state.record_event(event.clone());
        Ok(vec![event])
    }

    /// 处理一次点击意图。无效点击（锁定中、已翻开、已配对、未知牌）静默忽略，
    /// 返回空事件列表且状态不变。
    pub fn select_card(state: &mut GameState, instance_id: InstanceId) -> Vec<GameEvent> {
        if state.is_locked() || state.is_complete() {
            return Vec::new();
        }

        match state.find_card_mut(instance_id) {
            Some(card) if !card.flipped && !card.matched => card.flipped = true,
            _ => return Vec::new(),
        }
        state.selection.push(instance_id);

        let event = GameEvent::CardFlipped { instance_id };
        state.record_event(event.clone());

        if state.selection.len() < 2 {
            state.phase = TurnPhase::OneSelected;
        } else {
            // 第二张已翻开：锁定输入并登记延迟判定任务。
            state.phase = TurnPhase::Locked;
            state.pending = Some(PendingResolution {
                generation: state.generation,
                first: state.selection[0],
                second: instance_id,
            });
        }

        vec![event]
    }

    /// 判定一对已翻开的牌。只应由排定的延迟回调（或无状态调试接口）调用。
    /// 任务代数与当前棋盘不符时说明棋盘已被重开，直接丢弃。
    pub fn resolve_pair(state: &mut GameState, pending: &PendingResolution) -> Vec<GameEvent> {
        if pending.generation != state.generation {
            return Vec::new();
        }

        let first_identity = state.find_card(pending.first).map(|card| card.identity_id);
        let second_identity = state.find_card(pending.second).map(|card| card.identity_id);
        let (Some(first_identity), Some(second_identity)) = (first_identity, second_identity)
        else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if first_identity == second_identity {
            for instance_id in [pending.first, pending.second] {
                if let Some(card) = state.find_card_mut(instance_id) {
                    card.matched = true;
                }
            }
            state.match_score += 1;
            events.push(GameEvent::PairMatched {
                first: pending.first,
                second: pending.second,
                identity_id: first_identity,
            });
        } else {
            for instance_id in [pending.first, pending.second] {
                if let Some(card) = state.find_card_mut(instance_id) {
                    card.flipped = false;
                }
            }
            events.push(GameEvent::PairMissed {
                first: pending.first,
                second: pending.second,
            });
        }

        state.selection.clear();
        state.pending = None;
        state.move_count += 1;
        state.phase = TurnPhase::Idle;

        if state.all_matched() {
            state.complete = true;
            state.phase = TurnPhase::Complete;
            events.push(GameEvent::BoardCompleted {
                move_count: state.move_count,
                match_score: state.match_score,
            });
        }

        for event in &events {
            state.record_event(event.clone());
        }
        events
    }
}
