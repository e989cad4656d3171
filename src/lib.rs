pub mod game;
pub mod utils;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use game::{
    BoardSnapshot, CardCatalog, CardIdentity, CardInstance, CardView, CatalogError,
    CompletionSummary, GameEvent, GameState, IdentityId, InstanceId, IntegrityError,
    PendingResolution, RuleEngine, RuleResolution, TurnPhase, DEFAULT_RESOLVE_DELAY_MS,
};

use crate::utils::console_log;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

#[wasm_bindgen]
pub fn greet(name: &str) -> String {
    let message = format!("你好，{name}! 欢迎来到记忆翻牌。");
    web_sys::console::log_1(&message.clone().into());
    message
}

fn to_js_error(error: CatalogError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn integrity_to_js_error(error: IntegrityError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

/// 面向前端的游戏引擎封装。状态放在 `Rc<RefCell>` 里，
/// 点击处理与延迟判定回调共用同一条写入路径。
#[wasm_bindgen]
pub struct GameEngine {
    state: Rc<RefCell<GameState>>,
    catalog: CardCatalog,
    rng: SmallRng,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: Option<String>, seed: Option<u32>) -> Result<GameEngine, JsValue> {
        let catalog = if let Some(json) = catalog_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            CardCatalog::sample()
        };

        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed as u64),
            None => SmallRng::from_entropy(),
        };

        let state = RuleEngine::deal(&catalog, &mut rng).map_err(to_js_error)?;
        console_log(&format!("board dealt with {} cards", state.cards.len()));

        Ok(GameEngine {
            state: Rc::new(RefCell::new(state)),
            catalog,
            rng,
        })
    }

    /// 判定延迟的默认毫秒数。
    #[wasm_bindgen(js_name = "resolveDelayMs")]
    pub fn resolve_delay_ms() -> u32 {
        DEFAULT_RESOLVE_DELAY_MS
    }

    /// 渲染层每帧读取的快照。
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.borrow().snapshot()).map_err(JsValue::from)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&*self.state.borrow()).map_err(serde_to_js_error)
    }

    /// 导入完整状态（热更新用）。代数自增，旧棋盘排定的判定任务全部失效。
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let mut imported: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;

        let current = self.state.borrow().generation;
        imported.generation = current.max(imported.generation) + 1;
        if let Some(pending) = imported.pending.as_mut() {
            // 导入的棋盘可能正处于锁定中，让它的任务跟上新代数，前端可重新排定。
            pending.generation = imported.generation;
        }

        *self.state.borrow_mut() = imported;
        Ok(())
    }

    /// 处理一次点击意图；无效点击静默忽略。
    /// 返回的信封里 `pending=true` 表示该排定一次延迟判定了。
    pub fn select_card(&mut self, instance_id: u32) -> Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        let events = RuleEngine::select_card(&mut state, instance_id);
        make_resolution_json(resolution_from_events(&state, events))
    }

    /// 等待固定延迟后判定当前翻开的一对牌。
    /// 任务携带排定时的棋盘代数，期间棋盘被重开则判定落空。
    pub fn resolve_pending(&self, delay_ms: Option<u32>) -> Promise {
        let state_rc = Rc::clone(&self.state);
        let pending = self.state.borrow().pending.clone();
        let delay = delay_ms.unwrap_or(DEFAULT_RESOLVE_DELAY_MS);

        future_to_promise(async move {
            let Some(pending) = pending else {
                let state = state_rc.borrow();
                let json = make_resolution_json(resolution_from_events(&state, Vec::new()))?;
                return Ok(JsValue::from_str(&json));
            };

            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }

            let mut state = state_rc.borrow_mut();
            let events = RuleEngine::resolve_pair(&mut state, &pending);
            if state.is_complete() {
                console_log(&format!(
                    "board completed in {} moves, {} matches",
                    state.move_count, state.match_score
                ));
            }
            let json = make_resolution_json(resolution_from_events(&state, events))?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 重开一局：重新发牌并清零计数器。
    pub fn request_reset(&mut self) -> Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        let events =
            RuleEngine::redeal(&mut state, &self.catalog, &mut self.rng).map_err(to_js_error)?;
        console_log(&format!("board redealt with {} cards", state.cards.len()));
        make_resolution_json(resolution_from_events(&state, events))
    }
}

/// 返回内置示例牌面目录，方便前端调试或初始化。
#[wasm_bindgen(js_name = "sampleCatalog")]
pub fn sample_catalog() -> Result<JsValue, JsValue> {
    to_value(&CardCatalog::sample()).map_err(JsValue::from)
}

/// 校验牌面目录是否满足发牌前置条件。
#[wasm_bindgen(js_name = "validateCatalog")]
pub fn validate_catalog(catalog: JsValue) -> Result<(), JsValue> {
    let catalog: CardCatalog = from_value(catalog).map_err(JsValue::from)?;
    catalog.validate().map_err(to_js_error)
}

/// 校验游戏状态的内部一致性。
#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state.integrity_check().map_err(integrity_to_js_error)
}

/// 用给定目录（缺省为示例目录）发一副新棋盘并返回完整状态。
#[wasm_bindgen(js_name = "createBoardState")]
pub fn create_board_state(catalog: JsValue, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let catalog: CardCatalog = if catalog.is_undefined() || catalog.is_null() {
        CardCatalog::sample()
    } else {
        from_value(catalog).map_err(JsValue::from)?
    };

    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed as u64),
        None => SmallRng::from_entropy(),
    };

    let state = RuleEngine::deal(&catalog, &mut rng).map_err(to_js_error)?;
    to_value(&state).map_err(JsValue::from)
}

/// 无状态版点击处理：直接在传入的状态上执行并返回判定信封。
#[wasm_bindgen(js_name = "selectCard")]
pub fn select_card(state: JsValue, instance_id: u32) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let events = RuleEngine::select_card(&mut state, instance_id);
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

/// 无状态版延迟判定（同步执行，调试用）。
#[wasm_bindgen(js_name = "resolvePending")]
pub fn resolve_pending(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let events = match state.pending.clone() {
        Some(pending) => RuleEngine::resolve_pair(&mut state, &pending),
        None => Vec::new(),
    };
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
