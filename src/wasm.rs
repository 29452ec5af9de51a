//! Browser bindings
//!
//! A thin `wasm_bindgen` wrapper so a JS render loop can drive a `Board`:
//! push inputs through the setters, call `tick` once per animation frame and
//! read the ball, pegs and contacts back.

use wasm_bindgen::prelude::*;

use crate::board::{BallView, Board, BoardEvent};
use crate::settings::{BoardMode, BoardSettings, PhysicsOverrides};
use crate::sim::{Dimensions, StopReason, Target};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
    log::info!("Plinko Drop starting...");
}

fn to_js_error(err: serde_json::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct PlinkoBoard {
    board: Board,
    settings: BoardSettings,
    ball: Option<BallView>,
    /// Set when the last tick stopped the run after a landing
    landed: bool,
}

#[wasm_bindgen]
impl PlinkoBoard {
    /// New board using the settings stored in LocalStorage
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32) -> PlinkoBoard {
        let settings = BoardSettings::load();
        let board = Board::new(Dimensions::new(width, height), &settings);
        PlinkoBoard {
            board,
            settings,
            ball: None,
            landed: false,
        }
    }

    #[wasm_bindgen(js_name = setRunning)]
    pub fn set_running(&mut self, running: bool) {
        self.board.set_running(running);
    }

    #[wasm_bindgen(js_name = setResetToken)]
    pub fn set_reset_token(&mut self, token: f64) {
        self.board.set_reset_token(token.to_bits());
    }

    #[wasm_bindgen(js_name = setDimensions)]
    pub fn set_dimensions(&mut self, width: f32, height: f32) {
        self.board.set_dimensions(Dimensions::new(width, height));
    }

    #[wasm_bindgen(js_name = setTarget)]
    pub fn set_target(&mut self, x: f32, y: f32) {
        self.board.set_target(Target::new(x, y));
    }

    /// Merge a partial physics update given as JSON and persist it
    #[wasm_bindgen(js_name = setPhysics)]
    pub fn set_physics(&mut self, json: &str) -> Result<(), JsValue> {
        let overrides = PhysicsOverrides::from_json(json).map_err(to_js_error)?;
        self.board.set_overrides(&overrides);
        self.settings.physics = *self.board.physics();
        self.settings.save();
        Ok(())
    }

    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = BoardMode::from_str(mode)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown board mode: {mode}")))?;
        self.board.set_mode(mode);
        self.settings.mode = mode;
        Ok(())
    }

    #[wasm_bindgen(js_name = setCompletionDelay)]
    pub fn set_completion_delay(&mut self, delay_ms: f64) {
        self.board.set_completion_delay(delay_ms);
        self.settings.completion_delay_ms = delay_ms.max(0.0);
    }

    /// Advance one animation frame; true when the completion fired
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let frame = self.board.tick(now_ms);
        self.ball = frame.ball;
        self.landed = false;

        let mut completed = false;
        for event in frame.events {
            match event {
                BoardEvent::Stopped {
                    reason: StopReason::Landed,
                    ..
                } => self.landed = true,
                BoardEvent::Completed { .. } => completed = true,
                _ => {}
            }
        }
        completed
    }

    /// The last tick dropped the run signal after a landing
    #[wasm_bindgen(getter)]
    pub fn landed(&self) -> bool {
        self.landed
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.board.is_running()
    }

    #[wasm_bindgen(getter, js_name = hasBall)]
    pub fn has_ball(&self) -> bool {
        self.ball.is_some()
    }

    #[wasm_bindgen(getter, js_name = ballX)]
    pub fn ball_x(&self) -> f32 {
        self.ball.map(|b| b.position.x).unwrap_or(0.0)
    }

    #[wasm_bindgen(getter, js_name = ballY)]
    pub fn ball_y(&self) -> f32 {
        self.ball.map(|b| b.position.y).unwrap_or(0.0)
    }

    #[wasm_bindgen(getter, js_name = ballOpacity)]
    pub fn ball_opacity(&self) -> f32 {
        self.ball.map(|b| b.opacity).unwrap_or(0.0)
    }

    #[wasm_bindgen(getter, js_name = ballRadius)]
    pub fn ball_radius(&self) -> f32 {
        self.board.physics().ball_radius_live
    }

    /// `[{ id, position: [x, y], radius }, ...]`
    #[wasm_bindgen(js_name = pegsJson)]
    pub fn pegs_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.board.pegs()).map_err(to_js_error)
    }

    /// `{ touching: [...], lastTouch: { id: ms } }`
    #[wasm_bindgen(js_name = contactsJson)]
    pub fn contacts_json(&self) -> Result<String, JsValue> {
        self.board.contacts().to_json().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = settingsJson)]
    pub fn settings_json(&self) -> Result<String, JsValue> {
        self.settings.to_json().map_err(to_js_error)
    }
}
