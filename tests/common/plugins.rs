//! Encoder and presenter doubles for driving the engine by hand

use async_trait::async_trait;
use brickpipe::pipe::{
    Brick, BrickError, BrickResult, Encoder, EncoderPlugin, ViewPresenter, Viewer, ViewerPlugin,
};
use brickpipe::settings::{Setting, SettingKind, SettingValues};
use brickpipe::Chain;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::Notify;

/// Holds translations until opened.
#[derive(Default)]
pub struct Gate {
    open: Cell<bool>,
    notify: Notify,
}

impl Gate {
    pub fn opened() -> Rc<Self> {
        let gate = Rc::new(Self::default());
        gate.open.set(true);
        gate
    }

    pub fn open(&self) {
        self.open.set(true);
        self.notify.notify_waiters();
    }

    pub fn close(&self) {
        self.open.set(false);
    }

    async fn pass(&self) {
        while !self.open.get() {
            self.notify.notified().await;
        }
    }
}

/// Shifts every code point by `shift`, waiting at the gate first.
pub struct GatedShift {
    gate: Rc<Gate>,
    runs: Rc<Cell<usize>>,
}

impl GatedShift {
    fn shift(content: &Chain, delta: i64) -> BrickResult<Chain> {
        let shifted = content
            .code_points()?
            .iter()
            .map(|&cp| (cp as i64 + delta) as u32)
            .collect();
        Chain::from_code_points(shifted).map_err(|e| BrickError::invalid_input(e.to_string()))
    }
}

#[async_trait(?Send)]
impl EncoderPlugin for GatedShift {
    fn name(&self) -> &str {
        "gated-shift"
    }

    fn title(&self) -> &str {
        "Gated shift"
    }

    fn settings(&self) -> Vec<Setting> {
        vec![Setting::new("shift", SettingKind::integer(Some(-25), Some(25)), 1)]
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.gate.pass().await;
        self.runs.set(self.runs.get() + 1);
        Self::shift(&content, settings.integer("shift").unwrap_or(0))
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.gate.pass().await;
        self.runs.set(self.runs.get() + 1);
        Self::shift(&content, -settings.integer("shift").unwrap_or(0))
    }
}

/// A gated shift brick plus its completed run counter.
pub fn gated_shift(gate: &Rc<Gate>) -> (Brick, Rc<Cell<usize>>) {
    let runs = Rc::new(Cell::new(0));
    let plugin = GatedShift {
        gate: gate.clone(),
        runs: runs.clone(),
    };
    let encoder = Encoder::new(plugin).expect("gated shift settings are valid");
    (Brick::Encoder(encoder), runs)
}

/// Renders `prefix` followed by the content, waiting at the gate first.
pub struct GatedEcho {
    gate: Rc<Gate>,
    runs: Rc<Cell<usize>>,
}

#[async_trait(?Send)]
impl ViewerPlugin for GatedEcho {
    fn name(&self) -> &str {
        "gated-echo"
    }

    fn title(&self) -> &str {
        "Gated echo"
    }

    fn settings(&self) -> Vec<Setting> {
        vec![Setting::new("prefix", SettingKind::text(), "")]
    }

    async fn perform_view(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.gate.pass().await;
        self.runs.set(self.runs.get() + 1);
        let prefix = settings.text("prefix").cloned().unwrap_or_default();
        Ok(prefix.concat(&content)?)
    }
}

/// A gated echo viewer plus its completed run counter.
pub fn gated_echo(gate: &Rc<Gate>) -> (Brick, Rc<Cell<usize>>) {
    let runs = Rc::new(Cell::new(0));
    let plugin = GatedEcho {
        gate: gate.clone(),
        runs: runs.clone(),
    };
    let viewer = Viewer::new(plugin).expect("gated echo settings are valid");
    (Brick::Viewer(viewer), runs)
}

/// Fails every translation with an unrecoverable error.
pub struct Broken;

#[async_trait(?Send)]
impl EncoderPlugin for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn title(&self) -> &str {
        "Broken"
    }

    fn settings(&self) -> Vec<Setting> {
        Vec::new()
    }

    async fn perform_encode(&self, _: Chain, _: &SettingValues) -> BrickResult<Chain> {
        Err(BrickError::Internal("wires crossed".into()))
    }

    async fn perform_decode(&self, _: Chain, _: &SettingValues) -> BrickResult<Chain> {
        Err(BrickError::Internal("wires crossed".into()))
    }
}

pub fn broken() -> Brick {
    Brick::Encoder(Encoder::new(Broken).expect("no settings"))
}

/// Records everything a viewer presents.
#[derive(Default)]
pub struct RecordingPresenter {
    pub views: RefCell<Vec<String>>,
}

impl RecordingPresenter {
    pub fn last(&self) -> Option<String> {
        self.views.borrow().last().cloned()
    }
}

impl ViewPresenter for RecordingPresenter {
    fn present(&self, view: &Chain) {
        self.views.borrow_mut().push(view.to_string());
    }
}
