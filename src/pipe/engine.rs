//! Pipe execution engine.
//!
//! A [`Pipe`] owns an ordered list of bricks interleaved with content buckets:
//! bucket `i` lies between encoder `i - 1` and encoder `i`, so there is always
//! one more bucket than there are encoders. Viewers sit on the bucket whose
//! index is the number of encoders before them.
//!
//! Translations run as local tasks (`tokio::task::spawn_local`), so a pipe
//! must be driven from inside a [`tokio::task::LocalSet`]. All bookkeeping
//! between two suspension points is synchronous; no state borrow is held
//! across an await.

use crate::chain::{Chain, TextEncoding};
use crate::config::PipeConfig;
use crate::pipe::brick::{Brick, BrickInput};
use crate::pipe::error::{BrickError, BrickResult, PipeError, PipeResult};
use crate::pipe::observer::{BrickEvent, BrickObserver};
use crate::pipe::registry::BrickRegistry;
use crate::pipe::relocation::{relocate_selection, Propagation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tokio::sync::oneshot;

/// Collaborators shared by a pipe and its bricks.
pub struct PipeContext {
    registry: Rc<BrickRegistry>,
    observer: Option<Rc<dyn BrickObserver>>,
    rng: RefCell<StdRng>,
    encoding: TextEncoding,
}

impl PipeContext {
    pub fn new(registry: Rc<BrickRegistry>) -> Self {
        Self {
            registry,
            observer: None,
            rng: RefCell::new(StdRng::from_entropy()),
            encoding: TextEncoding::default(),
        }
    }

    /// Context with the built-in bricks registered.
    pub fn with_builtins() -> Self {
        Self::new(Rc::new(BrickRegistry::with_builtins()))
    }

    pub fn from_config(config: &PipeConfig) -> Self {
        let mut context = Self::with_builtins().with_encoding(config.default_encoding);
        if let Some(seed) = config.random_seed {
            context = context.with_seed(seed);
        }
        context
    }

    pub fn with_observer(mut self, observer: Rc<dyn BrickObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Deterministic setting randomization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn registry(&self) -> &BrickRegistry {
        &self.registry
    }

    /// Encoding tagged onto byte content injected from outside.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Default for PipeContext {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[derive(Debug, Clone, Copy)]
struct BrickState {
    busy: bool,
    settings_version: u64,
}

impl Default for BrickState {
    fn default() -> Self {
        Self {
            busy: false,
            settings_version: 1,
        }
    }
}

type Listener = oneshot::Sender<PipeResult<Chain>>;

struct PipeState {
    id: Option<u64>,
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    bricks: Vec<Brick>,
    brick_state: Vec<BrickState>,
    bucket_content: Vec<Chain>,
    bucket_listeners: Vec<Vec<Listener>>,
    selected_bucket: usize,
}

impl PipeState {
    fn new() -> Self {
        Self {
            id: None,
            url: None,
            title: None,
            description: None,
            bricks: Vec::new(),
            brick_state: Vec::new(),
            bucket_content: vec![Chain::empty()],
            bucket_listeners: vec![Vec::new()],
            selected_bucket: 0,
        }
    }

    fn index_of(&self, brick: &Brick) -> Option<usize> {
        self.bricks.iter().position(|b| b.ptr_eq(brick))
    }

    /// Number of encoders before brick `index`.
    fn encoder_position(&self, index: usize) -> usize {
        self.bricks[..index].iter().filter(|b| b.is_encoder()).count()
    }

    fn encoder_at(&self, position: usize) -> Option<Brick> {
        self.bricks
            .iter()
            .filter(|b| b.is_encoder())
            .nth(position)
            .cloned()
    }

    fn viewers_on(&self, bucket: usize) -> Vec<Brick> {
        let mut position = 0;
        let mut viewers = Vec::new();
        for brick in &self.bricks {
            match brick {
                Brick::Encoder(_) => position += 1,
                Brick::Viewer(_) if position == bucket => viewers.push(brick.clone()),
                Brick::Viewer(_) => {}
            }
            if position > bucket {
                break;
            }
        }
        viewers
    }

    fn any_busy(&self) -> bool {
        self.brick_state.iter().any(|s| s.busy)
    }

    fn check_bucket(&self, bucket: usize) -> PipeResult<()> {
        let count = self.bucket_content.len();
        if bucket >= count {
            return Err(PipeError::BucketOutOfRange { bucket, count });
        }
        Ok(())
    }

    /// Mark the encoder at `index` busy and snapshot what it needs.
    fn begin_translation(&mut self, index: usize, is_encode: bool) -> Option<TranslationJob> {
        if self.brick_state[index].busy {
            return None;
        }
        self.brick_state[index].busy = true;
        let (source_bucket, _) = self.translation_buckets(index, is_encode);
        Some(TranslationJob {
            is_encode,
            source: self.bucket_content[source_bucket].clone(),
            settings_version: self.brick_state[index].settings_version,
        })
    }

    fn begin_view(&mut self, index: usize) -> Option<ViewJob> {
        if self.brick_state[index].busy {
            return None;
        }
        self.brick_state[index].busy = true;
        let bucket = self.encoder_position(index);
        Some(ViewJob {
            source: self.bucket_content[bucket].clone(),
            settings_version: self.brick_state[index].settings_version,
        })
    }

    /// `(source, result)` buckets of the encoder at `index`.
    fn translation_buckets(&self, index: usize, is_encode: bool) -> (usize, usize) {
        let position = self.encoder_position(index);
        if is_encode {
            (position, position + 1)
        } else {
            (position + 1, position)
        }
    }

    fn take_listeners(&mut self) -> Vec<(usize, Listener)> {
        let mut taken = Vec::new();
        for (bucket, listeners) in self.bucket_listeners.iter_mut().enumerate() {
            taken.extend(listeners.drain(..).map(|tx| (bucket, tx)));
        }
        taken
    }
}

#[derive(Debug, Clone)]
struct TranslationJob {
    is_encode: bool,
    source: Chain,
    settings_version: u64,
}

#[derive(Debug, Clone)]
struct ViewJob {
    source: Chain,
    settings_version: u64,
}

pub(crate) struct PipeShared {
    state: RefCell<PipeState>,
    context: PipeContext,
}

/// Handle to a pipe. Clones share the same pipe.
#[derive(Clone)]
pub struct Pipe {
    shared: Rc<PipeShared>,
}

impl Pipe {
    pub fn new(context: PipeContext) -> Self {
        Self {
            shared: Rc::new(PipeShared {
                state: RefCell::new(PipeState::new()),
                context,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<PipeShared>) -> Self {
        Self { shared }
    }

    pub fn context(&self) -> &PipeContext {
        &self.shared.context
    }

    pub fn ptr_eq(&self, other: &Pipe) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Identifier assigned by external storage.
    pub fn id(&self) -> Option<u64> {
        self.shared.state.borrow().id
    }

    pub fn set_id(&self, id: Option<u64>) {
        self.shared.state.borrow_mut().id = id;
    }

    pub fn url(&self) -> Option<String> {
        self.shared.state.borrow().url.clone()
    }

    pub fn set_url(&self, url: Option<String>) {
        self.shared.state.borrow_mut().url = url;
    }

    pub fn title(&self) -> Option<String> {
        self.shared.state.borrow().title.clone()
    }

    pub fn set_title(&self, title: Option<String>) {
        self.shared.state.borrow_mut().title = title;
    }

    pub fn description(&self) -> Option<String> {
        self.shared.state.borrow().description.clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        self.shared.state.borrow_mut().description = description;
    }

    pub fn bricks(&self) -> Vec<Brick> {
        self.shared.state.borrow().bricks.clone()
    }

    pub fn brick(&self, index: usize) -> Option<Brick> {
        self.shared.state.borrow().bricks.get(index).cloned()
    }

    pub fn brick_count(&self) -> usize {
        self.shared.state.borrow().bricks.len()
    }

    pub fn encoder_count(&self) -> usize {
        self.shared
            .state
            .borrow()
            .bricks
            .iter()
            .filter(|b| b.is_encoder())
            .count()
    }

    pub fn bucket_count(&self) -> usize {
        self.shared.state.borrow().bucket_content.len()
    }

    pub fn index_of_brick(&self, brick: &Brick) -> Option<usize> {
        self.shared.state.borrow().index_of(brick)
    }

    /// Bucket a viewer shows, or the bucket right below an encoder.
    pub fn bucket_of(&self, brick: &Brick) -> PipeResult<usize> {
        let state = self.shared.state.borrow();
        let index = state.index_of(brick).ok_or(PipeError::BrickNotInPipe)?;
        Ok(state.encoder_position(index))
    }

    pub fn selected_bucket(&self) -> usize {
        self.shared.state.borrow().selected_bucket
    }

    /// Whether any brick is translating or viewing.
    pub fn is_busy(&self) -> bool {
        self.shared.state.borrow().any_busy()
    }

    /// Current content of `bucket`, without waiting.
    pub fn content(&self, bucket: usize) -> PipeResult<Chain> {
        let state = self.shared.state.borrow();
        state.check_bucket(bucket)?;
        Ok(state.bucket_content[bucket].clone())
    }

    /// Snapshot of every bucket.
    pub fn buckets(&self) -> Vec<Chain> {
        self.shared.state.borrow().bucket_content.clone()
    }

    /// Content of `bucket` once no brick is busy.
    ///
    /// Fails with `Interrupted` if the pipe structure changes while waiting, and
    /// with `Translation` if the last brick to finish failed unrecoverably.
    pub async fn wait_for_content(&self, bucket: usize) -> PipeResult<Chain> {
        let rx = {
            let mut state = self.shared.state.borrow_mut();
            state.check_bucket(bucket)?;
            if !state.any_busy() {
                return Ok(state.bucket_content[bucket].clone());
            }
            let (tx, rx) = oneshot::channel();
            state.bucket_listeners[bucket].push(tx);
            rx
        };
        rx.await.map_err(|_| PipeError::Interrupted)?
    }

    /// Wait until every brick is idle.
    pub async fn wait_until_idle(&self) -> PipeResult<()> {
        let bucket = self.selected_bucket();
        self.wait_for_content(bucket).await.map(|_| ())
    }

    /// Write `content` into `bucket` and propagate it to the neighbours.
    ///
    /// The selection moves to `bucket` unless the sender is an encoder.
    pub fn set_content(
        &self,
        content: impl Into<Chain>,
        bucket: usize,
        sender: Option<&Brick>,
    ) -> PipeResult<()> {
        let content = content.into();
        {
            let mut state = self.shared.state.borrow_mut();
            state.check_bucket(bucket)?;
            if state.bucket_content[bucket].is_equal_to(&content) {
                return Ok(());
            }
            state.bucket_content[bucket] = content.clone();
            if sender.map_or(true, Brick::is_viewer) {
                state.selected_bucket = bucket;
            }
        }
        tracing::trace!(bucket, "bucket content changed");
        if let Some(observer) = &self.shared.context.observer {
            observer.on_content_changed(bucket, &content);
        }
        self.propagate_content(bucket, sender, Propagation::Both);
        Ok(())
    }

    /// Remove `remove_count` bricks at `index` and insert `inputs` there.
    ///
    /// Outstanding [`wait_for_content`](Self::wait_for_content) calls fail with
    /// `Interrupted`. Returns the removed bricks, now detached.
    pub fn splice_bricks(
        &self,
        index: usize,
        remove_count: usize,
        inputs: Vec<BrickInput>,
    ) -> PipeResult<Vec<Brick>> {
        let count = self.brick_count();
        if index > count {
            return Err(PipeError::IndexOutOfRange { index, count });
        }
        if index + remove_count > count {
            return Err(PipeError::IndexOutOfRange {
                index: index + remove_count,
                count,
            });
        }
        let inserted = self.materialize(inputs)?;

        self.reject_listeners(PipeError::Interrupted);

        let weak = Rc::downgrade(&self.shared);
        for brick in &inserted {
            brick.core().attach(weak.clone());
        }

        let (removed, relocation) = {
            let mut state = self.shared.state.borrow_mut();
            let change_index = state.encoder_position(index) + 1;
            let removed: Vec<Brick> = state
                .bricks
                .splice(index..index + remove_count, inserted.iter().cloned())
                .collect();
            state.brick_state.splice(
                index..index + remove_count,
                inserted.iter().map(|_| BrickState::default()),
            );

            let inserted_encoders = inserted.iter().filter(|b| b.is_encoder()).count();
            let removed_encoders = removed.iter().filter(|b| b.is_encoder()).count();

            let relocation = if inserted_encoders == 0 && removed_encoders == 0 {
                None
            } else {
                let range = change_index..change_index + removed_encoders;
                let removed_content: Vec<Chain> = state
                    .bucket_content
                    .splice(
                        range.clone(),
                        std::iter::repeat_with(Chain::empty).take(inserted_encoders),
                    )
                    .collect();
                state.bucket_listeners.splice(
                    range,
                    std::iter::repeat_with(Vec::new).take(inserted_encoders),
                );

                let relocation = relocate_selection(
                    state.selected_bucket,
                    change_index,
                    inserted_encoders,
                    removed_encoders,
                );
                state.selected_bucket = relocation.selected_bucket;
                if relocation.seed_with_removed {
                    if let Some(seed) = removed_content.into_iter().next() {
                        state.bucket_content[change_index] = seed;
                    }
                }
                tracing::debug!(
                    change_index,
                    inserted = inserted_encoders,
                    removed = removed_encoders,
                    case = ?relocation.case,
                    selected = relocation.selected_bucket,
                    "buckets spliced"
                );
                Some(relocation)
            };
            (removed, relocation)
        };

        for brick in &removed {
            brick.core().detach();
            self.notify(brick, BrickEvent::Detached);
        }
        for brick in &inserted {
            self.notify(brick, BrickEvent::Attached);
        }

        if let Some(relocation) = relocation {
            if relocation.seed_with_removed {
                if let (Some(observer), Ok(content)) =
                    (&self.shared.context.observer, self.content(relocation.origin))
                {
                    observer.on_content_changed(relocation.origin, &content);
                }
            }
            self.propagate_content(relocation.origin, None, relocation.direction);
        }
        for viewer in inserted.iter().filter(|b| b.is_viewer()) {
            self.trigger_viewer_view(viewer.clone());
        }
        Ok(removed)
    }

    fn materialize(&self, inputs: Vec<BrickInput>) -> PipeResult<Vec<Brick>> {
        let mut bricks: Vec<Brick> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let brick = match input {
                BrickInput::Brick(brick) => {
                    if brick.core().is_attached() || bricks.iter().any(|b| b.ptr_eq(&brick)) {
                        return Err(PipeError::BrickAlreadyAttached(brick.name().to_owned()));
                    }
                    brick
                }
                BrickInput::Spec(spec) => self.shared.context.registry.materialize(&spec)?,
            };
            bricks.push(brick);
        }
        Ok(bricks)
    }

    pub fn append_brick(&self, input: impl Into<BrickInput>) -> PipeResult<Brick> {
        self.insert_brick(self.brick_count(), input)
    }

    pub fn append_bricks(&self, inputs: Vec<BrickInput>) -> PipeResult<()> {
        self.splice_bricks(self.brick_count(), 0, inputs).map(|_| ())
    }

    /// Insert a brick at `index` and return it.
    pub fn insert_brick(&self, index: usize, input: impl Into<BrickInput>) -> PipeResult<Brick> {
        self.splice_bricks(index, 0, vec![input.into()])?;
        self.brick(index).ok_or(PipeError::IndexOutOfRange {
            index,
            count: self.brick_count(),
        })
    }

    pub fn remove_brick(&self, brick: &Brick) -> PipeResult<()> {
        let index = self.index_of_brick(brick).ok_or(PipeError::BrickNotInPipe)?;
        self.splice_bricks(index, 1, Vec::new()).map(|_| ())
    }

    /// Replace `brick` in place and return the replacement.
    pub fn replace_brick(&self, brick: &Brick, input: impl Into<BrickInput>) -> PipeResult<Brick> {
        let index = self.index_of_brick(brick).ok_or(PipeError::BrickNotInPipe)?;
        self.splice_bricks(index, 1, vec![input.into()])?;
        self.brick(index).ok_or(PipeError::BrickNotInPipe)
    }

    /// Randomize a brick's settings with the context's generator.
    pub fn randomize_brick_settings(&self, brick: &Brick) -> PipeResult<Vec<String>> {
        if self.index_of_brick(brick).is_none() {
            return Err(PipeError::BrickNotInPipe);
        }
        let mut rng = self.shared.context.rng.borrow_mut();
        brick.randomize_settings(&mut *rng)
    }

    /// Called by a brick after one of its settings changed.
    ///
    /// An encoder translates toward the side away from the selection; a
    /// viewer re-renders.
    pub fn brick_setting_did_change(&self, brick: &Brick) -> PipeResult<()> {
        let encode = {
            let mut state = self.shared.state.borrow_mut();
            let index = state.index_of(brick).ok_or(PipeError::BrickNotInPipe)?;
            state.brick_state[index].settings_version += 1;
            state.selected_bucket <= state.encoder_position(index)
        };
        self.notify(brick, BrickEvent::SettingChanged);
        match brick {
            Brick::Encoder(_) => self.trigger_encoder_translation(brick.clone(), encode),
            Brick::Viewer(_) => self.trigger_viewer_view(brick.clone()),
        }
        Ok(())
    }

    /// Re-render a viewer after its presenter changed. A view in flight is repeated.
    pub(crate) fn refresh_viewer(&self, brick: &Brick) {
        {
            let mut state = self.shared.state.borrow_mut();
            let Some(index) = state.index_of(brick) else {
                return;
            };
            state.brick_state[index].settings_version += 1;
        }
        self.trigger_viewer_view(brick.clone());
    }

    fn propagate_content(&self, bucket: usize, sender: Option<&Brick>, direction: Propagation) {
        let (lower, upper, viewers) = {
            let state = self.shared.state.borrow();
            let lower = bucket.checked_sub(1).and_then(|p| state.encoder_at(p));
            (lower, state.encoder_at(bucket), state.viewers_on(bucket))
        };
        let is_sender = |brick: &Brick| sender.is_some_and(|s| s.ptr_eq(brick));

        if direction != Propagation::Forward {
            if let Some(lower) = lower.filter(|b| !is_sender(b)) {
                self.trigger_encoder_translation(lower, false);
            }
        }
        if direction != Propagation::Backward {
            if let Some(upper) = upper.filter(|b| !is_sender(b)) {
                self.trigger_encoder_translation(upper, true);
            }
        }
        for viewer in viewers.into_iter().filter(|b| !is_sender(b)) {
            self.trigger_viewer_view(viewer);
        }
    }

    fn trigger_encoder_translation(&self, brick: Brick, is_encode: bool) {
        let job = {
            let mut state = self.shared.state.borrow_mut();
            match state.index_of(&brick) {
                Some(index) => state.begin_translation(index, is_encode),
                None => None,
            }
        };
        let Some(job) = job else {
            return;
        };
        let pipe = self.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = pipe.run_translation(&brick, job).await {
                tracing::error!(brick = brick.name(), error = %e, "translation failed");
            }
        });
    }

    async fn run_translation(&self, brick: &Brick, mut job: TranslationJob) -> PipeResult<()> {
        let encoder = brick.as_encoder().cloned().ok_or(PipeError::NotAnEncoder)?;
        loop {
            let result = encoder.translate(job.source.clone(), job.is_encode).await;
            let (repeat, outcome) = self.complete_translation(brick, &job, result);
            match repeat {
                Some(next) => {
                    if let Err(e) = outcome {
                        tracing::error!(brick = brick.name(), error = %e, "translation failed");
                    }
                    job = next;
                }
                None => return outcome,
            }
        }
    }

    /// Bookkeeping after an encoder returned. Yields the follow-up job, if any.
    fn complete_translation(
        &self,
        brick: &Brick,
        job: &TranslationJob,
        result: BrickResult<Chain>,
    ) -> (Option<TranslationJob>, PipeResult<()>) {
        let flipped = {
            let mut state = self.shared.state.borrow_mut();
            let Some(index) = state.index_of(brick) else {
                tracing::debug!(brick = brick.name(), "brick left the pipe, discarding result");
                return (None, Ok(()));
            };
            state.brick_state[index].busy = false;
            let (_, result_bucket) = state.translation_buckets(index, job.is_encode);
            let selected = state.selected_bucket;
            let flipped = if job.is_encode {
                selected >= result_bucket
            } else {
                selected <= result_bucket
            };
            if flipped {
                tracing::debug!(
                    brick = brick.name(),
                    encode = job.is_encode,
                    "selection moved across encoder, translating the other way"
                );
                Some(state.begin_translation(index, !job.is_encode))
            } else {
                None
            }
        };

        let mut outcome = Ok(());
        let repeat = match flipped {
            Some(repeat) => repeat,
            None => {
                if let Ok(output) = &result {
                    let result_bucket = {
                        let state = self.shared.state.borrow();
                        state
                            .index_of(brick)
                            .map(|index| state.translation_buckets(index, job.is_encode).1)
                    };
                    if let Some(result_bucket) = result_bucket {
                        outcome = self.set_content(output.clone(), result_bucket, Some(brick));
                    }
                }
                let mut state = self.shared.state.borrow_mut();
                match state.index_of(brick) {
                    Some(index) => {
                        let (source_bucket, _) = state.translation_buckets(index, job.is_encode);
                        let stale = !state.bucket_content[source_bucket].is_equal_to(&job.source)
                            || state.brick_state[index].settings_version != job.settings_version;
                        if stale {
                            tracing::debug!(
                                brick = brick.name(),
                                "input changed during translation, repeating"
                            );
                            state.begin_translation(index, job.is_encode)
                        } else {
                            None
                        }
                    }
                    None => None,
                }
            }
        };

        let event = match &result {
            Ok(_) => BrickEvent::TranslationFinished {
                is_encode: job.is_encode,
            },
            Err(e) => BrickEvent::TranslationFailed(e.clone()),
        };
        self.notify(brick, event);
        self.brick_did_finish(result.as_ref().err());

        let outcome = match result {
            Err(e) if !e.is_recoverable() => Err(PipeError::Translation(e)),
            _ => outcome,
        };
        (repeat, outcome)
    }

    fn trigger_viewer_view(&self, brick: Brick) {
        let job = {
            let mut state = self.shared.state.borrow_mut();
            match state.index_of(&brick) {
                Some(index) => state.begin_view(index),
                None => None,
            }
        };
        let Some(job) = job else {
            return;
        };
        let pipe = self.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = pipe.run_view(&brick, job).await {
                tracing::error!(brick = brick.name(), error = %e, "view failed");
            }
        });
    }

    async fn run_view(&self, brick: &Brick, mut job: ViewJob) -> PipeResult<()> {
        let Some(viewer) = brick.as_viewer().cloned() else {
            return Ok(());
        };
        loop {
            let result = viewer.view(job.source.clone()).await;
            let (repeat, outcome) = self.complete_view(brick, &job, result);
            match repeat {
                Some(next) => {
                    if let Err(e) = outcome {
                        tracing::error!(brick = brick.name(), error = %e, "view failed");
                    }
                    job = next;
                }
                None => return outcome,
            }
        }
    }

    fn complete_view(
        &self,
        brick: &Brick,
        job: &ViewJob,
        result: BrickResult<()>,
    ) -> (Option<ViewJob>, PipeResult<()>) {
        let repeat = {
            let mut state = self.shared.state.borrow_mut();
            let Some(index) = state.index_of(brick) else {
                return (None, Ok(()));
            };
            state.brick_state[index].busy = false;
            let bucket = state.encoder_position(index);
            let stale = !state.bucket_content[bucket].is_equal_to(&job.source)
                || state.brick_state[index].settings_version != job.settings_version;
            if stale {
                state.begin_view(index)
            } else {
                None
            }
        };

        let event = match &result {
            Ok(()) => BrickEvent::Viewed,
            Err(e) => BrickEvent::TranslationFailed(e.clone()),
        };
        self.notify(brick, event);
        self.brick_did_finish(result.as_ref().err());

        let outcome = match result {
            Err(e) if !e.is_recoverable() => Err(PipeError::Translation(e)),
            _ => Ok(()),
        };
        (repeat, outcome)
    }

    /// Release waiters once nothing is busy anymore.
    fn brick_did_finish(&self, error: Option<&BrickError>) {
        let listeners = {
            let mut state = self.shared.state.borrow_mut();
            if state.any_busy() {
                return;
            }
            let mut listeners = Vec::new();
            for (bucket, tx) in state.take_listeners() {
                listeners.push((state.bucket_content[bucket].clone(), tx));
            }
            listeners
        };
        let failure = error.filter(|e| !e.is_recoverable());
        for (content, tx) in listeners {
            let outcome = match failure {
                Some(e) => Err(PipeError::Translation(e.clone())),
                None => Ok(content),
            };
            let _ = tx.send(outcome);
        }
    }

    fn reject_listeners(&self, error: PipeError) {
        let listeners = self.shared.state.borrow_mut().take_listeners();
        if !listeners.is_empty() {
            tracing::debug!(count = listeners.len(), "rejecting pending waiters");
        }
        for (_, tx) in listeners {
            let _ = tx.send(Err(error.clone()));
        }
    }

    fn notify(&self, brick: &Brick, event: BrickEvent) {
        if let Some(observer) = &self.shared.context.observer {
            observer.on_brick_event(brick, &event);
        }
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Pipe")
            .field("title", &state.title)
            .field("bricks", &state.bricks)
            .field("buckets", &state.bucket_content.len())
            .field("selected_bucket", &state.selected_bucket)
            .finish()
    }
}
