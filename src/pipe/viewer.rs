//! Viewer bricks: terminal stages rendering one bucket.

use crate::chain::Chain;
use crate::pipe::brick::{Brick, BrickCore};
use crate::pipe::error::{BrickResult, PipeError, PipeResult};
use crate::settings::{Setting, SettingValues, SettingsCollection};
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;

/// Brick-specific behaviour of a viewer.
#[async_trait(?Send)]
pub trait ViewerPlugin {
    fn name(&self) -> &str;

    fn title(&self) -> &str;

    fn settings(&self) -> Vec<Setting> {
        Vec::new()
    }

    fn revalidate(&self, _settings: &mut SettingsCollection) {}

    /// Render `content`; the result is handed to the attached presenter.
    async fn perform_view(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain>;
}

/// Receives rendered views. Implemented by whatever displays a viewer.
pub trait ViewPresenter {
    fn present(&self, view: &Chain);
}

pub struct Viewer {
    core: BrickCore,
    plugin: Box<dyn ViewerPlugin>,
    presenter: RefCell<Option<Rc<dyn ViewPresenter>>>,
    pending: RefCell<Option<Chain>>,
    last_view: RefCell<Option<Chain>>,
}

impl Viewer {
    pub fn new(plugin: impl ViewerPlugin + 'static) -> PipeResult<Rc<Self>> {
        Self::from_boxed(Box::new(plugin))
    }

    pub fn from_boxed(plugin: Box<dyn ViewerPlugin>) -> PipeResult<Rc<Self>> {
        let mut settings = SettingsCollection::from_settings(plugin.settings())?;
        plugin.revalidate(&mut settings);
        Ok(Rc::new(Self {
            core: BrickCore::new(plugin.name(), plugin.title(), settings),
            plugin,
            presenter: RefCell::new(None),
            pending: RefCell::new(None),
            last_view: RefCell::new(None),
        }))
    }

    pub fn core(&self) -> &BrickCore {
        &self.core
    }

    pub fn plugin(&self) -> &dyn ViewerPlugin {
        self.plugin.as_ref()
    }

    pub fn has_presenter(&self) -> bool {
        self.presenter.borrow().is_some()
    }

    /// Content waiting for a presenter.
    pub fn pending_view(&self) -> Option<Chain> {
        self.pending.borrow().clone()
    }

    /// Last output handed to the presenter.
    pub fn last_view(&self) -> Option<Chain> {
        self.last_view.borrow().clone()
    }

    /// Render `content`. Without a presenter the call is kept until one attaches;
    /// a later call replaces it.
    pub async fn view(&self, content: Chain) -> BrickResult<()> {
        let presenter = self.presenter.borrow().clone();
        let Some(presenter) = presenter else {
            *self.pending.borrow_mut() = Some(content);
            return Ok(());
        };

        let result = match self.core.check_settings() {
            Ok(settings) => self.plugin.perform_view(content, &settings).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(output) => {
                presenter.present(&output);
                *self.last_view.borrow_mut() = Some(output);
                *self.core.last_error.borrow_mut() = None;
                Ok(())
            }
            Err(e) => {
                tracing::trace!(brick = self.core.name(), error = %e, "view failed");
                *self.core.last_error.borrow_mut() = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Attach a presenter and replay the pending view, if any.
    ///
    /// Inside a pipe the replay is scheduled by the pipe and renders the
    /// current bucket, so `Pipe::wait_until_idle` covers it.
    pub async fn attach(self: &Rc<Self>, presenter: Rc<dyn ViewPresenter>) -> BrickResult<()> {
        *self.presenter.borrow_mut() = Some(presenter);
        let pending = self.pending.borrow_mut().take();
        match (pending, self.core.pipe()) {
            (Some(_), Some(pipe)) => {
                pipe.refresh_viewer(&Brick::Viewer(self.clone()));
                Ok(())
            }
            (Some(content), None) => self.view(content).await,
            (None, _) => Ok(()),
        }
    }

    /// Later views are queued again.
    pub fn detach_presenter(&self) -> Option<Rc<dyn ViewPresenter>> {
        self.presenter.borrow_mut().take()
    }

    /// User edit: write `content` into the bucket this viewer sits on.
    pub fn submit(self: &Rc<Self>, content: impl Into<Chain>) -> PipeResult<()> {
        let pipe = self.core.pipe().ok_or(PipeError::BrickNotInPipe)?;
        let brick = Brick::Viewer(self.clone());
        let bucket = pipe.bucket_of(&brick)?;
        pipe.set_content(content.into(), bucket, Some(&brick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Shout;

    #[async_trait(?Send)]
    impl ViewerPlugin for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn title(&self) -> &str {
            "Shout"
        }

        async fn perform_view(&self, content: Chain, _: &SettingValues) -> BrickResult<Chain> {
            Ok(content.to_upper_case()?)
        }
    }

    #[derive(Default)]
    struct Recorder {
        views: RefCell<Vec<String>>,
    }

    impl ViewPresenter for Recorder {
        fn present(&self, view: &Chain) {
            self.views.borrow_mut().push(view.to_string());
        }
    }

    #[tokio::test]
    async fn test_pending_view_replayed_on_attach() {
        let viewer = Viewer::new(Shout).unwrap();
        viewer.view(Chain::from("first")).await.unwrap();
        viewer.view(Chain::from("second")).await.unwrap();
        assert_eq!(viewer.pending_view(), Some(Chain::from("second")));

        let recorder = Rc::new(Recorder::default());
        viewer.attach(recorder.clone()).await.unwrap();
        assert_eq!(*recorder.views.borrow(), vec!["SECOND".to_string()]);
        assert!(viewer.pending_view().is_none());
        assert_eq!(viewer.last_view(), Some(Chain::from("SECOND")));
    }

    #[tokio::test]
    async fn test_detach_queues_again() {
        let viewer = Viewer::new(Shout).unwrap();
        let recorder = Rc::new(Recorder::default());
        viewer.attach(recorder.clone()).await.unwrap();
        viewer.view(Chain::from("a")).await.unwrap();

        assert!(viewer.detach_presenter().is_some());
        viewer.view(Chain::from("b")).await.unwrap();
        assert_eq!(*recorder.views.borrow(), vec!["A".to_string()]);
        assert_eq!(viewer.pending_view(), Some(Chain::from("b")));
    }

    #[test]
    fn test_submit_requires_pipe() {
        let viewer = Viewer::new(Shout).unwrap();
        assert_eq!(viewer.submit("x"), Err(PipeError::BrickNotInPipe));
    }
}
