use crate::chain::Chain;
use crate::pipe::error::{BrickError, BrickResult};
use crate::pipe::viewer::ViewerPlugin;
use crate::settings::SettingValues;
use async_trait::async_trait;

/// Shows a bucket as plain text. Edits come back through `Viewer::submit`.
pub struct TextViewer;

#[async_trait(?Send)]
impl ViewerPlugin for TextViewer {
    fn name(&self) -> &str {
        "text"
    }

    fn title(&self) -> &str {
        "Text"
    }

    async fn perform_view(&self, content: Chain, _settings: &SettingValues) -> BrickResult<Chain> {
        content.string().map_err(|e| {
            BrickError::invalid_input(format!("Content cannot be shown as text: {}", e))
        })?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binary_content_is_recoverable() {
        let settings = SettingValues::new();
        let err = TextViewer
            .perform_view(Chain::from(vec![0xffu8]), &settings)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());

        let shown = TextViewer
            .perform_view(Chain::from("hi"), &settings)
            .await
            .unwrap();
        assert_eq!(shown, Chain::from("hi"));
    }
}
