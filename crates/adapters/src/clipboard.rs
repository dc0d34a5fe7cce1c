use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard is unavailable: {0}")]
    Unavailable(#[source] arboard::Error),
    #[error("failed to copy to clipboard: {0}")]
    Write(#[source] arboard::Error),
}

/// Destination for copied result rows.
pub trait TextClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard opened on first use.
///
/// The handle stays alive afterwards; on X11 the copied text is lost as soon as
/// the owning handle is dropped.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextClipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|error| {
                warn!(%error, "opening clipboard failed");
                ClipboardError::Unavailable(error)
            })?,
        };
        let clipboard = self.inner.insert(clipboard);

        clipboard
            .set_text(text.to_string())
            .map_err(ClipboardError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClipboardError, SystemClipboard};

    #[test]
    fn clipboard_is_not_opened_until_used() {
        let clipboard = SystemClipboard::new();
        assert!(clipboard.inner.is_none());
    }

    #[test]
    fn errors_describe_the_failed_step() {
        let unavailable = ClipboardError::Unavailable(arboard::Error::ClipboardNotSupported);
        assert!(unavailable.to_string().starts_with("clipboard is unavailable"));

        let write = ClipboardError::Write(arboard::Error::ContentNotAvailable);
        assert!(write.to_string().starts_with("failed to copy to clipboard"));
    }
}
