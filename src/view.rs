use crate::object_url::ObjectUrl;

/// Colour of the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Normal,
    Error,
}

impl StatusTone {
    /// CSS colour applied to the status display.
    pub fn color(&self) -> &'static str {
        match self {
            StatusTone::Normal => "#c7cfe2",
            StatusTone::Error => "#ff7b7b",
        }
    }
}

/// The page elements the form controller drives, addressed by role.
///
/// The browser implementation maps each call onto a DOM mutation; the
/// terminal client prints and writes files instead.
pub trait FormView {
    /// Status display: text and colour.
    fn set_status(&mut self, message: &str, tone: StatusTone);

    /// Generate button: enabled flag and label.
    fn set_generate_button(&mut self, enabled: bool, label: &str);

    /// Download button enabled flag.
    fn set_download_enabled(&mut self, enabled: bool);

    /// Points the video player at `url` and un-hides it.
    fn show_video(&mut self, url: &ObjectUrl);

    /// Hides the placeholder shown before the first result.
    fn hide_placeholder(&mut self);

    /// Detaches the player from its source and hides it again.
    fn clear_video(&mut self);

    /// Saves the blob behind `url` under `filename`.
    fn trigger_download(&mut self, url: &ObjectUrl, filename: &str);
}
