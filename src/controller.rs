use crate::{
    error::TransportError,
    messages::{ErrorPayload, FormValues, GenerateRequest, VIDEO_FILENAME},
    object_url::{ObjectUrl, ObjectUrls},
    transport::{GenerateTransport, TransportResponse},
    view::{FormView, StatusTone},
};

/// Label of the generate button while idle.
pub const IDLE_LABEL: &str = "Generate video";
/// Label of the generate button while a request is in flight.
pub const LOADING_LABEL: &str = "Generating...";

pub const MSG_EMPTY_PROMPT: &str = "Please enter a prompt.";
pub const MSG_GENERATING: &str = "Spinning up the Veo model. This can take up to a minute...";
pub const MSG_DONE: &str = "Done! Enjoy your new clip.";
/// Shown when the server fails without saying why.
pub const MSG_GENERATION_FAILED: &str = "Generation failed.";
/// Shown when an error carries no message at all.
pub const MSG_SOMETHING_WRONG: &str = "Something went wrong.";

const VIDEO_MIME: &str = "video/mp4";

/// Represents what the form is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiState {
    /// Nothing submitted yet.
    Idle,
    /// A request is in flight and the generate button is disabled.
    Loading,
    /// The last attempt produced a video.
    ShowingResult,
    /// The last attempt failed; the status line says why.
    ShowingError,
}

impl UiState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Loading => "loading",
            UiState::ShowingResult => "showing-result",
            UiState::ShowingError => "showing-error",
        }
    }
}

/// Drives the generation form: validates input, submits it, and turns the
/// answer into either a playable video or a status message.
///
/// The controller owns the single live object URL. A new one is only created
/// after the previous one has been revoked.
///
/// A submission is split in two halves around the network call
/// ([`begin_submit`](Self::begin_submit) and
/// [`complete_submit`](Self::complete_submit)) so that callers holding the
/// controller behind a `RefCell` never keep it borrowed across an await.
/// [`submit`](Self::submit) runs both halves with the controller's own
/// transport.
pub struct FormController<V, T, U> {
    view: V,
    transport: T,
    urls: U,
    state: UiState,
    current_url: Option<ObjectUrl>,
}

impl<V: FormView, T, U: ObjectUrls> FormController<V, T, U> {
    /// Creates an idle controller with no video.
    pub fn new(view: V, transport: T, urls: U) -> Self {
        Self {
            view,
            transport,
            urls,
            state: UiState::Idle,
            current_url: None,
        }
    }

    /// Returns what the form is currently showing.
    pub fn state(&self) -> UiState {
        self.state
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == UiState::Loading
    }

    /// The live object URL of the last generated video, if any.
    pub fn current_url(&self) -> Option<&ObjectUrl> {
        self.current_url.as_ref()
    }

    /// The page the controller drives.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The transport used by [`submit`](Self::submit).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates the form and switches the UI to loading.
    ///
    /// Returns the request to send, or `None` when the prompt is blank, in
    /// which case a validation message is shown and nothing must be sent.
    pub fn begin_submit(&mut self, values: &FormValues) -> Option<GenerateRequest> {
        let Some(request) = values.to_request() else {
            log::debug!("Rejected submission with an empty prompt");
            self.view.set_status(MSG_EMPTY_PROMPT, StatusTone::Error);
            self.state = UiState::ShowingError;
            return None;
        };

        self.set_loading(true);
        self.view.set_status(MSG_GENERATING, StatusTone::Normal);
        self.state = UiState::Loading;

        log::info!(
            "Submitting generation ({}, {})",
            request.aspect_ratio,
            request.resolution
        );

        Some(request)
    }

    /// Applies the outcome of the network call started by
    /// [`begin_submit`](Self::begin_submit), then restores the generate
    /// button whatever happened.
    pub fn complete_submit(&mut self, outcome: Result<TransportResponse, TransportError>) {
        match self.apply_outcome(outcome) {
            Ok(()) => {
                self.view.set_status(MSG_DONE, StatusTone::Normal);
                self.state = UiState::ShowingResult;
            }
            Err(message) => {
                log::error!("Video generation failed: {message}");
                self.view.set_status(&message, StatusTone::Error);
                self.state = UiState::ShowingError;
            }
        }

        log::debug!("Form is now {}", self.state.as_str());
        self.set_loading(false);
    }

    /// Starts a download of the current video. Does nothing before the first
    /// successful generation.
    pub fn download(&mut self) {
        let Some(url) = &self.current_url else {
            return;
        };
        self.view.trigger_download(url, VIDEO_FILENAME);
    }

    fn apply_outcome(
        &mut self,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Result<(), String> {
        let response = outcome.map_err(|e| non_empty(e.to_string(), MSG_SOMETHING_WRONG))?;

        if !response.is_success() {
            let payload = ErrorPayload::parse_lenient(&response.body);
            log::debug!("Server answered {}", response.status);
            return Err(non_empty(
                payload.error.unwrap_or_default(),
                MSG_GENERATION_FAILED,
            ));
        }

        if let Some(previous) = self.current_url.take() {
            self.urls.revoke(&previous);
        }

        let url = match self.urls.create(response.body, VIDEO_MIME) {
            Ok(url) => url,
            Err(err) => {
                // the player may still point at the url revoked above
                self.view.clear_video();
                return Err(non_empty(err.to_string(), MSG_SOMETHING_WRONG));
            }
        };

        self.view.show_video(&url);
        self.view.hide_placeholder();
        self.view.set_download_enabled(true);
        self.current_url = Some(url);

        Ok(())
    }

    fn set_loading(&mut self, loading: bool) {
        let label = if loading { LOADING_LABEL } else { IDLE_LABEL };
        self.view.set_generate_button(!loading, label);
        let has_video = self.current_url.is_some();
        self.view.set_download_enabled(!loading && has_video);
    }
}

impl<V: FormView, T: GenerateTransport, U: ObjectUrls> FormController<V, T, U> {
    /// Runs a whole submission: validate, send, and render the outcome.
    pub async fn submit(&mut self, values: &FormValues) {
        let Some(request) = self.begin_submit(values) else {
            return;
        };
        let outcome = self.transport.generate(&request).await;
        self.complete_submit(outcome);
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::{error::ObjectUrlError, object_url::MemoryObjectUrls};

    #[derive(Default)]
    struct RecordingView {
        status: String,
        tone: Option<StatusTone>,
        generate_enabled: bool,
        generate_label: String,
        download_enabled: bool,
        video_src: Option<ObjectUrl>,
        placeholder_hidden: bool,
        downloads: Vec<(ObjectUrl, String)>,
    }

    impl FormView for RecordingView {
        fn set_status(&mut self, message: &str, tone: StatusTone) {
            self.status = message.to_string();
            self.tone = Some(tone);
        }

        fn set_generate_button(&mut self, enabled: bool, label: &str) {
            self.generate_enabled = enabled;
            self.generate_label = label.to_string();
        }

        fn set_download_enabled(&mut self, enabled: bool) {
            self.download_enabled = enabled;
        }

        fn show_video(&mut self, url: &ObjectUrl) {
            self.video_src = Some(url.clone());
        }

        fn hide_placeholder(&mut self) {
            self.placeholder_hidden = true;
        }

        fn clear_video(&mut self) {
            self.video_src = None;
        }

        fn trigger_download(&mut self, url: &ObjectUrl, filename: &str) {
            self.downloads.push((url.clone(), filename.to_string()));
        }
    }

    /// Answers every request with the queued responses, in order.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: RefCell<Vec<Result<TransportResponse, TransportError>>>,
        sent: RefCell<Vec<GenerateRequest>>,
    }

    impl ScriptedTransport {
        fn answering(status: u16, body: &'static [u8]) -> Self {
            let transport = Self::default();
            transport.push(status, body);
            transport
        }

        fn push(&self, status: u16, body: &'static [u8]) {
            self.responses.borrow_mut().push(Ok(TransportResponse {
                status,
                body: Bytes::from_static(body),
            }));
        }
    }

    #[async_trait(?Send)]
    impl GenerateTransport for ScriptedTransport {
        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.sent.borrow_mut().push(request.clone());
            self.responses.borrow_mut().remove(0)
        }
    }

    /// Creates `budget` urls, then fails every further attempt.
    struct LimitedUrls {
        inner: MemoryObjectUrls,
        budget: usize,
    }

    impl LimitedUrls {
        fn new(budget: usize) -> Self {
            Self {
                inner: MemoryObjectUrls::new(),
                budget,
            }
        }
    }

    impl ObjectUrls for LimitedUrls {
        fn create(&mut self, blob: Bytes, mime_type: &str) -> Result<ObjectUrl, ObjectUrlError> {
            if self.budget == 0 {
                return Err(ObjectUrlError::Create("out of memory".to_string()));
            }
            self.budget -= 1;
            self.inner.create(blob, mime_type)
        }

        fn revoke(&mut self, url: &ObjectUrl) {
            self.inner.revoke(url);
        }
    }

    fn form(prompt: &str) -> FormValues {
        FormValues {
            prompt: prompt.to_string(),
            negative_prompt: String::new(),
            aspect_ratio: "16:9".to_string(),
            resolution: "720p".to_string(),
        }
    }

    fn controller(
        transport: ScriptedTransport,
    ) -> (
        FormController<RecordingView, ScriptedTransport, MemoryObjectUrls>,
        MemoryObjectUrls,
    ) {
        let urls = MemoryObjectUrls::new();
        (
            FormController::new(RecordingView::default(), transport, urls.clone()),
            urls,
        )
    }

    #[tokio::test]
    async fn whitespace_prompt_is_rejected_without_network() {
        for prompt in ["", " ", "\t\n", "   \r\n  "] {
            let (mut controller, _) = controller(ScriptedTransport::default());
            controller.submit(&form(prompt)).await;

            assert!(controller.transport().sent.borrow().is_empty());
            assert_eq!(controller.view().status, MSG_EMPTY_PROMPT);
            assert_eq!(controller.view().tone, Some(StatusTone::Error));
            assert_eq!(controller.state(), UiState::ShowingError);
        }
    }

    #[tokio::test]
    async fn cat_surfing_scenario() {
        let (mut controller, urls) =
            controller(ScriptedTransport::answering(200, b"\x00\x00\x00\x18ftypmp42"));
        let values = FormValues {
            prompt: "a cat surfing".to_string(),
            negative_prompt: "low quality".to_string(),
            aspect_ratio: "9:16".to_string(),
            resolution: "1080p".to_string(),
        };

        controller.submit(&values).await;

        let sent = controller.transport().sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            serde_json::json!({
                "prompt": "a cat surfing",
                "negative_prompt": "low quality",
                "aspect_ratio": "9:16",
                "resolution": "1080p",
            })
        );

        let view = controller.view();
        let src = view.video_src.as_ref().unwrap();
        assert!(src.as_str().starts_with("blob:"));
        assert_eq!(
            urls.resolve(src),
            Some(Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"))
        );
        assert!(view.placeholder_hidden);
        assert!(view.download_enabled);
        assert_eq!(view.status, MSG_DONE);
        assert_eq!(controller.state(), UiState::ShowingResult);
    }

    #[tokio::test]
    async fn second_success_revokes_previous_url() {
        let transport = ScriptedTransport::answering(200, b"first");
        transport.push(200, b"second");
        let (mut controller, urls) = controller(transport);

        controller.submit(&form("a cat surfing")).await;
        let first = controller.current_url().cloned().unwrap();

        controller.submit(&form("a dog skiing")).await;
        let second = controller.current_url().cloned().unwrap();

        assert_ne!(first, second);
        assert_eq!(urls.live_count(), 1);
        assert_eq!(urls.resolve(&first), None);
        assert_eq!(urls.resolve(&second), Some(Bytes::from_static(b"second")));
        assert_eq!(controller.view().video_src.as_ref(), Some(&second));
    }

    #[tokio::test]
    async fn server_error_message_is_shown() {
        let (mut controller, urls) =
            controller(ScriptedTransport::answering(400, br#"{"error":"bad input"}"#));
        controller.submit(&form("a cat surfing")).await;

        assert_eq!(controller.view().status, "bad input");
        assert_eq!(controller.view().tone, Some(StatusTone::Error));
        assert_eq!(controller.state(), UiState::ShowingError);
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn unparsable_error_body_uses_fallback() {
        let bodies: [&'static [u8]; 4] = [b"<html>502 Bad Gateway</html>", b"", b"{}", br#"{"error":""}"#];
        for body in bodies {
            let (mut controller, _) = controller(ScriptedTransport::answering(502, body));
            controller.submit(&form("a cat surfing")).await;
            assert_eq!(controller.view().status, MSG_GENERATION_FAILED);
        }
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let transport = ScriptedTransport::default();
        transport
            .responses
            .borrow_mut()
            .push(Err(TransportError::InvalidUrl("offline".to_string())));
        let (mut controller, _) = controller(transport);

        controller.submit(&form("a cat surfing")).await;

        assert_eq!(controller.view().status, "invalid endpoint url: offline");
        assert_eq!(controller.state(), UiState::ShowingError);
    }

    #[tokio::test]
    async fn object_url_failure_is_reported() {
        let mut controller = FormController::new(
            RecordingView::default(),
            ScriptedTransport::answering(200, b"video"),
            LimitedUrls::new(0),
        );
        controller.submit(&form("a cat surfing")).await;

        assert_eq!(
            controller.view().status,
            "could not create object url: out of memory"
        );
        assert!(controller.current_url().is_none());
        assert!(!controller.view().download_enabled);
    }

    #[tokio::test]
    async fn failed_url_creation_leaves_no_stale_video() {
        let transport = ScriptedTransport::answering(200, b"first");
        transport.push(200, b"second");
        let urls = LimitedUrls::new(1);
        let live = urls.inner.clone();
        let mut controller = FormController::new(RecordingView::default(), transport, urls);

        controller.submit(&form("a cat surfing")).await;
        assert!(controller.view().download_enabled);

        controller.submit(&form("a dog skiing")).await;

        assert_eq!(controller.state(), UiState::ShowingError);
        assert!(controller.current_url().is_none());
        assert_eq!(controller.view().video_src, None);
        assert_eq!(live.live_count(), 0);
        assert!(!controller.view().download_enabled);

        controller.download();
        assert!(controller.view().downloads.is_empty());
    }

    #[test]
    fn state_names_are_stable() {
        let names = [
            UiState::Idle,
            UiState::Loading,
            UiState::ShowingResult,
            UiState::ShowingError,
        ]
        .map(|state| state.as_str());
        assert_eq!(names, ["idle", "loading", "showing-result", "showing-error"]);
    }

    #[tokio::test]
    async fn button_is_restored_after_every_attempt() {
        let transport = ScriptedTransport::answering(200, b"video");
        transport.push(500, br#"{"error":"Video generation failed: boom"}"#);
        let (mut controller, _) = controller(transport);

        controller.submit(&form("first")).await;
        assert!(controller.view().generate_enabled);
        assert_eq!(controller.view().generate_label, IDLE_LABEL);

        controller.submit(&form("second")).await;
        assert!(controller.view().generate_enabled);
        assert_eq!(controller.view().generate_label, IDLE_LABEL);
        // the earlier video is still playable
        assert!(controller.view().download_enabled);
    }

    #[test]
    fn begin_submit_disables_controls() {
        let (mut controller, _) = controller(ScriptedTransport::default());

        let request = controller.begin_submit(&form("  a cat surfing  ")).unwrap();

        assert_eq!(request.prompt, "a cat surfing");
        assert!(controller.is_loading());
        assert!(!controller.view().generate_enabled);
        assert_eq!(controller.view().generate_label, LOADING_LABEL);
        assert!(!controller.view().download_enabled);
        assert_eq!(controller.view().status, MSG_GENERATING);
        assert_eq!(controller.view().tone, Some(StatusTone::Normal));
    }

    #[test]
    fn download_without_video_does_nothing() {
        let (mut controller, _) = controller(ScriptedTransport::default());
        controller.download();
        assert!(controller.view().downloads.is_empty());
    }

    #[tokio::test]
    async fn download_uses_current_url_and_fixed_name() {
        let (mut controller, _) = controller(ScriptedTransport::answering(200, b"video"));
        controller.submit(&form("a cat surfing")).await;
        controller.download();

        let url = controller.current_url().cloned().unwrap();
        assert_eq!(
            controller.view().downloads,
            vec![(url, VIDEO_FILENAME.to_string())]
        );
    }
}
