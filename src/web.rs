//! Browser binding: wires the form controller to the page's DOM.
//!
//! Build with: `wasm-pack build --target web --out-dir static/pkg`
//! and serve `static/` with the `veo-studio` server.

use std::{cell::RefCell, rc::Rc};

use bytes::Bytes;
use wasm_bindgen::{JsCast as _, closure::Closure, prelude::*};
use web_sys::{
    Blob, BlobPropertyBag, Document, Event, HtmlAnchorElement, HtmlButtonElement, HtmlElement,
    HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, HtmlVideoElement, Url,
};

use crate::{
    controller::FormController,
    error::ObjectUrlError,
    messages::FormValues,
    object_url::{ObjectUrl, ObjectUrls},
    transport::{GenerateTransport, HttpTransport},
    view::{FormView, StatusTone},
};

type WebController = FormController<DomView, HttpTransport, BlobUrls>;

/// The page elements, looked up once by id.
pub struct DomView {
    document: Document,
    status: HtmlElement,
    generate: HtmlButtonElement,
    download: HtmlButtonElement,
    video: HtmlVideoElement,
    placeholder: HtmlElement,
}

impl FormView for DomView {
    fn set_status(&mut self, message: &str, tone: StatusTone) {
        self.status.set_text_content(Some(message));
        if let Err(err) = self.status.style().set_property("color", tone.color()) {
            log::warn!("Could not colour the status line: {err:?}");
        }
    }

    fn set_generate_button(&mut self, enabled: bool, label: &str) {
        self.generate.set_disabled(!enabled);
        self.generate.set_text_content(Some(label));
    }

    fn set_download_enabled(&mut self, enabled: bool) {
        self.download.set_disabled(!enabled);
    }

    fn show_video(&mut self, url: &ObjectUrl) {
        self.video.set_src(url.as_str());
        self.video.set_hidden(false);
    }

    fn hide_placeholder(&mut self) {
        self.placeholder.set_hidden(true);
    }

    fn clear_video(&mut self) {
        if let Err(err) = self.video.remove_attribute("src") {
            log::warn!("Could not detach the video source: {err:?}");
        }
        self.video.load();
        self.video.set_hidden(true);
        self.placeholder.set_hidden(false);
    }

    fn trigger_download(&mut self, url: &ObjectUrl, filename: &str) {
        if let Err(err) = anchor_download(&self.document, url, filename) {
            log::error!("Download failed: {err:?}");
        }
    }
}

fn anchor_download(document: &Document, url: &ObjectUrl, filename: &str) -> Result<(), JsValue> {
    let body = document.body().ok_or("document has no body")?;
    let link: HtmlAnchorElement = document.create_element("a")?.unchecked_into();
    link.set_href(url.as_str());
    link.set_download(filename);
    body.append_child(&link)?;
    link.click();
    body.remove_child(&link)?;
    Ok(())
}

/// Object URLs backed by real `Blob`s.
#[derive(Debug, Default)]
pub struct BlobUrls;

impl ObjectUrls for BlobUrls {
    fn create(&mut self, blob: Bytes, mime_type: &str) -> Result<ObjectUrl, ObjectUrlError> {
        let bytes = js_sys::Uint8Array::from(&blob[..]);
        let parts = js_sys::Array::of1(&bytes);
        let options = BlobPropertyBag::new();
        options.set_type(mime_type);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| ObjectUrlError::Create(format!("{e:?}")))?;
        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|e| ObjectUrlError::Create(format!("{e:?}")))?;

        Ok(ObjectUrl::new(url))
    }

    fn revoke(&mut self, url: &ObjectUrl) {
        if let Err(err) = Url::revoke_object_url(url.as_str()) {
            log::warn!("Could not revoke {url}: {err:?}");
        }
    }
}

/// The form fields read on every submission.
struct FormInputs {
    prompt: HtmlTextAreaElement,
    negative_prompt: HtmlInputElement,
    aspect_ratio: HtmlSelectElement,
    resolution: HtmlSelectElement,
}

impl FormInputs {
    fn values(&self) -> FormValues {
        FormValues {
            prompt: self.prompt.value(),
            negative_prompt: self.negative_prompt.value(),
            aspect_ratio: self.aspect_ratio.value(),
            resolution: self.resolution.value(),
        }
    }
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{id} has an unexpected type")))
}

/// Entry point: looks up the page elements and registers the submit and
/// download handlers.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console::init();

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let origin = window.location().origin()?;

    let transport =
        HttpTransport::new(&origin).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let view = DomView {
        status: by_id(&document, "status")?,
        generate: by_id(&document, "generate-btn")?,
        download: by_id(&document, "download-btn")?,
        video: by_id(&document, "result-video")?,
        placeholder: by_id(&document, "placeholder")?,
        document: document.clone(),
    };
    let inputs = Rc::new(FormInputs {
        prompt: by_id(&document, "prompt")?,
        negative_prompt: by_id(&document, "negative_prompt")?,
        aspect_ratio: by_id(&document, "aspect_ratio")?,
        resolution: by_id(&document, "resolution")?,
    });
    let form: HtmlElement = by_id(&document, "video-form")?;

    let controller = Rc::new(RefCell::new(FormController::new(view, transport, BlobUrls)));

    let submit_controller = Rc::clone(&controller);
    let submit_cb = Closure::wrap(Box::new(move |event: Event| {
        event.prevent_default();
        on_submit(Rc::clone(&submit_controller), inputs.values());
    }) as Box<dyn FnMut(_)>);
    form.add_event_listener_with_callback("submit", submit_cb.as_ref().unchecked_ref())?;
    submit_cb.forget();

    let download_controller = Rc::clone(&controller);
    let download_cb = Closure::wrap(Box::new(move |_event: Event| {
        download_controller.borrow_mut().download();
    }) as Box<dyn FnMut(_)>);
    controller
        .borrow()
        .view()
        .download
        .add_event_listener_with_callback("click", download_cb.as_ref().unchecked_ref())?;
    download_cb.forget();

    log::debug!("Form handlers registered");
    Ok(())
}

fn on_submit(controller: Rc<RefCell<WebController>>, values: FormValues) {
    if controller.borrow().is_loading() {
        log::debug!("Ignoring submit while a generation is in flight");
        return;
    }

    let Some(request) = controller.borrow_mut().begin_submit(&values) else {
        return;
    };
    let transport = controller.borrow().transport().clone();

    wasm_bindgen_futures::spawn_local(async move {
        let outcome = transport.generate(&request).await;
        controller.borrow_mut().complete_submit(outcome);
    });
}

/// Forwards `log` records to the browser console.
mod console {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use wasm_bindgen::JsValue;

    struct ConsoleLogger;

    static LOGGER: ConsoleLogger = ConsoleLogger;

    pub(super) fn init() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Debug);
        }
    }

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= Level::Debug
        }

        fn log(&self, record: &Record<'_>) {
            let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
            match record.level() {
                Level::Error => web_sys::console::error_1(&message),
                Level::Warn => web_sys::console::warn_1(&message),
                Level::Info => web_sys::console::info_1(&message),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&message),
            }
        }

        fn flush(&self) {}
    }
}
