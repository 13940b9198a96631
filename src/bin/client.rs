use argh::FromArgs;
use std::path::PathBuf;
use veo_studio::{
    FormController, FormValues, FormView, HttpTransport, MemoryObjectUrls, ObjectUrl,
    StatusTone, UiState,
};

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5000;

#[derive(FromArgs)]
/// Generate a clip through a running veo-studio server and save it.
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// what the video should show
    #[argh(positional)]
    prompt: String,

    /// what the video should avoid
    #[argh(option, short = 'n', default = "String::new()")]
    negative_prompt: String,

    /// aspect ratio, e.g. 16:9 or 9:16
    #[argh(option, short = 'a', default = "\"9:16\".to_string()")]
    aspect_ratio: String,

    /// resolution, e.g. 720p or 1080p
    #[argh(option, short = 'r', default = "\"720p\".to_string()")]
    resolution: String,

    /// directory the video is saved into
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output_dir: PathBuf,
}

/// Prints what the page would show and saves downloads to disk.
struct TerminalView {
    urls: MemoryObjectUrls,
    output_dir: PathBuf,
    video: Option<ObjectUrl>,
}

impl FormView for TerminalView {
    fn set_status(&mut self, message: &str, tone: StatusTone) {
        match tone {
            StatusTone::Normal => println!("{message}"),
            StatusTone::Error => eprintln!("error: {message}"),
        }
    }

    fn set_generate_button(&mut self, enabled: bool, label: &str) {
        log::debug!("generate button: {label} (enabled={enabled})");
    }

    fn set_download_enabled(&mut self, enabled: bool) {
        log::debug!("download button enabled={enabled}");
    }

    fn show_video(&mut self, url: &ObjectUrl) {
        self.video = Some(url.clone());
    }

    fn hide_placeholder(&mut self) {}

    fn clear_video(&mut self) {
        self.video = None;
    }

    fn trigger_download(&mut self, url: &ObjectUrl, filename: &str) {
        let Some(video) = self.urls.resolve(url) else {
            log::warn!("{url} is no longer live");
            return;
        };

        let path = self.output_dir.join(filename);
        match std::fs::write(&path, &video) {
            Ok(()) => println!("Saved {} ({} bytes)", path.display(), video.len()),
            Err(err) => eprintln!("error: could not write {}: {err}", path.display()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    // format the host and port
    let origin = format!("http://{}:{}", args.host, args.port);

    let urls = MemoryObjectUrls::new();
    let view = TerminalView {
        urls: urls.clone(),
        output_dir: args.output_dir,
        video: None,
    };
    let mut controller = FormController::new(view, HttpTransport::new(&origin)?, urls);

    controller
        .submit(&FormValues {
            prompt: args.prompt,
            negative_prompt: args.negative_prompt,
            aspect_ratio: args.aspect_ratio,
            resolution: args.resolution,
        })
        .await;

    if controller.state() != UiState::ShowingResult {
        std::process::exit(1);
    }

    controller.download();

    Ok(())
}
