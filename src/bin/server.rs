use argh::FromArgs;
use std::{path::PathBuf, sync::Arc, time::Duration};
use veo_studio::{
    server::{self, AppState},
    veo::{self, VeoClient},
};

// defaults for the server
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(FromArgs)]
/// veo-studio serves the generation form and proxies requests to Veo.
struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// directory holding index.html and the wasm bundle
    #[argh(option, short = 's', default = "PathBuf::from(DEFAULT_STATIC_DIR)")]
    static_dir: PathBuf,

    /// model used when a request does not name one
    #[argh(option, short = 'm', default = "veo::DEFAULT_MODEL.to_string()")]
    model: String,

    /// seconds between two polls of a running operation
    #[argh(option, default = "veo::DEFAULT_POLL_INTERVAL.as_secs()")]
    poll_interval: u64,

    /// seconds before a running operation is abandoned
    #[argh(option, default = "veo::DEFAULT_TIMEOUT.as_secs()")]
    timeout: u64,

    /// base url of the generative language API
    #[argh(option, default = "veo::DEFAULT_API_BASE.to_string()")]
    api_base: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();

    // a missing .env file is fine, the key may come from the environment
    if let Err(err) = dotenvy::dotenv() {
        log::debug!("No .env file loaded: {err}");
    }
    let api_key = server::api_key_from_env()?;

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let client = VeoClient::new(api_key)
        .with_api_base(args.api_base)
        .with_polling(
            Duration::from_secs(args.poll_interval),
            Duration::from_secs(args.timeout),
        );

    let static_dir = args.static_dir.is_dir().then_some(args.static_dir.clone());
    if static_dir.is_none() {
        log::warn!(
            "Static directory {} not found, serving the API only",
            args.static_dir.display()
        );
    }

    let app = server::router(
        AppState {
            generator: Arc::new(client),
            default_model: args.model,
        },
        static_dir,
    );

    log::info!("Starting the server");
    log::info!("Listening on: http://{}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
