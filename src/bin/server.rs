use std::path::PathBuf;

use clap::Parser;

use voice_clone_rs::config::{ServerConfig, ServerConfigBuilder, DEFAULT_LANGUAGE};
use voice_clone_rs::engines::coqui::{CoquiEngine, CoquiModelParams, DEFAULT_MODEL_NAME};
use voice_clone_rs::server::{self, AppState};
use voice_clone_rs::DevicePreference;

/// Web front-end for voice cloning with a reference recording.
#[derive(Parser, Debug)]
#[command(name = "voice-clone-server", version, about)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,

    #[arg(long, default_value = "uploads")]
    uploads_dir: PathBuf,

    #[arg(long, default_value = "outputs")]
    outputs_dir: PathBuf,

    /// Directory for temporary preprocessed references (defaults to the system temp dir)
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Maximum upload size in MiB
    #[arg(long, default_value_t = 50)]
    max_upload_mb: usize,

    /// Language used when a request omits one
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// auto, cuda or cpu
    #[arg(long, default_value = "auto")]
    device: DevicePreference,

    /// Path to the Coqui `tts` binary (defaults to `tts` on PATH)
    #[arg(long)]
    tts_bin: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model_name: String,

    #[arg(long, default_value_t = 1)]
    upload_retention_hours: u64,

    #[arg(long, default_value_t = 24)]
    output_retention_hours: u64,

    /// Load the model before accepting requests
    #[arg(long)]
    preload: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let config = ServerConfigBuilder::default()
            .host(self.host)
            .port(self.port)
            .uploads_dir(self.uploads_dir)
            .outputs_dir(self.outputs_dir)
            .temp_dir(self.temp_dir)
            .max_upload_bytes(self.max_upload_mb * 1024 * 1024)
            .default_language(self.language)
            .device(self.device)
            .tts_bin(self.tts_bin)
            .model_name(self.model_name)
            .retention(ServerConfig::retention_hours(
                self.upload_retention_hours,
                self.output_retention_hours,
            ))
            .build()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let preload = args.preload;
    let config = args.into_config()?;

    let engine = CoquiEngine::with_params(CoquiModelParams {
        bin_path: config.tts_bin.clone(),
        model_name: config.model_name.clone(),
    });
    let state = AppState::from_config(&config, Box::new(engine))?;

    if preload {
        let cloner = state.cloner.clone();
        if !tokio::task::spawn_blocking(move || cloner.initialize()).await? {
            log::warn!("Model preload failed; POST /initialize to retry");
        }
    }

    let addr = config.socket_addr()?;
    log::info!("Starting voice cloning web app at http://{addr}");
    server::serve(state, addr).await?;
    Ok(())
}
