use dotenv::dotenv;
use serde::{Deserialize, Serialize};

pub mod blob;
pub mod chat;
pub mod chunking;
pub mod db;
pub mod error;
pub mod media;
pub mod ocr;
pub mod orchestrator;
pub mod pipeline;
pub mod speech;

#[cfg(test)]
pub mod testing;

pub use error::{AppError, Result};

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    // Database
    pub db_host: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,

    // Static file server holding chunk blobs
    pub static_files_url: String,

    // OCR
    pub mistral_url: String,
    pub mistral_api_key: String,
    pub mistral_ocr_model: String,

    // Chat + chunk splitting
    pub openrouter_url: String,
    pub openrouter_api_key: String,
    pub splitter_model: String,

    // Speech
    pub deepinfra_url: String,
    pub deepinfra_api_key: String,
    pub tts_model: String,
    pub stt_model: String,

    // Applied to every provider client
    pub http_timeout_secs: u64,
}

pub fn read_config() -> Result<Config> {
    dotenv().ok();
    config::Config::builder()
        .add_source(config::File::with_name("config"))
        .build()
        .and_then(|c| c.try_deserialize::<Config>())
        .map_err(|e| AppError::InvalidInput(format!("Bad configuration: {e}")))
}
