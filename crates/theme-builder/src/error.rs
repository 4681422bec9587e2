use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown module type: {0}")]
    UnknownModule(String),

    #[error("Module attributes must be a JSON object")]
    AttrsNotObject,

    #[error("Unknown theme setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value for theme setting {key}")]
    InvalidSetting { key: String },

    #[error("Invalid layout: {0}")]
    InvalidLayout(#[from] serde_json::Error),
}
