pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod generator;
pub mod history;
pub mod init;
pub mod media;
pub mod outline;
pub mod project;
pub mod prompts;
pub mod session;
pub mod source;
pub mod studio;

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!(tag, "{}", message),
        _ => tracing::info!(tag, "{}", message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
