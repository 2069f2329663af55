#[cfg(feature = "http-adapter")]
pub mod openai;
