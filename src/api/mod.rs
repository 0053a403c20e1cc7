pub mod openai;
pub mod whisper;
