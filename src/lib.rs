//! 逐音节卡拉OK打轴。
//!
//! 把带音节分隔符的歌词文本或已有的 ASS 字幕载入为 [`layout::Layout`]，
//! 由 [`timing::TimingSession`] 根据按键时间为每个音节打轴，
//! 最后用 [`converter::generators::ass_generator`] 导出带 `\k` 标签的 Dialogue 行。

pub mod converter;
pub mod history;
pub mod layout;
pub mod logger;
pub mod replay;
pub mod settings;
pub mod timing;

pub use ktimer_core::{
    KaraokeError, OutputFormat, Row, SessionError, TimerOptions, TimerOptionsBuilder, Timing,
    Token, TokenKind,
};
