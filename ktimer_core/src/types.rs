use std::{fmt, ops::Range};

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// 音节之间的分隔符。
pub const SYLLABLE_DELIMITER: char = '|';

/// 未打轴音节两侧的可见标记，用于让用户看清音节边界。
pub const UNMAPPED_WRAPPER: char = '-';

/// 枚举：歌词文档中的记号类型。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TokenKind {
    /// 原样显示的文本
    Text,
    /// 换行，同时作为行分隔符
    Newline,
    /// 不可见的行分隔符
    Break,
    /// 已有时间信息的歌词（来自 Dialogue 行）
    Lyric,
    /// 等待打轴的音节
    Unmapped,
}

impl TokenKind {
    /// 是否为行分隔符。
    #[must_use]
    pub const fn is_separator(self) -> bool {
        matches!(self, Self::Newline | Self::Break)
    }
}

/// 一个音节的时间信息，单位为秒。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// 开始时间
    pub start: f64,
    /// 结束时间，尚未提交时为正无穷
    pub end: f64,
    /// 卡拉OK时长（`\k` 的来源）
    pub karaoke: f64,
}

impl Timing {
    #[must_use]
    pub const fn new(start: f64, end: f64, karaoke: f64) -> Self {
        Self {
            start,
            end,
            karaoke,
        }
    }

    /// 刚打点、结束时间尚未确定的时间信息。
    #[must_use]
    pub const fn pending(start: f64) -> Self {
        Self::new(start, f64::INFINITY, 0.0)
    }

    /// 结束时间是否已经确定。
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.end.is_finite()
    }

    /// 给定时间点是否落在 `[start, end)` 内。
    #[must_use]
    pub fn is_active_at(&self, position: f64) -> bool {
        self.start <= position && position < self.end
    }
}

/// 歌词文档中的最小单位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// 记号类型
    pub kind: TokenKind,
    /// 显示文本。未打轴音节带有两侧的 `-` 标记
    pub content: String,
    /// 该记号来自原文档的第几行（从 0 开始）
    pub source_line: usize,
    /// 时间信息
    pub timing: Option<Timing>,
}

impl Token {
    #[must_use]
    pub const fn newline(source_line: usize) -> Self {
        Self {
            kind: TokenKind::Newline,
            content: String::new(),
            source_line,
            timing: None,
        }
    }

    /// 创建一个未打轴音节，自动加上两侧的可见标记。
    #[must_use]
    pub fn unmapped(syllable: &str, source_line: usize) -> Self {
        Self {
            kind: TokenKind::Unmapped,
            content: format!("{UNMAPPED_WRAPPER}{syllable}{UNMAPPED_WRAPPER}"),
            source_line,
            timing: None,
        }
    }

    #[must_use]
    pub const fn lyric(content: String, source_line: usize, timing: Timing) -> Self {
        Self {
            kind: TokenKind::Lyric,
            content,
            source_line,
            timing: Some(timing),
        }
    }

    /// 去掉未打轴音节两侧标记后的文本。其它类型原样返回。
    #[must_use]
    pub fn bare_text(&self) -> &str {
        if self.kind != TokenKind::Unmapped {
            return &self.content;
        }
        let text = self
            .content
            .strip_prefix(UNMAPPED_WRAPPER)
            .unwrap_or(&self.content);
        text.strip_suffix(UNMAPPED_WRAPPER).unwrap_or(text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// 一组连续的未打轴音节，作为一次打轴的单位。
///
/// 行只保存记号的索引范围，记号本身归 `Layout` 所有。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    /// 该行在记号序列中的范围
    pub tokens: Range<usize>,
}

impl Row {
    #[must_use]
    pub const fn new(tokens: Range<usize>) -> Self {
        Self { tokens }
    }

    /// 该行的音节数。
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 第一个音节的索引。
    #[must_use]
    pub const fn first(&self) -> usize {
        self.tokens.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_text_strips_wrapper() {
        let token = Token::unmapped("ka", 0);
        assert_eq!(token.content, "-ka-");
        assert_eq!(token.bare_text(), "ka");

        let lyric = Token::lyric("-x-".to_string(), 0, Timing::new(0.0, 1.0, 1.0));
        assert_eq!(lyric.bare_text(), "-x-");
    }

    #[test]
    fn test_pending_timing_is_open_ended() {
        let timing = Timing::pending(1.5);
        assert!(!timing.is_committed());
        assert!(timing.is_active_at(1000.0));
        assert!(!timing.is_active_at(1.0));
    }

    #[test]
    fn test_token_kind_from_str() {
        assert_eq!("unmapped".parse::<TokenKind>(), Ok(TokenKind::Unmapped));
        assert!(TokenKind::Break.is_separator());
        assert!(!TokenKind::Lyric.is_separator());
    }
}
