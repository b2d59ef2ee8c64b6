//! 把歌词文本构建为记号序列并划分打轴行。

use tracing::{debug, info};

use ktimer_core::{KaraokeError, Row, Token, TokenKind};

use crate::converter::{
    parsers::ass_parser::{decode_dialogue, dialogue_tokens, plain_line_tokens, strip_script_header},
    processors::text_normalizer::strip_cr,
};

/// 把文本逐行解码为记号。
///
/// 能识别为 Dialogue 的行按 ASS 解码，其它行按纯文本解码。
/// 每一行的记号都以换行或分隔记号结尾，避免相邻两行被合并成同一个打轴行。
pub fn build_tokens(text: &str) -> Result<Vec<Token>, KaraokeError> {
    let mut tokens = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        match decode_dialogue(line, index + 1)? {
            Some(info) => tokens.extend(dialogue_tokens(&info, index)?),
            None => tokens.extend(plain_line_tokens(line, index)),
        }

        if !tokens.last().is_some_and(|t| t.kind.is_separator()) {
            tokens.push(Token::newline(index));
        }
    }
    Ok(tokens)
}

/// 把连续的未打轴音节划分为行。
#[must_use]
pub fn group_rows(tokens: &[Token]) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut row_start: Option<usize> = None;

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Unmapped => {
                row_start.get_or_insert(index);
            }
            TokenKind::Newline | TokenKind::Break => {
                if let Some(start) = row_start.take() {
                    rows.push(Row::new(start..index));
                }
            }
            TokenKind::Text | TokenKind::Lyric => {}
        }
    }
    if let Some(start) = row_start {
        rows.push(Row::new(start..tokens.len()));
    }
    rows
}

/// 一份已载入的歌词文档。
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    source: String,
    tokens: Vec<Token>,
    rows: Vec<Row>,
}

impl Layout {
    /// 从文本构建文档。格式错误时整个载入失败，不会得到部分文档。
    pub fn parse(text: &str) -> Result<Self, KaraokeError> {
        let tokens = build_tokens(text)?;
        let rows = group_rows(&tokens);
        debug!(
            "[Layout] 构建了 {} 个记号，{} 个待打轴行",
            tokens.len(),
            rows.len()
        );
        Ok(Self {
            source: text.to_string(),
            tokens,
            rows,
        })
    }

    /// 载入文件内容：去掉回车，ASS 文件还会先移除头部。
    pub fn load_file_text(text: &str, is_ass: bool) -> Result<Self, KaraokeError> {
        let mut text = strip_cr(text);
        if is_ass {
            text = strip_script_header(&text);
        }
        let layout = Self::parse(&text)?;
        info!(
            "[Layout] 已载入歌词，共 {} 行，{} 个待打轴行",
            layout.source_lines().count(),
            layout.rows.len()
        );
        Ok(layout)
    }

    /// 载入时使用的原始文本。
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 原始文本的每一行，与记号的 `source_line` 对应。
    pub fn source_lines(&self) -> impl Iterator<Item = &str> {
        self.source.split('\n')
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// 宿主不应直接修改时间信息，打轴会话之外只在测试和导入场景使用。
    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// 行的第一个音节是否已有时间信息。
    #[must_use]
    pub fn is_row_mapped(&self, row: &Row) -> bool {
        self.tokens
            .get(row.first())
            .is_some_and(|t| t.timing.is_some())
    }

    /// 行内每个音节是否都已提交时间。
    #[must_use]
    pub fn is_row_complete(&self, row: &Row) -> bool {
        self.tokens[row.tokens.clone()]
            .iter()
            .all(|t| t.timing.is_some_and(|timing| timing.is_committed()))
    }

    /// 从 `start` 开始寻找第一个未打轴的行，找不到时返回行数。
    #[must_use]
    pub fn next_unmapped_row(&self, start: usize) -> usize {
        (start..self.rows.len())
            .find(|&index| !self.is_row_mapped(&self.rows[index]))
            .unwrap_or(self.rows.len())
    }

    /// 行内所有音节的文本，用于提示信息。
    #[must_use]
    pub fn row_text(&self, row: &Row) -> String {
        self.tokens[row.tokens.clone()]
            .iter()
            .map(|t| t.content.as_str())
            .collect()
    }

    /// 在给定播放位置处于活动状态的记号，供渲染高亮使用。
    #[must_use]
    pub fn active_tokens(&self, position: f64) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.timing.is_some_and(|timing| timing.is_active_at(position)))
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "Dialogue: 0,0:00:01.00,0:00:02.00,Romaji,,0,0,0,,{\\k50}sa{\\k50}ku\nka|ra|o|ke\n\nmi|ku";

    #[test]
    fn test_build_tokens_mixed_document() {
        let tokens = build_tokens(MIXED).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Lyric,
                TokenKind::Lyric,
                TokenKind::Newline,
                TokenKind::Unmapped,
                TokenKind::Unmapped,
                TokenKind::Unmapped,
                TokenKind::Unmapped,
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Unmapped,
                TokenKind::Unmapped,
                TokenKind::Newline,
            ]
        );
        assert_eq!(tokens[3].source_line, 1);
        assert_eq!(tokens[9].source_line, 3);
    }

    #[test]
    fn test_group_rows() {
        let layout = Layout::parse(MIXED).unwrap();
        assert_eq!(layout.rows(), [Row::new(3..7), Row::new(9..11)]);
        assert_eq!(layout.row_text(&layout.rows()[1]), "-mi--ku-");
    }

    #[test]
    fn test_adjacent_lines_never_merge() {
        let layout = Layout::parse("ka|ra\nmi|ku").unwrap();
        assert_eq!(layout.rows().len(), 2);
    }

    #[test]
    fn test_trailing_row_without_separator() {
        let tokens = vec![Token::unmapped("a", 0), Token::unmapped("b", 0)];
        assert_eq!(group_rows(&tokens), [Row::new(0..2)]);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let first = Layout::parse(MIXED).unwrap();
        let second = Layout::parse(first.source()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_dialogue_aborts_load() {
        let result = Layout::parse("ka|ra\nDialogue: broken");
        assert!(matches!(
            result,
            Err(KaraokeError::InvalidDialogue { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_overflowing_karaoke_durations_abort_load() {
        let result = Layout::parse(
            r"Dialogue: 0,0:00:00.00,0:00:01.00,Romaji,,0,0,0,,{\k4294967295}a{\k1}b{\k1}c",
        );
        assert!(matches!(result, Err(KaraokeError::InvalidTime(_))));
    }

    #[test]
    fn test_load_ass_file_text() {
        let text = "[Script Info]\r\nTitle: x\r\n[Events]\r\nFormat: Layer\r\nka|ra\r\n";
        let layout = Layout::load_file_text(text, true).unwrap();
        assert_eq!(layout.source(), "ka|ra\n");
        assert_eq!(layout.rows().len(), 1);
    }

    #[test]
    fn test_active_tokens() {
        let layout = Layout::parse(MIXED).unwrap();
        assert_eq!(layout.active_tokens(1.2), [0]);
        assert_eq!(layout.active_tokens(1.6), [0, 1]);
        assert!(layout.active_tokens(5.0).is_empty());
    }

    #[test]
    fn test_next_unmapped_row() {
        let mut layout = Layout::parse("a|b\nc\nd").unwrap();
        assert_eq!(layout.next_unmapped_row(0), 0);
        layout.tokens_mut()[0].timing = Some(ktimer_core::Timing::pending(0.0));
        assert_eq!(layout.next_unmapped_row(0), 1);
        assert_eq!(layout.next_unmapped_row(3), 3);
    }
}
