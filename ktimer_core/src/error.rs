use std::{fmt, io};

use thiserror::Error;

/// 定义载入、解析和导出歌词时可能发生的错误。
///
/// 这些错误对当前的载入操作是致命的：调用方应中止载入并把错误呈现给用户。
#[derive(Error, Debug)]
pub enum KaraokeError {
    /// 以 `Dialogue` 开头，但字段布局不符合预期的行。
    #[error("第 {line_number} 行不是有效的 ASS Dialogue 行: {content}")]
    InvalidDialogue {
        /// 行号（从 1 开始）
        line_number: usize,
        /// 原始行内容
        content: String,
    },
    /// 无效的时间或卡拉OK时长。
    #[error("无效的时间格式: {0}")]
    InvalidTime(String),
    /// 整数解析错误。
    #[error("解析错误: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    /// 字符串格式化错误。
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// 配置文件解析错误。
    #[error("解析配置失败: {0}")]
    Config(#[from] toml::de::Error),
    /// 音节词典内容无效。
    #[error("音节词典无效: {0}")]
    Dictionary(String),
}

impl From<KaraokeError> for std::io::Error {
    fn from(err: KaraokeError) -> Self {
        Self::other(err)
    }
}

/// 打轴会话中可恢复的错误。
///
/// 出现这些错误时会话状态保持不变，调用方只需记录或提示即可。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// 所有行都已打轴，没有可继续的行。
    #[error("没有剩余的未打轴行")]
    NoRowsRemaining,
    /// 当前行的每个音节都已经打过点，需要先结束该行。
    #[error("第 {row} 行的音节已全部打点，请先结束该行")]
    RowFull {
        /// 行索引
        row: usize,
    },
    /// 试图结束一个尚未打完的行。
    #[error("无法结束未完成的行 \"{text}\" ({taps}/{expected})")]
    IncompleteRow {
        /// 行文本
        text: String,
        /// 已打点数
        taps: usize,
        /// 该行的音节数
        expected: usize,
    },
    /// 试图结束一个还没有打点的行。
    #[error("无法结束空行")]
    EmptyRow,
    /// 播放位置同时落在多个行内，需要手动指定要删除的行。
    #[error("多个行同时处于活动状态 ({rows:?})，请手动指定要删除的行")]
    AmbiguousPlayhead {
        /// 所有匹配的行索引
        rows: Vec<usize>,
    },
    /// 撤销删除的历史为空。
    #[error("撤销删除的历史为空")]
    UndeleteEmpty,
    /// 行索引越界。
    #[error("行索引 {row} 越界 (共 {row_count} 行)")]
    RowOutOfRange {
        /// 请求的行索引
        row: usize,
        /// 总行数
        row_count: usize,
    },
}
