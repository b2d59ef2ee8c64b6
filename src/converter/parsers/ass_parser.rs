//! ASS 格式解析器
//!
//! 只识别打轴工具自己输出的那一种 Dialogue 布局，其它行按纯文本歌词处理。

use std::sync::LazyLock;

use regex::Regex;

use ktimer_core::{KaraokeError, SYLLABLE_DELIMITER, Timing, Token};

/// 卡拉OK标签中文本里的空格会被替换成不换行空格，避免之后按空白拆分。
const NO_BREAK_SPACE: &str = "\u{00A0}";

/// 用于解析打轴工具输出的 Dialogue 行
static DIALOGUE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^Dialogue: (?P<Layer>\d+),",                           // Layer
        r"(?P<Start>\d:\d{2}:\d{2}\.\d{2}),",                    // 开始时间
        r"(?P<End>\d:\d{2}:\d{2}\.\d{2}),",                      // 结束时间
        r"(?P<Style>[^,]+),,0,0,0,,",                            // 样式，角色与边距固定为空和 0
        r"(?P<Text>.*)$"                                         // 文本内容
    ))
    .expect("编译 DIALOGUE_LINE_REGEX 失败")
});

/// 用于解析ASS时间戳字符串 (H:MM:SS.CS)
static ASS_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d):(\d{2}):(\d{2})\.(\d{2})$").expect("编译 ASS_TIME_REGEX 失败")
});

/// 用于解析ASS文本中的 K 标签 `{\k[厘秒]}`
static KARAOKE_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\\k([^}]*)\}").expect("编译 KARAOKE_TAG_REGEX 失败"));

/// 从 Dialogue 行中解析出的信息，时间单位为秒。
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueInfo {
    pub start: f64,
    pub end: f64,
    pub style: String,
    pub text: String,
}

/// 解析 ASS 时间字符串 (H:MM:SS.CS) 并转换为秒。
fn parse_ass_time(time_str: &str, line_number: usize) -> Result<f64, KaraokeError> {
    let caps = ASS_TIME_REGEX.captures(time_str).ok_or_else(|| {
        KaraokeError::InvalidTime(format!("第 {line_number} 行时间格式错误: {time_str}"))
    })?;
    let h: u32 = caps[1].parse()?;
    let m: u32 = caps[2].parse()?;
    let s: u32 = caps[3].parse()?;
    let cs: u32 = caps[4].parse()?;
    Ok(f64::from(h * 3600 + m * 60 + s) + f64::from(cs) / 100.0)
}

/// 尝试把一行解析为 Dialogue 行。
///
/// 不以 `Dialogue` 开头的行返回 `Ok(None)`；以它开头但格式不符的行是致命错误。
pub fn decode_dialogue(
    line: &str,
    line_number: usize,
) -> Result<Option<DialogueInfo>, KaraokeError> {
    if !line.starts_with("Dialogue") {
        return Ok(None);
    }

    let caps = DIALOGUE_LINE_REGEX
        .captures(line)
        .ok_or_else(|| KaraokeError::InvalidDialogue {
            line_number,
            content: line.to_string(),
        })?;

    Ok(Some(DialogueInfo {
        start: parse_ass_time(&caps["Start"], line_number)?,
        end: parse_ass_time(&caps["End"], line_number)?,
        style: caps["Style"].to_string(),
        text: caps["Text"].to_string(),
    }))
}

/// 把一个卡拉OK片段的文本和时长（厘秒）收集起来。
fn split_karaoke_segments(
    text: &str,
    line_number: usize,
) -> Result<Vec<(String, u32)>, KaraokeError> {
    let mut segments = Vec::new();
    let mut current_char_pos = 0;
    let mut pending: Option<u32> = None;

    for cap in KARAOKE_TAG_REGEX.captures_iter(text) {
        let (Some(tag_match), Some(duration_match)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let text_slice = &text[current_char_pos..tag_match.start()];

        match pending {
            Some(duration_cs) => segments.push((text_slice.to_string(), duration_cs)),
            // 第一个标签之前的文本作为零时长片段
            None if !text_slice.is_empty() => segments.push((text_slice.to_string(), 0)),
            None => {}
        }

        let duration_str = duration_match.as_str();
        let duration_cs = duration_str.parse().map_err(|_| {
            KaraokeError::InvalidTime(format!(
                "第 {line_number} 行: 无效的卡拉OK时长值: {duration_str}"
            ))
        })?;
        pending = Some(duration_cs);
        current_char_pos = tag_match.end();
    }

    if let Some(duration_cs) = pending {
        segments.push((text[current_char_pos..].to_string(), duration_cs));
    }
    Ok(segments)
}

/// 把解析出的 Dialogue 行转换为记号。
///
/// * 空文本生成一个换行记号。
/// * 含 `\k` 标签时每个片段生成一个歌词记号，开始时间按之前片段的时长累加，
///   结束时间统一为整行的结束时间。
/// * 不含标签时整行生成一个歌词记号。
pub fn dialogue_tokens(
    info: &DialogueInfo,
    source_line: usize,
) -> Result<Vec<Token>, KaraokeError> {
    if info.text.is_empty() {
        return Ok(vec![Token::newline(source_line)]);
    }

    if !KARAOKE_TAG_REGEX.is_match(&info.text) {
        let timing = Timing::new(info.start, info.end, info.end - info.start);
        return Ok(vec![Token::lyric(info.text.clone(), source_line, timing)]);
    }

    let segments = split_karaoke_segments(&info.text, source_line + 1)?;
    let mut tokens = Vec::with_capacity(segments.len());
    let mut offset_cs: u32 = 0;

    for (text, duration_cs) in segments {
        let timing = Timing::new(
            info.start + f64::from(offset_cs) / 100.0,
            info.end,
            f64::from(duration_cs) / 100.0,
        );
        tokens.push(Token::lyric(
            text.replace(' ', NO_BREAK_SPACE),
            source_line,
            timing,
        ));
        offset_cs = offset_cs.checked_add(duration_cs).ok_or_else(|| {
            KaraokeError::InvalidTime(format!(
                "第 {} 行: 卡拉OK时长累计溢出",
                source_line + 1
            ))
        })?;
    }
    Ok(tokens)
}

/// 把一行纯文本歌词按分隔符拆成未打轴音节。
#[must_use]
pub fn plain_line_tokens(line: &str, source_line: usize) -> Vec<Token> {
    if line.is_empty() {
        return vec![Token::newline(source_line)];
    }
    line.split(SYLLABLE_DELIMITER)
        .map(|piece| Token::unmapped(piece, source_line))
        .collect()
}

fn is_header_line(line: &str) -> bool {
    if line.is_empty() || line.starts_with(';') {
        return true;
    }
    if line != "[Events]" && line.starts_with('[') && line.ends_with(']') {
        return true;
    }
    !line.starts_with("Dialogue:") && line.contains(':')
}

/// 移除 ASS 文件开头的脚本信息、样式等头部内容。
///
/// 找到第一个不属于头部的行后，从该行开始返回；如果是 `[Events]`，
/// 则跳过它后面的两行（通常是它本身和 `Format:` 行之后的位置）。
/// 找不到时原样返回。
#[must_use]
pub fn strip_script_header(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let Some(index) = lines.iter().position(|line| !is_header_line(line)) else {
        return text.to_string();
    };

    let start = if lines[index] == "[Events]" {
        index + 2
    } else {
        index
    };
    lines.get(start..).unwrap_or_default().join("\n")
}
