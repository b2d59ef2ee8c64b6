//! ASS 格式生成器

use std::{collections::HashMap, fmt::Write};

use tracing::warn;

use ktimer_core::{KaraokeError, OutputFormat, TimerOptions, Token};

use crate::layout::Layout;

/// ASS 时间的小时只有一位，能表示的最大值为 9:59:59.99。
const MAX_ASS_TIME_CS: u64 = 10 * 3600 * 100 - 1;

/// 把秒数格式化为 ASS 时间 (H:MM:SS.CS)，截断到厘秒。
///
/// 负数按 0 处理，超过 9:59:59.99 的时间会被截到该值，保证输出仍能被解析器读回。
#[must_use]
pub fn format_ass_time(seconds: f64) -> String {
    // 加一个极小量抵消类似 0.29 * 100 = 28.999... 的浮点误差
    let mut total_cs = (seconds.max(0.0) * 100.0 + 1e-6).floor() as u64;
    if total_cs > MAX_ASS_TIME_CS {
        warn!("[ASS Generator] 时间 {seconds} 秒超出 ASS 可表示范围，已截为 9:59:59.99");
        total_cs = MAX_ASS_TIME_CS;
    }
    let cs = total_cs % 100;
    let total_seconds = total_cs / 100;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{secs:02}.{cs:02}")
}

/// 把一行已打轴的音节编码为一行 Dialogue。
///
/// 多于一个音节时为每个音节输出 `{\k厘秒}`，只有一个音节时输出纯文本。
pub fn encode_row(tokens: &[Token], style: &str, time_shift: f64) -> Result<String, KaraokeError> {
    let timed: Vec<_> = tokens
        .iter()
        .filter_map(|token| token.timing.map(|timing| (token.bare_text(), timing)))
        .collect();

    let (Some((_, first)), Some((_, last))) = (timed.first(), timed.last()) else {
        return Err(KaraokeError::InvalidTime(
            "该行没有任何已打轴的音节".to_string(),
        ));
    };

    let start = format_ass_time(first.start + time_shift);
    let end = format_ass_time(last.end + time_shift);

    let mut text = String::new();
    if timed.len() > 1 {
        for (syllable, timing) in &timed {
            let karaoke_cs = (timing.karaoke * 100.0).round() as i64;
            if karaoke_cs < 0 {
                warn!("[AssGenerator] 音节 \"{syllable}\" 的卡拉OK时长为负数: {karaoke_cs}");
            }
            write!(text, "{{\\k{karaoke_cs}}}{syllable}")?;
        }
    } else {
        text.push_str(timed[0].0);
    }

    Ok(format!("Dialogue: 0,{start},{end},{style},,0,0,0,,{text}"))
}

/// 按导出格式生成打轴结果。
///
/// 只有每个音节都已提交时间的行才会被输出。
pub fn generate_timings(layout: &Layout, options: &TimerOptions) -> Result<String, KaraokeError> {
    let mut encoded_by_line = HashMap::new();
    let mut encoded_in_order = Vec::new();

    for row in layout.rows().iter().filter(|row| layout.is_row_complete(row)) {
        let tokens = &layout.tokens()[row.tokens.clone()];
        let line = encode_row(tokens, &options.style, options.time_shift)?;
        encoded_by_line.insert(tokens[0].source_line, encoded_in_order.len());
        encoded_in_order.push(line);
    }

    let output = match options.output_format {
        OutputFormat::New => encoded_in_order.join("\n"),
        OutputFormat::Full => layout
            .source_lines()
            .enumerate()
            .map(|(index, original)| {
                encoded_by_line
                    .get(&index)
                    .map_or(original, |&i| encoded_in_order[i].as_str())
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(output)
}
