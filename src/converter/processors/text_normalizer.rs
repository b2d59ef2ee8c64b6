//! 分音节之前的文本预处理。

use ktimer_core::SYLLABLE_DELIMITER;

use super::syllablizer::syllablize;

/// 长音符号与排版字符的替换表。
const MACRON_REPLACEMENTS: [(char, &str); 8] = [
    ('ī', "ii"),
    ('ū', "uu"),
    ('ō', "ou"),
    ('ē', "ee"),
    ('ā', "aa"),
    ('…', "..."),
    ('“', "\""),
    ('”', "\""),
];

/// 移除所有回车符。
#[must_use]
pub fn strip_cr(text: &str) -> String {
    text.replace('\r', "")
}

/// 把带长音符号的罗马音展开为双写元音，统一引号和省略号，
/// 并移除已有的音节分隔符。
#[must_use]
pub fn normalize_macrons(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == SYLLABLE_DELIMITER {
            continue;
        }
        match MACRON_REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => normalized.push_str(to),
            None => normalized.push(ch),
        }
    }
    normalized
}

/// 完整的分音节流程：去掉回车、展开长音，再按等级分音节。
#[must_use]
pub fn prepare_for_syllablize(text: &str, level: u8) -> String {
    syllablize(&normalize_macrons(&strip_cr(text)), level)
}
