//! 罗马音自动分音节。
//!
//! 在未打轴的罗马音歌词中插入音节分隔符 `|`，供用户在此基础上手动修正。
//! 匹配规则来自一个有序词典，按固定顺序扫描，不做任何语言学推断。

use std::sync::OnceLock;

use serde::Deserialize;
use tracing::trace;

use ktimer_core::{KaraokeError, SYLLABLE_DELIMITER};

const VOWELS: [char; 5] = ['a', 'i', 'u', 'e', 'o'];

/// 分音节使用的词典。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyllableDictionary {
    /// 可以出现在音节前的促音辅音，每项一个 ASCII 字符。
    pub gemination_prefixes: Vec<String>,
    /// 按优先级排列的音节。
    pub syllables: Vec<String>,
    /// 插入分隔符之后执行的替换规则 `(原文, 替换为)`。
    #[serde(default)]
    pub merge_rules: Vec<(String, String)>,
}

impl SyllableDictionary {
    /// 从 TOML 文本加载词典。
    pub fn from_toml(content: &str) -> Result<Self, KaraokeError> {
        let mut dictionary: Self = toml::from_str(content)?;
        dictionary.normalize()?;
        Ok(dictionary)
    }

    /// 程序内置的默认词典。
    pub fn bundled() -> &'static Self {
        static DICTIONARY: OnceLock<SyllableDictionary> = OnceLock::new();
        DICTIONARY.get_or_init(|| {
            let content = include_str!("../../../assets/syllable_dictionary.toml");
            Self::from_toml(content).expect("Failed to parse syllable_dictionary.toml")
        })
    }

    fn normalize(&mut self) -> Result<(), KaraokeError> {
        if let Some(bad) = self
            .gemination_prefixes
            .iter()
            .find(|p| p.len() != 1 || !p.is_ascii())
        {
            return Err(KaraokeError::Dictionary(format!(
                "促音前缀必须是单个 ASCII 字符: {bad:?}"
            )));
        }
        if let Some(bad) = self
            .syllables
            .iter()
            .find(|s| s.is_empty() || !s.is_ascii())
        {
            return Err(KaraokeError::Dictionary(format!(
                "音节必须是非空的 ASCII 文本: {bad:?}"
            )));
        }
        for prefix in &mut self.gemination_prefixes {
            prefix.make_ascii_lowercase();
        }
        for syllable in &mut self.syllables {
            syllable.make_ascii_lowercase();
        }
        Ok(())
    }

    /// 在 `pos` 处尝试匹配一个音节，返回匹配的字节长度（含促音前缀）。
    ///
    /// 顺序：第一个前缀加音节、不带前缀的音节、其余前缀加音节。
    fn match_len(&self, bytes: &[u8], pos: usize) -> Option<usize> {
        let first = *bytes.get(pos)?;
        let syllable_at = |at: usize| {
            self.syllables
                .iter()
                .find(|s| {
                    bytes
                        .get(at..at + s.len())
                        .is_some_and(|b| b.eq_ignore_ascii_case(s.as_bytes()))
                })
                .map(|s| at + s.len() - pos)
        };
        let is_prefix = |prefix: &String| {
            prefix
                .as_bytes()
                .first()
                .is_some_and(|p| first.eq_ignore_ascii_case(p))
        };

        let mut prefixes = self.gemination_prefixes.iter();
        if let Some(prefix) = prefixes.next()
            && is_prefix(prefix)
            && let Some(len) = syllable_at(pos + 1)
        {
            return Some(len);
        }
        if let Some(len) = syllable_at(pos) {
            return Some(len);
        }
        prefixes
            .filter(|p| is_prefix(p))
            .find_map(|_| syllable_at(pos + 1))
    }
}

/// 使用内置词典分音节。
#[must_use]
pub fn syllablize(text: &str, level: u8) -> String {
    syllablize_with(text, level, SyllableDictionary::bundled())
}

/// 使用指定词典分音节。
///
/// * 等级 0：原样返回。
/// * 等级 1：在词典中的音节前插入分隔符，并合并促音。
/// * 等级 2：额外在相邻元音之间、元音与其后的 `n` 之间插入分隔符。
#[must_use]
pub fn syllablize_with(text: &str, level: u8, dictionary: &SyllableDictionary) -> String {
    if level == 0 {
        return text.to_string();
    }

    let result = text
        .split('\n')
        .map(|line| {
            let mut line = mark_dictionary_syllables(line, dictionary);
            if level >= 2 {
                line = split_vowels(&line);
            }
            cleanup(&line)
        })
        .collect::<Vec<_>>()
        .join("\n");

    trace!("[Syllablizer] 等级 {level}: {text:?} -> {result:?}");
    result
}

fn mark_dictionary_syllables(line: &str, dictionary: &SyllableDictionary) -> String {
    let bytes = line.as_bytes();
    let mut marked = String::with_capacity(line.len() * 2);
    let mut pos = 0;

    while pos < line.len() {
        if let Some(len) = dictionary.match_len(bytes, pos) {
            marked.push(SYLLABLE_DELIMITER);
            marked.push_str(&line[pos..pos + len]);
            pos += len;
        } else if let Some(ch) = line[pos..].chars().next() {
            marked.push(ch);
            pos += ch.len_utf8();
        } else {
            break;
        }
    }

    for (from, to) in &dictionary.merge_rules {
        if marked.contains(from.as_str()) {
            marked = marked.replace(from.as_str(), to);
        }
    }
    marked
}

fn is_vowel(ch: char) -> bool {
    VOWELS.contains(&ch.to_ascii_lowercase())
}

fn split_vowels(line: &str) -> String {
    let mut split = String::with_capacity(line.len() * 2);
    let mut previous_is_vowel = false;

    for ch in line.chars() {
        if previous_is_vowel && (is_vowel(ch) || ch.eq_ignore_ascii_case(&'n')) {
            split.push(SYLLABLE_DELIMITER);
        }
        split.push(ch);
        previous_is_vowel = is_vowel(ch);
    }
    split
}

fn cleanup(line: &str) -> String {
    let moved = line
        .replace(&format!("({SYLLABLE_DELIMITER}"), &format!("{SYLLABLE_DELIMITER}("))
        .replace(&format!("\"{SYLLABLE_DELIMITER}"), &format!("{SYLLABLE_DELIMITER}\""));

    let mut cleaned = String::with_capacity(moved.len() + 8);
    let mut chars = moved.chars().peekable();
    while let Some(ch) = chars.next() {
        // 连续的分隔符只保留一个
        if ch == SYLLABLE_DELIMITER && cleaned.ends_with(SYLLABLE_DELIMITER) {
            continue;
        }
        cleaned.push(ch);
        if ch == ' '
            && let Some(&next) = chars.peek()
            && next != ' '
            && next != SYLLABLE_DELIMITER
        {
            cleaned.push(SYLLABLE_DELIMITER);
        }
    }

    match cleaned.strip_prefix(SYLLABLE_DELIMITER) {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_is_identity() {
        for text in ["kyou", "(ka|na) ", "", "watashi wa\n\"kimi\""] {
            assert_eq!(syllablize(text, 0), text);
        }
    }

    #[test]
    fn test_digraph_boundary_lands_at_line_start() {
        // 唯一的分隔符在 "kyo" 前面，也就是行首，最终被清理掉
        assert_eq!(syllablize("kyou", 1), "kyou");
        assert_eq!(syllablize("kyou", 2), "kyo|u");
    }

    #[test]
    fn test_level_one_basic_words() {
        assert_eq!(syllablize("watashi", 1), "wa|ta|shi");
        assert_eq!(syllablize("Kokoro", 1), "Ko|ko|ro");
        assert_eq!(syllablize("mizu", 1), "mi|zu");
    }

    #[test]
    fn test_gemination_moves_boundary_before_consonant() {
        assert_eq!(syllablize("kitte", 1), "ki|tte");
        assert_eq!(syllablize("zasshi", 1), "za|sshi");
        assert_eq!(syllablize("ippai", 1), "i|ppai");
        assert_eq!(syllablize("kadzu", 1), "ka|dzu");
    }

    #[test]
    fn test_level_two_vowels_and_n() {
        assert_eq!(syllablize("ippai", 2), "i|ppa|i");
        assert_eq!(syllablize("sanpo", 2), "sa|n|po");
        assert_eq!(syllablize("kaoi", 2), "ka|o|i");
    }

    #[test]
    fn test_cleanup_rules() {
        assert_eq!(syllablize("(kimi)", 1), "(ki|mi)");
        assert_eq!(syllablize("\"kimi\"", 1), "\"ki|mi\"");
        assert_eq!(syllablize("sakura sakura", 1), "sa|ku|ra |sa|ku|ra");
        assert_eq!(syllablize("a b", 1), "a |b");
    }

    #[test]
    fn test_lines_are_processed_independently() {
        assert_eq!(syllablize("kimi\n\nnani", 1), "ki|mi\n\nna|ni");
    }

    #[test]
    fn test_idempotent_at_fixed_level() {
        let samples = [
            "kyou mo ippai",
            "(kimi no) \"kokoro\"",
            "kadzu zasshi kitte",
            "anata to sanpo shiyou",
        ];
        for level in 1..=2 {
            for sample in samples {
                let once = syllablize(sample, level);
                let twice = syllablize(&once, level);
                assert_eq!(once, twice, "等级 {level} 下对 {sample:?} 不是幂等的");
            }
        }
    }

    #[test]
    fn test_custom_dictionary() {
        let dictionary = SyllableDictionary::from_toml(
            r#"
            gemination_prefixes = []
            syllables = ["LA"]
            "#,
        )
        .unwrap();
        assert_eq!(syllablize_with("lalala", 1, &dictionary), "la|la|la");
    }

    #[test]
    fn test_invalid_dictionary_is_rejected() {
        let result = SyllableDictionary::from_toml(
            r#"
            gemination_prefixes = ["tt"]
            syllables = ["ka"]
            "#,
        );
        assert!(matches!(result, Err(KaraokeError::Dictionary(_))));
    }
}
