use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// 导出打轴结果的方式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// 只输出已打轴的行
    #[default]
    New,
    /// 输出全部原始行，已打轴的行被替换为生成的 Dialogue 行
    Full,
}

/// 打轴会话和导出的选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct TimerOptions {
    /// 导出时对所有时间统一施加的偏移（秒）。
    pub time_shift: f64,
    /// 每次打点后是否通知宿主播放提示音。
    pub play_cue: bool,
    /// 导出 Dialogue 行使用的样式名。
    pub style: String,
    /// 自动分音节的等级（0 为不处理）。
    pub syllablize_level: u8,
    /// 导出格式。
    pub output_format: OutputFormat,
    /// 文本编辑撤销栈的最大深度。
    pub undo_stack_depth: usize,
    /// 撤销删除历史的最大深度。
    pub undelete_depth: usize,
    /// 高精度推算的时间与播放器时间相差超过该值（秒）时，改用播放器时间。
    ///
    /// 用户在一行中途倒回去重打时，推算出的时间会完全错误，此时用播放器的时间代替。
    pub timestamp_correction_trigger: f64,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            time_shift: -0.02,
            play_cue: true,
            style: "Romaji".to_string(),
            syllablize_level: 2,
            output_format: OutputFormat::New,
            undo_stack_depth: 30,
            undelete_depth: 30,
            timestamp_correction_trigger: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options: TimerOptions = toml::from_str(
            r#"
            style = "Kanji"
            output_format = "full"
            "#,
        )
        .unwrap();

        assert_eq!(options.style, "Kanji");
        assert_eq!(options.output_format, OutputFormat::Full);
        assert!((options.time_shift + 0.02).abs() < f64::EPSILON);
        assert_eq!(options.undo_stack_depth, 30);
    }

    #[test]
    fn test_builder_overrides() {
        let options = TimerOptionsBuilder::default()
            .time_shift(0.0)
            .style("Test")
            .build()
            .unwrap();
        assert_eq!(options.style, "Test");
        assert!(options.time_shift.abs() < f64::EPSILON);
        assert!(options.play_cue);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("FULL".parse::<OutputFormat>().unwrap(), OutputFormat::Full);
        assert_eq!(OutputFormat::New.to_string(), "new");
    }
}
