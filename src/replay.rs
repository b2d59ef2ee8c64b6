//! 按脚本回放按键，用于在没有播放器的情况下驱动打轴会话。
//!
//! 脚本每行一条命令：`<时钟秒数> <播放位置秒数> <动作> [行号]`，`#` 开头为注释。
//! 动作为 [`KeyAction`] 的名称，或 `delete-row <行号>`。

use std::{str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{debug, info};

use ktimer_core::SessionError;

use crate::timing::{KeyAction, TimingHost, TimingSession};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("脚本第 {line_number} 行无效 ({reason}): {content}")]
    InvalidLine {
        line_number: usize,
        content: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    Key(KeyAction),
    DeleteRow(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub line_number: usize,
    pub clock: Duration,
    pub position: f64,
    pub command: ScriptCommand,
}

/// 解析整份脚本。任何一行无效都会使整个脚本被拒绝。
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>, ReplayError> {
    let mut steps = Vec::new();
    for (index, raw) in script.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let invalid = |reason| ReplayError::InvalidLine {
            line_number: index + 1,
            content: raw.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [clock, position, action, rest @ ..] = fields.as_slice() else {
            return Err(invalid("字段不足"));
        };
        let clock: f64 = clock.parse().map_err(|_| invalid("时钟不是数字"))?;
        let position: f64 = position.parse().map_err(|_| invalid("播放位置不是数字"))?;
        if clock < 0.0 {
            return Err(invalid("时钟必须是非负数"));
        }
        let clock = Duration::try_from_secs_f64(clock).map_err(|_| invalid("时钟超出范围"))?;
        if !position.is_finite() {
            return Err(invalid("播放位置必须是有限数"));
        }

        let command = match (*action, rest) {
            ("delete-row", [row]) => {
                ScriptCommand::DeleteRow(row.parse().map_err(|_| invalid("行号无效"))?)
            }
            ("delete-row", _) => return Err(invalid("delete-row 需要一个行号")),
            (name, []) => {
                ScriptCommand::Key(KeyAction::from_str(name).map_err(|_| invalid("未知动作"))?)
            }
            _ => return Err(invalid("多余的字段")),
        };

        steps.push(ScriptStep {
            line_number: index + 1,
            clock,
            position,
            command,
        });
    }
    Ok(steps)
}

/// 脚本驱动的宿主，时钟和播放位置由每一步指定。
#[derive(Debug, Default)]
pub struct ScriptedHost {
    clock: Duration,
    position: f64,
    cues: usize,
}

impl ScriptedHost {
    #[must_use]
    pub const fn cues(&self) -> usize {
        self.cues
    }
}

impl TimingHost for ScriptedHost {
    fn playback_position(&self) -> f64 {
        self.position
    }

    fn monotonic_now(&self) -> Duration {
        self.clock
    }

    fn on_tap_cue(&mut self) {
        self.cues += 1;
    }
}

/// 依次执行每一步。被拒绝的命令不会中断回放，而是连同行号一起返回。
pub fn run_script(
    session: &mut TimingSession,
    host: &mut ScriptedHost,
    steps: &[ScriptStep],
) -> Vec<(usize, SessionError)> {
    let mut rejected = Vec::new();
    for step in steps {
        host.clock = step.clock;
        host.position = step.position;
        debug!("[Replay] 第 {} 行: {:?}", step.line_number, step.command);

        let result = match step.command {
            ScriptCommand::Key(action) => session.dispatch(action, host),
            ScriptCommand::DeleteRow(row) => session.delete_row(host, row),
        };
        if let Err(e) = result {
            rejected.push((step.line_number, e));
        }
    }
    info!(
        "[Replay] 执行了 {} 条命令，其中 {} 条被拒绝",
        steps.len(),
        rejected.len()
    );
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "# 注释\n\n0 1.0 tap\n0.5 1.5 Tap\n2 3 delete-row 1\n";
        let steps = parse_script(script).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].command, ScriptCommand::Key(KeyAction::Tap));
        assert_eq!(steps[1].line_number, 4);
        assert_eq!(steps[1].clock, Duration::from_millis(500));
        assert_eq!(steps[2].command, ScriptCommand::DeleteRow(1));
    }

    #[test]
    fn test_parse_script_rejects_bad_lines() {
        for (script, reason) in [
            ("0 1", "字段不足"),
            ("x 1 tap", "时钟不是数字"),
            ("-1 1 tap", "时钟必须是非负数"),
            ("0 1 jump", "未知动作"),
            ("0 1 delete-row", "delete-row 需要一个行号"),
            ("0 1 tap 2", "多余的字段"),
            ("1e300 0 tap", "时钟超出范围"),
            ("NaN 0 tap", "时钟超出范围"),
            ("0 inf tap", "播放位置必须是有限数"),
            ("0 NaN tap", "播放位置必须是有限数"),
        ] {
            match parse_script(script) {
                Err(ReplayError::InvalidLine { reason: r, .. }) => assert_eq!(r, reason),
                other => panic!("{script:?} 应该被拒绝，实际得到 {other:?}"),
            }
        }
    }
}
