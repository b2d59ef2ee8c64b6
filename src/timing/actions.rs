use strum_macros::{Display, EnumIter, EnumString};

use ktimer_core::SessionError;

use super::{TimingHost, TimingSession, session::logged};

/// 打轴时可用的按键动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum KeyAction {
    /// 为下一个音节打点；当前行已打满时结束该行并开始下一行
    Tap,
    /// 结束当前行，不开始下一行
    End,
    /// 删除正在打点的行或上一行
    Back,
    /// 删除播放位置所在的行
    Delete,
    /// 恢复最近删除的行
    Undelete,
}

impl TimingSession {
    /// 把一次按键映射为会话命令。
    pub fn dispatch(
        &mut self,
        action: KeyAction,
        host: &mut impl TimingHost,
    ) -> Result<(), SessionError> {
        match action {
            KeyAction::Tap => {
                let row_len = self
                    .layout()
                    .rows()
                    .get(self.row_index())
                    .map(ktimer_core::Row::len);
                match row_len {
                    Some(len) if self.taps() == len => self.end_row(host, true),
                    Some(_) => self.tap(host),
                    None => logged(Err(SessionError::NoRowsRemaining)),
                }
            }
            KeyAction::End if self.taps() > 0 => self.end_row(host, false),
            KeyAction::End => logged(Err(SessionError::EmptyRow)),
            KeyAction::Back => self.back(host).map(drop),
            KeyAction::Delete => self.delete_at_playhead(host).map(drop),
            KeyAction::Undelete => self.undelete(host),
        }
    }
}
