//! 打轴状态机。
//!
//! 宿主（播放器界面、命令行回放等）实现 [`TimingHost`]，
//! 在用户按键时调用 [`TimingSession`] 的命令，会话据此原地修改记号的时间信息。

use std::time::Duration;

mod actions;
mod session;

pub use actions::KeyAction;
pub use session::TimingSession;

/// 打轴会话所需的宿主能力。
pub trait TimingHost {
    /// 播放器当前的播放位置（秒）。
    fn playback_position(&self) -> f64;

    /// 单调时钟的当前读数，精度应高于播放位置。
    fn monotonic_now(&self) -> Duration;

    /// 每次打点后调用，宿主可以在这里播放提示音。
    fn on_tap_cue(&mut self) {}

    /// 某个记号的时间信息被清除或恢复，宿主应刷新它的高亮状态。
    fn on_marker_cleared(&mut self, _token: usize) {}
}
