use std::time::Duration;

use tracing::{debug, warn};

use ktimer_core::{Row, SessionError, TimerOptions, Timing};

use super::TimingHost;
use crate::{history::BoundedStack, layout::Layout};

/// 被删除的行及其删除前的时间信息。
type SavedRow = (usize, Vec<Option<Timing>>);

/// 记录错误后原样返回。会话错误都是可恢复的，状态保持不变。
pub(super) fn logged<T>(result: Result<T, SessionError>) -> Result<T, SessionError> {
    if let Err(e) = &result {
        warn!("[TimingSession] {e}");
    }
    result
}

/// 一次打轴会话，持有所打轴的文档。
#[derive(Debug, Clone)]
pub struct TimingSession {
    layout: Layout,
    options: TimerOptions,
    /// 正在打轴的行；全部完成时等于行数。
    row_index: usize,
    /// 当前行第一次打点时的播放位置。
    row_anchor: Option<f64>,
    tap_instants: Vec<Duration>,
    undelete: BoundedStack<SavedRow>,
}

impl TimingSession {
    #[must_use]
    pub fn new(layout: Layout, options: TimerOptions) -> Self {
        let row_index = layout.next_unmapped_row(0);
        let undelete = BoundedStack::new(options.undelete_depth);
        Self {
            layout,
            options,
            row_index,
            row_anchor: None,
            tap_instants: Vec::new(),
            undelete,
        }
    }

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn into_layout(self) -> Layout {
        self.layout
    }

    #[must_use]
    pub const fn options(&self) -> &TimerOptions {
        &self.options
    }

    #[must_use]
    pub const fn row_index(&self) -> usize {
        self.row_index
    }

    /// 已经开始打点但还没有结束的行。
    #[must_use]
    pub fn active_row(&self) -> Option<usize> {
        self.row_anchor.map(|_| self.row_index)
    }

    /// 当前行已打点的次数。
    #[must_use]
    pub fn taps(&self) -> usize {
        self.tap_instants.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.row_index >= self.layout.rows().len()
    }

    /// 撤销删除历史中的条目数。
    #[must_use]
    pub fn undelete_len(&self) -> usize {
        self.undelete.len()
    }

    /// 下一个要打轴的行，供宿主高亮。
    ///
    /// 空闲时就是当前行；当前行打点中则是它之后的第一个未打轴行。
    #[must_use]
    pub fn upcoming_row(&self) -> Option<usize> {
        let next = if self.row_anchor.is_some() {
            self.layout.next_unmapped_row(self.row_index + 1)
        } else {
            self.row_index
        };
        (next < self.layout.rows().len()).then_some(next)
    }

    fn current_row(&self) -> Result<Row, SessionError> {
        self.layout
            .rows()
            .get(self.row_index)
            .cloned()
            .ok_or(SessionError::NoRowsRemaining)
    }

    /// 从 `start` 开始寻找下一个未打轴的行，并重置打点状态。
    fn advance_from(&mut self, start: usize) {
        self.row_index = self.layout.next_unmapped_row(start);
        self.row_anchor = None;
        self.tap_instants.clear();
        debug!("[TimingSession] 下一个待打轴行: {}", self.row_index);
    }

    /// 为当前行的下一个音节打点。
    pub fn tap(&mut self, host: &mut impl TimingHost) -> Result<(), SessionError> {
        logged(self.tap_inner(host))
    }

    fn tap_inner(&mut self, host: &mut impl TimingHost) -> Result<(), SessionError> {
        let row = self.current_row()?;
        if self.tap_instants.len() >= row.len() {
            return Err(SessionError::RowFull {
                row: self.row_index,
            });
        }

        self.undelete.clear();

        let instant = host.monotonic_now();
        let position = host.playback_position();
        self.tap_instants.push(instant);
        let anchor = *self.row_anchor.get_or_insert(position);

        let elapsed = instant
            .saturating_sub(self.tap_instants[0])
            .as_secs_f64();
        let mut start = anchor + elapsed;
        if start > position + self.options.timestamp_correction_trigger {
            debug!("[TimingSession] 推算时间 {start:.3} 超出播放位置 {position:.3}，改用播放位置");
            start = position;
        }

        let tap_index = self.tap_instants.len() - 1;
        let token_index = row.first() + tap_index;
        let tokens = self.layout.tokens_mut();
        tokens[token_index].timing = Some(Timing::pending(start));
        if tap_index > 0
            && let Some(previous) = tokens[token_index - 1].timing.as_mut()
        {
            previous.karaoke = start - previous.start;
        }

        if self.options.play_cue {
            host.on_tap_cue();
        }
        debug!(
            "[TimingSession] 第 {} 行第 {} 个音节开始于 {start:.3}",
            self.row_index,
            tap_index + 1
        );
        Ok(())
    }

    /// 以当前播放位置结束当前行。
    ///
    /// `continue_next` 为真时，紧接着为下一行的第一个音节打点。
    pub fn end_row(
        &mut self,
        host: &mut impl TimingHost,
        continue_next: bool,
    ) -> Result<(), SessionError> {
        logged(self.end_row_inner(host, continue_next))
    }

    fn end_row_inner(
        &mut self,
        host: &mut impl TimingHost,
        continue_next: bool,
    ) -> Result<(), SessionError> {
        let row = self.current_row()?;
        let taps = self.tap_instants.len();
        if taps != row.len() {
            return Err(SessionError::IncompleteRow {
                text: self.layout.row_text(&row),
                taps,
                expected: row.len(),
            });
        }
        let Some(anchor) = self.row_anchor else {
            return Err(SessionError::EmptyRow);
        };

        self.tap_instants.push(host.monotonic_now());
        let end = host.playback_position();
        let tokens = &mut self.layout.tokens_mut()[row.tokens.clone()];
        let mut consumed = anchor;
        for token in tokens.iter_mut() {
            if let Some(timing) = token.timing.as_mut() {
                timing.end = end;
            }
        }
        if let Some((last, rest)) = tokens.split_last_mut() {
            consumed += rest
                .iter()
                .filter_map(|t| t.timing.map(|timing| timing.karaoke))
                .sum::<f64>();
            if let Some(timing) = last.timing.as_mut() {
                timing.karaoke = end - consumed;
                if timing.karaoke < 0.0 {
                    warn!(
                        "[TimingSession] 第 {} 行最后一个音节的卡拉OK时长为负数: {:.3}",
                        self.row_index, timing.karaoke
                    );
                }
            }
        }
        debug!("[TimingSession] 第 {} 行结束于 {end:.3}", self.row_index);

        self.advance_from(self.row_index);
        if continue_next && !self.is_finished() {
            self.tap_inner(host)?;
        }
        Ok(())
    }

    /// 删除正在打点的行；没有时删除上一行。返回被删除的行。
    pub fn back(&mut self, host: &mut impl TimingHost) -> Result<Option<usize>, SessionError> {
        let target = match self.active_row() {
            Some(row) => row,
            None if self.row_index > 0 => self.row_index - 1,
            None => return Ok(None),
        };
        self.delete_row(host, target).map(|()| Some(target))
    }

    /// 删除播放位置所在的行。
    ///
    /// 有正在打点的行时等同于 [`Self::back`]。没有匹配的行时什么也不做。
    pub fn delete_at_playhead(
        &mut self,
        host: &mut impl TimingHost,
    ) -> Result<Option<usize>, SessionError> {
        if self.active_row().is_some() {
            return self.back(host);
        }

        let position = host.playback_position();
        let found: Vec<usize> = self
            .layout
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                self.layout.tokens()[row.first()]
                    .timing
                    .is_some_and(|t| t.start <= position && position <= t.end)
            })
            .map(|(index, _)| index)
            .collect();

        match found.as_slice() {
            [] => Ok(None),
            [row] => {
                let row = *row;
                self.delete_row(host, row).map(|()| Some(row))
            }
            _ => logged(Err(SessionError::AmbiguousPlayhead { rows: found })),
        }
    }

    /// 清除一行的时间信息，并从第一行开始重新寻找待打轴行。
    ///
    /// 已完成的行会被保存到撤销删除历史中，正在打点的行不会。
    /// 如果另有一行正在打点，它已打的点也一并清除。
    pub fn delete_row(
        &mut self,
        host: &mut impl TimingHost,
        row: usize,
    ) -> Result<(), SessionError> {
        logged(self.delete_row_inner(host, row))
    }

    fn delete_row_inner(
        &mut self,
        host: &mut impl TimingHost,
        row: usize,
    ) -> Result<(), SessionError> {
        let row_count = self.layout.rows().len();
        let Some(target) = self.layout.rows().get(row).cloned() else {
            return Err(SessionError::RowOutOfRange { row, row_count });
        };

        let active = self.active_row();
        if active != Some(row) {
            let saved = self.layout.tokens()[target.tokens.clone()]
                .iter()
                .map(|t| t.timing)
                .collect();
            self.undelete.push((row, saved));
        }

        self.clear_row(host, &target);
        if let Some(active) = active
            && active != row
        {
            let partial = self.layout.rows()[active].clone();
            self.clear_row(host, &partial);
        }

        debug!("[TimingSession] 已删除第 {row} 行的时间信息");
        self.advance_from(0);
        Ok(())
    }

    fn clear_row(&mut self, host: &mut impl TimingHost, row: &Row) {
        for index in row.tokens.clone() {
            if self.layout.tokens_mut()[index].timing.take().is_some() {
                host.on_marker_cleared(index);
            }
        }
    }

    /// 恢复最近一次删除的行。
    pub fn undelete(&mut self, host: &mut impl TimingHost) -> Result<(), SessionError> {
        logged(self.undelete_inner(host))
    }

    fn undelete_inner(&mut self, host: &mut impl TimingHost) -> Result<(), SessionError> {
        let (row, saved) = self.undelete.pop().ok_or(SessionError::UndeleteEmpty)?;
        let row_count = self.layout.rows().len();
        let target = self
            .layout
            .rows()
            .get(row)
            .cloned()
            .ok_or(SessionError::RowOutOfRange { row, row_count })?;

        for (index, timing) in target.tokens.zip(saved) {
            self.layout.tokens_mut()[index].timing = timing;
            host.on_marker_cleared(index);
        }

        debug!("[TimingSession] 已恢复第 {row} 行的时间信息");
        self.advance_from(0);
        Ok(())
    }
}
