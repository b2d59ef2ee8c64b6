//! 有界的撤销/重做历史，以及歌词文本编辑器。

use std::collections::VecDeque;

use tracing::debug;

use crate::converter::processors::text_normalizer::prepare_for_syllablize;

/// 容量固定的后进先出栈，满了以后丢弃最旧的元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedStack<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedStack<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 压入一个元素。容量为 0 时直接丢弃。
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 从最旧到最新遍历。
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }
}

/// 一对撤销/重做栈。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditHistory<T> {
    undo: BoundedStack<T>,
    redo: BoundedStack<T>,
}

impl<T> EditHistory<T> {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            undo: BoundedStack::new(depth),
            redo: BoundedStack::new(depth),
        }
    }

    /// 记录修改之前的状态。新的修改会使重做历史失效。
    pub fn record(&mut self, previous: T) {
        self.redo.clear();
        self.undo.push(previous);
    }

    /// 取出上一个状态，并把当前状态放入重做栈。
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// 取出被撤销的状态，并把当前状态放回撤销栈。
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

/// 载入打轴之前的歌词文本，带撤销/重做。
#[derive(Debug, Clone)]
pub struct LyricsEditor {
    text: String,
    history: EditHistory<String>,
}

impl LyricsEditor {
    #[must_use]
    pub fn new(text: impl Into<String>, depth: usize) -> Self {
        Self {
            text: text.into(),
            history: EditHistory::new(depth),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 用新文本替换当前文本。内容相同时不产生历史记录。
    pub fn edit(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.text {
            return;
        }
        let previous = std::mem::replace(&mut self.text, text);
        self.history.record(previous);
    }

    /// 对当前文本做预处理和分音节，返回文本是否发生了变化。
    pub fn syllablize(&mut self, level: u8) -> bool {
        let processed = prepare_for_syllablize(&self.text, level);
        if processed == self.text {
            debug!("[LyricsEditor] 分音节没有改变文本");
            return false;
        }
        self.edit(processed);
        true
    }

    pub fn undo(&mut self) -> bool {
        let current = self.text.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.text = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.text.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.text = next;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
