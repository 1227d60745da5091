/// Transient toast state: at most one notice, replaced on report, cleared
/// automatically after a fixed number of UI ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NoticeCenter {
    current: Option<Notice>,
    display_ticks: u8,
    ticks_remaining: u8,
}

impl NoticeCenter {
    #[must_use]
    pub fn new(display_ticks: u8) -> Self {
        Self {
            current: None,
            display_ticks,
            ticks_remaining: 0,
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(NoticeKind::Success, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(NoticeKind::Error, message.into());
    }

    fn show(&mut self, kind: NoticeKind, message: String) {
        self.current = Some(Notice { kind, message });
        self.ticks_remaining = self.display_ticks;
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.ticks_remaining = 0;
    }

    pub fn tick(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        if self.ticks_remaining == 0 {
            self.current = None;
        }
    }
}
