use crate::task::TaskId;

/// What a compositor request asks for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LayerOperation {
    Move { x: i32, y: i32 },
    MoveRelative { dx: i32, dy: i32 },
    Draw,
}

/// A notification delivered by value into a task's mailbox.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Message {
    InterruptXhci,
    InterruptLapicTimer,
    /// A timer registered with the timer manager expired.
    TimerTimeout { timeout: u64, value: i32 },
    KeyPush { modifier: u8, keycode: u8, ascii: u8 },
    /// A task asks the compositor to act on one of its layers.
    Layer {
        src_task: TaskId,
        op: LayerOperation,
        layer_id: u32,
    },
    /// The compositor finished a [`Message::Layer`] request.
    LayerFinish,
}
