//! # Scheduling Parameters

/// Highest priority level. Levels run from `0` (idle) to this value.
pub const MAX_LEVEL: usize = 7;

/// Level of the idle task; nothing else should be parked here.
pub const IDLE_LEVEL: usize = 0;

/// Level a task runs at when woken without an explicit level for the first time.
pub const DEFAULT_LEVEL: usize = 1;

/// Size of a task's private stack in bytes.
pub const TASK_STACK_BYTES: usize = 8 * 4096;

/// Timer interrupts per second.
pub const TIMER_FREQ: u64 = 100;

/// Ticks between two preemptive task switches (20 ms).
pub const TASK_TIMER_PERIOD: u64 = TIMER_FREQ / 50;

/// Value carried by the preemption timer.
pub const TASK_TIMER_VALUE: i32 = i32::MIN;

/// Default MXCSR value (all SSE exceptions masked).
pub const DEFAULT_MXCSR: u32 = 0x1f80;

const _: () = {
    assert!(IDLE_LEVEL < DEFAULT_LEVEL && DEFAULT_LEVEL <= MAX_LEVEL);
    assert!(TASK_STACK_BYTES.is_multiple_of(16));
    assert!(TASK_TIMER_PERIOD > 0);
};
