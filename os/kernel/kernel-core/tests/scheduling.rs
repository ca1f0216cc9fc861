mod common;

use common::{Frames, MockCpu, TestPhys, frames, idle, worker};
use kernel_core::KernelCore;
use kernel_info::sched::{MAX_LEVEL, TASK_TIMER_PERIOD};
use kernel_sync::SpinLock;
use kernel_task::{Message, TaskContext, TaskId};

const MAIN: TaskId = TaskId::new(1);
const IDLE: TaskId = TaskId::new(2);
const CR3: u64 = 0x5000;

fn context_of(core: &KernelCore<'_, MockCpu, &TestPhys, Frames>, id: TaskId) -> *const TaskContext {
    core.with_tasks(|t| std::ptr::from_ref(t.task(id).unwrap().context()))
}

#[test]
fn caller_becomes_main_task() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    assert_eq!(core.current_task(), MAIN);
    assert_eq!(core.with_tasks(|t| t.idle_task()), IDLE);
    assert_eq!(core.with_tasks(|t| t.task(IDLE).unwrap().context().cr3), CR3);
    assert_eq!(core.current_tick(), 0);
}

#[test]
fn spawned_task_inherits_page_tables() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    let a = core.spawn(worker, 7, None).unwrap();
    core.with_tasks(|t| {
        let task = t.task(a).unwrap();
        assert!(task.running());
        assert_eq!(task.context().cr3, CR3);
        assert_eq!(task.context().rsi, 7);
    });
}

#[test]
fn spawn_with_bad_level_leaves_task_asleep() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    assert!(core.spawn(worker, 0, Some(MAX_LEVEL + 1)).is_err());
    let orphan = TaskId::new(3);
    assert!(!core.with_tasks(|t| t.task(orphan).unwrap().running()));
}

#[test]
fn timer_preempts_once_per_period() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);
    let a = core.spawn(worker, 0, Some(MAX_LEVEL)).unwrap();

    let mut saved = TaskContext::zeroed();
    saved.rip = 0xdead_0000;
    for _ in 1..TASK_TIMER_PERIOD {
        core.on_timer_interrupt(&saved);
    }
    assert!(core.cpu().restores.borrow().is_empty());

    core.on_timer_interrupt(&saved);
    assert_eq!(core.cpu().eois.get(), usize::try_from(TASK_TIMER_PERIOD).unwrap());
    assert_eq!(*core.cpu().restores.borrow(), [context_of(&core, a)]);
    assert_eq!(core.current_task(), a);
    assert_eq!(core.with_tasks(|t| t.task(MAIN).unwrap().context().rip), 0xdead_0000);
}

#[test]
fn lone_task_is_not_switched() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    let saved = TaskContext::zeroed();
    for _ in 0..3 * TASK_TIMER_PERIOD {
        core.on_timer_interrupt(&saved);
    }
    assert!(core.cpu().restores.borrow().is_empty());
    assert_eq!(core.current_task(), MAIN);
}

#[test]
fn timer_timeout_is_delivered() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    core.add_timer(3, 42, MAIN);
    let saved = TaskContext::zeroed();
    for _ in 0..3 {
        core.on_timer_interrupt(&saved);
    }
    assert_eq!(
        core.receive_message(MAIN).unwrap(),
        Some(Message::TimerTimeout {
            timeout: 3,
            value: 42
        })
    );
}

#[test]
fn sleeping_caller_switches_to_idle() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    core.sleep(MAIN).unwrap();

    let switches = core.cpu().switches.borrow();
    assert_eq!(switches.len(), 1);
    assert_eq!(switches[0].0, context_of(&core, IDLE));
    assert_eq!(switches[0].1.cast_const(), context_of(&core, MAIN));
    assert_eq!(core.current_task(), IDLE);
}

#[test]
fn sleeping_another_task_does_not_switch() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);
    let a = core.spawn(worker, 0, None).unwrap();

    core.sleep(a).unwrap();

    assert!(core.cpu().switches.borrow().is_empty());
    assert!(!core.with_tasks(|t| t.task(a).unwrap().running()));
}

#[test]
fn receive_or_sleep_takes_queued_message() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    let key = Message::KeyPush {
        modifier: 0,
        keycode: 4,
        ascii: b'a',
    };
    core.send_message(MAIN, key).unwrap();

    assert_eq!(core.receive_or_sleep(MAIN).unwrap(), Some(key));
    assert!(core.cpu().switches.borrow().is_empty());
}

#[test]
fn receive_or_sleep_suspends_on_empty_mailbox() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);

    // the mock "returns" from the switch without anyone waking main, so the
    // second round finds it already asleep
    assert_eq!(core.receive_or_sleep(MAIN).unwrap(), None);
    assert_eq!(core.cpu().switches.borrow().len(), 1);
    assert_eq!(core.current_task(), IDLE);

    core.send_message(MAIN, Message::InterruptXhci).unwrap();
    assert!(core.with_tasks(|t| t.task(MAIN).unwrap().running()));
}

#[test]
fn unknown_task_is_an_error() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::with_cr3(CR3), &phys, &frames, idle);
    let ghost = TaskId::new(99);

    assert!(core.sleep(ghost).is_err());
    assert!(core.wakeup(ghost, None).is_err());
    assert!(core.send_message(ghost, Message::LayerFinish).is_err());
    assert!(core.receive_or_sleep(ghost).is_err());
    assert!(core.init_context(ghost, worker, 0).is_err());
}

#[test]
fn idle_halts() {
    let phys = TestPhys::new();
    let frames = SpinLock::new(frames());
    let core = KernelCore::new(MockCpu::default(), &phys, &frames, idle);
    core.idle();
    assert_eq!(core.cpu().halts.get(), 1);
}
