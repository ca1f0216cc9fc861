use kernel_info::sched::{TASK_TIMER_PERIOD, TASK_TIMER_VALUE};
use kernel_task::{Message, TaskId, TaskManager, Timer, TimerManager};

extern "C" fn idle(_: u64, _: i64) {}
extern "C" fn work(_: u64, _: i64) {}

const MAIN: TaskId = TaskId::new(1);

#[test]
fn preemption_timer_rearms() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);

    let fired: Vec<u64> = (0..5 * TASK_TIMER_PERIOD)
        .filter_map(|_| timers.tick(&mut tasks).then(|| timers.current_tick()))
        .collect();
    let expected: Vec<u64> = (1..=5).map(|n| n * TASK_TIMER_PERIOD).collect();
    assert_eq!(fired, expected);
    assert_eq!(timers.pending(), 1);
    // the preemption timer does not talk to mailboxes
    assert_eq!(tasks.receive_message(MAIN), Ok(None));
}

#[test]
fn expired_timer_becomes_message() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);
    let rx = tasks.new_task();
    tasks.init_context(rx, work, 0, 0).unwrap();

    timers.add_timer(Timer::new(3, 7, rx));
    timers.add_timer(Timer::new(5, 8, rx));

    timers.tick(&mut tasks);
    timers.tick(&mut tasks);
    assert_eq!(tasks.receive_message(rx), Ok(None));
    assert!(!tasks.task(rx).unwrap().running());

    timers.tick(&mut tasks);
    assert!(tasks.task(rx).unwrap().running());
    assert_eq!(
        tasks.receive_message(rx),
        Ok(Some(Message::TimerTimeout {
            timeout: 3,
            value: 7
        }))
    );

    timers.tick(&mut tasks);
    timers.tick(&mut tasks);
    assert_eq!(
        tasks.receive_message(rx),
        Ok(Some(Message::TimerTimeout {
            timeout: 5,
            value: 8
        }))
    );
    assert_eq!(timers.pending(), 1);
}

#[test]
fn overdue_timers_fire_in_timeout_order() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);
    let rx = tasks.new_task();

    timers.add_timer(Timer::new(1, 2, rx));
    timers.add_timer(Timer::new(0, 1, rx));
    timers.tick(&mut tasks);

    let values: Vec<i32> = std::iter::from_fn(|| tasks.receive_message(rx).unwrap())
        .map(|m| match m {
            Message::TimerTimeout { value, .. } => value,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(values, [1, 2]);
}

#[test]
fn timer_for_unknown_task_is_dropped() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);
    timers.add_timer(Timer::new(1, 5, TaskId::new(50)));
    timers.tick(&mut tasks);
    assert_eq!(timers.pending(), 1);
}

#[test]
fn timeout_for_unprimed_task_does_not_wake_it() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);
    let rx = tasks.new_task();

    timers.add_timer(Timer::new(1, 9, rx));
    timers.tick(&mut tasks);
    assert!(!tasks.task(rx).unwrap().running());
    assert_eq!(tasks.task(rx).unwrap().pending_messages(), 1);
}

#[test]
fn reserved_value_stays_one_shot() {
    let mut tasks = TaskManager::new(idle, 0);
    let mut timers = TimerManager::new(MAIN);
    let user = Timer::new(1, TASK_TIMER_VALUE, MAIN);
    assert!(!user.is_preemption());
    timers.add_timer(user);
    assert_eq!(timers.pending(), 2);

    let preemptions = (0..2 * TASK_TIMER_PERIOD)
        .filter(|_| timers.tick(&mut tasks))
        .count();
    assert_eq!(preemptions, 2);
    assert_eq!(timers.pending(), 1);
    assert_eq!(
        tasks.receive_message(MAIN),
        Ok(Some(Message::TimerTimeout {
            timeout: 1,
            value: TASK_TIMER_VALUE
        }))
    );
}
