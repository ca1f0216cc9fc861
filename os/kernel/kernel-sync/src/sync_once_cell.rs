use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FULL: u8 = 2;

/// Write-once cell used for the few values interrupt trampolines must reach
/// without an argument (the installed kernel core, the logger).
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    slot: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.state.load(Ordering::Acquire) == FULL
    }

    /// # Safety
    /// The cell must be `FULL`.
    #[inline]
    unsafe fn value(&self) -> &T {
        unsafe { (*self.slot.get()).assume_init_ref() }
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // Safety: checked FULL first
        self.is_full().then(|| unsafe { self.value() })
    }

    /// Stores `value` unless the cell was already claimed; hands it back then.
    ///
    /// # Errors
    /// The rejected value if another writer came first.
    pub fn set(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        unsafe { (*self.slot.get()).write(value) };
        self.state.store(FULL, Ordering::Release);
        Ok(())
    }

    /// The stored value, running `init` first if the cell is empty. A
    /// concurrent writer wins over `init`.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if !self.is_full() {
            drop(self.set(init()));
            while !self.is_full() {
                spin_loop();
            }
        }
        // Safety: FULL
        unsafe { self.value() }
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == FULL {
            unsafe { self.slot.get_mut().assume_init_drop() }
        }
    }
}

// Safety: readers only see the value after FULL; there is a single writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
