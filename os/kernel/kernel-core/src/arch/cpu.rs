use super::context;
use crate::cpu::Cpu;
use core::arch::asm;
use kernel_task::TaskContext;

/// x2APIC end-of-interrupt register.
const IA32_X2APIC_EOI: u32 = 0x80B;

/// The boot processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86Cpu;

impl Cpu for X86Cpu {
    #[inline]
    fn read_cr3(&self) -> u64 {
        let cr3: u64;
        unsafe { asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags)) };
        cr3
    }

    #[inline]
    unsafe fn write_cr3(&self, root: u64) {
        unsafe { asm!("mov cr3, {}", in(reg) root, options(nostack, preserves_flags)) };
    }

    #[inline]
    fn notify_end_of_interrupt(&self) {
        unsafe {
            asm!(
                "wrmsr",
                in("ecx") IA32_X2APIC_EOI,
                in("eax") 0u32,
                in("edx") 0u32,
                options(nostack, preserves_flags)
            );
        }
    }

    #[inline]
    unsafe fn switch_context(&self, next: *const TaskContext, current: *mut TaskContext) {
        unsafe { context::switch_context(next, current) };
    }

    #[inline]
    unsafe fn restore_context(&self, next: *const TaskContext) {
        unsafe { context::restore_context(next) }
    }

    #[inline]
    fn halt(&self) {
        unsafe { asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}
