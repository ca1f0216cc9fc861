//! Register save/restore against the fixed [`TaskContext`] layout:
//!
//! ```text
//! 0x00 cr3    0x08 rip    0x10 rflags  0x18 reserved
//! 0x20 cs     0x28 ss     0x30 fs      0x38 gs
//! 0x40 rax    0x48 rbx    0x50 rcx     0x58 rdx
//! 0x60 rdi    0x68 rsi    0x70 rsp     0x78 rbp
//! 0x80 r8 ... 0xb8 r15    0xc0 fxsave area (512 bytes)
//! ```

use core::arch::naked_asm;
use kernel_task::TaskContext;

/// Save the caller's registers into `current` and resume `next`.
///
/// `current` resumes as if this call had returned normally.
///
/// # Safety
/// Both contexts must be live and `next` resumable; interrupts masked.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(next: *const TaskContext, current: *mut TaskContext) {
    naked_asm!(
        // rdi = next, rsi = current
        "mov [rsi + 0x40], rax",
        "mov [rsi + 0x48], rbx",
        "mov [rsi + 0x50], rcx",
        "mov [rsi + 0x58], rdx",
        "mov [rsi + 0x60], rdi",
        "mov [rsi + 0x68], rsi",

        "lea rax, [rsp + 8]",
        "mov [rsi + 0x70], rax",      // rsp after our `ret`
        "mov [rsi + 0x78], rbp",

        "mov [rsi + 0x80], r8",
        "mov [rsi + 0x88], r9",
        "mov [rsi + 0x90], r10",
        "mov [rsi + 0x98], r11",
        "mov [rsi + 0xa0], r12",
        "mov [rsi + 0xa8], r13",
        "mov [rsi + 0xb0], r14",
        "mov [rsi + 0xb8], r15",

        "mov rax, cr3",
        "mov [rsi + 0x00], rax",
        "mov rax, [rsp]",
        "mov [rsi + 0x08], rax",      // return address
        "pushfq",
        "pop qword ptr [rsi + 0x10]",

        "mov ax, cs",
        "movzx rax, ax",
        "mov [rsi + 0x20], rax",
        "mov ax, ss",
        "movzx rax, ax",
        "mov [rsi + 0x28], rax",
        "mov ax, fs",
        "movzx rax, ax",
        "mov [rsi + 0x30], rax",
        "mov ax, gs",
        "movzx rax, ax",
        "mov [rsi + 0x38], rax",

        "fxsave64 [rsi + 0xc0]",
        "jmp {restore}",
        restore = sym restore_context,
    );
}

/// Load `next` completely and continue it via `iretq`. Never returns.
///
/// # Safety
/// `next` must hold a resumable state whose page tables map its stack.
#[unsafe(naked)]
pub unsafe extern "C" fn restore_context(next: *const TaskContext) {
    naked_asm!(
        // iretq frame
        "push qword ptr [rdi + 0x28]", // ss
        "push qword ptr [rdi + 0x70]", // rsp
        "push qword ptr [rdi + 0x10]", // rflags
        "push qword ptr [rdi + 0x20]", // cs
        "push qword ptr [rdi + 0x08]", // rip

        "fxrstor64 [rdi + 0xc0]",

        "mov rax, [rdi + 0x00]",
        "mov cr3, rax",
        "mov rax, [rdi + 0x30]",
        "mov fs, ax",
        "mov rax, [rdi + 0x38]",
        "mov gs, ax",

        "mov rax, [rdi + 0x40]",
        "mov rbx, [rdi + 0x48]",
        "mov rcx, [rdi + 0x50]",
        "mov rdx, [rdi + 0x58]",
        "mov rsi, [rdi + 0x68]",
        "mov rbp, [rdi + 0x78]",
        "mov r8,  [rdi + 0x80]",
        "mov r9,  [rdi + 0x88]",
        "mov r10, [rdi + 0x90]",
        "mov r11, [rdi + 0x98]",
        "mov r12, [rdi + 0xa0]",
        "mov r13, [rdi + 0xa8]",
        "mov r14, [rdi + 0xb0]",
        "mov r15, [rdi + 0xb8]",

        "mov rdi, [rdi + 0x60]",
        "iretq",
    );
}
