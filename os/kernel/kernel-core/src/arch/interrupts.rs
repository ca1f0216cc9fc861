use super::{X86Cpu, halt_forever, kernel};
use crate::cpu::Cpu;
use core::arch::naked_asm;
use kernel_task::TaskContext;
use log::error;

/// LAPIC timer vector entry.
///
/// Builds a complete [`TaskContext`] of the interrupted code on the stack
/// so the scheduler can save it if it switches away. If it does not, the
/// registers are restored from that image.
#[unsafe(naked)]
pub extern "C" fn lapic_timer_entry() {
    naked_asm!(
        // [rbp] = old rbp, +0x08 rip, +0x10 cs, +0x18 rflags, +0x20 rsp, +0x28 ss
        "push rbp",
        "mov rbp, rsp",

        // the CPU aligned rsp to 16 before its 5 pushes; with rbp it is aligned again
        "sub rsp, 512",
        "fxsave64 [rsp]",
        "push r15",
        "push r14",
        "push r13",
        "push r12",
        "push r11",
        "push r10",
        "push r9",
        "push r8",
        "push qword ptr [rbp]",        // rbp
        "push qword ptr [rbp + 0x20]", // rsp
        "push rsi",
        "push rdi",
        "push rdx",
        "push rcx",
        "push rbx",
        "push rax",

        "mov ax, fs",
        "movzx rax, ax",
        "mov bx, gs",
        "movzx rbx, bx",
        "mov rcx, cr3",

        "push rbx",                    // gs
        "push rax",                    // fs
        "push qword ptr [rbp + 0x28]", // ss
        "push qword ptr [rbp + 0x10]", // cs
        "push rbp",                    // reserved1
        "push qword ptr [rbp + 0x18]", // rflags
        "push qword ptr [rbp + 0x08]", // rip
        "push rcx",                    // cr3

        "mov rdi, rsp",
        "call {rust}",

        "add rsp, 8*8",                // cr3 .. gs
        "pop rax",
        "pop rbx",
        "pop rcx",
        "pop rdx",
        "pop rdi",
        "pop rsi",
        "add rsp, 16",                 // rsp, rbp
        "pop r8",
        "pop r9",
        "pop r10",
        "pop r11",
        "pop r12",
        "pop r13",
        "pop r14",
        "pop r15",
        "fxrstor64 [rsp]",

        "mov rsp, rbp",
        "pop rbp",
        "iretq",
        rust = sym lapic_timer_rust,
    );
}

extern "C" fn lapic_timer_rust(saved: &TaskContext) {
    match kernel() {
        Some(kernel) => kernel.on_timer_interrupt(saved),
        None => X86Cpu.notify_end_of_interrupt(),
    }
}

/// Page-fault (vector 14) entry. Resumes the faulting instruction once the
/// page is mapped; any other fault stops the CPU.
#[unsafe(naked)]
pub extern "C" fn page_fault_entry() {
    naked_asm!(
        // SysV caller-saved registers; the Rust side preserves the rest
        "push rax",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        // error code + 9 pushes leave rsp 8 off; realign for the call
        "sub rsp, 8",

        "mov rdi, [rsp + 80]",         // error code
        "mov rsi, cr2",                // faulting address
        "call {rust}",

        "add rsp, 8",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rax",
        "add rsp, 8",                  // error code
        "iretq",
        rust = sym page_fault_rust,
    );
}

extern "C" fn page_fault_rust(error_code: u64, addr: u64) {
    let Some(kernel) = kernel() else {
        error!("#PF at {addr:#x} (err {error_code:#x}) before kernel init");
        halt_forever();
    };
    if let Err(e) = kernel.on_page_fault(error_code, addr) {
        error!("#PF at {addr:#x} (err {error_code:#x}): {e}");
        halt_forever();
    }
}
