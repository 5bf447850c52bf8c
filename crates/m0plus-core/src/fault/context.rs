//! Register context stacked by the core on exception entry.

/// Words the core pushes on exception entry: `r0-r3, r12, lr, pc, xPSR`.
pub const EXCEPTION_FRAME_WORDS: usize = 8;

/// `EXC_RETURN` bit set when the interrupted code ran on the process stack.
pub const EXC_RETURN_PROCESS_STACK: u32 = 1 << 2;

/// Snapshot of the stacked registers at fault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaultContext {
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
    exc_return: u32,
    stack_pointer: u32,
}

impl FaultContext {
    /// Copies the stacked frame found at `stack_pointer`.
    ///
    /// `exc_return` is the link register value on handler entry.
    #[must_use]
    pub const fn capture(
        stack_pointer: u32,
        frame: &[u32; EXCEPTION_FRAME_WORDS],
        exc_return: u32,
    ) -> Self {
        Self {
            r0: frame[0],
            r1: frame[1],
            r2: frame[2],
            r3: frame[3],
            r12: frame[4],
            lr: frame[5],
            pc: frame[6],
            xpsr: frame[7],
            exc_return,
            stack_pointer,
        }
    }

    /// Stacked `r0`.
    #[must_use]
    pub const fn r0(&self) -> u32 {
        self.r0
    }

    /// Stacked `r1`.
    #[must_use]
    pub const fn r1(&self) -> u32 {
        self.r1
    }

    /// Stacked `r2`.
    #[must_use]
    pub const fn r2(&self) -> u32 {
        self.r2
    }

    /// Stacked `r3`.
    #[must_use]
    pub const fn r3(&self) -> u32 {
        self.r3
    }

    /// Stacked `r12`.
    #[must_use]
    pub const fn r12(&self) -> u32 {
        self.r12
    }

    /// Stacked link register of the faulting code.
    #[must_use]
    pub const fn lr(&self) -> u32 {
        self.lr
    }

    /// Stacked program counter: the faulting instruction.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Stacked program status register.
    #[must_use]
    pub const fn xpsr(&self) -> u32 {
        self.xpsr
    }

    /// `EXC_RETURN` value the handler was entered with.
    #[must_use]
    pub const fn exc_return(&self) -> u32 {
        self.exc_return
    }

    /// Stack pointer holding the frame.
    #[must_use]
    pub const fn stack_pointer(&self) -> u32 {
        self.stack_pointer
    }

    /// Returns `true` when the faulting code ran on the process stack.
    #[must_use]
    pub const fn used_process_stack(&self) -> bool {
        self.exc_return & EXC_RETURN_PROCESS_STACK != 0
    }
}

#[cfg(test)]
mod tests {
    use super::FaultContext;

    #[test]
    fn thread_mode_main_stack_return_is_detected() {
        let frame = [0; 8];
        let msp = FaultContext::capture(0x2000_0F00, &frame, 0xFFFF_FFF9);
        let psp = FaultContext::capture(0x2000_0F00, &frame, 0xFFFF_FFFD);
        assert!(!msp.used_process_stack());
        assert!(psp.used_process_stack());
    }
}
