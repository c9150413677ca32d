//! Conditional-compilation state machine (C5): tracks the nested stack of
//! `#if`/`#ifdef`/`#ifndef` ... `#elif` ... `#else` ... `#endif` frames and
//! decides, at any point in the input, whether the engine is currently
//! emitting tokens.

/// One entry on the conditional stack, covering a single `#if`..`#endif`
/// chain (including any `#elif`/`#else` branches within it).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalFrame {
    /// Whether some branch of this chain has already been taken.
    pub taken: bool,
    /// Whether *this* branch (the current one in the chain) is active.
    pub active: bool,
    /// Whether a `#else` has already been seen in this chain.
    pub seen_else: bool,
}

/// Reasons a conditional directive can be rejected; translated into
/// [`cprep_foundation::errors::PreprocessorError::ConditionalImbalance`] by
/// the engine, which has the line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalError {
    /// `#elif`/`#else`/`#endif` with no matching `#if`.
    NoOpenFrame,
    /// `#elif`/`#else` after an `#else` in the same chain.
    ElseAlreadySeen,
}

/// The stack of open conditional frames (C5). Each frame's `active` flag is
/// evaluated purely against its own branch; whether the engine emits
/// anything at a given point is the nested-gating AND of every frame's
/// `active` flag on the stack, computed by [`ConditionalStack::is_emitting`].
#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    frames: Vec<ConditionalFrame>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A region only emits if it and every enclosing frame are active.
    pub fn is_emitting(&self) -> bool {
        self.frames.iter().all(|frame| frame.active)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a new frame for `#if`/`#ifdef`/`#ifndef`.
    pub fn push(&mut self, predicate_true: bool) {
        self.frames.push(ConditionalFrame {
            taken: predicate_true,
            active: predicate_true,
            seen_else: false,
        });
    }

    /// Handles `#elif predicate`.
    pub fn elif(&mut self, predicate_true: bool) -> Result<(), ConditionalError> {
        let frame = self.frames.last_mut().ok_or(ConditionalError::NoOpenFrame)?;
        if frame.seen_else {
            return Err(ConditionalError::ElseAlreadySeen);
        }
        if frame.taken {
            frame.active = false;
        } else if predicate_true {
            frame.taken = true;
            frame.active = true;
        } else {
            frame.active = false;
        }
        Ok(())
    }

    /// Handles `#else`.
    pub fn else_branch(&mut self) -> Result<(), ConditionalError> {
        let frame = self.frames.last_mut().ok_or(ConditionalError::NoOpenFrame)?;
        if frame.seen_else {
            return Err(ConditionalError::ElseAlreadySeen);
        }
        frame.seen_else = true;
        frame.active = !frame.taken;
        if frame.active {
            frame.taken = true;
        }
        Ok(())
    }

    /// Handles `#endif`, popping the innermost frame.
    pub fn endif(&mut self) -> Result<(), ConditionalError> {
        self.frames.pop().map(|_| ()).ok_or(ConditionalError::NoOpenFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_if_true_emits() {
        let mut stack = ConditionalStack::new();
        stack.push(true);
        assert!(stack.is_emitting());
        stack.endif().unwrap();
        assert!(stack.is_emitting());
    }

    #[test]
    fn simple_if_false_suppresses() {
        let mut stack = ConditionalStack::new();
        stack.push(false);
        assert!(!stack.is_emitting());
    }

    #[test]
    fn else_fires_only_when_if_was_false() {
        let mut stack = ConditionalStack::new();
        stack.push(false);
        stack.else_branch().unwrap();
        assert!(stack.is_emitting());

        let mut stack = ConditionalStack::new();
        stack.push(true);
        stack.else_branch().unwrap();
        assert!(!stack.is_emitting());
    }

    #[test]
    fn elif_chain_takes_first_true_branch_only() {
        let mut stack = ConditionalStack::new();
        stack.push(false);
        stack.elif(false).unwrap();
        assert!(!stack.is_emitting());
        stack.elif(true).unwrap();
        assert!(stack.is_emitting());
        stack.elif(true).unwrap();
        assert!(!stack.is_emitting());
        stack.else_branch().unwrap();
        assert!(!stack.is_emitting());
    }

    #[test]
    fn nested_gating_requires_every_enclosing_frame_active() {
        let mut stack = ConditionalStack::new();
        stack.push(true);
        stack.push(false);
        assert!(!stack.is_emitting());
        stack.else_branch().unwrap();
        assert!(stack.is_emitting());
        stack.endif().unwrap();
        assert!(stack.is_emitting());
    }

    #[test]
    fn else_twice_is_rejected() {
        let mut stack = ConditionalStack::new();
        stack.push(true);
        stack.else_branch().unwrap();
        assert_eq!(stack.else_branch(), Err(ConditionalError::ElseAlreadySeen));
    }

    #[test]
    fn endif_without_if_is_rejected() {
        let mut stack = ConditionalStack::new();
        assert_eq!(stack.endif(), Err(ConditionalError::NoOpenFrame));
    }
}
