//! Function Invocations
//!
//! A [`FunctionInvocation`] is one call to a library function inside a
//! generated entry point. Invocations carry a *group* key that decides where
//! in the entry point they are emitted (transform before colour before
//! lighting, …).
//!
//! # Ordering
//!
//! Invocations implement a total order that compares their *signature*:
//! group, function name, operand count and then, per operand, its usage and
//! effective type. A mask therefore changes the signature only when it changes
//! the number of components seen by the callee: an `XYZ` mask on a `vec3`
//! parameter compares equal to the unmasked parameter, an `XY` mask compares
//! less.

use std::cmp::Ordering;

use smallvec::SmallVec;

use super::parameter::{Operand, OperandMask, OperandSemantic, ParameterPtr};

// ─── Execution groups ────────────────────────────────────────────────────────

/// Emission groups used by the built-in sub-render-states.
pub mod groups {
    pub const VS_TRANSFORM: i32 = 100;
    pub const VS_COLOUR: i32 = 200;
    pub const VS_LIGHTING: i32 = 300;
    pub const VS_TEXTURING: i32 = 400;

    pub const PS_COLOUR_BEGIN: i32 = 100;
    pub const PS_SAMPLING: i32 = 150;
    pub const PS_TEXTURING: i32 = 200;
    pub const PS_COLOUR_END: i32 = 500;
}

/// A call to a named shader function.
#[derive(Debug, Clone)]
pub struct FunctionInvocation {
    function_name: String,
    group: i32,
    operands: SmallVec<[Operand; 4]>,
}

impl FunctionInvocation {
    #[must_use]
    pub fn new(function_name: impl Into<String>, group: i32) -> Self {
        Self {
            function_name: function_name.into(),
            group,
            operands: SmallVec::new(),
        }
    }

    /// Appends an operand that uses the whole parameter.
    pub fn push_operand(&mut self, parameter: ParameterPtr, semantic: OperandSemantic) -> &mut Self {
        self.push_operand_with_mask(parameter, semantic, OperandMask::empty())
    }

    /// Appends an operand restricted to the components in `mask`.
    ///
    /// An empty mask selects the whole parameter.
    pub fn push_operand_with_mask(
        &mut self,
        parameter: ParameterPtr,
        semantic: OperandSemantic,
        mask: OperandMask,
    ) -> &mut Self {
        self.operands.push(Operand::new(parameter, semantic, Some(mask)));
        self
    }

    /// Builder form of [`push_operand`](Self::push_operand).
    #[must_use]
    pub fn with_operand(mut self, parameter: ParameterPtr, semantic: OperandSemantic) -> Self {
        self.push_operand(parameter, semantic);
        self
    }

    /// Builder form of [`push_operand_with_mask`](Self::push_operand_with_mask).
    #[must_use]
    pub fn with_masked_operand(
        mut self,
        parameter: ParameterPtr,
        semantic: OperandSemantic,
        mask: OperandMask,
    ) -> Self {
        self.push_operand_with_mask(parameter, semantic, mask);
        self
    }

    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> i32 {
        self.group
    }

    #[inline]
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Compact signature text, e.g. `FFP_Transform(in mat4x4f, in vec4f, out vec4f)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .operands
            .iter()
            .map(|op| {
                let usage = match op.semantic() {
                    OperandSemantic::In => "in",
                    OperandSemantic::Out => "out",
                    OperandSemantic::InOut => "inout",
                };
                format!("{usage} {}", op.effective_type().wgsl())
            })
            .collect();
        format!("{}({})", self.function_name, args.join(", "))
    }
}

impl Ord for FunctionInvocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| self.function_name.cmp(&other.function_name))
            .then_with(|| self.operands.len().cmp(&other.operands.len()))
            .then_with(|| {
                self.operands
                    .iter()
                    .zip(other.operands.iter())
                    .map(|(lhs, rhs)| {
                        lhs.semantic()
                            .cmp(&rhs.semantic())
                            .then_with(|| lhs.effective_type().cmp(&rhs.effective_type()))
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
    }
}

impl PartialOrd for FunctionInvocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FunctionInvocation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FunctionInvocation {}
