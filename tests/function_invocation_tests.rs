//! Function Invocation Tests
//!
//! Tests for:
//! - FunctionInvocation ordering: masks compare by the component count they select
//! - Signature sets: equivalent invocations collapse, distinct ones are kept
//! - Writer: the signature set drives the listed function signatures

use std::collections::BTreeSet;

use glam::{Vec3, Vec4};

use myth_shadergen::shader::function::groups;
use myth_shadergen::shader::{
    FunctionInvocation, GpuConstantType, GpuProgramType, OperandMask, OperandSemantic,
    ParameterFactory, Program, ProgramWriter, Semantic, WgslProgramWriter,
};

fn invocation_with(mask: OperandMask) -> FunctionInvocation {
    let mut invocation = FunctionInvocation::new("name", 0);
    invocation.push_operand_with_mask(
        ParameterFactory::create_const_vec3(Vec3::ZERO),
        OperandSemantic::In,
        mask,
    );
    invocation
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn mask_order_follows_selected_components() {
    let mut a = FunctionInvocation::new("name", 0);
    a.push_operand(ParameterFactory::create_const_vec3(Vec3::ZERO), OperandSemantic::In);
    let b = invocation_with(OperandMask::XY);
    let c = invocation_with(OperandMask::XYZ);

    assert!(b != a);
    assert!(b < a);
    assert!(c == a);
    assert!(!(c < a));
}

#[test]
fn ordering_is_consistent_with_equality() {
    let a = invocation_with(OperandMask::empty());
    let b = invocation_with(OperandMask::X);
    let c = invocation_with(OperandMask::XYZ);

    assert_eq!(a.cmp(&c), std::cmp::Ordering::Equal);
    assert_eq!(a == c, a.cmp(&c).is_eq());
    assert!(b < a && b < c);
    assert_eq!(a.partial_cmp(&b), Some(a.cmp(&b)));
}

#[test]
fn function_name_orders_before_operands() {
    let mut a = FunctionInvocation::new("FFP_Add", 0);
    a.push_operand(ParameterFactory::create_const_vec4(Vec4::ONE), OperandSemantic::In);
    let b = FunctionInvocation::new("FFP_Modulate", 0);
    assert!(a < b);
}

// ============================================================================
// Signature sets
// ============================================================================

#[test]
fn equivalent_invocations_share_a_signature() {
    let set: BTreeSet<FunctionInvocation> = [
        invocation_with(OperandMask::empty()),
        invocation_with(OperandMask::XYZ),
        invocation_with(OperandMask::XY),
        invocation_with(OperandMask::Y | OperandMask::Z),
    ]
    .into_iter()
    .collect();

    // Unmasked == XYZ, and XY / YZ both select two components
    assert_eq!(set.len(), 2);
}

#[test]
fn writer_lists_each_signature_once() {
    let mut program = Program::new(GpuProgramType::Fragment);
    let colour_in = program
        .resolve_input(Semantic::Colour, 0, GpuConstantType::Float4)
        .unwrap();
    let colour_out = program
        .resolve_output(Semantic::Colour, 0, GpuConstantType::Float4)
        .unwrap();
    program.add_dependency("FFPLib_Common");
    for _ in 0..3 {
        program.add_invocation(
            FunctionInvocation::new("FFP_Assign", groups::PS_COLOUR_BEGIN)
                .with_operand(colour_in.clone(), OperandSemantic::In)
                .with_operand(colour_out.clone(), OperandSemantic::Out),
        );
    }

    let source = WgslProgramWriter.write_source(&program).unwrap().source;
    assert_eq!(source.matches("//   FFP_Assign(in vec4f, out vec4f)").count(), 1);
    assert_eq!(source.matches("FFP_Assign(input.colour0, &o_colour0);").count(), 3);
}
