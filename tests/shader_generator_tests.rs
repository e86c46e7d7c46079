//! Shader Generator Tests
//!
//! Tests for:
//! - ShaderGenerator: technique creation, validation, removal, schemes
//! - Template composition: FFP builder, scheme and per-pass templates
//! - ProgramManager: program sharing, reference counting, idempotent acquisition
//! - Failure handling: compile errors leave the material untouched
//! - Material removal: stale registrations, released programs
//! - Target languages: WGSL and GLSL output

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use myth_shadergen::material::{
    DEFAULT_RESOURCE_GROUP, LayerBlendOperation, TextureUnitState, TrackVertexColour,
};
use myth_shadergen::shader::{NagaCompiler, ProgramCompiler};
use myth_shadergen::{
    FfpColour, FfpLighting, GpuProgramType, MaterialManager, ShaderGenError, ShaderGenerator,
    ShaderGeneratorSettings,
};

const SCHEME: &str = "MyScheme";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (ShaderGenerator, MaterialManager) {
    init_logger();
    let generator = ShaderGenerator::new(ShaderGeneratorSettings::default()).unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    (generator, materials)
}

fn register(generator: &mut ShaderGenerator, materials: &MaterialManager, name: &str) -> bool {
    let material = materials.get_by_name(name, DEFAULT_RESOURCE_GROUP).unwrap();
    generator.create_shader_based_technique(material, 0, SCHEME)
}

fn validate(generator: &mut ShaderGenerator, materials: &mut MaterialManager, name: &str) -> bool {
    generator
        .validate_material(materials, SCHEME, name, DEFAULT_RESOURCE_GROUP)
        .unwrap()
}

// ============================================================================
// Technique lifecycle
// ============================================================================

#[test]
fn create_validate_and_remove_technique() {
    let (mut generator, mut materials) = setup();

    assert!(register(&mut generator, &materials, "TestMat"));
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 1);

    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name_mut("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);

    let generated = &material.techniques()[1];
    assert_eq!(generated.scheme_name(), SCHEME);
    assert!(generated.passes()[0].has_gpu_program(GpuProgramType::Vertex));
    assert!(generated.passes()[0].has_gpu_program(GpuProgramType::Fragment));

    assert!(generator.remove_shader_based_technique(material, 0, SCHEME));
    assert_eq!(material.techniques().len(), 1);
    assert!(!material.techniques()[0].is_programmable());

    // Second removal has nothing to remove
    assert!(!generator.remove_shader_based_technique(material, 0, SCHEME));
    assert_eq!(generator.program_manager().program_count(), 0);

    // Nothing to build until the technique is registered again
    assert!(!validate(&mut generator, &mut materials, "TestMat"));
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 1);
}

#[test]
fn scheme_already_present_on_material_is_rejected() {
    let (mut generator, mut materials) = setup();
    assert!(register(&mut generator, &materials, "TestMat"));
    validate(&mut generator, &mut materials, "TestMat");

    // The material now owns a technique in the scheme
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert!(!generator.create_shader_based_technique(material, 0, SCHEME));
}

#[test]
fn programmable_technique_is_rejected() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");
    validate(&mut generator, &mut materials, "TestMat");

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert!(!generator.create_shader_based_technique(material, 1, "OtherScheme"));
}

// ============================================================================
// Material removal
// ============================================================================

#[test]
fn recreated_material_is_rebuilt() {
    let (mut generator, mut materials) = setup();
    assert!(register(&mut generator, &materials, "TestMat"));
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let handle = materials.handle_of("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    materials.remove(handle);
    // Dropped passes never released their programs
    assert_eq!(generator.program_manager().program_count(), 2);

    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
    assert_eq!(material.techniques()[1].scheme_name(), SCHEME);

    let vs = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap();
    assert_eq!(generator.program_manager().program_count(), 2);
    assert_eq!(generator.program_manager().reference_count(vs.source_hash()), 1);
}

#[test]
fn recreated_material_can_be_registered_again() {
    let (mut generator, mut materials) = setup();
    assert!(register(&mut generator, &materials, "TestMat"));
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let handle = materials.handle_of("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    materials.remove(handle);
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();

    assert!(register(&mut generator, &materials, "TestMat"));
    assert_eq!(generator.program_manager().program_count(), 0);

    assert!(validate(&mut generator, &mut materials, "TestMat"));
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
}

#[test]
fn stale_registration_never_removes_user_techniques() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let handle = materials.handle_of("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    materials.remove(handle);
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();

    // Same id as the lost generated technique, but in the default scheme
    let material = materials.get_by_name_mut("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    material.create_technique().create_pass();

    assert!(generator.remove_scheme(&mut materials, SCHEME));
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
}

#[test]
fn remove_material_releases_generated_programs() {
    let (mut generator, mut materials) = setup();
    materials.create("Twin", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");
    register(&mut generator, &materials, "Twin");
    validate(&mut generator, &mut materials, "TestMat");
    validate(&mut generator, &mut materials, "Twin");

    let handle = materials.handle_of("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let removed = generator.remove_material(&mut materials, handle).unwrap();
    assert_eq!(removed.techniques().len(), 1);
    assert!(materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).is_none());

    // The twin still holds the shared programs
    let twin = materials.get_by_name("Twin", DEFAULT_RESOURCE_GROUP).unwrap();
    let vs = twin.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap();
    assert_eq!(generator.program_manager().program_count(), 2);
    assert_eq!(generator.program_manager().reference_count(vs.source_hash()), 1);

    // The registration went with the material
    assert!(!validate(&mut generator, &mut materials, "TestMat"));
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert!(register(&mut generator, &materials, "TestMat"));
}

#[test]
fn validation_is_idempotent() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");

    assert!(validate(&mut generator, &mut materials, "TestMat"));
    let compiled = generator.program_manager().compile_count();
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    assert_eq!(generator.program_manager().compile_count(), compiled);
    assert_eq!(generator.program_manager().program_count(), 2);
    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
}

#[test]
fn invalidation_rebuilds_technique() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");
    validate(&mut generator, &mut materials, "TestMat");

    let first_id = materials
        .get_by_name("TestMat", DEFAULT_RESOURCE_GROUP)
        .unwrap()
        .techniques()[1]
        .id();

    assert!(generator.invalidate_material(SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP));
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
    assert_ne!(material.techniques()[1].id(), first_id);

    // Same source, so the old programs were reused rather than duplicated
    assert_eq!(generator.program_manager().program_count(), 2);
    let vs = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap();
    assert_eq!(generator.program_manager().reference_count(vs.source_hash()), 1);
}

#[test]
fn source_technique_survives_scheme_removal() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");
    validate(&mut generator, &mut materials, "TestMat");

    assert_eq!(generator.scheme_names(), [SCHEME]);
    assert!(generator.remove_scheme(&mut materials, SCHEME));
    assert!(!generator.remove_scheme(&mut materials, SCHEME));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 1);
    assert_eq!(material.techniques()[0].scheme_name(), "Default");
    assert!(generator.scheme_names().is_empty());
}

#[test]
fn validate_scheme_builds_every_material() {
    let (mut generator, mut materials) = setup();
    materials.create("Second", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");
    register(&mut generator, &materials, "Second");

    assert!(generator.validate_scheme(&mut materials, SCHEME).unwrap());
    for name in ["TestMat", "Second"] {
        let material = materials.get_by_name(name, DEFAULT_RESOURCE_GROUP).unwrap();
        assert_eq!(material.techniques().len(), 2);
    }

    generator.remove_all_shader_based_techniques(&mut materials);
    for name in ["TestMat", "Second"] {
        let material = materials.get_by_name(name, DEFAULT_RESOURCE_GROUP).unwrap();
        assert_eq!(material.techniques().len(), 1);
    }
    assert_eq!(generator.program_manager().program_count(), 0);
}

// ============================================================================
// Program sharing
// ============================================================================

#[test]
fn equivalent_passes_share_programs() {
    let (mut generator, mut materials) = setup();
    materials.create("Twin", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");
    register(&mut generator, &materials, "Twin");
    validate(&mut generator, &mut materials, "TestMat");
    validate(&mut generator, &mut materials, "Twin");

    assert_eq!(generator.program_manager().program_count(), 2);
    assert_eq!(generator.program_manager().compile_count(), 2);

    let a = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let b = materials.get_by_name("Twin", DEFAULT_RESOURCE_GROUP).unwrap();
    let vs_a = a.techniques()[1].passes()[0].gpu_program(GpuProgramType::Vertex).unwrap();
    let vs_b = b.techniques()[1].passes()[0].gpu_program(GpuProgramType::Vertex).unwrap();

    assert!(Arc::ptr_eq(vs_a, vs_b));
    assert_eq!(generator.program_manager().reference_count(vs_a.source_hash()), 2);
}

#[test]
fn different_passes_get_different_programs() {
    let (mut generator, mut materials) = setup();
    materials.create("Unlit", DEFAULT_RESOURCE_GROUP).unwrap();
    materials
        .get_by_name_mut("Unlit", DEFAULT_RESOURCE_GROUP)
        .unwrap()
        .techniques_mut()[0]
        .passes_mut()[0]
        .lighting_enabled = false;

    register(&mut generator, &materials, "TestMat");
    register(&mut generator, &materials, "Unlit");
    validate(&mut generator, &mut materials, "TestMat");
    validate(&mut generator, &mut materials, "Unlit");

    // Vertex programs differ, fragment programs are identical
    assert_eq!(generator.program_manager().program_count(), 3);

    let unlit = materials.get_by_name("Unlit", DEFAULT_RESOURCE_GROUP).unwrap();
    let source = unlit.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap()
        .source();
    assert!(!source.contains("FFP_Light_Directional_Diffuse("));
}

// ============================================================================
// Template composition
// ============================================================================

#[test]
fn fixed_function_state_follows_source_pass() {
    let (mut generator, mut materials) = setup();
    {
        let pass = &mut materials
            .get_by_name_mut("TestMat", DEFAULT_RESOURCE_GROUP)
            .unwrap()
            .techniques_mut()[0]
            .passes_mut()[0];
        pass.vertex_colour_tracking = TrackVertexColour::DIFFUSE;
        pass.add_texture_unit(TextureUnitState::new("base.png"));
        pass.add_texture_unit(TextureUnitState::new("detail.png")).colour_op =
            LayerBlendOperation::Subtract;
    }
    register(&mut generator, &materials, "TestMat");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let pass = &material.techniques()[1].passes()[0];
    let vs = pass.gpu_program(GpuProgramType::Vertex).unwrap().source();
    let fs = pass.gpu_program(GpuProgramType::Fragment).unwrap().source();

    assert!(vs.contains("@location(3) colour0: vec4f"));
    assert!(vs.contains("@location(5) texcoord0: vec2f"));
    assert!(fs.contains("@group(1) @binding(3) var s_texture1: sampler;"));
    assert!(fs.contains("FFP_Subtract(l_texel1, o_colour0, &o_colour0);"));
}

#[test]
fn scheme_templates_replace_builtin_ones() {
    let settings = ShaderGeneratorSettings {
        light_count: 1,
        ..Default::default()
    };
    init_logger();
    let mut generator = ShaderGenerator::new(settings).unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();

    generator
        .get_render_state(SCHEME)
        .add_template_sub_render_state(Box::new(FfpLighting::new(2)));
    register(&mut generator, &materials, "TestMat");
    validate(&mut generator, &mut materials, "TestMat");

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let vs = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap();
    assert_eq!(vs.source().matches("FFP_Light_Directional_Diffuse(l_normal").count(), 2);
    assert!(vs.uniforms().iter().any(|u| u.name == "light_direction_view_space1"));
}

#[test]
fn per_pass_templates_are_applied() {
    let (mut generator, mut materials) = setup();
    materials
        .get_by_name_mut("TestMat", DEFAULT_RESOURCE_GROUP)
        .unwrap()
        .techniques_mut()[0]
        .passes_mut()[0]
        .vertex_colour_tracking = TrackVertexColour::DIFFUSE;
    register(&mut generator, &materials, "TestMat");

    // A colour stage without pass specialisation writes white
    let colour = generator.create_sub_render_state::<FfpColour>();
    generator
        .get_material_render_state(SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP, 0)
        .unwrap()
        .add_template_sub_render_state(colour);
    validate(&mut generator, &mut materials, "TestMat");

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let vs = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap()
        .source();
    // Linked templates are specialised for the pass, so tracking still applies
    assert!(vs.contains("FFP_Assign(input.colour0, &o_colour0);"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[derive(Default)]
struct FailingCompiler {
    calls: Arc<AtomicUsize>,
}

impl ProgramCompiler for FailingCompiler {
    fn supports_language(&self, _language: &str) -> bool {
        true
    }

    fn compile(
        &self,
        name: &str,
        _program_type: GpuProgramType,
        _source: &str,
    ) -> myth_shadergen::Result<naga::Module> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ShaderGenError::Compilation {
            program: name.to_string(),
            message: "rejected".to_string(),
        })
    }
}

#[test]
fn compile_failure_leaves_material_unchanged() {
    init_logger();
    let calls = Arc::new(AtomicUsize::new(0));
    let compiler = FailingCompiler {
        calls: calls.clone(),
    };
    let mut generator =
        ShaderGenerator::with_compiler(ShaderGeneratorSettings::default(), Box::new(compiler))
            .unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");

    let err = generator
        .validate_material(&mut materials, SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP)
        .unwrap_err();
    assert!(matches!(err, ShaderGenError::Compilation { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 1);
    assert_eq!(generator.program_manager().program_count(), 0);
}

/// Compiles through naga until `budget` compilations were attempted, then
/// rejects every program.
struct BudgetCompiler {
    budget: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl BudgetCompiler {
    fn new(budget: usize) -> (Self, Arc<AtomicUsize>) {
        let budget = Arc::new(AtomicUsize::new(budget));
        let compiler = Self {
            budget: budget.clone(),
            calls: Arc::default(),
        };
        (compiler, budget)
    }
}

impl ProgramCompiler for BudgetCompiler {
    fn supports_language(&self, language: &str) -> bool {
        NagaCompiler.supports_language(language)
    }

    fn compile(
        &self,
        name: &str,
        program_type: GpuProgramType,
        source: &str,
    ) -> myth_shadergen::Result<naga::Module> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.budget.load(Ordering::SeqCst) {
            return Err(ShaderGenError::Compilation {
                program: name.to_string(),
                message: "budget exhausted".to_string(),
            });
        }
        NagaCompiler.compile(name, program_type, source)
    }
}

#[test]
fn failed_second_pass_releases_first_pass_programs() {
    init_logger();
    let (compiler, _) = BudgetCompiler::new(2);
    let mut generator =
        ShaderGenerator::with_compiler(ShaderGeneratorSettings::default(), Box::new(compiler))
            .unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();

    // Pass 0 is lit, pass 1 unlit: the second vertex program is the third compile
    let material = materials.get_by_name_mut("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    material.techniques_mut()[0].create_pass().lighting_enabled = false;
    register(&mut generator, &materials, "TestMat");

    let err = generator
        .validate_material(&mut materials, SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP)
        .unwrap_err();
    assert!(matches!(err, ShaderGenError::Compilation { .. }));
    assert_eq!(generator.program_manager().compile_count(), 2);

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 1);
    assert_eq!(generator.program_manager().program_count(), 0);
}

#[test]
fn failed_rebuild_keeps_previous_technique() {
    init_logger();
    let (compiler, budget) = BudgetCompiler::new(usize::MAX);
    let mut generator =
        ShaderGenerator::with_compiler(ShaderGeneratorSettings::default(), Box::new(compiler))
            .unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let generated = material.techniques()[1].id();
    let vs_hash = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap()
        .source_hash();

    // A different light count needs a new vertex program, which is rejected
    budget.store(2, Ordering::SeqCst);
    generator
        .get_material_render_state(SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP, 0)
        .unwrap()
        .add_template_sub_render_state(Box::new(FfpLighting::new(3)));
    assert!(
        generator
            .validate_material(&mut materials, SCHEME, "TestMat", DEFAULT_RESOURCE_GROUP)
            .is_err()
    );

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    assert_eq!(material.techniques().len(), 2);
    assert_eq!(material.techniques()[1].id(), generated);
    assert!(material.techniques()[1].passes()[0].has_gpu_program(GpuProgramType::Fragment));
    assert_eq!(generator.program_manager().program_count(), 2);
    assert_eq!(generator.program_manager().reference_count(vs_hash), 1);

    // Still marked for rebuilding once compilation succeeds again
    budget.store(usize::MAX, Ordering::SeqCst);
    assert!(validate(&mut generator, &mut materials, "TestMat"));
    assert_eq!(generator.program_manager().reference_count(vs_hash), 0);
    assert_eq!(generator.program_manager().program_count(), 2);
}

// ============================================================================
// Target languages
// ============================================================================

#[test]
fn unknown_target_language_is_rejected() {
    init_logger();
    let settings = ShaderGeneratorSettings {
        target_language: "hlsl".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        ShaderGenerator::new(settings),
        Err(ShaderGenError::UnsupportedLanguage(_))
    ));

    let (mut generator, _) = setup();
    assert!(generator.set_target_language("hlsl").is_err());
    assert_eq!(generator.target_language(), "wgsl");
}

#[test]
fn glsl_target_translates_programs() {
    init_logger();
    let settings = ShaderGeneratorSettings {
        target_language: "glsl".to_string(),
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(settings).unwrap();
    let mut materials = MaterialManager::new();
    materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    register(&mut generator, &materials, "TestMat");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    for ty in [GpuProgramType::Vertex, GpuProgramType::Fragment] {
        let program = material.techniques()[1].passes()[0].gpu_program(ty).unwrap();
        assert_eq!(program.language(), "glsl");
        assert!(program.source().starts_with("#version 450"));
    }
}

#[test]
fn switching_language_rebuilds_programs() {
    let (mut generator, mut materials) = setup();
    register(&mut generator, &materials, "TestMat");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    generator.set_target_language("glsl").unwrap();
    assert_eq!(generator.target_language(), "glsl");
    assert!(validate(&mut generator, &mut materials, "TestMat"));

    let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
    let vs = material.techniques()[1].passes()[0]
        .gpu_program(GpuProgramType::Vertex)
        .unwrap();
    assert_eq!(vs.language(), "glsl");
}
