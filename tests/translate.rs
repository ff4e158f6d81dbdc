use rspirv::binary::Assemble;
use rspirv::dr::{Builder, Operand};
use spirv::{
    AccessQualifier, AddressingModel, BuiltIn, Capability, Decoration, Dim, ExecutionMode,
    ExecutionModel, FunctionControl, ImageFormat, ImageOperands, MemoryModel,
    SamplerAddressingMode, SamplerFilterMode, StorageClass,
};
use spirv2clc::{Error, TargetEnv, Translator};

fn new_kernel_builder() -> Builder {
    let mut b = Builder::new();
    b.set_version(1, 0);
    b.capability(Capability::Addresses);
    b.capability(Capability::Kernel);
    b.memory_model(AddressingModel::Physical32, MemoryModel::OpenCL);
    return b;
}

fn translate(words: &[u32]) -> String {
    let mut translator = Translator::new(TargetEnv::OpenCL1_2);
    translator.translate_words(words).expect("translation failed")
}

/// kernel void k(global uint* p) { p[get_global_id(0)]++; }
fn add_one_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let v3uint = b.type_vector(uint, 3);
    let ptr_global_uint = b.type_pointer(None, StorageClass::CrossWorkgroup, uint);
    let ptr_input_v3 = b.type_pointer(None, StorageClass::Input, v3uint);

    let gid_var = b.variable(ptr_input_v3, None, StorageClass::Input, None);
    b.decorate(
        gid_var,
        Decoration::BuiltIn,
        [Operand::BuiltIn(BuiltIn::GlobalInvocationId)],
    );

    let one = b.constant_u32(uint, 1);
    let fn_ty = b.type_function(void, vec![ptr_global_uint]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let p = b.function_parameter(ptr_global_uint).unwrap();
    b.begin_block(None).unwrap();
    let gid_vec = b.load(v3uint, None, gid_var, None, None).unwrap();
    let gid = b.composite_extract(uint, None, gid_vec, [0u32]).unwrap();
    let elem = b
        .in_bounds_ptr_access_chain(ptr_global_uint, None, p, gid, [])
        .unwrap();
    let val = b.load(uint, None, elem, None, None).unwrap();
    let inc = b.i_add(uint, None, val, one).unwrap();
    b.store(elem, inc, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![gid_var]);

    return b.module().assemble();
}

#[test]
fn add_one_kernel_has_expected_shape() {
    let source = translate(&add_one_module());
    assert!(source.contains("kernel"), "missing kernel qualifier:\n{source}");
    assert!(
        source.contains("get_global_id(0)"),
        "missing work-item query:\n{source}"
    );
    assert!(
        source.contains("uint global*"),
        "missing global pointer parameter:\n{source}"
    );
}

#[test]
fn translation_is_deterministic() {
    let words = add_one_module();
    let first = translate(&words);
    let second = translate(&words);
    assert_eq!(first, second);

    // A reused instance resets all tables between runs.
    let mut translator = Translator::new(TargetEnv::OpenCL1_2);
    let third = translator.translate_words(&words).unwrap();
    let fourth = translator.translate_words(&words).unwrap();
    assert_eq!(third, fourth);
    assert_eq!(first, third);
}

#[test]
fn rejected_binaries_produce_no_source() {
    let mut translator = Translator::new(TargetEnv::OpenCL1_2);
    let result = translator.translate_words(&[0xDEAD_BEEF, 0, 0, 0, 0]);
    assert!(matches!(result, Err(Error::InvalidModule(_))));
}

/// kernel void k(global int* a, global int* b) { *a = *a / *b; }
fn signed_divide_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let ptr_global_uint = b.type_pointer(None, StorageClass::CrossWorkgroup, uint);

    let fn_ty = b.type_function(void, vec![ptr_global_uint, ptr_global_uint]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let a = b.function_parameter(ptr_global_uint).unwrap();
    let divisor = b.function_parameter(ptr_global_uint).unwrap();
    b.begin_block(None).unwrap();
    let lhs = b.load(uint, None, a, None, None).unwrap();
    let rhs = b.load(uint, None, divisor, None, None).unwrap();
    let quotient = b.s_div(uint, None, lhs, rhs).unwrap();
    b.store(a, quotient, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn signed_divide_bridges_through_reinterprets() {
    let source = translate(&signed_divide_module());
    assert!(
        source.contains("as_uint(as_int("),
        "signed divide must reinterpret operands and result:\n{source}"
    );
    assert!(source.contains(" / "), "missing division:\n{source}");
}

/// A reqd_work_group_size(64,1,1) kernel with a workgroup barrier.
fn barrier_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);

    // Workgroup scope and SequentiallyConsistent | WorkgroupMemory.
    let scope_wg = b.constant_u32(uint, 2);
    let semantics = b.constant_u32(uint, 0x110);

    let fn_ty = b.type_function(void, vec![]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    b.begin_block(None).unwrap();
    b.control_barrier(scope_wg, scope_wg, semantics).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);
    b.execution_mode(f, ExecutionMode::LocalSize, [64, 1, 1]);

    return b.module().assemble();
}

#[test]
fn workgroup_barrier_lowers_to_local_fence() {
    let source = translate(&barrier_module());
    assert!(
        source.contains("barrier(CLK_LOCAL_MEM_FENCE)"),
        "missing local fence:\n{source}"
    );
    assert!(
        source.contains("__attribute((reqd_work_group_size(64,1,1)))"),
        "missing work-group size attribute:\n{source}"
    );
}

/// kernel void k(global float* in, global uchar* out) { *out = convert_uchar_sat(*in); }
fn saturating_conversion_module() -> Vec<u32> {
    let mut b = new_kernel_builder();
    b.capability(Capability::Int8);

    let void = b.type_void();
    let uchar = b.type_int(8, 0);
    let float = b.type_float(32);
    let ptr_global_float = b.type_pointer(None, StorageClass::CrossWorkgroup, float);
    let ptr_global_uchar = b.type_pointer(None, StorageClass::CrossWorkgroup, uchar);

    let fn_ty = b.type_function(void, vec![ptr_global_float, ptr_global_uchar]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let input = b.function_parameter(ptr_global_float).unwrap();
    let output = b.function_parameter(ptr_global_uchar).unwrap();
    b.begin_block(None).unwrap();
    let val = b.load(float, None, input, None, None).unwrap();
    let converted = b.convert_f_to_u(uchar, None, val).unwrap();
    b.decorate(converted, Decoration::SaturatedConversion, []);
    b.store(output, converted, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn saturating_conversion_guards_nan_and_truncates() {
    let source = translate(&saturating_conversion_module());
    assert!(
        source.contains("convert_uchar_sat_rtz("),
        "missing saturating rtz conversion:\n{source}"
    );
    assert!(
        source.contains("isnan("),
        "NaN must convert to 0 explicitly:\n{source}"
    );
}

/// A literal-sampler 2D image read at explicit LOD 0.
fn image_read_module() -> Vec<u32> {
    let mut b = new_kernel_builder();
    b.capability(Capability::ImageBasic);
    b.capability(Capability::LiteralSampler);

    let void = b.type_void();
    let float = b.type_float(32);
    let v2float = b.type_vector(float, 2);
    let v4float = b.type_vector(float, 4);
    let image = b.type_image(
        void,
        Dim::Dim2D,
        0,
        0,
        0,
        0,
        ImageFormat::Unknown,
        Some(AccessQualifier::ReadOnly),
    );
    let sampler = b.type_sampler();
    let sampled_image_ty = b.type_sampled_image(image);
    let ptr_global_v4 = b.type_pointer(None, StorageClass::CrossWorkgroup, v4float);

    let literal_sampler = b.constant_sampler(
        sampler,
        SamplerAddressingMode::Clamp,
        0,
        SamplerFilterMode::Nearest,
    );
    let zero = b.constant_f32(float, 0.0);
    let coord = b.constant_composite(v2float, vec![zero, zero]);

    let fn_ty = b.type_function(void, vec![image, ptr_global_v4]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let img = b.function_parameter(image).unwrap();
    let out = b.function_parameter(ptr_global_v4).unwrap();
    b.begin_block(None).unwrap();
    let sampled = b.sampled_image(sampled_image_ty, None, img, literal_sampler).unwrap();
    let texel = b
        .image_sample_explicit_lod(
            v4float,
            None,
            sampled,
            coord,
            ImageOperands::LOD,
            [Operand::IdRef(zero)],
        )
        .unwrap();
    b.store(out, texel, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn literal_sampler_image_read() {
    let source = translate(&image_read_module());
    assert!(
        source.contains(
            "CLK_ADDRESS_CLAMP | CLK_NORMALIZED_COORDS_FALSE | CLK_FILTER_NEAREST"
        ),
        "missing literal sampler initialiser:\n{source}"
    );
    assert!(source.contains("read_imagef("), "missing image read:\n{source}");
    assert!(
        source.contains("read_only image2d_t"),
        "missing image parameter:\n{source}"
    );
}

/// An OpName that collides with an OpenCL C keyword.
fn reserved_name_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let ptr_global_uint = b.type_pointer(None, StorageClass::CrossWorkgroup, uint);

    let fn_ty = b.type_function(void, vec![ptr_global_uint]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let p = b.function_parameter(ptr_global_uint).unwrap();
    b.name(p, "restrict");
    b.begin_block(None).unwrap();
    let val = b.load(uint, None, p, None, None).unwrap();
    b.store(p, val, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn reserved_names_are_sanitised() {
    let source = translate(&reserved_name_module());
    assert!(
        source.contains("restrict_MADE_VALID_CLC_IDENT"),
        "reserved OpName must be renamed:\n{source}"
    );
    assert!(
        !source.contains("* restrict;"),
        "raw reserved identifier leaked:\n{source}"
    );
}

/// A diamond CFG whose join block merges two constants through OpPhi.
fn phi_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let bool_ty = b.type_bool();
    let ptr_global_uint = b.type_pointer(None, StorageClass::CrossWorkgroup, uint);

    let zero = b.constant_u32(uint, 0);
    let one = b.constant_u32(uint, 1);
    let two = b.constant_u32(uint, 2);

    let fn_ty = b.type_function(void, vec![ptr_global_uint]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let p = b.function_parameter(ptr_global_uint).unwrap();
    b.begin_block(None).unwrap();
    let loaded = b.load(uint, None, p, None, None).unwrap();
    let cond = b.i_equal(bool_ty, None, loaded, zero).unwrap();
    let block_then = b.id();
    let block_else = b.id();
    let block_join = b.id();
    b.branch_conditional(cond, block_then, block_else, [])
        .unwrap();

    b.begin_block(Some(block_then)).unwrap();
    b.branch(block_join).unwrap();

    b.begin_block(Some(block_else)).unwrap();
    b.branch(block_join).unwrap();

    b.begin_block(Some(block_join)).unwrap();
    let merged = b
        .phi(uint, None, vec![(one, block_then), (two, block_else)])
        .unwrap();
    b.name(merged, "acc");
    b.store(p, merged, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn phi_assignments_cover_every_edge() {
    let source = translate(&phi_module());
    assert!(source.contains("  uint acc;"), "missing phi declaration:\n{source}");
    let fan_in = source.matches("  acc = ").count();
    assert_eq!(fan_in, 2, "expected one assignment per incoming edge:\n{source}");
    assert!(source.contains("goto"), "missing flattened control flow:\n{source}");
}

/// A Workgroup-storage global referenced by the kernel body.
fn workgroup_lift_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let ptr_local_uint = b.type_pointer(None, StorageClass::Workgroup, uint);

    let scratch = b.variable(ptr_local_uint, None, StorageClass::Workgroup, None);
    b.name(scratch, "scratch");
    let seven = b.constant_u32(uint, 7);

    let fn_ty = b.type_function(void, vec![]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    b.begin_block(None).unwrap();
    b.store(scratch, seven, None, None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn workgroup_globals_are_hoisted_into_the_kernel() {
    let source = translate(&workgroup_lift_module());
    let declaration = "local uint scratch;";
    assert_eq!(
        source.matches(declaration).count(),
        1,
        "expected exactly one hoisted declaration:\n{source}"
    );
    let body_start = source.find("kernel").unwrap();
    let decl_at = source.find(declaration).unwrap();
    let use_at = source.find("*scratch = ").unwrap();
    assert!(decl_at > body_start, "declaration must be inside the kernel:\n{source}");
    assert!(decl_at < use_at, "declaration must precede first use:\n{source}");
}

/// A switch over a loaded selector with two literal cases.
fn switch_module() -> Vec<u32> {
    let mut b = new_kernel_builder();

    let void = b.type_void();
    let uint = b.type_int(32, 0);
    let ptr_global_uint = b.type_pointer(None, StorageClass::CrossWorkgroup, uint);

    let ten = b.constant_u32(uint, 10);
    let twenty = b.constant_u32(uint, 20);

    let fn_ty = b.type_function(void, vec![ptr_global_uint]);
    let f = b.id();
    b.begin_function(void, Some(f), FunctionControl::NONE, fn_ty)
        .unwrap();
    let p = b.function_parameter(ptr_global_uint).unwrap();
    b.begin_block(None).unwrap();
    let selector = b.load(uint, None, p, None, None).unwrap();
    let block_default = b.id();
    let block_one = b.id();
    let block_two = b.id();
    let block_exit = b.id();
    b.switch(
        selector,
        block_default,
        vec![
            (Operand::LiteralInt32(1), block_one),
            (Operand::LiteralInt32(2), block_two),
        ],
    )
    .unwrap();

    b.begin_block(Some(block_default)).unwrap();
    b.branch(block_exit).unwrap();

    b.begin_block(Some(block_one)).unwrap();
    b.store(p, ten, None, None).unwrap();
    b.branch(block_exit).unwrap();

    b.begin_block(Some(block_two)).unwrap();
    b.store(p, twenty, None, None).unwrap();
    b.branch(block_exit).unwrap();

    b.begin_block(Some(block_exit)).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();
    b.entry_point(ExecutionModel::Kernel, f, "k", vec![]);

    return b.module().assemble();
}

#[test]
fn switch_lowers_to_goto_cases() {
    let source = translate(&switch_module());
    assert!(source.contains("switch ("), "missing switch:\n{source}");
    assert!(source.contains("default: goto "), "missing default case:\n{source}");
    assert!(source.contains("case 1: goto "), "missing literal case:\n{source}");
    assert!(source.contains("case 2: goto "), "missing literal case:\n{source}");
}

#[test]
fn assembly_input_goes_through_the_same_gate() {
    let assembly = "\
OpCapability Addresses
OpCapability Kernel
OpMemoryModel Physical32 OpenCL
OpEntryPoint Kernel %k \"k\"
%void = OpTypeVoid
%fnty = OpTypeFunction %void
%k = OpFunction %void None %fnty
%entry = OpLabel
OpReturn
OpFunctionEnd
";
    let mut translator = Translator::new(TargetEnv::OpenCL1_2);
    let source = translator.translate_assembly(assembly).unwrap();
    assert!(source.contains("void kernel k("), "unexpected kernel signature:\n{source}");

    let garbage = translator.translate_assembly("OpThisIsNotAnOpcode");
    assert!(matches!(garbage, Err(Error::InvalidModule(_))));
}
