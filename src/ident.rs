use crate::translator::Translator;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Suffix appended to a candidate that collides with a reserved identifier.
pub const COLLISION_SUFFIX: &str = "_MADE_VALID_CLC_IDENT";

/// Identifiers the generated source must never introduce: C90 and C99
/// keywords plus the OpenCL C built-in and reserved data types and the
/// address-space, function, and access qualifiers.
static RESERVED_IDENTIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        // ANSI / ISO C90
        "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
        "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return",
        "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned",
        "void", "volatile", "while",
        // C99
        "_Bool", "_Complex", "_Imaginary", "inline", "restrict",
        // OpenCL C built-in vector data types
        "char2", "char3", "char4", "char8", "char16", "uchar2", "uchar3", "uchar4", "uchar8",
        "uchar16", "short2", "short3", "short4", "short8", "short16", "ushort2", "ushort3",
        "ushort4", "ushort8", "ushort16", "int2", "int3", "int4", "int8", "int16", "uint2",
        "uint3", "uint4", "uint8", "uint16", "long2", "long3", "long4", "long8", "long16",
        "ulong2", "ulong3", "ulong4", "ulong8", "ulong16", "float2", "float3", "float4", "float8",
        "float16", "double2", "double3", "double4", "double8", "double16",
        // OpenCL C other built-in data types
        "image2d_t", "image3d_t", "image2d_array_t", "image1d_t", "image1d_buffer_t",
        "image1d_array_t", "image2d_depth_t", "image2d_array_depth_t", "sampler_t", "queue_t",
        "ndrange_t", "clk_event_t", "reserve_id_t", "event_t", "clk_mem_fence_flags",
        // OpenCL C reserved data types
        "bool2", "bool3", "bool4", "bool8", "bool16", "half2", "half3", "half4", "half8",
        "half16", "quad", "quad2", "quad3", "quad4", "quad8", "quad16", "complex", "imaginary",
        // OpenCL C address space qualifiers
        "__global", "global", "__local", "local", "__constant", "constant", "__private",
        "private", "__generic", "generic",
        // OpenCL C function qualifiers
        "__kernel", "kernel",
        // OpenCL C access qualifiers
        "__read_only", "read_only", "__write_only", "write_only", "__read_write", "read_write",
        // OpenCL C misc
        "uniform", "pipe",
    ])
});

impl Translator {
    /// A name is usable if no id already owns it and it is not reserved.
    pub(crate) fn is_valid_identifier(&self, name: &str) -> bool {
        if self.names.values().any(|issued| issued == name) {
            return false;
        }
        return !RESERVED_IDENTIFIERS.contains(name);
    }

    /// Turns `name` into an identifier that is neither reserved nor already
    /// issued, first by suffixing, then by counting up until unique.
    pub(crate) fn make_valid_identifier(&self, name: &str) -> String {
        let mut newname = name.to_owned();

        if !self.is_valid_identifier(&newname) {
            newname.push_str(COLLISION_SUFFIX);
        }

        let mut name_iter = 1u32;
        while !self.is_valid_identifier(&newname) {
            let candidate = format!("{newname}{name_iter}");
            if self.is_valid_identifier(&candidate) {
                newname = candidate;
                break;
            }
            name_iter += 1;
        }

        return newname;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::TargetEnv;
    use proptest::prelude::*;

    #[test]
    fn reserved_word_gets_suffixed() {
        let translator = Translator::new(TargetEnv::default());
        assert_eq!(
            translator.make_valid_identifier("restrict"),
            "restrict_MADE_VALID_CLC_IDENT"
        );
    }

    #[test]
    fn clean_names_pass_through() {
        let translator = Translator::new(TargetEnv::default());
        assert_eq!(translator.make_valid_identifier("my_var"), "my_var");
    }

    #[test]
    fn issued_names_get_counted() {
        let mut translator = Translator::new(TargetEnv::default());
        let first = translator.make_valid_identifier("acc");
        translator.names.insert(1, first);
        let second = translator.make_valid_identifier("acc");
        translator.names.insert(2, second.clone());
        assert_eq!(second, "acc_MADE_VALID_CLC_IDENT");
        let third = translator.make_valid_identifier("acc");
        assert_eq!(third, "acc_MADE_VALID_CLC_IDENT1");
    }

    proptest! {
        #[test]
        fn sanitised_names_are_never_reserved(name in "[a-z_][a-z0-9_]{0,12}") {
            let translator = Translator::new(TargetEnv::default());
            let fixed = translator.make_valid_identifier(&name);
            prop_assert!(!RESERVED_IDENTIFIERS.contains(fixed.as_str()));
        }
    }
}
