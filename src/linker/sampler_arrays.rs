//! Accessor functions for arrayed sampler uniforms.
//!
//! Sampler arrays may only be indexed with constant expressions, so each
//! arrayed sampler gets a `switch` that enumerates every valid index.

use super::types::GlslType;
use super::variable::Variable;

const BILINEAR_DEPTH_2D: &str = "\
float bilinearDepthCompare(sampler2D tex, vec2 uv, float depth) {
    vec2 size = vec2(textureSize(tex, 0));
    vec2 texel = uv * size - 0.5;
    vec2 f = fract(texel);
    vec2 base = (floor(texel) + 0.5) / size;
    vec2 dx = vec2(1.0 / size.x, 0.0);
    vec2 dy = vec2(0.0, 1.0 / size.y);
    float a = step(depth, texture(tex, base).r);
    float b = step(depth, texture(tex, base + dx).r);
    float c = step(depth, texture(tex, base + dy).r);
    float d = step(depth, texture(tex, base + dx + dy).r);
    return mix(mix(a, b, f.x), mix(c, d, f.x), f.y);
}";

const SINGLE_TAP_DEPTH_CUBE: &str = "\
float cubeDepthCompare(samplerCube tex, vec3 dir, float depth) {
    return step(depth, texture(tex, dir).r);
}";

/// Name of the generated color accessor for `var`.
pub fn accessor_name(var: &Variable) -> String {
    format!("texture_array_{}", var.name)
}

/// Name of the generated depth-comparison accessor for `var`.
pub fn depth_accessor_name(var: &Variable) -> String {
    format!("texture_array_depth_{}", var.name)
}

fn helper_for(ty: GlslType) -> Option<&'static str> {
    match ty {
        GlslType::Sampler2D => Some(BILINEAR_DEPTH_2D),
        GlslType::SamplerCube => Some(SINGLE_TAP_DEPTH_CUBE),
        _ => None,
    }
}

fn switch_function(
    signature: &str,
    cases: impl Iterator<Item = String>,
    fallback: &str,
) -> String {
    let mut out = String::new();
    out.push_str(signature);
    out.push_str(" {\n    switch (index) {\n");
    for case in cases {
        out.push_str(&case);
    }
    out.push_str(&format!("        default: return {fallback};\n"));
    out.push_str("    }\n}");
    out
}

fn color_accessor(var: &Variable) -> Option<String> {
    let coord = var.ty.sampler_coord()?;
    let n = var.array_size;
    let name = var.name.clone();
    let (signature, lookup): (String, Box<dyn Fn(u32) -> String>) = match var.ty {
        GlslType::Sampler2DMS => (
            format!(
                "vec4 {}(int index, ivec2 coord, int sampleIndex)",
                accessor_name(var)
            ),
            Box::new(move |i| format!("texelFetch({name}[{i}], coord, sampleIndex)")),
        ),
        GlslType::Sampler2DShadow | GlslType::SamplerCubeShadow => return None,
        _ => (
            format!("vec4 {}(int index, {} coord)", accessor_name(var), coord),
            Box::new(move |i| format!("texture({name}[{i}], coord)")),
        ),
    };
    let cases = (0..n).map(|i| format!("        case {i}: return {};\n", lookup(i)));
    Some(switch_function(&signature, cases, "vec4(0.0)"))
}

fn depth_accessor(var: &Variable) -> Option<String> {
    let n = var.array_size;
    let name = var.name.clone();
    let (signature, lookup): (String, Box<dyn Fn(u32) -> String>) = match var.ty {
        GlslType::Sampler2D => (
            format!(
                "float {}(int index, vec2 coord, float depth)",
                depth_accessor_name(var)
            ),
            Box::new(move |i| format!("bilinearDepthCompare({name}[{i}], coord, depth)")),
        ),
        GlslType::SamplerCube => (
            format!(
                "float {}(int index, vec3 coord, float depth)",
                depth_accessor_name(var)
            ),
            Box::new(move |i| format!("cubeDepthCompare({name}[{i}], coord, depth)")),
        ),
        GlslType::Sampler2DShadow => (
            format!(
                "float {}(int index, vec2 coord, float depth)",
                depth_accessor_name(var)
            ),
            Box::new(move |i| format!("texture({name}[{i}], vec3(coord, depth))")),
        ),
        GlslType::SamplerCubeShadow => (
            format!(
                "float {}(int index, vec3 coord, float depth)",
                depth_accessor_name(var)
            ),
            Box::new(move |i| format!("texture({name}[{i}], vec4(coord, depth))")),
        ),
        _ => return None,
    };
    let cases = (0..n).map(|i| format!("        case {i}: return {};\n", lookup(i)));
    Some(switch_function(&signature, cases, "1.0"))
}

/// Generate helper and accessor functions for every arrayed sampler in
/// `uniforms` (already in declaration order). Returns an empty list when
/// there are none.
pub fn generate_accessors(uniforms: &[&Variable]) -> Vec<String> {
    let arrayed: Vec<&Variable> = uniforms
        .iter()
        .copied()
        .filter(|v| v.ty.is_sampler() && v.is_array())
        .collect();

    let mut helpers: Vec<&'static str> = Vec::new();
    for var in &arrayed {
        if let Some(helper) = helper_for(var.ty) {
            if !helpers.contains(&helper) {
                helpers.push(helper);
            }
        }
    }

    let mut out: Vec<String> = helpers.into_iter().map(str::to_string).collect();
    for var in arrayed {
        out.extend(color_accessor(var));
        out.extend(depth_accessor(var));
    }
    out
}
