// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The GLSL sources of every program the renderer draws with.
//!
//! Sources are assembled from shared chunks: a vertex stage, the declarations of a paint
//! (`vec4 paint()`, premultiplied), and a `main` that either writes the paint out or
//! combines it with something else. The same text compiles as GLSL 3.30 and, with the
//! ES header, as GLSL ES 3.00.

use tvg_common::blend::{BlendMethod, MaskMethod};

/// Uniform blocks, in binding-point order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Block {
    Matrix,
    InvMatrix,
    ColorInfo,
    GradientInfo,
    Gaussian,
    DropShadow,
    Params,
}

impl Block {
    pub(crate) const ALL: [Self; 7] = [
        Self::Matrix,
        Self::InvMatrix,
        Self::ColorInfo,
        Self::GradientInfo,
        Self::Gaussian,
        Self::DropShadow,
        Self::Params,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Matrix => "Matrix",
            Self::InvMatrix => "InvMatrix",
            Self::ColorInfo => "ColorInfo",
            Self::GradientInfo => "GradientInfo",
            Self::Gaussian => "Gaussian",
            Self::DropShadow => "DropShadow",
            Self::Params => "Params",
        }
    }

    /// The binding point every program attaches this block to.
    pub(crate) fn binding(self) -> u32 {
        self as u32
    }
}

/// Texture samplers, in texture-unit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Sampler {
    Image,
    Src,
    Mask,
    Dst,
    Blur,
}

impl Sampler {
    pub(crate) const ALL: [Self; 5] = [Self::Image, Self::Src, Self::Mask, Self::Dst, Self::Blur];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Image => "uTexture",
            Self::Src => "uSrcTexture",
            Self::Mask => "uMaskTexture",
            Self::Dst => "uDstTexture",
            Self::Blur => "uBlurTexture",
        }
    }

    pub(crate) fn unit(self) -> u32 {
        self as u32
    }
}

/// Name of the float uniform carrying the draw depth.
pub(crate) const DEPTH_UNIFORM: &str = "uDepth";

/// What a blend program reads its source color from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendSource {
    /// A solid color.
    Solid,
    /// A linear gradient.
    Linear,
    /// A radial gradient.
    Radial,
    /// An image texture.
    Image,
    /// A composed offscreen target.
    Scene,
}

impl BlendSource {
    fn name(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Linear => "linear",
            Self::Radial => "radial",
            Self::Image => "image",
            Self::Scene => "scene",
        }
    }
}

/// The post-effect passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectProgram {
    /// Horizontal Gaussian pass.
    GaussianH,
    /// Vertical Gaussian pass.
    GaussianV,
    /// Vertical blur of the shadow, composed under the original.
    DropShadow,
    /// Solid fill keeping alpha.
    Fill,
    /// Luma mapped between two colors.
    Tint,
    /// Luma mapped through three colors.
    Tritone,
}

impl EffectProgram {
    fn name(self) -> &'static str {
        match self {
            Self::GaussianH => "gaussian_h",
            Self::GaussianV => "gaussian_v",
            Self::DropShadow => "dropshadow",
            Self::Fill => "fill",
            Self::Tint => "tint",
            Self::Tritone => "tritone",
        }
    }
}

/// Identifies one program of the shader bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKey {
    /// Solid fill of geometry.
    Color,
    /// Solid fills of device-space geometry with per-vertex colors.
    SolidBatch,
    /// Linear gradient fill of geometry.
    Linear,
    /// Radial gradient fill of geometry.
    Radial,
    /// Textured image quad.
    Image,
    /// Writes nothing but depth and stencil.
    Stencil,
    /// Copies a target with opacity.
    Blit,
    /// Composes a target through a mask target.
    Mask(MaskMethod),
    /// Draws a source with a non-normal blend.
    Blend(BlendMethod, BlendSource),
    /// Runs an effect pass.
    Effect(EffectProgram),
}

impl ProgramKey {
    /// The stable name of the program, such as `blend_multiply_solid`.
    pub fn name(self) -> String {
        match self {
            Self::Color => "color".into(),
            Self::SolidBatch => "solid_batch".into(),
            Self::Linear => "linear".into(),
            Self::Radial => "radial".into(),
            Self::Image => "image".into(),
            Self::Stencil => "stencil".into(),
            Self::Blit => "blit".into(),
            Self::Mask(method) => format!("mask_{}", mask_name(method)),
            Self::Blend(method, source) => format!("blend_{}_{}", method.name(), source.name()),
            Self::Effect(effect) => format!("effect_{}", effect.name()),
        }
    }
}

/// `None` has no program of its own and composes like `Alpha`.
fn mask_name(method: MaskMethod) -> &'static str {
    match method {
        MaskMethod::None => MaskMethod::Alpha.name(),
        other => other.name(),
    }
}

/// Vertex and fragment text of one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShaderSource {
    pub(crate) vertex: String,
    pub(crate) fragment: String,
}

const DESKTOP_HEADER: &str = "#version 330 core\n";
const ES_HEADER: &str = "#version 300 es\nprecision highp float;\nprecision highp int;\n";

/// Geometry in user space, positioned by the model-view-projection matrix.
const GEOMETRY_VS: &str = r#"
layout(location = 0) in vec2 aLocation;
layout(std140) uniform Matrix {
    mat4 mvp;
};
uniform float uDepth;

void main() {
    gl_Position = mvp * vec4(aLocation, 0.0, 1.0);
    gl_Position.z = uDepth * gl_Position.w;
}
"#;

/// Device-space geometry carrying a straight color per vertex.
const BATCH_VS: &str = r#"
layout(location = 0) in vec2 aLocation;
layout(location = 1) in vec4 aColor;
layout(std140) uniform Matrix {
    mat4 mvp;
};
uniform float uDepth;
out vec4 vColor;

void main() {
    gl_Position = mvp * vec4(aLocation, 0.0, 1.0);
    gl_Position.z = uDepth * gl_Position.w;
    vColor = aColor;
}
"#;

/// Geometry that also forwards its gradient-space position.
const GRADIENT_VS: &str = r#"
layout(location = 0) in vec2 aLocation;
layout(std140) uniform Matrix {
    mat4 mvp;
};
layout(std140) uniform InvMatrix {
    mat4 invTransform;
};
uniform float uDepth;
out vec2 vPos;

void main() {
    gl_Position = mvp * vec4(aLocation, 0.0, 1.0);
    gl_Position.z = uDepth * gl_Position.w;
    vPos = (invTransform * vec4(aLocation, 0.0, 1.0)).xy;
}
"#;

/// Geometry with texture coordinates.
const IMAGE_VS: &str = r#"
layout(location = 0) in vec2 aLocation;
layout(location = 1) in vec2 aUV;
layout(std140) uniform Matrix {
    mat4 mvp;
};
uniform float uDepth;
out vec2 vUV;

void main() {
    gl_Position = mvp * vec4(aLocation, 0.0, 1.0);
    gl_Position.z = uDepth * gl_Position.w;
    vUV = aUV;
}
"#;

/// A quad already in normalized device coordinates.
const QUAD_VS: &str = r#"
layout(location = 0) in vec2 aLocation;
layout(location = 1) in vec2 aUV;
uniform float uDepth;
out vec2 vUV;

void main() {
    gl_Position = vec4(aLocation, uDepth, 1.0);
    vUV = aUV;
}
"#;

const FRAGMENT_OUT: &str = "out vec4 FragColor;\n";

const SOLID_PAINT: &str = r#"
layout(std140) uniform ColorInfo {
    vec4 solidColor;
};

vec4 paint() {
    return vec4(solidColor.rgb * solidColor.a, solidColor.a);
}
"#;

const BATCH_PAINT: &str = r#"
in vec4 vColor;

vec4 paint() {
    return vec4(vColor.rgb * vColor.a, vColor.a);
}
"#;

/// `format` is 0 for RGBA texels and 1 for BGRA ones.
const TEXTURE_INFO: &str = r#"
layout(std140) uniform ColorInfo {
    int format;
    int flipY;
    int opacity;
    int dummy;
};

vec4 sampleTexture(sampler2D tex, vec2 uv) {
    if (flipY == 1) {
        uv.y = 1.0 - uv.y;
    }
    vec4 color = texture(tex, uv);
    if (format == 1) {
        color = color.bgra;
    }
    return color * (float(opacity) / 255.0);
}
"#;

const IMAGE_PAINT: &str = r#"
uniform sampler2D uTexture;
in vec2 vUV;

vec4 paint() {
    return sampleTexture(uTexture, vUV);
}
"#;

const SCENE_PAINT: &str = r#"
uniform sampler2D uSrcTexture;
in vec2 vUV;

vec4 paint() {
    return sampleTexture(uSrcTexture, vUV);
}
"#;

/// Stops are straight colors. `nStops` is (count, noise, spread, opacity).
const GRADIENT_LIB: &str = r#"
layout(std140) uniform GradientInfo {
    vec4 nStops;
    vec4 shape;
    vec4 focal;
    vec4 stopPoints[4];
    vec4 stopColors[16];
};
in vec2 vPos;

float stopAt(int i) {
    return stopPoints[i / 4][i % 4];
}

float spread(float t) {
    int mode = int(nStops.z);
    if (mode == 1) {
        float m = mod(t, 2.0);
        return m > 1.0 ? 2.0 - m : m;
    }
    if (mode == 2) {
        return fract(t);
    }
    return clamp(t, 0.0, 1.0);
}

vec4 stopColor(float t) {
    int count = int(nStops.x);
    if (t <= stopAt(0)) {
        return stopColors[0];
    }
    for (int i = 1; i < 16; ++i) {
        if (i >= count) {
            break;
        }
        float next = stopAt(i);
        if (t <= next) {
            float prev = stopAt(i - 1);
            float f = next > prev ? (t - prev) / (next - prev) : 1.0;
            return mix(stopColors[i - 1], stopColors[i], f);
        }
    }
    return stopColors[count - 1];
}

float dither(vec2 pos) {
    return fract(sin(dot(pos, vec2(12.9898, 78.233))) * 43758.5453) - 0.5;
}

vec4 gradientColor(float t) {
    vec4 color = stopColor(spread(t));
    color.rgb += vec3(nStops.y * dither(gl_FragCoord.xy) / 255.0);
    color = clamp(color, 0.0, 1.0);
    return vec4(color.rgb * color.a, color.a) * nStops.w;
}
"#;

/// `shape` is (x1, y1, x2, y2).
const LINEAR_PAINT: &str = r#"
vec4 paint() {
    vec2 d = shape.zw - shape.xy;
    float len2 = dot(d, d);
    float t = len2 > 0.0 ? dot(vPos - shape.xy, d) / len2 : 0.0;
    return gradientColor(t);
}
"#;

/// Two-point conical gradient. `shape` is (cx, cy, r, fr), `focal` is (fx, fy, 0, 0).
const RADIAL_PAINT: &str = r#"
vec4 paint() {
    vec2 cd = shape.xy - focal.xy;
    vec2 pd = vPos - focal.xy;
    float dr = shape.z - shape.w;
    float a = dot(cd, cd) - dr * dr;
    float b = dot(pd, cd) + shape.w * dr;
    float c = dot(pd, pd) - shape.w * shape.w;
    float t;
    if (abs(a) < 1e-5) {
        if (abs(b) < 1e-5) {
            return vec4(0.0);
        }
        t = c / (2.0 * b);
    } else {
        float disc = b * b - a * c;
        if (disc < 0.0) {
            return vec4(0.0);
        }
        float root = sqrt(disc);
        t = max((b + root) / a, (b - root) / a);
    }
    if (shape.w + t * dr < 0.0) {
        return vec4(0.0);
    }
    return gradientColor(t);
}
"#;

const PAINT_MAIN: &str = r#"
void main() {
    FragColor = paint();
}
"#;

const STENCIL_FS: &str = r#"
void main() {
    FragColor = vec4(0.0);
}
"#;

/// Separable W3C blend functions on straight colors.
const BLEND_LIB: &str = r#"
uniform sampler2D uDstTexture;

float lum(vec3 c) {
    return dot(c, vec3(0.3, 0.59, 0.11));
}

vec3 clipColor(vec3 c) {
    float l = lum(c);
    float n = min(c.r, min(c.g, c.b));
    float x = max(c.r, max(c.g, c.b));
    if (n < 0.0) {
        c = l + (c - l) * l / (l - n);
    }
    if (x > 1.0) {
        c = l + (c - l) * (1.0 - l) / (x - l);
    }
    return c;
}

vec3 setLum(vec3 c, float l) {
    return clipColor(c + (l - lum(c)));
}

float sat(vec3 c) {
    return max(c.r, max(c.g, c.b)) - min(c.r, min(c.g, c.b));
}

vec3 setSat(vec3 c, float s) {
    float n = min(c.r, min(c.g, c.b));
    float x = max(c.r, max(c.g, c.b));
    if (x > n) {
        return (c - n) * s / (x - n);
    }
    return vec3(0.0);
}

float colorDodge(float s, float d) {
    if (d <= 0.0) {
        return 0.0;
    }
    if (s >= 1.0) {
        return 1.0;
    }
    return min(1.0, d / (1.0 - s));
}

float colorBurn(float s, float d) {
    if (d >= 1.0) {
        return 1.0;
    }
    if (s <= 0.0) {
        return 0.0;
    }
    return 1.0 - min(1.0, (1.0 - d) / s);
}

float hardLight(float s, float d) {
    if (s <= 0.5) {
        return d * 2.0 * s;
    }
    float s2 = 2.0 * s - 1.0;
    return d + s2 - d * s2;
}

float softLight(float s, float d) {
    if (s <= 0.5) {
        return d - (1.0 - 2.0 * s) * d * (1.0 - d);
    }
    float dd = d <= 0.25 ? ((16.0 * d - 12.0) * d + 4.0) * d : sqrt(d);
    return d + (2.0 * s - 1.0) * (dd - d);
}
"#;

const BLEND_MAIN: &str = r#"
void main() {
    vec4 src = paint();
    vec4 dst = texelFetch(uDstTexture, ivec2(gl_FragCoord.xy), 0);
    if (src.a <= 0.0) {
        FragColor = dst;
        return;
    }
    vec3 cs = src.rgb / src.a;
    vec3 cd = dst.a > 0.0 ? dst.rgb / dst.a : vec3(0.0);
    vec3 mixed = clamp(blendRgb(cs, cd), 0.0, 1.0);
    vec3 rgb = src.rgb * (1.0 - dst.a) + dst.rgb * (1.0 - src.a) + src.a * dst.a * mixed;
    FragColor = vec4(rgb, src.a + dst.a - src.a * dst.a);
}
"#;

fn blend_fn(method: BlendMethod) -> &'static str {
    match method {
        BlendMethod::Normal => "s",
        BlendMethod::Multiply => "s * d",
        BlendMethod::Screen => "s + d - s * d",
        BlendMethod::Overlay => {
            "vec3(hardLight(d.r, s.r), hardLight(d.g, s.g), hardLight(d.b, s.b))"
        }
        BlendMethod::Darken => "min(s, d)",
        BlendMethod::Lighten => "max(s, d)",
        BlendMethod::ColorDodge => {
            "vec3(colorDodge(s.r, d.r), colorDodge(s.g, d.g), colorDodge(s.b, d.b))"
        }
        BlendMethod::ColorBurn => {
            "vec3(colorBurn(s.r, d.r), colorBurn(s.g, d.g), colorBurn(s.b, d.b))"
        }
        BlendMethod::HardLight => {
            "vec3(hardLight(s.r, d.r), hardLight(s.g, d.g), hardLight(s.b, d.b))"
        }
        BlendMethod::SoftLight => {
            "vec3(softLight(s.r, d.r), softLight(s.g, d.g), softLight(s.b, d.b))"
        }
        BlendMethod::Difference => "abs(d - s)",
        BlendMethod::Exclusion => "s + d - 2.0 * s * d",
        BlendMethod::Hue => "setLum(setSat(s, sat(d)), lum(d))",
        BlendMethod::Saturation => "setLum(setSat(d, sat(s)), lum(d))",
        BlendMethod::Color => "setLum(s, lum(d))",
        BlendMethod::Luminosity => "setLum(d, lum(s))",
        BlendMethod::Add => "min(s + d, vec3(1.0))",
    }
}

const MASK_HEADER: &str = r#"
uniform sampler2D uSrcTexture;
uniform sampler2D uMaskTexture;
in vec2 vUV;

const vec3 LUMA = vec3(0.2125, 0.7154, 0.0721);
"#;

/// Body of `vec4 masked(vec4 src, vec4 m)`.
fn mask_fn(method: MaskMethod) -> &'static str {
    match method {
        MaskMethod::None | MaskMethod::Alpha | MaskMethod::Intersect => "return src * m.a;",
        MaskMethod::InvAlpha => "return src * (1.0 - m.a);",
        MaskMethod::Luma => "return src * dot(m.rgb, LUMA);",
        MaskMethod::InvLuma => "return src * (1.0 - dot(m.rgb, LUMA));",
        MaskMethod::Add => "return src + m * (1.0 - src.a);",
        MaskMethod::Subtract => {
            "float a = src.a - m.a;\n    return a <= 0.0 ? vec4(0.0) : src * (a / src.a);"
        }
        MaskMethod::Difference => {
            "float da = src.a - m.a;\n    if (da < 0.0) {\n        return m * (-da / m.a);\n    }\n    return src.a > 0.0 ? src * (da / src.a) : vec4(0.0);"
        }
        MaskMethod::Lighten => "return src.a >= m.a ? src : m;",
        MaskMethod::Darken => "return src.a < m.a ? src : m;",
    }
}

/// Opacity comes from the `opacity` field of `ColorInfo`.
const MASK_MAIN: &str = r#"
void main() {
    vec4 src = texture(uSrcTexture, vUV);
    vec4 m = texture(uMaskTexture, vUV);
    FragColor = masked(src, m) * (float(opacity) / 255.0);
}
"#;

const MASK_INFO: &str = r#"
layout(std140) uniform ColorInfo {
    int format;
    int flipY;
    int opacity;
    int dummy;
};
"#;

const GAUSSIAN_BLOCK: &str = r#"
layout(std140) uniform Gaussian {
    float sigma;
    float scale;
    float extend;
    float dummy0;
};
"#;

const DROPSHADOW_BLOCK: &str = r#"
layout(std140) uniform DropShadow {
    float sigma;
    float scale;
    float extend;
    float dummy0;
    vec4 color;
    vec2 offset;
};
"#;

/// `dir` is one texel step along the blur axis in texture space.
const GAUSSIAN_LIB: &str = r#"
uniform sampler2D uSrcTexture;
in vec2 vUV;

vec4 gaussian(sampler2D tex, vec2 uv, vec2 dir) {
    vec4 sum = texture(tex, uv);
    float s = sigma * scale;
    if (s <= 0.0) {
        return sum;
    }
    vec2 delta = dir / vec2(textureSize(tex, 0));
    int radius = int(min(ceil(extend), 128.0));
    float total = 1.0;
    for (int i = 1; i <= 128; ++i) {
        if (i > radius) {
            break;
        }
        float x = float(i);
        float w = exp(-x * x / (2.0 * s * s));
        sum += w * (texture(tex, uv + delta * x) + texture(tex, uv - delta * x));
        total += 2.0 * w;
    }
    return sum / total;
}
"#;

const GAUSSIAN_H_MAIN: &str = r#"
void main() {
    FragColor = gaussian(uSrcTexture, vUV, vec2(1.0, 0.0));
}
"#;

const GAUSSIAN_V_MAIN: &str = r#"
void main() {
    FragColor = gaussian(uSrcTexture, vUV, vec2(0.0, 1.0));
}
"#;

/// `uSrcTexture` holds the original, `uBlurTexture` its horizontal blur. Texture v runs
/// against device y.
const DROPSHADOW_MAIN: &str = r#"
uniform sampler2D uBlurTexture;

void main() {
    vec2 texel = 1.0 / vec2(textureSize(uSrcTexture, 0));
    vec4 orig = texture(uSrcTexture, vUV);
    vec2 uv = vUV + vec2(-offset.x, offset.y) * texel;
    float a = gaussian(uBlurTexture, uv, vec2(0.0, 1.0)).a;
    vec4 shadow = color * a;
    FragColor = orig + shadow * (1.0 - orig.a);
}
"#;

const PARAMS_BLOCK: &str = r#"
layout(std140) uniform Params {
    vec4 params[3];
};
uniform sampler2D uSrcTexture;
in vec2 vUV;

const vec3 LUMA = vec3(0.2125, 0.7154, 0.0721);
"#;

/// `params[0]` is the straight fill color.
const FILL_MAIN: &str = r#"
void main() {
    vec4 orig = texture(uSrcTexture, vUV);
    FragColor = vec4(params[0].rgb, 1.0) * params[0].a * orig.a;
}
"#;

/// `params[0]` and `params[1]` are black and white, `params[2].x` the intensity.
const TINT_MAIN: &str = r#"
void main() {
    vec4 orig = texture(uSrcTexture, vUV);
    if (orig.a <= 0.0) {
        FragColor = orig;
        return;
    }
    vec3 rgb = orig.rgb / orig.a;
    float l = dot(rgb, LUMA);
    vec3 tinted = mix(params[0].rgb, params[1].rgb, l);
    FragColor = vec4(mix(rgb, tinted, params[2].x) * orig.a, orig.a);
}
"#;

/// `params[0..3]` are shadow, midtone and highlight, `params[2].w` the blender.
const TRITONE_MAIN: &str = r#"
void main() {
    vec4 orig = texture(uSrcTexture, vUV);
    if (orig.a <= 0.0) {
        FragColor = orig;
        return;
    }
    vec3 rgb = orig.rgb / orig.a;
    float l = dot(rgb, LUMA);
    vec3 toned = l < 0.5
        ? mix(params[0].rgb, params[1].rgb, 2.0 * l)
        : mix(params[1].rgb, params[2].rgb, 2.0 * (l - 0.5));
    FragColor = vec4(mix(toned, rgb, params[2].w) * orig.a, orig.a);
}
"#;

/// The sources of `key`, for a WebGL-style (GLSL ES) or a desktop context.
pub(crate) fn source(key: ProgramKey, webgl: bool) -> ShaderSource {
    let header = if webgl { ES_HEADER } else { DESKTOP_HEADER };
    let (vertex, parts): (&str, Vec<&str>) = match key {
        ProgramKey::Color => (GEOMETRY_VS, vec![SOLID_PAINT, PAINT_MAIN]),
        ProgramKey::SolidBatch => (BATCH_VS, vec![BATCH_PAINT, PAINT_MAIN]),
        ProgramKey::Linear => (GRADIENT_VS, vec![GRADIENT_LIB, LINEAR_PAINT, PAINT_MAIN]),
        ProgramKey::Radial => (GRADIENT_VS, vec![GRADIENT_LIB, RADIAL_PAINT, PAINT_MAIN]),
        ProgramKey::Image => (IMAGE_VS, vec![TEXTURE_INFO, IMAGE_PAINT, PAINT_MAIN]),
        ProgramKey::Stencil => (GEOMETRY_VS, vec![STENCIL_FS]),
        ProgramKey::Blit => (QUAD_VS, vec![TEXTURE_INFO, SCENE_PAINT, PAINT_MAIN]),
        ProgramKey::Mask(method) => {
            let fragment = format!(
                "{header}{FRAGMENT_OUT}{MASK_INFO}{MASK_HEADER}\nvec4 masked(vec4 src, vec4 m) {{\n    {}\n}}\n{MASK_MAIN}",
                mask_fn(method)
            );
            return ShaderSource {
                vertex: format!("{header}{QUAD_VS}"),
                fragment,
            };
        }
        ProgramKey::Blend(method, src) => {
            let (vertex, paint): (&str, &[&str]) = match src {
                BlendSource::Solid => (GEOMETRY_VS, &[SOLID_PAINT]),
                BlendSource::Linear => (GRADIENT_VS, &[GRADIENT_LIB, LINEAR_PAINT]),
                BlendSource::Radial => (GRADIENT_VS, &[GRADIENT_LIB, RADIAL_PAINT]),
                BlendSource::Image => (IMAGE_VS, &[TEXTURE_INFO, IMAGE_PAINT]),
                BlendSource::Scene => (QUAD_VS, &[TEXTURE_INFO, SCENE_PAINT]),
            };
            let fragment = format!(
                "{header}{FRAGMENT_OUT}{}{BLEND_LIB}\nvec3 blendRgb(vec3 s, vec3 d) {{\n    return {};\n}}\n{BLEND_MAIN}",
                paint.concat(),
                blend_fn(method)
            );
            return ShaderSource {
                vertex: format!("{header}{vertex}"),
                fragment,
            };
        }
        ProgramKey::Effect(effect) => {
            let parts = match effect {
                EffectProgram::GaussianH => vec![GAUSSIAN_BLOCK, GAUSSIAN_LIB, GAUSSIAN_H_MAIN],
                EffectProgram::GaussianV => vec![GAUSSIAN_BLOCK, GAUSSIAN_LIB, GAUSSIAN_V_MAIN],
                EffectProgram::DropShadow => vec![DROPSHADOW_BLOCK, GAUSSIAN_LIB, DROPSHADOW_MAIN],
                EffectProgram::Fill => vec![PARAMS_BLOCK, FILL_MAIN],
                EffectProgram::Tint => vec![PARAMS_BLOCK, TINT_MAIN],
                EffectProgram::Tritone => vec![PARAMS_BLOCK, TRITONE_MAIN],
            };
            (QUAD_VS, parts)
        }
    };
    ShaderSource {
        vertex: format!("{header}{vertex}"),
        fragment: format!("{header}{FRAGMENT_OUT}{}", parts.concat()),
    }
}
