//! Scoped CSS generation.
//!
//! Rules are collected per device and emitted desktop first, then inside the
//! tablet (`max-width: 980px`) and phone (`max-width: 767px`) media blocks.
//! Every rule is printed as `selector { prop: value; ... }\n`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::attrs::{Attrs, Device};
use crate::element::Features;

/// Ordered property/value pairs for one rule.
#[derive(Debug, Default, Clone)]
pub struct Declarations(Vec<(String, String)>);

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration; empty values are dropped.
    pub fn push(&mut self, property: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if !value.is_empty() {
            self.0.push((property.to_string(), value));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn render(&self) -> String {
        self.0
            .iter()
            .map(|(prop, value)| format!("{}: {}", prop, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Default)]
pub struct CssBuilder {
    desktop: String,
    tablet: String,
    phone: String,
}

impl CssBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&mut self, device: Device) -> &mut String {
        match device {
            Device::Desktop => &mut self.desktop,
            Device::Tablet => &mut self.tablet,
            Device::Phone => &mut self.phone,
        }
    }

    pub fn rule(&mut self, device: Device, selector: &str, decls: &Declarations) {
        if decls.is_empty() {
            return;
        }
        let line = format!("{} {{ {}; }}\n", selector, decls.render());
        self.bucket(device).push_str(&line);
    }

    pub fn desktop(&mut self, selector: &str, decls: &Declarations) {
        self.rule(Device::Desktop, selector, decls);
    }

    /// Free-form declaration text supplied by the user, already cleaned.
    pub fn raw(&mut self, device: Device, selector: &str, body: &str) {
        let body = body.trim();
        if body.is_empty() {
            return;
        }
        let line = format!("{} {{ {} }}\n", selector, body);
        self.bucket(device).push_str(&line);
    }

    /// Appends already finished stylesheet text (for example a child module's CSS).
    pub fn append(&mut self, css: &str) {
        self.desktop.push_str(css);
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_empty() && self.tablet.is_empty() && self.phone.is_empty()
    }

    pub fn finish(self) -> String {
        let mut out = self.desktop;
        for (device, rules) in [(Device::Tablet, self.tablet), (Device::Phone, self.phone)] {
            if rules.is_empty() {
                continue;
            }
            if let Some(query) = device.media_query() {
                out.push_str(query);
                out.push_str(" {\n");
                for line in rules.lines() {
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("}\n");
            }
        }
        out
    }
}

/// Strips characters that could close a declaration or a style element.
pub fn clean(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Cleans user-written declaration blocks; semicolons are allowed here.
pub fn clean_block(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '<' | '>'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `#rgb` / `#rrggbb` to `rgba(r, g, b, alpha)`.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Option<String> {
    let hex = hex.trim().trim_start_matches('#');
    let full: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(full.get(i..i + 2)?, 16).ok();
    Some(format!(
        "rgba({}, {}, {}, {})",
        channel(0)?,
        channel(2)?,
        channel(4)?,
        alpha
    ))
}

fn clean_url(value: &str) -> String {
    clean(value).replace(['(', ')', '\'', '\\'], "")
}

/// A length from a JSON scalar: bare numbers get `unit`, strings with their
/// own unit (`50%`, `2em`, `auto`) pass through cleaned.
pub fn length(value: &Value, unit: &str) -> Option<String> {
    match value {
        Value::Number(n) => n.as_f64().map(|n| format!("{}{}", n, unit)),
        Value::String(s) => {
            let s = clean(s);
            if s.is_empty() {
                None
            } else if s.parse::<f64>().is_ok() {
                Some(format!("{}{}", s, unit))
            } else {
                Some(s)
            }
        }
        _ => None,
    }
}

/// Four-sided box value: an object with `top/right/bottom/left` (or the
/// corner keys for radii) or a single scalar.
pub fn box_value(value: &Value, keys: [&str; 4]) -> Option<String> {
    match value {
        Value::Object(map) => {
            if keys.iter().all(|k| map.get(*k).map_or(true, is_blank)) {
                return None;
            }
            let parts: Vec<String> = keys
                .iter()
                .map(|k| {
                    map.get(*k)
                        .and_then(|v| length(v, "px"))
                        .unwrap_or_else(|| "0px".to_string())
                })
                .collect();
            Some(parts.join(" "))
        }
        other => length(other, "px"),
    }
}

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
const CORNERS: [&str; 4] = ["top_left", "top_right", "bottom_right", "bottom_left"];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn color(attrs: &Attrs, key: &str) -> Option<String> {
    attrs.str(key).map(clean).filter(|c| !c.is_empty())
}

pub fn box_shadow_preset(style: &str) -> Option<&'static str> {
    match style {
        "preset1" => Some("0 2px 4px rgba(0,0,0,0.1)"),
        "preset2" => Some("0 4px 12px rgba(0,0,0,0.15)"),
        "preset3" => Some("0 8px 24px rgba(0,0,0,0.2)"),
        _ => None,
    }
}

pub fn text_shadow_preset(style: &str) -> Option<&'static str> {
    match style {
        "preset1" => Some("0 1px 2px rgba(0,0,0,0.15)"),
        "preset2" => Some("0 2px 4px rgba(0,0,0,0.2)"),
        "preset3" => Some("0 4px 8px rgba(0,0,0,0.3)"),
        _ => None,
    }
}

fn gradient(kind: &str, direction: f64, start: &str, end: &str) -> String {
    match kind {
        "radial" => format!("radial-gradient(circle, {}, {})", start, end),
        _ => format!("linear-gradient({}deg, {}, {})", direction, start, end),
    }
}

pub fn background(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let kind = attrs
        .str("background_type")
        .unwrap_or(if attrs.has("background_color") { "color" } else { "none" });
    let mut decls = Declarations::new();
    let mut hover = Declarations::new();

    match kind {
        "color" => {
            if let Some(c) = color(attrs, "background_color") {
                decls.push("background-color", c);
            }
            if let Some(c) = color(attrs, &Attrs::hover_key("background_color")) {
                hover.push("background-color", c);
            }
        }
        "gradient" => {
            let gradient_type = attrs.text_or("background_gradient_type", "linear");
            let direction = attrs.number_or("background_gradient_direction", 180.0);
            let start = color(attrs, "background_gradient_start").unwrap_or_else(|| "#ffffff".into());
            let end = color(attrs, "background_gradient_end").unwrap_or_else(|| "#000000".into());
            decls.push("background", gradient(&gradient_type, direction, &start, &end));

            let hover_start = color(attrs, &Attrs::hover_key("background_gradient_start"));
            let hover_end = color(attrs, &Attrs::hover_key("background_gradient_end"));
            if hover_start.is_some() || hover_end.is_some() {
                hover.push(
                    "background",
                    gradient(
                        &gradient_type,
                        direction,
                        hover_start.as_deref().unwrap_or(&start),
                        hover_end.as_deref().unwrap_or(&end),
                    ),
                );
            }
        }
        "image" => {
            if let Some(url) = attrs.str("background_image") {
                decls
                    .push("background-image", format!("url(\"{}\")", clean_url(url)))
                    .push("background-size", clean(&attrs.text_or("background_size", "cover")))
                    .push(
                        "background-position",
                        clean(&attrs.text_or("background_position", "center center")),
                    )
                    .push("background-repeat", clean(&attrs.text_or("background_repeat", "no-repeat")));
                if attrs.bool("parallax") {
                    decls.push("background-attachment", "fixed");
                }
            }
        }
        _ => {}
    }

    css.desktop(selector, &decls);
    css.desktop(&format!("{}:hover", selector), &hover);
}

pub fn spacing(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut decls = Declarations::new();
    for prop in ["margin", "padding"] {
        if let Some(value) = attrs.get(prop).and_then(|v| box_value(v, SIDES)) {
            decls.push(prop, value);
        }
    }
    css.desktop(selector, &decls);
}

pub fn border(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut decls = Declarations::new();
    let width = attrs.get("border_width").and_then(|v| box_value(v, SIDES));
    let has_width = width.is_some();
    if let Some(width) = width {
        decls.push("border-width", width);
    }
    if let Some(style) = attrs.str("border_style").filter(|s| *s != "none") {
        if has_width || attrs.has("border_color") {
            decls.push("border-style", clean(style));
        }
    }
    if let Some(c) = color(attrs, "border_color") {
        decls.push("border-color", c);
    }
    if let Some(radius) = attrs.get("border_radius").and_then(|v| box_value(v, CORNERS)) {
        decls.push("border-radius", radius);
    }
    css.desktop(selector, &decls);

    if let Some(c) = color(attrs, &Attrs::hover_key("border_color")) {
        let mut hover = Declarations::new();
        hover.push("border-color", c);
        css.desktop(&format!("{}:hover", selector), &hover);
    }
}

fn shadow_value(attrs: &Attrs, style: &str) -> Option<String> {
    if let Some(preset) = box_shadow_preset(style) {
        return Some(preset.to_string());
    }
    if style != "custom" {
        return None;
    }
    let shadow = format!(
        "{}px {}px {}px {}px {}",
        attrs.number_or("box_shadow_horizontal", 0.0),
        attrs.number_or("box_shadow_vertical", 0.0),
        attrs.number_or("box_shadow_blur", 0.0),
        attrs.number_or("box_shadow_spread", 0.0),
        color(attrs, "box_shadow_color").unwrap_or_else(|| "rgba(0,0,0,0.3)".into()),
    );
    if attrs.bool("box_shadow_inset") {
        Some(format!("inset {}", shadow))
    } else {
        Some(shadow)
    }
}

pub fn box_shadow(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let style = attrs.text_or("box_shadow_style", "none");
    if let Some(shadow) = shadow_value(attrs, &style) {
        let mut decls = Declarations::new();
        decls.push("box-shadow", shadow);
        css.desktop(selector, &decls);
    }
    let hover_style = attrs.text(&Attrs::hover_key("box_shadow_style"));
    if let Some(shadow) = shadow_value(attrs, &hover_style) {
        let mut hover = Declarations::new();
        hover.push("box-shadow", shadow);
        css.desktop(&format!("{}:hover", selector), &hover);
    }
}

/// Typography for `selector`, reading keys `{prefix}font_size` and so on.
/// Modules with several text parts call this once per part.
pub fn typography_with_prefix(attrs: &Attrs, prefix: &str, selector: &str, css: &mut CssBuilder) {
    let key = |name: &str| format!("{}{}", prefix, name);
    let mut decls = Declarations::new();

    if let Some(family) = attrs.str(&key("font_family")) {
        decls.push("font-family", format!("'{}', sans-serif", clean(family).replace('\'', "")));
    }
    if let Some(size) = attrs.get(&key("font_size")).and_then(|v| length(v, "px")) {
        decls.push("font-size", size);
    }
    for (name, prop) in [
        ("font_weight", "font-weight"),
        ("font_style", "font-style"),
        ("text_transform", "text-transform"),
        ("text_decoration", "text-decoration"),
    ] {
        if let Some(value) = attrs.str(&key(name)) {
            decls.push(prop, clean(value));
        }
    }
    if let Some(lh) = attrs.get(&key("line_height")).and_then(|v| length(v, "em")) {
        decls.push("line-height", lh);
    }
    if let Some(ls) = attrs.get(&key("letter_spacing")).and_then(|v| length(v, "px")) {
        decls.push("letter-spacing", ls);
    }
    if let Some(c) = color(attrs, &key("text_color")) {
        decls.push("color", c);
    }
    if let Some(align) = attrs.str(&key("text_align")) {
        decls.push("text-align", clean(align));
    }
    if let Some(shadow) = text_shadow_preset(&attrs.text(&key("text_shadow_style"))) {
        decls.push("text-shadow", shadow);
    }
    css.desktop(selector, &decls);

    if let Some(c) = color(attrs, &Attrs::hover_key(&key("text_color"))) {
        let mut hover = Declarations::new();
        hover.push("color", c);
        css.desktop(&format!("{}:hover", selector), &hover);
    }
}

pub fn typography(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    typography_with_prefix(attrs, "", selector, css);
}

/// `(suffix, css function, unit, neutral value)`
const FILTERS: [(&str, &str, &str, f64); 8] = [
    ("hue_rotate", "hue-rotate", "deg", 0.0),
    ("saturate", "saturate", "%", 100.0),
    ("brightness", "brightness", "%", 100.0),
    ("contrast", "contrast", "%", 100.0),
    ("invert", "invert", "%", 0.0),
    ("sepia", "sepia", "%", 0.0),
    ("opacity", "opacity", "%", 100.0),
    ("blur", "blur", "px", 0.0),
];

/// Filters are only emitted when they differ from their neutral value.
pub fn filters(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut base = Vec::new();
    let mut hover = Vec::new();
    for (name, func, unit, neutral) in FILTERS {
        let key = format!("filter_{}", name);
        if let Some(value) = attrs.number(&key) {
            if (value - neutral).abs() > f64::EPSILON {
                base.push(format!("{}({}{})", func, value, unit));
            }
        }
        if let Some(value) = attrs.number(&Attrs::hover_key(&key)) {
            hover.push(format!("{}({}{})", func, value, unit));
        }
    }
    if !base.is_empty() {
        let mut decls = Declarations::new();
        decls.push("filter", base.join(" "));
        css.desktop(selector, &decls);
    }
    if !hover.is_empty() {
        let mut decls = Declarations::new();
        decls.push("filter", hover.join(" "));
        css.desktop(&format!("{}:hover", selector), &decls);
    }
}

fn transform_parts(attrs: &Attrs, suffix: &str, only_changed: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let value = |name: &str| attrs.number(&format!("{}{}", name, suffix));
    let keep = |v: f64, neutral: f64| !only_changed || (v - neutral).abs() > f64::EPSILON;

    if let Some(scale) = value("transform_scale").filter(|v| keep(*v, 100.0)) {
        parts.push(format!("scale({})", scale / 100.0));
    }
    if let Some(rotate) = value("transform_rotate").filter(|v| keep(*v, 0.0)) {
        parts.push(format!("rotate({}deg)", rotate));
    }
    if let Some(skew) = value("transform_skew_x").filter(|v| keep(*v, 0.0)) {
        parts.push(format!("skewX({}deg)", skew));
    }
    if let Some(skew) = value("transform_skew_y").filter(|v| keep(*v, 0.0)) {
        parts.push(format!("skewY({}deg)", skew));
    }
    if let Some(x) = value("transform_translate_x").filter(|v| keep(*v, 0.0)) {
        parts.push(format!("translateX({}px)", x));
    }
    if let Some(y) = value("transform_translate_y").filter(|v| keep(*v, 0.0)) {
        parts.push(format!("translateY({}px)", y));
    }
    parts
}

pub fn transform(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let base = transform_parts(attrs, "", true);
    let hover = transform_parts(attrs, crate::attrs::HOVER_SUFFIX, false);

    let mut decls = Declarations::new();
    if !base.is_empty() {
        decls.push("transform", base.join(" "));
    }
    if let Some(origin) = attrs.str("transform_origin") {
        decls.push("transform-origin", clean(origin));
    }
    if !hover.is_empty() {
        decls.push("transition", "transform 0.3s ease");
    }
    css.desktop(selector, &decls);

    if !hover.is_empty() {
        let mut decls = Declarations::new();
        decls.push("transform", hover.join(" "));
        css.desktop(&format!("{}:hover", selector), &decls);
    }
}

pub fn position(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let kind = attrs.text_or("position_type", "default");
    if !matches!(kind.as_str(), "relative" | "absolute" | "fixed" | "sticky") {
        return;
    }
    let mut decls = Declarations::new();
    decls.push("position", kind);
    for (key, prop) in [
        ("position_top", "top"),
        ("position_right", "right"),
        ("position_bottom", "bottom"),
        ("position_left", "left"),
    ] {
        if let Some(value) = attrs.get(key).and_then(|v| length(v, "px")) {
            decls.push(prop, value);
        }
    }
    if let Some(z) = attrs.number("z_index") {
        decls.push("z-index", format!("{}", z as i64));
    }
    css.desktop(selector, &decls);
}

pub fn sizing(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut decls = Declarations::new();
    for (key, prop) in [
        ("width", "width"),
        ("max_width", "max-width"),
        ("min_width", "min-width"),
        ("height", "height"),
        ("min_height", "min-height"),
        ("max_height", "max-height"),
    ] {
        if let Some(value) = attrs.get(key).and_then(|v| length(v, "px")) {
            decls.push(prop, value);
        }
    }
    match attrs.text("module_alignment").as_str() {
        "center" => {
            decls.push("margin-left", "auto").push("margin-right", "auto");
        }
        "right" => {
            decls.push("margin-left", "auto").push("margin-right", "0");
        }
        "left" => {
            decls.push("margin-left", "0").push("margin-right", "auto");
        }
        _ => {}
    }
    if let Some(overflow) = attrs.str("overflow").filter(|o| *o != "visible") {
        decls.push("overflow", clean(overflow));
    }
    css.desktop(selector, &decls);
}

pub fn divider_path(style: &str) -> Option<&'static str> {
    match style {
        "slant" => Some("M0,0 L1200,120 L1200,0 Z"),
        "wave" => Some(
            "M321.39,56.44c58-10.79,114.16-30.13,172-41.86,82.39-16.72,168.19-17.73,250.45-.39\
             C823.78,31,906.67,72,985.66,92.83c70.05,18.48,146.53,26.09,214.34,3V0H0V27.35\
             A600.21,600.21,0,0,0,321.39,56.44Z",
        ),
        "curve" => Some("M0,0V7.23C0,65.52,268.63,112.77,600,112.77S1200,65.52,1200,7.23V0Z"),
        "triangle" => Some("M0,0 L0,120 L600,0 L1200,120 L1200,0 Z"),
        _ => None,
    }
}

fn divider_image(path: &str, fill: &str) -> String {
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1200 120\" preserveAspectRatio=\"none\">\
         <path fill=\"{}\" d=\"{}\"/></svg>",
        fill, path
    );
    format!("url(\"data:image/svg+xml;base64,{}\")", BASE64.encode(svg))
}

/// Section dividers drawn as SVG backgrounds on `::before` (top) and `::after` (bottom).
pub fn dividers(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    let mut pieces = Vec::new();
    for (edge, pseudo) in [("top", "::before"), ("bottom", "::after")] {
        let style = attrs.text(&format!("{}_divider_style", edge));
        let Some(path) = divider_path(&style) else {
            continue;
        };
        let fill = color(attrs, &format!("{}_divider_color", edge)).unwrap_or_else(|| "#ffffff".into());
        let height = attrs.number_or(&format!("{}_divider_height", edge), 100.0);
        let flip = attrs.bool(&format!("{}_divider_flip", edge));

        let mut decls = Declarations::new();
        decls
            .push("content", "\"\"")
            .push("position", "absolute")
            .push(edge, "0")
            .push("left", "0")
            .push("right", "0")
            .push("height", format!("{}px", height))
            .push("background-image", divider_image(path, &fill))
            .push("background-size", "100% 100%")
            .push("background-repeat", "no-repeat")
            .push("z-index", "1")
            .push("pointer-events", "none");
        match (edge, flip) {
            ("bottom", true) => {
                decls.push("transform", "scaleY(-1) scaleX(-1)");
            }
            ("bottom", false) => {
                decls.push("transform", "scaleY(-1)");
            }
            (_, true) => {
                decls.push("transform", "scaleX(-1)");
            }
            _ => {}
        }
        pieces.push((format!("{}{}", selector, pseudo), decls));
    }

    if pieces.is_empty() {
        return;
    }
    let mut host = Declarations::new();
    host.push("position", "relative").push("overflow", "hidden");
    css.desktop(selector, &host);
    for (sel, decls) in pieces {
        css.desktop(&sel, &decls);
    }
}

pub fn custom(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    for (key, suffix) in [
        ("custom_css_before", "::before"),
        ("custom_css_main", ""),
        ("custom_css_after", "::after"),
    ] {
        if let Some(body) = attrs.str(key) {
            css.raw(Device::Desktop, &format!("{}{}", selector, suffix), &clean_block(body));
        }
    }
}

enum Responsive {
    Length(&'static str),
    Sides,
    Corners,
    Keyword,
}

/// Attributes that accept `__tablet` / `__phone` overrides.
const RESPONSIVE_FIELDS: &[(&str, &str, Responsive)] = &[
    ("background_color", "background-color", Responsive::Keyword),
    ("margin", "margin", Responsive::Sides),
    ("padding", "padding", Responsive::Sides),
    ("border_width", "border-width", Responsive::Sides),
    ("border_radius", "border-radius", Responsive::Corners),
    ("font_size", "font-size", Responsive::Length("px")),
    ("line_height", "line-height", Responsive::Length("em")),
    ("letter_spacing", "letter-spacing", Responsive::Length("px")),
    ("text_align", "text-align", Responsive::Keyword),
    ("width", "width", Responsive::Length("px")),
    ("max_width", "max-width", Responsive::Length("px")),
    ("min_height", "min-height", Responsive::Length("px")),
];

pub fn responsive(attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    for device in [Device::Tablet, Device::Phone] {
        let mut decls = Declarations::new();
        for (key, prop, kind) in RESPONSIVE_FIELDS {
            let Some(value) = attrs.responsive(key, device) else {
                continue;
            };
            let rendered = match kind {
                Responsive::Length(unit) => length(value, unit),
                Responsive::Sides => box_value(value, SIDES),
                Responsive::Corners => box_value(value, CORNERS),
                Responsive::Keyword => value.as_str().map(clean),
            };
            if let Some(rendered) = rendered {
                decls.push(prop, rendered);
            }
        }
        css.rule(device, selector, &decls);
    }
}

/// Runs every design generator in the fixed order.
pub fn common(features: &Features, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
    background(attrs, selector, css);
    spacing(attrs, selector, css);
    border(attrs, selector, css);
    box_shadow(attrs, selector, css);
    if features.typography {
        typography(attrs, selector, css);
    }
    filters(attrs, selector, css);
    transform(attrs, selector, css);
    if features.position {
        position(attrs, selector, css);
    }
    if features.sizing {
        sizing(attrs, selector, css);
    }
    if features.dividers {
        dividers(attrs, selector, css);
    }
    custom(attrs, selector, css);
    responsive(attrs, selector, css);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        Attrs::from_value(value).unwrap()
    }

    fn run(f: fn(&Attrs, &str, &mut CssBuilder), value: Value) -> String {
        let mut css = CssBuilder::new();
        f(&attrs(value), "#m1", &mut css);
        css.finish()
    }

    #[test]
    fn test_rule_format() {
        let mut css = CssBuilder::new();
        let mut decls = Declarations::new();
        decls.push("color", "red").push("margin", "0");
        css.desktop(".a", &decls);
        assert_eq!(css.finish(), ".a { color: red; margin: 0; }\n");
    }

    #[test]
    fn test_empty_declarations_emit_nothing() {
        let mut css = CssBuilder::new();
        css.desktop(".a", &Declarations::new());
        assert!(css.is_empty());
        assert_eq!(css.finish(), "");
    }

    #[test]
    fn test_media_blocks_follow_desktop() {
        let mut css = CssBuilder::new();
        let mut decls = Declarations::new();
        decls.push("color", "red");
        css.rule(Device::Phone, ".a", &decls);
        css.rule(Device::Tablet, ".a", &decls);
        css.desktop(".a", &decls);
        assert_eq!(
            css.finish(),
            ".a { color: red; }\n\
             @media (max-width: 980px) {\n  .a { color: red; }\n}\n\
             @media (max-width: 767px) {\n  .a { color: red; }\n}\n"
        );
    }

    #[test]
    fn test_clean_strips_breakout_characters() {
        assert_eq!(clean("red; } body { display:none"), "red  body  display:none");
        assert_eq!(clean("</style>"), "/style");
    }

    #[test]
    fn test_hex_to_rgba() {
        assert_eq!(hex_to_rgba("#7c3aed", 0.15), Some("rgba(124, 58, 237, 0.15)".into()));
        assert_eq!(hex_to_rgba("#fff", 1.0), Some("rgba(255, 255, 255, 1)".into()));
        assert_eq!(hex_to_rgba("red", 0.5), None);
    }

    #[test]
    fn test_length_units() {
        assert_eq!(length(&json!(12), "px"), Some("12px".into()));
        assert_eq!(length(&json!("1.5"), "em"), Some("1.5em".into()));
        assert_eq!(length(&json!("50%"), "px"), Some("50%".into()));
        assert_eq!(length(&json!(""), "px"), None);
    }

    #[test]
    fn test_background_color_and_hover() {
        let css = run(
            background,
            json!({"background_type": "color", "background_color": "#111", "background_color__hover": "#222"}),
        );
        assert_eq!(
            css,
            "#m1 { background-color: #111; }\n#m1:hover { background-color: #222; }\n"
        );
    }

    #[test]
    fn test_background_linear_and_radial_gradients() {
        let css = run(
            background,
            json!({"background_type": "gradient", "background_gradient_start": "#fff", "background_gradient_end": "#000", "background_gradient_direction": 90}),
        );
        assert_eq!(css, "#m1 { background: linear-gradient(90deg, #fff, #000); }\n");

        let css = run(
            background,
            json!({"background_type": "gradient", "background_gradient_type": "radial"}),
        );
        assert_eq!(css, "#m1 { background: radial-gradient(circle, #ffffff, #000000); }\n");
    }

    #[test]
    fn test_background_image() {
        let css = run(
            background,
            json!({"background_type": "image", "background_image": "/uploads/a.jpg"}),
        );
        assert!(css.contains("background-image: url(\"/uploads/a.jpg\")"));
        assert!(css.contains("background-size: cover"));
        assert!(css.contains("background-repeat: no-repeat"));
    }

    #[test]
    fn test_spacing_object_and_scalar() {
        let css = run(
            spacing,
            json!({"margin": {"top": 10, "bottom": "20"}, "padding": 8}),
        );
        assert_eq!(css, "#m1 { margin: 10px 0px 20px 0px; padding: 8px; }\n");
    }

    #[test]
    fn test_border_with_radius_and_hover() {
        let css = run(
            border,
            json!({"border_width": 1, "border_style": "solid", "border_color": "#ccc",
                   "border_radius": {"top_left": 4, "top_right": 4},
                   "border_color__hover": "#000"}),
        );
        assert_eq!(
            css,
            "#m1 { border-width: 1px; border-style: solid; border-color: #ccc; border-radius: 4px 4px 0px 0px; }\n\
             #m1:hover { border-color: #000; }\n"
        );
    }

    #[test]
    fn test_box_shadow_presets_and_custom() {
        assert_eq!(
            run(box_shadow, json!({"box_shadow_style": "preset2"})),
            "#m1 { box-shadow: 0 4px 12px rgba(0,0,0,0.15); }\n"
        );
        assert_eq!(run(box_shadow, json!({"box_shadow_style": "none"})), "");
        assert_eq!(
            run(
                box_shadow,
                json!({"box_shadow_style": "custom", "box_shadow_vertical": 3, "box_shadow_blur": 6, "box_shadow_color": "#000"})
            ),
            "#m1 { box-shadow: 0px 3px 6px 0px #000; }\n"
        );
    }

    #[test]
    fn test_typography_units_and_hover() {
        let css = run(
            typography,
            json!({"font_family": "Inter", "font_size": 18, "line_height": 1.4, "text_color": "#333", "text_color__hover": "#000"}),
        );
        assert_eq!(
            css,
            "#m1 { font-family: 'Inter', sans-serif; font-size: 18px; line-height: 1.4em; color: #333; }\n\
             #m1:hover { color: #000; }\n"
        );
    }

    #[test]
    fn test_filters_skip_neutral_values() {
        assert_eq!(
            run(filters, json!({"filter_saturate": 100, "filter_brightness": 100})),
            ""
        );
        assert_eq!(
            run(filters, json!({"filter_brightness": 120, "filter_blur": 2})),
            "#m1 { filter: brightness(120%) blur(2px); }\n"
        );
    }

    #[test]
    fn test_transform_with_hover() {
        let css = run(
            transform,
            json!({"transform_scale": 100, "transform_rotate": 5, "transform_scale__hover": 110}),
        );
        assert_eq!(
            css,
            "#m1 { transform: rotate(5deg); transition: transform 0.3s ease; }\n\
             #m1:hover { transform: scale(1.1); }\n"
        );
    }

    #[test]
    fn test_position_default_emits_nothing() {
        assert_eq!(run(position, json!({"position_type": "default", "z_index": 3})), "");
        assert_eq!(
            run(position, json!({"position_type": "absolute", "position_top": 0, "z_index": 3})),
            "#m1 { position: absolute; top: 0px; z-index: 3; }\n"
        );
    }

    #[test]
    fn test_sizing_alignment() {
        assert_eq!(
            run(sizing, json!({"max_width": "600px", "module_alignment": "center"})),
            "#m1 { max-width: 600px; margin-left: auto; margin-right: auto; }\n"
        );
    }

    #[test]
    fn test_dividers_use_svg_data_uri() {
        let css = run(dividers, json!({"bottom_divider_style": "wave", "bottom_divider_height": 60}));
        assert!(css.starts_with("#m1 { position: relative; overflow: hidden; }\n"));
        assert!(css.contains("#m1::after {"));
        assert!(css.contains("height: 60px"));
        assert!(css.contains("data:image/svg+xml;base64,"));
        assert!(css.contains("transform: scaleY(-1)"));
        assert_eq!(run(dividers, json!({"top_divider_style": "none"})), "");
    }

    #[test]
    fn test_custom_css_blocks() {
        let css = run(
            custom,
            json!({"custom_css_main": "letter-spacing: 2px;", "custom_css_after": "content: '*'; }"}),
        );
        assert_eq!(
            css,
            "#m1 { letter-spacing: 2px; }\n#m1::after { content: '*'; }\n"
        );
    }

    #[test]
    fn test_responsive_overrides() {
        let css = run(
            responsive,
            json!({"font_size": 20, "font_size__tablet": 18, "padding__phone": {"top": 5, "right": 5, "bottom": 5, "left": 5}}),
        );
        assert_eq!(
            css,
            "@media (max-width: 980px) {\n  #m1 { font-size: 18px; }\n}\n\
             @media (max-width: 767px) {\n  #m1 { padding: 5px 5px 5px 5px; }\n}\n"
        );
    }

    #[test]
    fn test_common_order() {
        let features = Features {
            typography: true,
            ..Features::none()
        };
        let mut css = CssBuilder::new();
        let a = attrs(json!({
            "background_color": "#eee",
            "padding": 10,
            "font_size": 14,
            "custom_css_main": "outline: 0;"
        }));
        common(&features, &a, "#m1", &mut css);
        let out = css.finish();
        let bg = out.find("background-color").unwrap();
        let pad = out.find("padding").unwrap();
        let font = out.find("font-size").unwrap();
        let custom = out.find("outline").unwrap();
        assert!(bg < pad && pad < font && font < custom);
    }
}
