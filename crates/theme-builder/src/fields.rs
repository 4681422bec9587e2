//! Field schema declared by each module.
//!
//! Schemas drive three things: default attribute values, the JSON the editor
//! consumes to build its settings panels, and which design generators run.

use serde::Serialize;
use serde_json::{json, Value};

use crate::element::Features;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Toggle,
    Number,
    Color,
    Range,
    Url,
    Icon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Shows a field only while another field holds one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowIf {
    pub field: &'static str,
    pub values: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub default: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub responsive: bool,
    pub hover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_if: Option<ShowIf>,
}

/// Whole numbers are stored as integers so they print without a fraction.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        json!(n)
    }
}

/// Ordered `(name, definition)` pairs.
pub type Schema = Vec<(&'static str, FieldDef)>;

impl FieldDef {
    fn new(kind: FieldType, label: &'static str, default: Value) -> Self {
        Self {
            label,
            kind,
            default,
            options: Vec::new(),
            unit: None,
            min: None,
            max: None,
            responsive: false,
            hover: false,
            show_if: None,
        }
    }

    pub fn text(label: &'static str, default: &str) -> Self {
        Self::new(FieldType::Text, label, Value::from(default))
    }

    pub fn textarea(label: &'static str, default: &str) -> Self {
        Self::new(FieldType::Textarea, label, Value::from(default))
    }

    pub fn url(label: &'static str, default: &str) -> Self {
        Self::new(FieldType::Url, label, Value::from(default))
    }

    pub fn icon(label: &'static str, default: &str) -> Self {
        Self::new(FieldType::Icon, label, Value::from(default))
    }

    pub fn color(label: &'static str, default: &str) -> Self {
        Self::new(FieldType::Color, label, Value::from(default))
    }

    pub fn toggle(label: &'static str, default: bool) -> Self {
        Self::new(FieldType::Toggle, label, Value::from(default))
    }

    pub fn number(label: &'static str, default: f64) -> Self {
        Self::new(FieldType::Number, label, number_value(default))
    }

    pub fn range(label: &'static str, default: f64, min: f64, max: f64, unit: &'static str) -> Self {
        let mut def = Self::new(FieldType::Range, label, number_value(default));
        def.min = Some(min);
        def.max = Some(max);
        def.unit = Some(unit);
        def
    }

    pub fn select(label: &'static str, options: &[(&'static str, &'static str)], default: &str) -> Self {
        let mut def = Self::new(FieldType::Select, label, Value::from(default));
        def.options = options
            .iter()
            .map(|(value, label)| FieldOption { value, label })
            .collect();
        def
    }

    /// A field with no default value (left out of merged attributes).
    pub fn blank(mut self) -> Self {
        self.default = Value::Null;
        self
    }

    pub fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn responsive(mut self) -> Self {
        self.responsive = true;
        self
    }

    pub fn hover(mut self) -> Self {
        self.hover = true;
        self
    }

    pub fn show_if(mut self, field: &'static str, values: &[&'static str]) -> Self {
        self.show_if = Some(ShowIf {
            field,
            values: values.to_vec(),
        });
        self
    }
}

/// Serializes a schema as a JSON array of field objects carrying their name.
pub fn schema_json(schema: &Schema) -> Value {
    Value::Array(
        schema
            .iter()
            .map(|(name, def)| {
                let mut value = serde_json::to_value(def).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.insert("name".into(), Value::from(*name));
                }
                value
            })
            .collect(),
    )
}

const SHADOW_STYLES: &[(&str, &str)] = &[
    ("none", "None"),
    ("preset1", "Soft"),
    ("preset2", "Medium"),
    ("preset3", "Strong"),
    ("custom", "Custom"),
];

const GRADIENT_TYPES: &[(&str, &str)] = &[
    ("linear", "Linear"),
    ("radial", "Radial"),
];

const DIVIDER_STYLES: &[(&str, &str)] = &[
    ("none", "None"),
    ("slant", "Slant"),
    ("wave", "Wave"),
    ("curve", "Curve"),
    ("triangle", "Triangle"),
];

/// Design-tab fields derived from the module's feature flags.
pub fn design_fields(features: &Features) -> Schema {
    let mut schema: Schema = Vec::new();

    if features.background {
        schema.push((
            "background_type",
            FieldDef::select(
                "Background",
                &[("color", "Color"), ("gradient", "Gradient"), ("image", "Image")],
                "color",
            ),
        ));
        schema.push(("background_color", FieldDef::color("Background Color", "").responsive().hover()));
        schema.push((
            "background_gradient_type",
            FieldDef::select("Gradient Type", GRADIENT_TYPES, "linear").show_if("background_type", &["gradient"]),
        ));
        schema.push((
            "background_gradient_direction",
            FieldDef::range("Gradient Direction", 180.0, 0.0, 360.0, "deg").show_if("background_type", &["gradient"]),
        ));
        schema.push((
            "background_gradient_start",
            FieldDef::color("Gradient Start", "#2ea3f2").show_if("background_type", &["gradient"]),
        ));
        schema.push((
            "background_gradient_end",
            FieldDef::color("Gradient End", "#1a5f8c").show_if("background_type", &["gradient"]),
        ));
        schema.push((
            "background_image",
            FieldDef::url("Background Image", "").show_if("background_type", &["image"]),
        ));
        schema.push((
            "background_size",
            FieldDef::select(
                "Background Size",
                &[("cover", "Cover"), ("contain", "Contain"), ("auto", "Actual Size")],
                "cover",
            )
            .show_if("background_type", &["image"]),
        ));
        schema.push((
            "background_position",
            FieldDef::text("Background Position", "center").show_if("background_type", &["image"]),
        ));
    }

    if features.spacing {
        schema.push(("margin", FieldDef::text("Margin", "").blank().unit("px").responsive()));
        schema.push(("padding", FieldDef::text("Padding", "").blank().unit("px").responsive()));
    }

    if features.border {
        schema.push(("border_width", FieldDef::text("Border Width", "").blank().unit("px").responsive()));
        schema.push((
            "border_style",
            FieldDef::select(
                "Border Style",
                &[("solid", "Solid"), ("dashed", "Dashed"), ("dotted", "Dotted"), ("double", "Double")],
                "solid",
            ),
        ));
        schema.push(("border_color", FieldDef::color("Border Color", "").hover()));
        schema.push(("border_radius", FieldDef::text("Border Radius", "").blank().unit("px").responsive().hover()));
    }

    if features.box_shadow {
        schema.push(("box_shadow_style", FieldDef::select("Box Shadow", SHADOW_STYLES, "none").hover()));
        for (name, label) in [
            ("box_shadow_horizontal", "Horizontal Offset"),
            ("box_shadow_vertical", "Vertical Offset"),
            ("box_shadow_blur", "Blur"),
            ("box_shadow_spread", "Spread"),
        ] {
            schema.push((
                name,
                FieldDef::range(label, 0.0, -100.0, 100.0, "px").show_if("box_shadow_style", &["custom"]),
            ));
        }
        schema.push((
            "box_shadow_color",
            FieldDef::color("Shadow Color", "rgba(0,0,0,0.3)").show_if("box_shadow_style", &["custom"]),
        ));
        schema.push((
            "box_shadow_inset",
            FieldDef::toggle("Inset", false).show_if("box_shadow_style", &["custom"]),
        ));
    }

    if features.typography {
        schema.push(("font_family", FieldDef::text("Font", "").blank()));
        schema.push(("font_size", FieldDef::range("Font Size", 16.0, 8.0, 120.0, "px").blank().responsive()));
        schema.push((
            "font_weight",
            FieldDef::select(
                "Font Weight",
                &[("", "Default"), ("300", "Light"), ("400", "Normal"), ("600", "Semi Bold"), ("700", "Bold")],
                "",
            ),
        ));
        schema.push(("line_height", FieldDef::range("Line Height", 1.5, 0.5, 4.0, "em").blank().responsive()));
        schema.push(("letter_spacing", FieldDef::range("Letter Spacing", 0.0, -5.0, 20.0, "px").blank()));
        schema.push((
            "text_transform",
            FieldDef::select(
                "Text Transform",
                &[("", "None"), ("uppercase", "Uppercase"), ("lowercase", "Lowercase"), ("capitalize", "Capitalize")],
                "",
            ),
        ));
        schema.push(("text_color", FieldDef::color("Text Color", "").hover()));
        schema.push((
            "text_align",
            FieldDef::select(
                "Text Alignment",
                &[("", "Default"), ("left", "Left"), ("center", "Center"), ("right", "Right"), ("justify", "Justify")],
                "",
            )
            .responsive(),
        ));
        schema.push((
            "text_shadow_style",
            FieldDef::select(
                "Text Shadow",
                &[("none", "None"), ("preset1", "Soft"), ("preset2", "Medium"), ("preset3", "Strong")],
                "none",
            ),
        ));
    }

    if features.filters {
        schema.push(("filter_hue_rotate", FieldDef::range("Hue Rotate", 0.0, 0.0, 360.0, "deg")));
        schema.push(("filter_saturate", FieldDef::range("Saturation", 100.0, 0.0, 200.0, "%")));
        schema.push(("filter_brightness", FieldDef::range("Brightness", 100.0, 0.0, 200.0, "%")));
        schema.push(("filter_contrast", FieldDef::range("Contrast", 100.0, 0.0, 200.0, "%")));
        schema.push(("filter_invert", FieldDef::range("Invert", 0.0, 0.0, 100.0, "%")));
        schema.push(("filter_sepia", FieldDef::range("Sepia", 0.0, 0.0, 100.0, "%")));
        schema.push(("filter_opacity", FieldDef::range("Opacity", 100.0, 0.0, 100.0, "%")));
        schema.push(("filter_blur", FieldDef::range("Blur", 0.0, 0.0, 50.0, "px")));
    }

    if features.transform {
        schema.push(("transform_scale", FieldDef::range("Scale", 100.0, 0.0, 300.0, "%").hover()));
        schema.push(("transform_rotate", FieldDef::range("Rotate", 0.0, -360.0, 360.0, "deg").hover()));
        schema.push(("transform_skew_x", FieldDef::range("Skew X", 0.0, -90.0, 90.0, "deg")));
        schema.push(("transform_skew_y", FieldDef::range("Skew Y", 0.0, -90.0, 90.0, "deg")));
        schema.push(("transform_translate_x", FieldDef::range("Translate X", 0.0, -500.0, 500.0, "px").hover()));
        schema.push(("transform_translate_y", FieldDef::range("Translate Y", 0.0, -500.0, 500.0, "px").hover()));
    }

    if features.position {
        schema.push((
            "position_type",
            FieldDef::select(
                "Position",
                &[
                    ("default", "Default"),
                    ("relative", "Relative"),
                    ("absolute", "Absolute"),
                    ("fixed", "Fixed"),
                    ("sticky", "Sticky"),
                ],
                "default",
            ),
        ));
        for (name, label) in [
            ("position_top", "Top"),
            ("position_right", "Right"),
            ("position_bottom", "Bottom"),
            ("position_left", "Left"),
        ] {
            schema.push((name, FieldDef::text(label, "").blank().unit("px").show_if(
                "position_type",
                &["relative", "absolute", "fixed", "sticky"],
            )));
        }
        schema.push(("z_index", FieldDef::number("Z Index", 0.0).blank()));
    }

    if features.sizing {
        schema.push(("width", FieldDef::text("Width", "").blank().responsive()));
        schema.push(("max_width", FieldDef::text("Max Width", "").blank().responsive()));
        schema.push(("min_height", FieldDef::text("Min Height", "").blank().responsive()));
        schema.push((
            "module_alignment",
            FieldDef::select(
                "Module Alignment",
                &[("", "Default"), ("left", "Left"), ("center", "Center"), ("right", "Right")],
                "",
            ),
        ));
    }

    if features.animation {
        schema.push((
            "animation_style",
            FieldDef::select(
                "Animation",
                &[
                    ("none", "None"),
                    ("fade", "Fade"),
                    ("slide", "Slide"),
                    ("bounce", "Bounce"),
                    ("zoom", "Zoom"),
                    ("flip", "Flip"),
                ],
                "none",
            ),
        ));
        schema.push(("animation_duration", FieldDef::range("Duration", 1000.0, 0.0, 5000.0, "ms")));
        schema.push(("animation_delay", FieldDef::range("Delay", 0.0, 0.0, 5000.0, "ms")));
    }

    if features.dividers {
        for (style, color, height, label) in [
            ("top_divider_style", "top_divider_color", "top_divider_height", "Top Divider"),
            ("bottom_divider_style", "bottom_divider_color", "bottom_divider_height", "Bottom Divider"),
        ] {
            schema.push((style, FieldDef::select(label, DIVIDER_STYLES, "none")));
            schema.push((color, FieldDef::color("Divider Color", "#ffffff")));
            schema.push((height, FieldDef::range("Divider Height", 100.0, 0.0, 500.0, "px")));
        }
    }

    schema
}

/// Advanced-tab fields shared by every module.
pub fn advanced_fields() -> Schema {
    vec![
        ("css_id", FieldDef::text("CSS ID", "").blank()),
        ("css_class", FieldDef::text("CSS Class", "").blank()),
        ("custom_css_before", FieldDef::textarea("Before", "").blank()),
        ("custom_css_main", FieldDef::textarea("Main Element", "").blank()),
        ("custom_css_after", FieldDef::textarea("After", "").blank()),
        ("disable_on_desktop", FieldDef::toggle("Hide on Desktop", false)),
        ("disable_on_tablet", FieldDef::toggle("Hide on Tablet", false)),
        ("disable_on_phone", FieldDef::toggle("Hide on Phone", false)),
    ]
}
