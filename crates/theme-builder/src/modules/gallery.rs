use serde_json::Value;

use crate::attrs::{Attrs, Device};
use crate::css::{CssBuilder, Declarations};
use crate::element::{Category, Element};
use crate::fields::{FieldDef, Schema};
use crate::html::{escape, safe_url};
use crate::style_config::StyleRule;

/// Displays `gallery_images`: an array of `{src, title?, alt?, caption?}`.
/// For CMS albums the caller fills that array from the album's images.
pub struct Gallery;

pub const LAYOUTS: &[(&str, &str)] = &[
    ("grid", "Grid"),
    ("masonry", "Masonry"),
    ("carousel", "Carousel"),
    ("list", "List"),
];

const STYLE: &[StyleRule] = &[
    StyleRule::new("image_border_radius", "border-radius", " .jtb-gallery-item img").unit("px"),
    StyleRule::new("title_color", "color", " .jtb-gallery-title"),
    StyleRule::new("title_font_size", "font-size", " .jtb-gallery-title").unit("px").responsive(),
    StyleRule::new("caption_color", "color", " .jtb-gallery-caption"),
    StyleRule::new("overlay_color", "background-color", " .jtb-gallery-link::after").hover(),
];

fn layout(attrs: &Attrs) -> &'static str {
    match attrs.text("layout").as_str() {
        "masonry" => "masonry",
        "carousel" => "carousel",
        "list" => "list",
        _ => "grid",
    }
}

fn columns(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some((n as u32).clamp(1, 6))
}

impl Element for Gallery {
    fn slug(&self) -> &'static str {
        "gallery"
    }

    fn name(&self) -> &'static str {
        "Gallery"
    }

    fn icon(&self) -> &'static str {
        "image"
    }

    fn category(&self) -> Category {
        Category::Media
    }

    fn fields(&self) -> Schema {
        vec![
            (
                "gallery_source",
                FieldDef::select("Source", &[("custom", "Custom Images"), ("cms_gallery", "CMS Gallery")], "custom"),
            ),
            (
                "cms_gallery_slug",
                FieldDef::text("Gallery", "").blank().show_if("gallery_source", &["cms_gallery"]),
            ),
            ("layout", FieldDef::select("Layout", LAYOUTS, "grid")),
            ("columns", FieldDef::range("Columns", 3.0, 1.0, 6.0, "").responsive()),
            ("gutter", FieldDef::range("Gutter", 10.0, 0.0, 60.0, "px")),
            ("show_title", FieldDef::toggle("Show Title", true)),
            ("show_caption", FieldDef::toggle("Show Caption", false)),
            ("lightbox", FieldDef::toggle("Open in Lightbox", true)),
            (
                "image_ratio",
                FieldDef::select(
                    "Image Ratio",
                    &[("auto", "Original"), ("1:1", "Square"), ("4:3", "4:3"), ("16:9", "16:9")],
                    "auto",
                ),
            ),
            ("image_border_radius", FieldDef::range("Image Border Radius", 0.0, 0.0, 50.0, "px")),
            ("overlay_color", FieldDef::color("Overlay Color", "").blank().hover()),
            ("title_color", FieldDef::color("Title Color", "").blank()),
            ("title_font_size", FieldDef::range("Title Font Size", 14.0, 10.0, 40.0, "px").blank().responsive()),
            ("caption_color", FieldDef::color("Caption Color", "").blank()),
        ]
    }

    fn style_config(&self) -> &'static [StyleRule] {
        STYLE
    }

    fn render(&self, attrs: &Attrs, _content: &str) -> String {
        let images = attrs.list("gallery_images");
        let usable: Vec<&serde_json::Map<String, Value>> = images
            .iter()
            .filter_map(Value::as_object)
            .filter(|img| img.get("src").and_then(Value::as_str).is_some_and(|s| !s.is_empty()))
            .collect();

        if usable.is_empty() {
            return "<div class=\"jtb-gallery jtb-gallery-empty\"><p>No images to display.</p></div>".to_string();
        }

        let layout = layout(attrs);
        let lightbox = attrs.bool("lightbox");
        let show_title = attrs.bool("show_title");
        let show_caption = attrs.bool("show_caption");

        let mut html = format!(
            "<div class=\"jtb-gallery jtb-gallery-{}\"{}>",
            layout,
            if lightbox { " data-lightbox=\"true\"" } else { "" }
        );

        for img in usable {
            let text = |key: &str| img.get(key).and_then(Value::as_str).unwrap_or("").to_string();
            let src = escape(&safe_url(&text("src")));
            let title = text("title");
            let alt = {
                let alt = text("alt");
                if alt.is_empty() { title.clone() } else { alt }
            };

            html.push_str("<figure class=\"jtb-gallery-item\">");
            let image = format!("<img src=\"{}\" alt=\"{}\" loading=\"lazy\">", src, escape(&alt));
            if lightbox {
                html.push_str(&format!(
                    "<a class=\"jtb-gallery-link\" href=\"{}\" data-title=\"{}\">{}</a>",
                    src,
                    escape(&title),
                    image
                ));
            } else {
                html.push_str(&image);
            }

            let caption = text("caption");
            let has_title = show_title && !title.is_empty();
            let has_caption = show_caption && !caption.is_empty();
            if has_title || has_caption {
                html.push_str("<figcaption>");
                if has_title {
                    html.push_str(&format!("<span class=\"jtb-gallery-title\">{}</span>", escape(&title)));
                }
                if has_caption {
                    html.push_str(&format!("<span class=\"jtb-gallery-caption\">{}</span>", escape(&caption)));
                }
                html.push_str("</figcaption>");
            }
            html.push_str("</figure>");
        }

        html.push_str("</div>");
        html
    }

    fn module_css(&self, attrs: &Attrs, selector: &str, css: &mut CssBuilder) {
        let layout = layout(attrs);
        let gutter = format!("{}px", attrs.number_or("gutter", 10.0));
        let container = format!("{} .jtb-gallery", selector);
        let item = format!("{} .jtb-gallery-item", selector);

        for device in Device::ALL {
            let Some(cols) = columns(attrs.responsive("columns", device)) else {
                continue;
            };
            let mut decls = Declarations::new();
            let mut item_decls = Declarations::new();
            match layout {
                "grid" => {
                    decls.push("grid-template-columns", format!("repeat({}, 1fr)", cols));
                }
                "masonry" => {
                    decls.push("column-count", cols.to_string());
                }
                "carousel" => {
                    item_decls.push("flex", format!("0 0 calc({:.4}% - {})", 100.0 / f64::from(cols), gutter));
                }
                _ => {}
            }
            if device == Device::Desktop {
                match layout {
                    "grid" => {
                        decls.push("display", "grid").push("gap", gutter.clone());
                    }
                    "masonry" => {
                        decls.push("column-gap", gutter.clone());
                        item_decls
                            .push("break-inside", "avoid")
                            .push("margin-bottom", gutter.clone());
                    }
                    "carousel" => {
                        decls
                            .push("display", "flex")
                            .push("gap", gutter.clone())
                            .push("overflow-x", "auto")
                            .push("scroll-snap-type", "x mandatory");
                        item_decls.push("scroll-snap-align", "start");
                    }
                    _ => {}
                }
            }
            css.rule(device, &container, &decls);
            css.rule(device, &item, &item_decls);
        }

        if layout == "list" {
            let mut decls = Declarations::new();
            decls
                .push("display", "flex")
                .push("flex-direction", "column")
                .push("gap", gutter);
            css.desktop(&container, &decls);
        }

        let mut img = Declarations::new();
        img.push("display", "block").push("width", "100%");
        match attrs.text("image_ratio").as_str() {
            "1:1" => {
                img.push("aspect-ratio", "1 / 1").push("object-fit", "cover");
            }
            "4:3" => {
                img.push("aspect-ratio", "4 / 3").push("object-fit", "cover");
            }
            "16:9" => {
                img.push("aspect-ratio", "16 / 9").push("object-fit", "cover");
            }
            _ => {
                img.push("height", "auto");
            }
        }
        css.desktop(&format!("{} img", item), &img);

        let mut link = Declarations::new();
        link.push("position", "relative").push("display", "block");
        css.desktop(&format!("{} .jtb-gallery-link", selector), &link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        Gallery.with_defaults(&Attrs::from_value(value).unwrap())
    }

    fn images() -> serde_json::Value {
        json!([
            {"src": "/uploads/galleries/1/a.jpg", "title": "Beach"},
            {"src": "/uploads/galleries/1/b.jpg", "title": "", "alt": "Dunes", "caption": "Morning"},
            {"title": "no source"}
        ])
    }

    #[test]
    fn test_empty_gallery() {
        let html = Gallery.render(&attrs(json!({})), "");
        assert_eq!(html, "<div class=\"jtb-gallery jtb-gallery-empty\"><p>No images to display.</p></div>");
    }

    #[test]
    fn test_render_with_lightbox() {
        let html = Gallery.render(&attrs(json!({"gallery_images": images()})), "");
        assert!(html.starts_with("<div class=\"jtb-gallery jtb-gallery-grid\" data-lightbox=\"true\">"));
        assert_eq!(html.matches("<figure").count(), 2);
        assert!(html.contains("<a class=\"jtb-gallery-link\" href=\"/uploads/galleries/1/a.jpg\" data-title=\"Beach\"><img src=\"/uploads/galleries/1/a.jpg\" alt=\"Beach\" loading=\"lazy\"></a>"));
        assert!(html.contains("<span class=\"jtb-gallery-title\">Beach</span>"));
        assert!(html.contains("alt=\"Dunes\""));
        assert!(!html.contains("Morning"));
    }

    #[test]
    fn test_render_without_lightbox_with_captions() {
        let html = Gallery.render(
            &attrs(json!({"gallery_images": images(), "lightbox": false, "show_caption": true, "layout": "list"})),
            "",
        );
        assert!(html.starts_with("<div class=\"jtb-gallery jtb-gallery-list\">"));
        assert!(!html.contains("jtb-gallery-link"));
        assert!(html.contains("<span class=\"jtb-gallery-caption\">Morning</span>"));
    }

    #[test]
    fn test_grid_css_with_responsive_columns() {
        let css = Gallery.generate_css(&attrs(json!({"columns": 4, "columns__phone": 1, "gutter": 16})), "#g");
        assert!(css.contains("#g .jtb-gallery { grid-template-columns: repeat(4, 1fr); display: grid; gap: 16px; }"));
        let phone = css.split("@media (max-width: 767px)").nth(1).unwrap();
        assert!(phone.contains("  #g .jtb-gallery { grid-template-columns: repeat(1, 1fr); }\n"));
    }

    #[test]
    fn test_masonry_css() {
        let css = Gallery.generate_css(&attrs(json!({"layout": "masonry", "columns": 3})), "#g");
        assert!(css.contains("#g .jtb-gallery { column-count: 3; column-gap: 10px; }"));
        assert!(css.contains("#g .jtb-gallery-item { break-inside: avoid; margin-bottom: 10px; }"));
    }

    #[test]
    fn test_columns_clamped() {
        assert_eq!(columns(Some(&json!(12))), Some(6));
        assert_eq!(columns(Some(&json!("0"))), Some(1));
        assert_eq!(columns(None), None);
    }
}
