use crate::settings::ButtonConfig;
use base64::Engine;

// Icon rendering configuration
pub const ICON_SIZE: u32 = 144; // Key canvas size
const TEXT_WIDTH: f32 = 140.0; // Usable width for a line of text
const CHAR_WIDTH_FACTOR: f32 = 0.45; // Average glyph width relative to font size

const COUNT_MAX_FONT_SIZE: f32 = 40.0;
const LABEL_MAX_FONT_SIZE: f32 = 30.0;
const COUNT_BASELINE_Y: u32 = 62;
const LABEL_BASELINE_Y: u32 = 108;

pub const NEUTRAL_COLOR: &str = "white";

/// Resolve the background color for `count`.
///
/// Ladder G wins whenever its first cutoff is set, ladder B is consulted only
/// otherwise, and an unconfigured key stays neutral. The two ladders are
/// deliberately mirror images: G treats a high count as green, B as red.
pub fn resolve_color(count: usize, config: &ButtonConfig) -> &str {
    config
        .g_ladder()
        .color_for(count)
        .or_else(|| config.b_ladder().color_for(count))
        .unwrap_or(NEUTRAL_COLOR)
}

/// Font size that fits `text_len` characters into `width`, capped at `max_size`
pub fn fit_font_size(text_len: usize, width: f32, max_size: f32) -> f32 {
    if text_len == 0 {
        return max_size;
    }
    (width / (text_len as f32 * CHAR_WIDTH_FACTOR)).min(max_size)
}

pub fn count_label(count: usize) -> String {
    format!("{} Tasks", count)
}

/// Parse a CSS named color or hex string into RGB, for the handful of
/// formats the property inspector offers
fn parse_color(color: &str) -> Option<[u8; 3]> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let v = ch.to_digit(16)? as u8;
                    rgb[i] = v * 17;
                }
                Some(rgb)
            }
            6 => Some([
                u8::from_str_radix(hex.get(0..2)?, 16).ok()?,
                u8::from_str_radix(hex.get(2..4)?, 16).ok()?,
                u8::from_str_radix(hex.get(4..6)?, 16).ok()?,
            ]),
            _ => None,
        };
    }

    match color.to_ascii_lowercase().as_str() {
        "white" => Some([255, 255, 255]),
        "black" => Some([0, 0, 0]),
        "green" => Some([0, 128, 0]),
        "yellow" => Some([255, 255, 0]),
        "orange" => Some([255, 165, 0]),
        "red" => Some([255, 0, 0]),
        "blue" => Some([0, 0, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        "purple" => Some([128, 0, 128]),
        _ => None,
    }
}

/// Calculate relative luminance and return appropriate text color for contrast
fn contrast_text_color(background: &str) -> &'static str {
    let Some(bg_rgb) = parse_color(background) else {
        return "black";
    };

    let r = bg_rgb[0] as f32 / 255.0;
    let g = bg_rgb[1] as f32 / 255.0;
    let b = bg_rgb[2] as f32 / 255.0;

    let luminance = 0.2126 * r + 0.7152 * g + 0.0722 * b;

    if luminance > 0.5 { "black" } else { "white" }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn text_line(text: &str, y: u32, max_size: f32, fill: &str) -> String {
    let size = fit_font_size(text.chars().count(), TEXT_WIDTH, max_size);
    format!(
        r#"<text x="{x}" y="{y}" font-family="Arial, Helvetica, sans-serif" font-weight="bold" font-size="{size:.2}" fill="{fill}" text-anchor="middle">{text}</text>"#,
        x = ICON_SIZE / 2,
        y = y,
        size = size,
        fill = fill,
        text = escape_xml(text),
    )
}

/// Render the key face for `count` as SVG markup
pub fn render_icon_svg(count: usize, config: &ButtonConfig) -> String {
    let background = resolve_color(count, config);
    let text_fill = contrast_text_color(background);

    let count_line = text_line(&count_label(count), COUNT_BASELINE_Y, COUNT_MAX_FONT_SIZE, text_fill);
    let label_line = text_line(&config.item_name, LABEL_BASELINE_Y, LABEL_MAX_FONT_SIZE, text_fill);

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}"><rect width="{size}" height="{size}" fill="{background}"/>{count_line}{label_line}</svg>"#,
        size = ICON_SIZE,
        background = escape_xml(background),
        count_line = count_line,
        label_line = label_line,
    )
}

/// Wrap SVG markup as a data URI the host accepts for key images
pub fn svg_data_uri(svg: &str) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(svg)
    )
}

/// Render the key face for `count` and encode it for the host
pub fn render_icon(count: usize, config: &ButtonConfig) -> String {
    svg_data_uri(&render_icon_svg(count, config))
}
