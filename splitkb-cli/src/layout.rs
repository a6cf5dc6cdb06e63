//! Generate an HTML/SVG visualization of the split keyboard's layers.
//! Each wired position is a rectangle with its label.

use splitkb_core::keymap::Layer;
use splitkb_core::layers::{LAYERS, NUM_LAYERS};
use splitkb_core::{Binding, Coord, Keymap, LayerBit, NUM_COLUMNS, NUM_LINES};

/// Physical key position and size for SVG rendering.
struct Key {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    pos: Coord,
}

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
/// Gap between keys.
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 4.0;
/// Spacing between left and right halves.
const HALF_GAP: f64 = 60.0;
/// Margin around the SVG content.
const MARGIN: f64 = 20.0;
/// Columns per half.
const HALF: usize = NUM_COLUMNS / 2;

/// Column stagger for the left half (y offset in units of S).
/// Index 0 = outermost, index 5 = innermost. The right half mirrors it.
const STAGGER: [f64; HALF] = [0.40, 0.25, 0.00, -0.15, 0.10, 0.30];

/// Thumb line sits a little lower than the finger lines.
const THUMB_DROP: f64 = 0.35;

/// Whether `pos` carries anything on any layer.
fn is_used(keymap: &Keymap, pos: Coord) -> bool {
    keymap.flags(pos).selector != LayerBit::None
        || LAYERS
            .iter()
            .any(|(_, layer)| !binding(layer, pos).is_empty())
}

fn binding(layer: &Layer, pos: Coord) -> &Binding {
    &layer[pos.line as usize][pos.column as usize]
}

/// Build physical key positions for every used position of both halves.
fn build_keys(keymap: &Keymap) -> Vec<Key> {
    let mut keys = Vec::new();
    for pos in Coord::all().filter(|&pos| is_used(keymap, pos)) {
        let column = pos.column as usize;
        let (x, stagger) = if column < HALF {
            (column as f64 * S, STAGGER[column])
        } else {
            let mirrored = NUM_COLUMNS - 1 - column;
            (column as f64 * S + HALF_GAP, STAGGER[mirrored])
        };
        let line = pos.line as f64;
        let drop = if pos.line as usize == NUM_LINES - 1 {
            THUMB_DROP
        } else {
            0.0
        };
        keys.push(Key {
            x,
            y: (line + stagger + drop) * S,
            w: U,
            h: U,
            pos,
        });
    }
    keys
}

/// Compute the bounding box of all keys: (max_x + w, max_y + h).
fn bbox(keys: &[Key]) -> (f64, f64) {
    let mut max_x: f64 = 0.0;
    let mut max_y: f64 = 0.0;
    for k in keys {
        max_x = max_x.max(k.x + k.w);
        max_y = max_y.max(k.y + k.h);
    }
    (max_x, max_y)
}

fn selector_name(bit: LayerBit) -> Option<&'static str> {
    match bit {
        LayerBit::None => None,
        LayerBit::Shift => Some("Shift"),
        LayerBit::Function => Some("Fn"),
        LayerBit::Accent => Some("Acc"),
    }
}

/// Main label of a binding: the key, prefixed by a forced modifier.
fn label(binding: &Binding) -> String {
    if let Some(media) = binding.media {
        return media.display_name().to_string();
    }
    match (binding.forced, binding.primary) {
        (Some(with), Some(key)) => format!("{}+{}", with.display_name(), key.display_name()),
        (None, Some(key)) => key.display_name().to_string(),
        _ => String::new(),
    }
}

/// Render a single layer as an SVG group.
fn render_layer(keymap: &Keymap, keys: &[Key], layer_idx: usize, y_offset: f64) -> String {
    let (name, layer) = LAYERS[layer_idx];
    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<g transform="translate({MARGIN}, {y_offset})">"#
    ));
    svg.push_str(&format!(
        r#"<text x="0" y="-10" class="layer-title">Layer {layer_idx} ({})</text>"#,
        html_escape(name),
    ));

    for key in keys {
        let binding = binding(layer, key.pos);
        let flags = keymap.flags(key.pos);
        let selector = selector_name(flags.selector);

        let key_class = if selector.is_some() {
            "key layer"
        } else if binding.is_empty() {
            "key unused"
        } else if binding.media.is_some() {
            "key media"
        } else if binding.primary.is_some_and(|k| k.is_modifier()) {
            "key modifier"
        } else {
            "key"
        };

        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{R}" class="{key_class}"/>"#,
            key.x, key.y, key.w, key.h,
        ));

        let cx = key.x + key.w / 2.0;
        let main = label(binding);
        if !main.is_empty() {
            let font_class = if main.chars().count() > 3 { " small" } else { "" };
            svg.push_str(&format!(
                r#"<text x="{cx}" y="{}" class="label{font_class}">{}</text>"#,
                key.y + key.h / 2.0 + 1.0,
                html_escape(&main),
            ));
        }

        // Bottom line: the shifted variant, or the layer a selector holds.
        let sub = binding
            .secondary
            .map(|k| k.display_name())
            .or(selector.filter(|_| flags.resolves_on_release || main.is_empty()));
        if let Some(sub) = sub {
            svg.push_str(&format!(
                r#"<text x="{cx}" y="{}" class="label sub">{}</text>"#,
                key.y + key.h - 9.0,
                html_escape(sub),
            ));
        }
    }

    svg.push_str("</g>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html(keymap: &Keymap) -> String {
    let keys = build_keys(keymap);
    let (content_w, content_h) = bbox(&keys);
    let layer_height = content_h + 60.0;
    let total_width = content_w + 2.0 * MARGIN;
    let total_height = NUM_LAYERS as f64 * layer_height + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<title>Split keyboard layout</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  svg {{
    filter: drop-shadow(0 2px 8px rgba(0,0,0,0.3));
  }}
  .key {{
    fill: #16213e;
    stroke: #0f3460;
    stroke-width: 1.5;
  }}
  .key:hover {{
    fill: #1a1a5e;
    stroke: #e94560;
  }}
  .key.unused {{
    fill: #0d1117;
    stroke: #21262d;
    stroke-dasharray: 3 3;
  }}
  .key.layer {{
    fill: #2d1b4e;
    stroke: #e94560;
    stroke-width: 2;
  }}
  .key.modifier {{
    fill: #1b2e4e;
    stroke: #53a8b6;
    stroke-width: 1.5;
  }}
  .key.media {{
    fill: #1e3b2e;
    stroke: #5fb67a;
  }}
  .label {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 13px;
    text-anchor: middle;
    dominant-baseline: middle;
    pointer-events: none;
  }}
  .label.small {{
    font-size: 10px;
  }}
  .label.sub {{
    fill: #9aa5ce;
    font-size: 9px;
  }}
  .layer-title {{
    fill: #e94560;
    font-family: system-ui, -apple-system, sans-serif;
    font-size: 16px;
    font-weight: bold;
  }}
</style>
</head>
<body>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    for layer_idx in 0..NUM_LAYERS {
        let y_offset = MARGIN + layer_idx as f64 * layer_height + 30.0;
        html.push_str(&render_layer(keymap, &keys, layer_idx, y_offset));
        html.push('\n');
    }

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitkb_core::DEFAULT_KEYMAP;

    #[test]
    fn unwired_line_is_not_drawn() {
        let keys = build_keys(&DEFAULT_KEYMAP);
        assert!(!keys.is_empty());
        assert!(keys.iter().all(|k| k.pos.line != 0));
    }

    #[test]
    fn every_layer_gets_a_title() {
        let html = generate_html(&DEFAULT_KEYMAP);
        for (idx, (name, _)) in LAYERS.iter().enumerate() {
            assert!(html.contains(&format!("Layer {idx} ({name})")));
        }
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn selectors_are_highlighted() {
        let html = generate_html(&DEFAULT_KEYMAP);
        // Shift, Accent and Function on each of the five layers.
        assert_eq!(html.matches(r#"class="key layer""#).count(), 3 * NUM_LAYERS);
    }

    #[test]
    fn forced_modifier_is_part_of_the_label() {
        let alt_tab = Binding::forced(splitkb_core::Keycode::Tab, splitkb_core::Keycode::LAlt);
        let label = label(&alt_tab);
        assert!(label.contains('+'));
        assert!(label.ends_with(splitkb_core::Keycode::Tab.display_name()));
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(html_escape("<&>"), "&lt;&amp;&gt;");
    }
}
