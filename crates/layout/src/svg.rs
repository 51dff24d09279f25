use kurbo::{CubicBez, Point, Rect};

use crate::geometry::bounding_box;

/// A laid-out node box to draw
#[derive(Debug, Clone)]
pub struct SvgNode {
    pub rect: Rect,
    pub label: String,
    pub color: String,
    pub highlighted: bool,
}

/// Everything needed to draw one frame of the tree
#[derive(Debug, Clone, Default)]
pub struct SvgScene {
    pub nodes: Vec<SvgNode>,
    pub connections: Vec<CubicBez>,
    pub markers: Vec<Point>,
}

pub fn generate_svg(scene: &SvgScene, padding: f64) -> String {
    let bounds = bounding_box(scene.nodes.iter().map(|n| n.rect))
        .unwrap_or(Rect::new(0.0, 0.0, 100.0, 100.0))
        .inflate(padding, padding);

    let mut svg = format!(
        r#"<svg width="{}" height="{}" viewBox="{} {} {} {}" xmlns="http://www.w3.org/2000/svg">
<rect x="{}" y="{}" width="100%" height="100%" fill="white"/>
"#,
        bounds.width(),
        bounds.height(),
        bounds.x0,
        bounds.y0,
        bounds.width(),
        bounds.height(),
        bounds.x0,
        bounds.y0,
    );

    // Connections go underneath the boxes
    for curve in &scene.connections {
        svg.push_str(&format!(
            r##"<path d="M {} {} C {} {}, {} {}, {} {}" stroke="#323232" stroke-width="2" fill="none"/>
"##,
            curve.p0.x,
            curve.p0.y,
            curve.p1.x,
            curve.p1.y,
            curve.p2.x,
            curve.p2.y,
            curve.p3.x,
            curve.p3.y
        ));
    }

    for node in &scene.nodes {
        let stroke = if node.highlighted { "#ff8844" } else { "black" };
        let stroke_width = if node.highlighted { 3.0 } else { 1.0 };
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="6" fill="{}" stroke="{}" stroke-width="{}"/>
<text x="{}" y="{}" font-family="Arial" font-size="12" text-anchor="middle">{}</text>
"#,
            node.rect.x0,
            node.rect.y0,
            node.rect.width(),
            node.rect.height(),
            escape(&node.color),
            stroke,
            stroke_width,
            node.rect.center().x,
            node.rect.center().y + 4.0,
            escape(&node.label)
        ));
    }

    for marker in &scene.markers {
        svg.push_str(&format!(
            r##"<circle cx="{}" cy="{}" r="5" fill="#4488ff"/>
"##,
            marker.x, marker.y
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_contains_nodes_and_curves() {
        let scene = SvgScene {
            nodes: vec![SvgNode {
                rect: Rect::new(0.0, 0.0, 100.0, 40.0),
                label: "A & B".to_string(),
                color: "lightblue".to_string(),
                highlighted: false,
            }],
            connections: vec![CubicBez::new(
                (50.0, 40.0),
                (50.0, 70.0),
                (50.0, 90.0),
                (50.0, 120.0),
            )],
            markers: vec![Point::new(50.0, 80.0)],
        };
        let svg = generate_svg(&scene, 10.0);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("A &amp; B"));
        assert!(svg.contains("M 50 40 C 50 70, 50 90, 50 120"));
        assert!(svg.contains("<circle"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
