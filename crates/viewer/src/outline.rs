//! KDL outlines: one KDL node per tree node, nesting gives the hierarchy

use anyhow::{Context, Result, bail};
use graphview::{Canvas, NewNode, NodeId};

const DEFAULT_TYPE: &str = "node";
const DEFAULT_COLOR: &str = "#9ecae1";

/// A parsed outline entry with its children in document order
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub spec: NewNode,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::count).sum::<usize>()
    }
}

/// Parse an outline such as
///
/// ```kdl
/// company "Acme" color="#ffcc00" {
///     team "Platform" type="team"
///     team "Apps" type="team" accepts=#false
/// }
/// ```
///
/// The first positional argument is the display name, falling back to the
/// node name. Exactly one top-level node is allowed.
pub fn parse_outline(content: &str) -> Result<OutlineNode> {
    let doc = kdl::KdlDocument::parse(content).context("invalid KDL outline")?;
    let mut roots = doc.nodes().iter();
    let Some(root) = roots.next() else {
        bail!("outline is empty");
    };
    if roots.next().is_some() {
        bail!("outline must have exactly one top-level node");
    }
    Ok(convert(root))
}

fn convert(kdl_node: &kdl::KdlNode) -> OutlineNode {
    // Positional arguments have no name
    let name = kdl_node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .unwrap_or_else(|| kdl_node.name().value().to_string());
    let type_tag = property(kdl_node, "type").unwrap_or(DEFAULT_TYPE);
    let color = property(kdl_node, "color").unwrap_or(DEFAULT_COLOR);

    let spec = NewNode::new(name, type_tag, color)
        .draggable(flag(kdl_node, "draggable").unwrap_or(true))
        .accepts_children(flag(kdl_node, "accepts").unwrap_or(true));
    let children = kdl_node
        .children()
        .map(|doc| doc.nodes().iter().map(convert).collect())
        .unwrap_or_default();
    OutlineNode { spec, children }
}

fn property<'a>(kdl_node: &'a kdl::KdlNode, key: &str) -> Option<&'a str> {
    kdl_node
        .entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .and_then(|e| e.value().as_string())
}

fn flag(kdl_node: &kdl::KdlNode, key: &str) -> Option<bool> {
    kdl_node
        .entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .and_then(|e| e.value().as_bool())
}

/// Add the outline to an empty canvas, returning the new root id
pub fn load_outline(canvas: &mut Canvas, outline: &OutlineNode) -> Result<NodeId> {
    let root = canvas
        .add_node(outline.spec.clone(), None, None)
        .context("failed to add outline root")?;
    let mut stack: Vec<(NodeId, &OutlineNode)> = vec![(root, outline)];
    while let Some((parent, node)) = stack.pop() {
        for child in &node.children {
            let id = canvas
                .add_node(child.spec.clone(), Some(parent), None)
                .with_context(|| format!("failed to add {:?}", child.spec.name))?;
            stack.push((id, child));
        }
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_layout::kurbo::Size;
    use graphview::CanvasConfig;

    const OUTLINE: &str = r##"
company "Acme" color="#ffcc00" {
    team "Platform" type="team" {
        service "Gateway" draggable=#false
    }
    team "Apps" type="team" accepts=#false
}
"##;

    #[test]
    fn test_parse_outline() {
        let outline = parse_outline(OUTLINE).unwrap();
        assert_eq!(outline.spec.name, "Acme");
        assert_eq!(outline.spec.color, "#ffcc00");
        assert_eq!(outline.spec.type_tag, DEFAULT_TYPE);
        assert_eq!(outline.count(), 4);

        let platform = &outline.children[0];
        assert_eq!(platform.spec.type_tag, "team");
        assert!(!platform.children[0].spec.draggable);
        assert!(!outline.children[1].spec.accepts_children);
    }

    #[test]
    fn test_rejects_forest() {
        assert!(parse_outline("a\nb\n").is_err());
        assert!(parse_outline("").is_err());
    }

    #[test]
    fn test_falls_back_to_node_name() {
        let outline = parse_outline("root { leaf }").unwrap();
        assert_eq!(outline.spec.name, "root");
        assert_eq!(outline.children[0].spec.name, "leaf");
    }

    #[test]
    fn test_load_keeps_child_order() {
        let outline = parse_outline(OUTLINE).unwrap();
        let mut canvas = Canvas::headless(CanvasConfig::default(), Size::new(800.0, 600.0));
        let root = load_outline(&mut canvas, &outline).unwrap();
        let tree = canvas.tree();
        assert_eq!(tree.len(), 4);
        let names: Vec<&str> = tree
            .children(root)
            .unwrap()
            .iter()
            .map(|id| tree.get(*id).unwrap().name())
            .collect();
        assert_eq!(names, ["Platform", "Apps"]);
    }
}
