use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use kurbo::Point;

use crate::types::*;

/// Two-pass tidy layout for fixed-width boxes.
///
/// Pass 1 (post-order) measures every subtree, pass 2 (pre-order) centers
/// each child inside its own subtree width. Subtree widths are memoized per
/// id and the memo is dropped at the start of every full recompute.
#[derive(Debug, Clone)]
pub struct TreeLayout<Id> {
    config: LayoutConfig,
    widths: HashMap<Id, f64>,
}

impl<Id> TreeLayout<Id>
where
    Id: Copy + Eq + Hash + Debug,
{
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            widths: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.invalidate();
    }

    /// Drop all memoized subtree widths
    pub fn invalidate(&mut self) {
        self.widths.clear();
    }

    /// Memoized width of the last recompute, if the node was measured
    pub fn cached_width(&self, id: Id) -> Option<f64> {
        self.widths.get(&id).copied()
    }

    /// Width of the subtree rooted at `id`, reusing memoized values
    pub fn subtree_width<T>(&mut self, tree: &T, id: Id) -> Result<f64, LayoutError>
    where
        T: LayoutTree<Id = Id>,
    {
        let mut visiting = HashSet::new();
        self.measure(tree, id, &mut visiting)
    }

    /// Compute positions for every node reachable from the root
    pub fn compute<T>(&mut self, tree: &T) -> Result<Vec<(Id, Point)>, LayoutError>
    where
        T: LayoutTree<Id = Id>,
    {
        self.invalidate();
        let Some(root) = tree.root() else {
            return Ok(Vec::new());
        };

        let mut visiting = HashSet::new();
        self.measure(tree, root, &mut visiting)?;

        let mut positions = Vec::with_capacity(self.widths.len());
        self.place(
            tree,
            root,
            self.config.root_x,
            self.config.root_y,
            &mut positions,
        )?;
        Ok(positions)
    }

    /// Compute positions and write them back into the tree
    pub fn apply<T>(&mut self, tree: &mut T) -> Result<usize, LayoutError>
    where
        T: LayoutTree<Id = Id>,
    {
        let positions = self.compute(tree)?;
        let count = positions.len();
        for (id, position) in positions {
            tree.set_position(id, position);
        }
        tracing::trace!(nodes = count, "tree layout applied");
        Ok(count)
    }

    fn measure<T>(
        &mut self,
        tree: &T,
        id: Id,
        visiting: &mut HashSet<Id>,
    ) -> Result<f64, LayoutError>
    where
        T: LayoutTree<Id = Id>,
    {
        if let Some(width) = self.widths.get(&id) {
            return Ok(*width);
        }
        if tree.rendered_size(id).is_none() {
            return Err(LayoutError::UnknownNode(format!("{id:?}")));
        }
        if !visiting.insert(id) {
            return Err(LayoutError::CycleDetected(format!("{id:?}")));
        }

        let children = tree.children(id);
        let width = if children.is_empty() {
            self.config.node_width
        } else {
            let mut total = 0.0;
            for &child in children {
                total += self.measure(tree, child, visiting)?;
            }
            total += (children.len() - 1) as f64 * self.config.horizontal_spacing;
            total.max(self.config.node_width)
        };

        visiting.remove(&id);
        self.widths.insert(id, width);
        Ok(width)
    }

    fn place<T>(
        &self,
        tree: &T,
        id: Id,
        center_x: f64,
        top_y: f64,
        out: &mut Vec<(Id, Point)>,
    ) -> Result<(), LayoutError>
    where
        T: LayoutTree<Id = Id>,
    {
        let size = tree
            .rendered_size(id)
            .ok_or_else(|| LayoutError::UnknownNode(format!("{id:?}")))?;
        out.push((id, Point::new(center_x - size.width / 2.0, top_y)));

        let children = tree.children(id);
        if children.is_empty() {
            return Ok(());
        }

        let spacing = self.config.horizontal_spacing;
        let total: f64 = children
            .iter()
            .map(|child| self.widths.get(child).copied().unwrap_or(self.config.node_width))
            .sum::<f64>()
            + (children.len() - 1) as f64 * spacing;

        // Taller content pushes the whole next level down
        let child_y = top_y + size.height + self.config.vertical_margin;
        let mut cursor = center_x - total / 2.0;
        for &child in children {
            let width = self
                .widths
                .get(&child)
                .copied()
                .unwrap_or(self.config.node_width);
            self.place(tree, child, cursor + width / 2.0, child_y, out)?;
            cursor += width + spacing;
        }
        Ok(())
    }
}

impl<Id> Default for TreeLayout<Id>
where
    Id: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    struct VecTree {
        children: Vec<Vec<usize>>,
        sizes: Vec<Size>,
        positions: Vec<Point>,
    }

    impl VecTree {
        fn new(children: Vec<Vec<usize>>) -> Self {
            let n = children.len();
            Self {
                children,
                sizes: vec![Size::new(100.0, 50.0); n],
                positions: vec![Point::ZERO; n],
            }
        }
    }

    impl LayoutTree for VecTree {
        type Id = usize;

        fn root(&self) -> Option<usize> {
            if self.children.is_empty() { None } else { Some(0) }
        }

        fn children(&self, id: usize) -> &[usize] {
            &self.children[id]
        }

        fn rendered_size(&self, id: usize) -> Option<Size> {
            self.sizes.get(id).copied()
        }

        fn set_position(&mut self, id: usize, position: Point) {
            self.positions[id] = position;
        }
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            node_width: 100.0,
            node_height: 50.0,
            horizontal_spacing: 20.0,
            vertical_margin: 30.0,
            root_x: 0.0,
            root_y: 0.0,
        }
    }

    #[test]
    fn test_leaf_width_is_node_width() {
        let tree = VecTree::new(vec![vec![]]);
        let mut layout = TreeLayout::new(config());
        assert_eq!(layout.subtree_width(&tree, 0).unwrap(), 100.0);
    }

    #[test]
    fn test_internal_width_sums_children() {
        let tree = VecTree::new(vec![vec![1, 2, 3], vec![], vec![], vec![]]);
        let mut layout = TreeLayout::new(config());
        // 3 * 100 + 2 * 20
        assert_eq!(layout.subtree_width(&tree, 0).unwrap(), 340.0);
    }

    #[test]
    fn test_single_child_width_floored() {
        let tree = VecTree::new(vec![vec![1], vec![]]);
        let mut layout = TreeLayout::new(LayoutConfig {
            node_width: 100.0,
            ..config()
        });
        assert_eq!(layout.subtree_width(&tree, 0).unwrap(), 100.0);
    }

    #[test]
    fn test_children_centered_under_parent() {
        let mut tree = VecTree::new(vec![vec![1, 2], vec![], vec![]]);
        let mut layout = TreeLayout::new(config());
        layout.apply(&mut tree).unwrap();

        assert_eq!(tree.positions[0], Point::new(-50.0, 0.0));
        // total = 220, children centers at -60 and 60
        assert_eq!(tree.positions[1], Point::new(-110.0, 80.0));
        assert_eq!(tree.positions[2], Point::new(10.0, 80.0));
    }

    #[test]
    fn test_tall_parent_pushes_children_down() {
        let mut tree = VecTree::new(vec![vec![1], vec![]]);
        tree.sizes[0] = Size::new(100.0, 120.0);
        let mut layout = TreeLayout::new(config());
        layout.apply(&mut tree).unwrap();
        assert_eq!(tree.positions[1].y, 150.0);
    }

    #[test]
    fn test_cache_invalidated_on_recompute() {
        let mut tree = VecTree::new(vec![vec![1], vec![]]);
        let mut layout = TreeLayout::new(config());
        layout.apply(&mut tree).unwrap();
        assert_eq!(layout.cached_width(0), Some(100.0));

        tree.children = vec![vec![1, 2], vec![], vec![]];
        tree.sizes.push(Size::new(100.0, 50.0));
        tree.positions.push(Point::ZERO);
        layout.apply(&mut tree).unwrap();
        assert_eq!(layout.cached_width(0), Some(220.0));
    }

    #[test]
    fn test_cycle_reported() {
        let tree = VecTree::new(vec![vec![1], vec![0]]);
        let mut layout = TreeLayout::new(config());
        assert!(matches!(
            layout.compute(&tree),
            Err(LayoutError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_unknown_child_reported() {
        let tree = VecTree::new(vec![vec![7]]);
        let mut layout = TreeLayout::new(config());
        assert!(matches!(
            layout.compute(&tree),
            Err(LayoutError::UnknownNode(_))
        ));
    }
}
