use arbor_layout::kurbo::{Point, Rect, Size};
use arbor_layout::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct TestTree {
    children: Vec<Vec<usize>>,
    sizes: Vec<Size>,
    positions: Vec<Point>,
}

impl TestTree {
    /// Random tree where node `i > 0` hangs under a node with a smaller index
    fn random(rng: &mut StdRng, n: usize) -> Self {
        let mut children = vec![Vec::new(); n];
        for i in 1..n {
            let parent = rng.random_range(0..i);
            children[parent].push(i);
        }
        let sizes = (0..n)
            .map(|_| Size::new(150.0, rng.random_range(40.0..120.0)))
            .collect();
        Self {
            children,
            sizes,
            positions: vec![Point::ZERO; n],
        }
    }

    fn rect(&self, id: usize) -> Rect {
        geometry::node_rect(self.positions[id], self.sizes[id])
    }
}

impl LayoutTree for TestTree {
    type Id = usize;

    fn root(&self) -> Option<usize> {
        (!self.children.is_empty()).then_some(0)
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

#[test]
fn test_layout_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut tree = TestTree::random(&mut rng, 40);
    let mut layout = TreeLayout::new(LayoutConfig::default());

    layout.apply(&mut tree).unwrap();
    let first = tree.positions.clone();
    layout.apply(&mut tree).unwrap();
    assert_eq!(first, tree.positions);

    // A fresh engine produces the same answer
    let mut other = TreeLayout::new(LayoutConfig::default());
    other.apply(&mut tree).unwrap();
    assert_eq!(first, tree.positions);
}

#[test]
fn test_siblings_never_overlap() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let n = rng.random_range(1..60);
        let mut tree = TestTree::random(&mut rng, n);
        let mut layout = TreeLayout::new(LayoutConfig::default());
        layout.apply(&mut tree).unwrap();

        for kids in &tree.children {
            for pair in kids.windows(2) {
                let left = tree.rect(pair[0]);
                let right = tree.rect(pair[1]);
                assert!(
                    left.x1 <= right.x0,
                    "siblings {} and {} overlap",
                    pair[0],
                    pair[1]
                );
            }
        }
    }
}

#[test]
fn test_children_below_parent() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut tree = TestTree::random(&mut rng, 30);
    let config = LayoutConfig::default();
    let mut layout = TreeLayout::new(config);
    layout.apply(&mut tree).unwrap();

    for (parent, kids) in tree.children.iter().enumerate() {
        let parent_rect = tree.rect(parent);
        for &child in kids {
            let expected = parent_rect.y1 + config.vertical_margin;
            assert!((tree.positions[child].y - expected).abs() < 1e-9);
        }
    }
}

#[test]
fn test_root_placed_at_origin() {
    let mut tree = TestTree {
        children: vec![vec![]],
        sizes: vec![Size::new(150.0, 60.0)],
        positions: vec![Point::ZERO],
    };
    let config = LayoutConfig {
        root_x: 400.0,
        root_y: 20.0,
        ..Default::default()
    };
    let mut layout = TreeLayout::new(config);
    layout.apply(&mut tree).unwrap();
    assert_eq!(tree.positions[0], Point::new(325.0, 20.0));
}

#[test]
fn test_empty_tree_lays_out_nothing() {
    let mut tree = TestTree {
        children: vec![],
        sizes: vec![],
        positions: vec![],
    };
    let mut layout = TreeLayout::new(LayoutConfig::default());
    assert_eq!(layout.apply(&mut tree).unwrap(), 0);
}

#[test]
fn test_svg_scene_from_layout() {
    let mut tree = TestTree {
        children: vec![vec![1, 2], vec![], vec![]],
        sizes: vec![Size::new(150.0, 60.0); 3],
        positions: vec![Point::ZERO; 3],
    };
    let mut layout = TreeLayout::new(LayoutConfig::default());
    layout.apply(&mut tree).unwrap();

    let curve_config = CurveConfig::default();
    let connections = [1, 2]
        .iter()
        .map(|&c| connection_curve(tree.rect(0), tree.rect(c), &curve_config))
        .collect();
    let nodes = (0..3)
        .map(|i| SvgNode {
            rect: tree.rect(i),
            label: format!("N{i}"),
            color: "lightblue".to_string(),
            highlighted: i == 1,
        })
        .collect();
    let svg = generate_svg(
        &SvgScene {
            nodes,
            connections,
            markers: vec![],
        },
        20.0,
    );
    assert_eq!(svg.matches("<path").count(), 2);
    assert_eq!(svg.matches("<rect").count(), 4);
}
