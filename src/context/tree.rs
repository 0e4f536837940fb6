use std::collections::BTreeMap;

/// A node in the project structure tree: either a directory with named,
/// ordered children, or a file leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(BTreeMap<String, TreeNode>),
    File,
}

/// Project structure tree built from relative paths.
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    root: BTreeMap<String, TreeNode>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from forward-slash relative paths.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path);
        }
        tree
    }

    /// Insert one relative path. A path that tries to treat a known file as
    /// a directory is rejected and logged, never silently overwritten.
    pub fn insert(&mut self, path: &str) {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((leaf, dirs)) = components.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for dir in dirs {
            let entry = current
                .entry((*dir).to_string())
                .or_insert_with(|| TreeNode::Directory(BTreeMap::new()));
            match entry {
                TreeNode::Directory(children) => current = children,
                TreeNode::File => {
                    tracing::warn!("path {path} treats file {dir} as a directory; skipping");
                    return;
                }
            }
        }

        match current.entry((*leaf).to_string()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(TreeNode::File);
            }
            std::collections::btree_map::Entry::Occupied(existing) => {
                if matches!(existing.get(), TreeNode::Directory(_)) {
                    tracing::warn!("path {path} collides with directory {leaf}; skipping");
                }
            }
        }
    }

    /// Render with two-space indentation, directories suffixed with `/`,
    /// children in name order.
    pub fn render(&self) -> String {
        let mut output = String::new();
        render_level(&self.root, 0, &mut output);
        output
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn render_level(children: &BTreeMap<String, TreeNode>, depth: usize, output: &mut String) {
    for (name, node) in children {
        for _ in 0..depth {
            output.push_str("  ");
        }
        match node {
            TreeNode::Directory(nested) => {
                output.push_str(name);
                output.push_str("/\n");
                render_level(nested, depth + 1, output);
            }
            TreeNode::File => {
                output.push_str(name);
                output.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nested_paths_in_name_order() {
        let tree = FileTree::from_paths(["src/main.rs", "src/app/mod.rs", "Cargo.toml"]);

        let expected = concat!(
            "Cargo.toml\n",
            "src/\n",
            "  app/\n",
            "    mod.rs\n",
            "  main.rs\n",
        );
        assert_eq!(tree.render(), expected);
    }

    #[test]
    fn rendering_is_deterministic_across_insertion_orders() {
        let a = FileTree::from_paths(["b/x.rs", "a/y.rs", "a/b/z.rs"]);
        let b = FileTree::from_paths(["a/b/z.rs", "b/x.rs", "a/y.rs"]);
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn file_used_as_directory_is_rejected() {
        let mut tree = FileTree::new();
        tree.insert("src/config");
        tree.insert("src/config/nested.rs");

        let expected = concat!("src/\n", "  config\n");
        assert_eq!(tree.render(), expected);
    }

    #[test]
    fn directory_collision_keeps_the_directory() {
        let mut tree = FileTree::new();
        tree.insert("src/app/mod.rs");
        tree.insert("src/app");

        let expected = concat!("src/\n", "  app/\n", "    mod.rs\n");
        assert_eq!(tree.render(), expected);
    }
}
